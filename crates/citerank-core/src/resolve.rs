//! Best-effort affiliation resolution boundary.
//!
//! Affiliation coverage in bibliographic dumps is poor; when the catalog has
//! no affiliation for a (paper, author) authorship, the layer assembler asks
//! an [`AffiliationResolver`] exactly once per pair. Resolution is
//! best-effort: an empty set and an error are both non-fatal and the record
//! is skipped.

use anyhow::Result;
use std::collections::BTreeSet;

use crate::model::{AffilId, AuthorId, PaperId};

/// External lookup for an author's affiliations on a given paper.
pub trait AffiliationResolver {
    /// Resolve the affiliations of `author` at the time of `paper`.
    ///
    /// May return an empty set. Implementations should not retry
    /// internally; the caller already deduplicates attempts per
    /// (paper, author) pair within one build.
    ///
    /// # Errors
    ///
    /// Failures are reported but treated as "no affiliation found" by
    /// callers.
    fn resolve(&self, author: &AuthorId, paper: &PaperId) -> Result<BTreeSet<AffilId>>;
}

/// Resolver that never finds anything. For builds without an external
/// affiliation source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl AffiliationResolver for NoResolver {
    fn resolve(&self, _author: &AuthorId, _paper: &PaperId) -> Result<BTreeSet<AffilId>> {
        Ok(BTreeSet::new())
    }
}
