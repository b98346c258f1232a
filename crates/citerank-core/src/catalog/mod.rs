//! Read-only catalog query boundary.
//!
//! # Overview
//!
//! The model engine never talks to a database directly and never constructs
//! query text. Everything it needs from the relational store goes through
//! the [`Catalog`] trait as typed batch lookups; the SQLite implementation
//! in [`sqlite`] owns all SQL.
//!
//! The trait is deliberately read-only. Connection and transaction handling
//! belong to the implementation, not to the callers.

pub mod sqlite;

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AffilId, AuthorId, PaperId, PubRecord, VenueId, Year};

pub use sqlite::SqliteCatalog;

/// Which publication table a [`Catalog::pub_records`] call reads from.
///
/// `Selected` covers the directly targeted venue+year records; `Expanded`
/// covers the pre-joined expansion table used for archive years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PubSource {
    Selected,
    Expanded,
}

/// One author-affiliation join row for a (paper, author) pair.
///
/// `affil` is `None` when the source data has no affiliation recorded for
/// that authorship; the affiliation layer then attempts external resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliationRow {
    pub paper: PaperId,
    pub author: AuthorId,
    pub affil: Option<AffilId>,
}

/// Typed read-only operations the model engine depends on.
///
/// Batch parameters are sets so implementations can bind them as parameter
/// lists. An empty set or year list yields an empty result, never an error.
pub trait Catalog {
    /// Papers published at `venue` in any of `years`, with their years.
    fn papers_by_venue(&self, venue: &VenueId, years: &[Year]) -> Result<Vec<(PaperId, Year)>>;

    /// All citation edges touching the given papers on either endpoint,
    /// as `(citing, cited)` pairs.
    fn citations_touching(&self, papers: &BTreeSet<PaperId>) -> Result<Vec<(PaperId, PaperId)>>;

    /// Authorship rows `(paper, author)` for the given papers.
    fn authorships(&self, papers: &BTreeSet<PaperId>) -> Result<Vec<(PaperId, AuthorId)>>;

    /// Author-affiliation join rows restricted to the given authors and
    /// papers.
    fn author_affiliations(
        &self,
        authors: &BTreeSet<AuthorId>,
        papers: &BTreeSet<PaperId>,
    ) -> Result<Vec<AffiliationRow>>;

    /// Resolve a venue abbreviation (e.g. `"KDD"`) to its catalog id.
    fn resolve_venue(&self, abbr: &str) -> Result<Option<VenueId>>;

    /// Papers from the pre-joined conference-expansion table for
    /// `venue` in any of `years`, with their years.
    fn expanded_papers(&self, venue: &VenueId, years: &[Year]) -> Result<Vec<(PaperId, Year)>>;

    /// Full publication records (year + author → affiliations) for `venue`
    /// over `years`, read from the given source table.
    fn pub_records(
        &self,
        venue: &VenueId,
        years: &[Year],
        source: PubSource,
    ) -> Result<BTreeMap<PaperId, PubRecord>>;
}
