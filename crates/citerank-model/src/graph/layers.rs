//! Per-type layer assembly from catalog facts.
//!
//! # Overview
//!
//! Builds the three node/edge layers the unified graph is assembled from:
//!
//! - **Paper layer** — seeded from a venue+year selection, expanded by one
//!   of two [`ExpansionPolicy`] strategies, with the induced citation edges
//!   at constant weight 1.0.
//! - **Author layer** — authorship join plus log-smoothed co-authorship
//!   weights, max-normalized.
//! - **Affiliation layer** — author-affiliation join with one best-effort
//!   external resolution attempt per (paper, author) pair lacking a source
//!   affiliation.
//!
//! Layers are plain data; ids stay in their natural key space until
//! [`crate::graph::assemble`] assigns unified node ids.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use tracing::{debug, instrument, warn};

use citerank_core::catalog::Catalog;
use citerank_core::model::{AffilId, AuthorId, PaperId, VenueId, Year};
use citerank_core::resolve::AffiliationResolver;

use super::index::EdgeIndex;

/// Constant weight assigned to citation edges when no contextual weighting
/// is supplied.
pub const CITATION_WEIGHT: f64 = 1.0;

// ---------------------------------------------------------------------------
// Expansion policy
// ---------------------------------------------------------------------------

/// How the seed paper set is grown before edge extraction.
///
/// The two strategies are mutually exclusive; configuration layers select
/// one by name through [`parse_policy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionPolicy {
    /// Follow citation edges `hops` times from the seed set, folding each
    /// hop's newly discovered nodes (minus exclusions) into the set.
    NHops { hops: usize },
    /// Pull additional papers from the same venue over `extra_years`, and
    /// from each `(related venue abbreviation, years)` pair.
    Venue {
        extra_years: Vec<Year>,
        related: Vec<(String, Vec<Year>)>,
    },
}

impl ExpansionPolicy {
    /// The selector string this policy is addressed by in configuration.
    #[must_use]
    pub const fn selector(&self) -> &'static str {
        match self {
            Self::NHops { .. } => "n_hops",
            Self::Venue { .. } => "conf",
        }
    }
}

/// An unsupported expansion-policy selector was requested.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown expansion policy `{selector}`; expected `n_hops` or `conf`")]
pub struct UnknownExpansionPolicy {
    pub selector: String,
}

impl UnknownExpansionPolicy {
    /// Machine-readable code for this failure.
    #[must_use]
    pub const fn code(&self) -> citerank_core::ErrorCode {
        citerank_core::ErrorCode::UnknownExpansionPolicy
    }
}

/// Map a configuration selector to a policy carrying the supplied
/// parameters.
///
/// # Errors
///
/// Returns [`UnknownExpansionPolicy`] for any selector other than
/// `n_hops` or `conf`; no partial work is performed.
pub fn parse_policy(
    selector: &str,
    hops: usize,
    extra_years: Vec<Year>,
    related: Vec<(String, Vec<Year>)>,
) -> Result<ExpansionPolicy, UnknownExpansionPolicy> {
    match selector {
        "n_hops" => Ok(ExpansionPolicy::NHops { hops }),
        "conf" => Ok(ExpansionPolicy::Venue {
            extra_years,
            related,
        }),
        other => Err(UnknownExpansionPolicy {
            selector: other.to_owned(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Paper layer
// ---------------------------------------------------------------------------

/// The expanded paper node set with its induced citation edges.
#[derive(Debug)]
pub struct PaperLayer {
    pub nodes: BTreeSet<PaperId>,
    /// Induced citation edges at [`CITATION_WEIGHT`].
    pub edges: Vec<(PaperId, PaperId, f64)>,
    /// Publication year per paper, where known.
    pub years: BTreeMap<PaperId, Year>,
    /// Fingerprint of the citation universe the layer was cut from.
    pub content_hash: String,
}

/// Build the paper layer for `venue` over `years` under `policy`.
///
/// # Errors
///
/// Returns an error if a catalog query fails.
#[instrument(skip(catalog, policy, exclude), fields(policy = policy.selector()))]
pub fn paper_layer(
    catalog: &dyn Catalog,
    venue: &VenueId,
    years: &[Year],
    policy: &ExpansionPolicy,
    exclude: &BTreeSet<PaperId>,
) -> Result<PaperLayer> {
    let seed = catalog.papers_by_venue(venue, years)?;

    let mut years_by_paper: BTreeMap<PaperId, Year> = BTreeMap::new();
    let mut nodes: BTreeSet<PaperId> = BTreeSet::new();
    for (paper, year) in seed {
        years_by_paper.insert(paper.clone(), year);
        nodes.insert(paper);
    }

    let index = match policy {
        ExpansionPolicy::NHops { hops } => {
            // The index is cut around the seed set; hops walk outward
            // through it.
            let index = EdgeIndex::from_pairs(catalog.citations_touching(&nodes)?);
            expand_by_hops(&mut nodes, &index, exclude, *hops);
            index
        }
        ExpansionPolicy::Venue {
            extra_years,
            related,
        } => {
            fold_expansion(
                &mut nodes,
                &mut years_by_paper,
                catalog.expanded_papers(venue, extra_years)?,
                exclude,
            );

            for (abbr, related_years) in related {
                let Some(related_venue) = catalog.resolve_venue(abbr)? else {
                    warn!(venue = %abbr, "related venue not found; skipping expansion source");
                    continue;
                };
                fold_expansion(
                    &mut nodes,
                    &mut years_by_paper,
                    catalog.expanded_papers(&related_venue, related_years)?,
                    exclude,
                );
            }

            EdgeIndex::from_pairs(catalog.citations_touching(&nodes)?)
        }
    };

    let edges = index
        .induced_subgraph(&nodes)
        .into_iter()
        .map(|(from, to)| (from, to, CITATION_WEIGHT))
        .collect::<Vec<_>>();

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        "paper layer assembled"
    );

    Ok(PaperLayer {
        nodes,
        edges,
        years: years_by_paper,
        content_hash: index.content_hash().to_owned(),
    })
}

/// Hop `hops` times, excluding `exclude` from each hop's newly discovered
/// nodes before folding them in.
fn expand_by_hops(
    nodes: &mut BTreeSet<PaperId>,
    index: &EdgeIndex,
    exclude: &BTreeSet<PaperId>,
    hops: usize,
) {
    let mut frontier = nodes.clone();
    for hop in 0..hops {
        frontier = &index.follow_nodes(&frontier) - exclude;
        nodes.extend(frontier.iter().cloned());
        debug!(hop = hop + 1, nodes = nodes.len(), "hop expansion");
    }
}

fn fold_expansion(
    nodes: &mut BTreeSet<PaperId>,
    years_by_paper: &mut BTreeMap<PaperId, Year>,
    expanded: Vec<(PaperId, Year)>,
    exclude: &BTreeSet<PaperId>,
) {
    for (paper, year) in expanded {
        years_by_paper.insert(paper.clone(), year);
        if !exclude.contains(&paper) {
            nodes.insert(paper);
        }
    }
}

// ---------------------------------------------------------------------------
// Author layer
// ---------------------------------------------------------------------------

/// Authors of the paper set with authorship and co-authorship edges.
#[derive(Debug)]
pub struct AuthorLayer {
    pub authors: BTreeSet<AuthorId>,
    /// Co-authorship edges, max-normalized into `[0, 1]`.
    pub coauthorships: Vec<(AuthorId, AuthorId, f64)>,
    /// `(paper, author)` authorship pairs.
    pub authorships: Vec<(PaperId, AuthorId)>,
}

/// Build the author layer by joining `papers` against the authorship
/// relation.
///
/// Co-authorship weight is `1 + ln(shared papers)` when `weighted`, else a
/// constant 1.0; either way the edge list is max-normalized. Authors with
/// no co-authors still appear as nodes.
///
/// # Errors
///
/// Returns an error if the catalog query fails.
#[instrument(skip(catalog, papers), fields(papers = papers.len()))]
pub fn author_layer(
    catalog: &dyn Catalog,
    papers: &BTreeSet<PaperId>,
    weighted: bool,
) -> Result<AuthorLayer> {
    let authorships = catalog.authorships(papers)?;

    let mut papers_by_author: BTreeMap<AuthorId, BTreeSet<PaperId>> = BTreeMap::new();
    for (paper, author) in &authorships {
        papers_by_author
            .entry(author.clone())
            .or_default()
            .insert(paper.clone());
    }

    let authors: Vec<AuthorId> = papers_by_author.keys().cloned().collect();

    let mut coauthorships = Vec::new();
    for (i, a1) in authors.iter().enumerate() {
        for a2 in &authors[i + 1..] {
            let shared = papers_by_author[a1]
                .intersection(&papers_by_author[a2])
                .count();
            if shared == 0 {
                continue;
            }

            // Log transformation smooths values so prolific pairs do not
            // crush everything else after normalization.
            let weight = if weighted {
                1.0 + (shared as f64).ln()
            } else {
                1.0
            };
            coauthorships.push((a1.clone(), a2.clone(), weight));
        }
    }

    let coauthorships = normalize_edges(coauthorships);

    debug!(
        authors = authors.len(),
        coauthorships = coauthorships.len(),
        authorships = authorships.len(),
        "author layer assembled"
    );

    Ok(AuthorLayer {
        authors: authors.into_iter().collect(),
        coauthorships,
        authorships,
    })
}

// ---------------------------------------------------------------------------
// Affiliation layer
// ---------------------------------------------------------------------------

/// Resolution bookkeeping for one affiliation-layer build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Join rows that carried a source affiliation.
    pub from_source: usize,
    /// (paper, author) pairs recovered by the external resolver.
    pub resolved: usize,
    /// (paper, author) pairs skipped because resolution found nothing.
    pub missing: usize,
}

/// Affiliations of the author set with author→affiliation edges.
#[derive(Debug)]
pub struct AffiliationLayer {
    pub affils: BTreeSet<AffilId>,
    /// `(author, affiliation, 1.0)` membership edges, deduplicated.
    pub author_affil_edges: Vec<(AuthorId, AffilId, f64)>,
    pub stats: ResolutionStats,
}

/// Build the affiliation layer by joining `authors` and `papers` against
/// the author-affiliation relation.
///
/// A row without a source affiliation triggers exactly one resolver attempt
/// per (paper, author) pair within the build; unresolvable records are
/// skipped and counted, never fatal. Resolved affiliations are treated
/// identically to source-provided ones.
///
/// # Errors
///
/// Returns an error if the catalog query fails. Resolver failures are
/// downgraded to misses.
#[instrument(skip_all, fields(authors = authors.len(), papers = papers.len()))]
pub fn affiliation_layer(
    catalog: &dyn Catalog,
    resolver: &dyn AffiliationResolver,
    authors: &BTreeSet<AuthorId>,
    papers: &BTreeSet<PaperId>,
) -> Result<AffiliationLayer> {
    let rows = catalog.author_affiliations(authors, papers)?;

    let mut affils = BTreeSet::new();
    let mut edges: BTreeSet<(AuthorId, AffilId)> = BTreeSet::new();
    let mut attempted: BTreeSet<(PaperId, AuthorId)> = BTreeSet::new();
    let mut stats = ResolutionStats::default();

    for row in rows {
        let resolved = match row.affil {
            Some(affil) => {
                stats.from_source += 1;
                BTreeSet::from([affil])
            }
            None => {
                // Never retry a (paper, author) pair within one build.
                if !attempted.insert((row.paper.clone(), row.author.clone())) {
                    continue;
                }

                let found = resolver.resolve(&row.author, &row.paper).unwrap_or_else(|err| {
                    warn!(
                        author = %row.author,
                        paper = %row.paper,
                        error = %err,
                        "affiliation resolver failed; treating as missing"
                    );
                    BTreeSet::new()
                });

                if found.is_empty() {
                    stats.missing += 1;
                    continue;
                }
                stats.resolved += 1;
                found
            }
        };

        for affil in resolved {
            affils.insert(affil.clone());
            edges.insert((row.author.clone(), affil));
        }
    }

    debug!(
        affils = affils.len(),
        edges = edges.len(),
        resolved = stats.resolved,
        missing = stats.missing,
        "affiliation layer assembled"
    );

    Ok(AffiliationLayer {
        affils,
        author_affil_edges: edges
            .into_iter()
            .map(|(author, affil)| (author, affil, 1.0))
            .collect(),
        stats,
    })
}

// ---------------------------------------------------------------------------
// Edge normalization
// ---------------------------------------------------------------------------

/// Divide every weight by the maximum weight observed, mapping a non-empty
/// list into `[0, 1]` with the maximum exactly 1.0.
///
/// Empty input is a no-op, as is a list whose maximum is not positive
/// (there is nothing meaningful to scale by).
#[must_use]
pub fn normalize_edges<K>(edges: Vec<(K, K, f64)>) -> Vec<(K, K, f64)> {
    let wmax = edges.iter().map(|(_, _, w)| *w).fold(0.0_f64, f64::max);
    if wmax <= 0.0 {
        return edges;
    }

    edges
        .into_iter()
        .map(|(from, to, weight)| (from, to, weight / wmax))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_policy_accepts_both_selectors() {
        assert_eq!(
            parse_policy("n_hops", 2, Vec::new(), Vec::new()).expect("n_hops"),
            ExpansionPolicy::NHops { hops: 2 }
        );
        assert!(matches!(
            parse_policy("conf", 0, vec![2009], Vec::new()).expect("conf"),
            ExpansionPolicy::Venue { .. }
        ));
    }

    #[test]
    fn parse_policy_rejects_unknown_selector() {
        let err = parse_policy("random_walk", 1, Vec::new(), Vec::new()).expect_err("rejected");
        assert_eq!(err.selector, "random_walk");
        assert_eq!(err.code(), citerank_core::ErrorCode::UnknownExpansionPolicy);
    }

    #[test]
    fn normalize_edges_scales_max_to_one() {
        let edges = normalize_edges(vec![("a", "b", 2.0), ("b", "c", 0.5)]);
        let weights: Vec<f64> = edges.iter().map(|(_, _, w)| *w).collect();
        assert!((weights[0] - 1.0).abs() < 1e-12);
        assert!((weights[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn normalize_edges_empty_is_noop() {
        let edges: Vec<(&str, &str, f64)> = normalize_edges(Vec::new());
        assert!(edges.is_empty());
    }

    #[test]
    fn normalize_edges_zero_max_passes_through() {
        let edges = normalize_edges(vec![("a", "b", 0.0)]);
        assert_eq!(edges[0].2, 0.0);
    }

    #[test]
    fn expand_by_hops_applies_exclusions_per_hop() {
        let index = EdgeIndex::from_pairs([
            (PaperId::new("s"), PaperId::new("x")),
            (PaperId::new("s"), PaperId::new("y")),
            (PaperId::new("x"), PaperId::new("z")),
        ]);

        let mut nodes: BTreeSet<PaperId> = [PaperId::new("s")].into();
        let exclude: BTreeSet<PaperId> = [PaperId::new("y")].into();

        expand_by_hops(&mut nodes, &index, &exclude, 2);

        // Hop 1 discovers x (y excluded); hop 2 walks from {s, x} to z.
        let expected: BTreeSet<PaperId> = [
            PaperId::new("s"),
            PaperId::new("x"),
            PaperId::new("z"),
        ]
        .into();
        assert_eq!(nodes, expected);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any non-empty positive weight list normalizes into [0, 1]
            /// with the maximum exactly 1.0.
            #[test]
            fn normalize_edges_maps_into_unit_interval(
                weights in proptest::collection::vec(1e-3_f64..1e6, 1..30),
            ) {
                let edges: Vec<(usize, usize, f64)> = weights
                    .iter()
                    .enumerate()
                    .map(|(i, w)| (i, i + 1, *w))
                    .collect();

                let normalized = normalize_edges(edges);
                let max = normalized
                    .iter()
                    .map(|(_, _, w)| *w)
                    .fold(f64::NEG_INFINITY, f64::max);

                prop_assert_eq!(max, 1.0);
                for (_, _, w) in normalized {
                    prop_assert!((0.0..=1.0).contains(&w));
                }
            }
        }
    }
}
