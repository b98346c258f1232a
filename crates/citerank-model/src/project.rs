//! Cross-layer score and edge projection.
//!
//! # Overview
//!
//! Pushes structure computed on a fine-grained layer down onto a coarser
//! partition through a multi-valued membership mapping:
//!
//! - paper citation edges → author-citation edges (via authorship),
//! - paper records → co-authorship edges (authors sharing a paper),
//! - author-pair edges → affiliation-pair edges (via author → affiliations),
//! - paper citation edges → affiliation-pair edges (direct projection),
//! - entity scores → additive roll-ups onto their membership sets.
//!
//! Pair projections exclude self-pairs unconditionally: a derived
//! affiliation-affiliation (or author-author) edge never connects an entity
//! to itself.
//!
//! ## Age Decay
//!
//! When the contributing relation carries a year, its contribution is
//! scaled by `exp(-age_relevance · (current_year − year))` with the year
//! clamped into `[old_year, current_year]`, so recent activity contributes
//! close to 1.0 and old activity decays toward 0. Accumulated pair weights
//! are compressed with `log₁₀(1 + total)` to bound outliers.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use citerank_core::model::{AffilId, AuthorId, PaperId, PubRecord, Year};

/// Author → set-of-affiliations membership mapping.
pub type Membership = BTreeMap<AuthorId, BTreeSet<AffilId>>;

// ---------------------------------------------------------------------------
// Age decay
// ---------------------------------------------------------------------------

/// Parameters of the exponential age-decay window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayParams {
    /// Decay rate; 0 disables decay (every year contributes 1.0).
    pub age_relevance: f64,
    /// Years before this are treated as this old, no older.
    pub old_year: Year,
    /// Reference "now"; years after this are treated as current.
    pub current_year: Year,
}

impl DecayParams {
    /// Decay factor for activity from `year`, in `[0, 1]`.
    #[must_use]
    pub fn decay(&self, year: Year) -> f64 {
        let clamped = year.clamp(self.old_year, self.current_year);
        (-self.age_relevance * f64::from(self.current_year - clamped)).exp()
    }
}

// ---------------------------------------------------------------------------
// Pair accumulation
// ---------------------------------------------------------------------------

/// Ordered-pair accumulator with explicit default-on-absence adds.
#[derive(Debug)]
struct PairSums<K: Ord>(BTreeMap<(K, K), f64>);

impl<K: Ord> Default for PairSums<K> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<K: Ord + Clone> PairSums<K> {
    fn add(&mut self, from: &K, to: &K, amount: f64) {
        *self
            .0
            .entry((from.clone(), to.clone()))
            .or_insert(0.0) += amount;
    }

    /// Drain into an edge list, compressing totals with `log₁₀(1 + t)`.
    fn into_log_edges(self) -> Vec<(K, K, f64)> {
        self.0
            .into_iter()
            .map(|((from, to), total)| (from, to, (1.0 + total).log10()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Paper layer → author layer
// ---------------------------------------------------------------------------

/// Project citation edges onto the author layer with age decay.
///
/// For each citation `(citing, cited)`, every author of the citing paper is
/// connected to every distinct author of the cited paper; the contribution
/// is the decay factor of the citing paper's year. Edge weight is
/// `log₁₀(1 + Σ contributions)`.
#[must_use]
pub fn author_citation_edges(
    citations: &BTreeSet<(PaperId, PaperId)>,
    records: &BTreeMap<PaperId, PubRecord>,
    decay: &DecayParams,
) -> Vec<(AuthorId, AuthorId, f64)> {
    let mut sums = PairSums::default();

    for (citing, cited) in citations {
        let (Some(from), Some(to)) = (records.get(citing), records.get(cited)) else {
            continue;
        };
        let weight = decay.decay(from.year);

        for a1 in from.authors.keys() {
            for a2 in to.authors.keys() {
                if a1 != a2 {
                    sums.add(a1, a2, weight);
                }
            }
        }
    }

    sums.into_log_edges()
}

/// Age-decayed co-authorship accumulation from shared publications.
///
/// Every unordered author pair on a paper contributes that paper's decay
/// factor; pairs are keyed `(min, max)` so contributions accumulate once.
#[must_use]
pub fn coauthorship_edges(
    records: &BTreeMap<PaperId, PubRecord>,
    decay: &DecayParams,
) -> Vec<(AuthorId, AuthorId, f64)> {
    let mut sums = PairSums::default();

    for record in records.values() {
        let weight = decay.decay(record.year);
        let authors: Vec<&AuthorId> = record.authors.keys().collect();

        for (i, a1) in authors.iter().enumerate() {
            for a2 in &authors[i + 1..] {
                sums.add(*a1, *a2, weight);
            }
        }
    }

    sums.into_log_edges()
}

/// Accumulate the author → affiliations membership across records.
#[must_use]
pub fn membership_from_records(records: &BTreeMap<PaperId, PubRecord>) -> Membership {
    let mut membership = Membership::new();
    for record in records.values() {
        for (author, affils) in &record.authors {
            membership
                .entry(author.clone())
                .or_default()
                .extend(affils.iter().cloned());
        }
    }
    membership
}

// ---------------------------------------------------------------------------
// Author layer → affiliation layer
// ---------------------------------------------------------------------------

/// Project author-pair edges onto affiliation pairs.
///
/// For every edge `(a₁, a₂)` with a known score for `a₁`, each
/// `(f₁, f₂) ∈ M(a₁) × M(a₂)` with `f₁ ≠ f₂` accumulates `score(a₁)`.
/// Authors without membership or score are skipped. Final weight is
/// `log₁₀(1 + aggregate)`; self-pairs are never emitted.
#[must_use]
pub fn project_author_edges(
    author_edges: &[(AuthorId, AuthorId, f64)],
    author_scores: &BTreeMap<AuthorId, f64>,
    membership: &Membership,
) -> Vec<(AffilId, AffilId, f64)> {
    let mut sums = PairSums::default();

    for (a1, a2, _) in author_edges {
        let (Some(affils1), Some(affils2)) = (membership.get(a1), membership.get(a2)) else {
            continue;
        };
        let Some(score) = author_scores.get(a1) else {
            continue;
        };

        for f1 in affils1 {
            for f2 in affils2 {
                if f1 != f2 {
                    sums.add(f1, f2, *score);
                }
            }
        }
    }

    let edges = sums.into_log_edges();
    debug!(edges = edges.len(), "author edges projected onto affiliations");
    edges
}

/// Directly project citation edges onto affiliation pairs with age decay.
///
/// Affiliations of the citing paper's authors are connected to the distinct
/// affiliations of the cited paper's authors, weighted by the citing
/// paper's decay factor and compressed with `log₁₀(1 + total)`.
#[must_use]
pub fn affil_citation_edges(
    citations: &BTreeSet<(PaperId, PaperId)>,
    records: &BTreeMap<PaperId, PubRecord>,
    decay: &DecayParams,
) -> Vec<(AffilId, AffilId, f64)> {
    let mut sums = PairSums::default();

    for (citing, cited) in citations {
        let (Some(from), Some(to)) = (records.get(citing), records.get(cited)) else {
            continue;
        };
        let weight = decay.decay(from.year);
        let from_affils = from.affiliations();
        let to_affils = to.affiliations();

        for f1 in &from_affils {
            for f2 in &to_affils {
                if f1 != f2 {
                    sums.add(f1, f2, weight);
                }
            }
        }
    }

    sums.into_log_edges()
}

/// Roll scores from a fine layer up onto its membership sets.
///
/// Every entity with a known score and a non-empty membership set adds its
/// full score to each member. Entities missing from `membership` are
/// skipped — bibliographic linkage is inherently incomplete.
#[must_use]
pub fn project_scores(
    scores: &BTreeMap<AuthorId, f64>,
    membership: &Membership,
) -> BTreeMap<AffilId, f64> {
    let mut rolled: BTreeMap<AffilId, f64> = BTreeMap::new();

    for (author, score) in scores {
        let Some(affils) = membership.get(author) else {
            continue;
        };
        for affil in affils {
            *rolled.entry(affil.clone()).or_insert(0.0) += score;
        }
    }

    rolled
}

// ---------------------------------------------------------------------------
// Author activity tallies
// ---------------------------------------------------------------------------

/// Per-author activity derived from one paper universe.
#[derive(Debug, Default)]
pub struct AuthorActivity {
    /// Papers per author.
    pub publications: BTreeMap<AuthorId, f64>,
    /// Age-decayed incoming citations per author.
    pub citations: BTreeMap<AuthorId, f64>,
}

/// Tally publication counts and age-decayed incoming citations per author.
///
/// A citation `(citing, cited)` credits every author of the cited paper
/// with the decay factor of the citing paper's year.
#[must_use]
pub fn author_activity(
    records: &BTreeMap<PaperId, PubRecord>,
    citations: &BTreeSet<(PaperId, PaperId)>,
    decay: &DecayParams,
) -> AuthorActivity {
    let mut activity = AuthorActivity::default();

    for record in records.values() {
        for author in record.authors.keys() {
            *activity
                .publications
                .entry(author.clone())
                .or_insert(0.0) += 1.0;
        }
    }

    for (citing, cited) in citations {
        let (Some(from), Some(to)) = (records.get(citing), records.get(cited)) else {
            continue;
        };
        let weight = decay.decay(from.year);
        for author in to.authors.keys() {
            *activity.citations.entry(author.clone()).or_insert(0.0) += weight;
        }
    }

    activity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(raw: &str) -> AuthorId {
        AuthorId::new(raw)
    }

    fn affil(raw: &str) -> AffilId {
        AffilId::new(raw)
    }

    fn paper(raw: &str) -> PaperId {
        PaperId::new(raw)
    }

    const NO_DECAY: DecayParams = DecayParams {
        age_relevance: 0.0,
        old_year: 2000,
        current_year: 2015,
    };

    fn record(year: Year, authors: &[(&str, &[&str])]) -> PubRecord {
        let mut record = PubRecord::with_year(year);
        for (name, affils) in authors {
            record.authors.insert(
                author(name),
                affils.iter().map(|f| affil(f)).collect(),
            );
        }
        record
    }

    #[test]
    fn decay_is_one_for_current_year() {
        let params = DecayParams {
            age_relevance: 0.5,
            old_year: 2000,
            current_year: 2015,
        };
        assert!((params.decay(2015) - 1.0).abs() < 1e-12);
        // Future years clamp to current.
        assert!((params.decay(2030) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn decay_clamps_old_years() {
        let params = DecayParams {
            age_relevance: 0.5,
            old_year: 2010,
            current_year: 2015,
        };
        // 1990 decays exactly like the window floor.
        assert!((params.decay(1990) - params.decay(2010)).abs() < 1e-12);
        assert!(params.decay(2010) < params.decay(2014));
    }

    #[test]
    fn self_pairs_are_never_projected() {
        // Both authors belong to the same single affiliation: the only
        // candidate pair is a self-pair, so nothing is produced.
        let edges = vec![(author("a"), author("b"), 2.0)];
        let scores = [(author("a"), 2.0)].into();
        let membership: Membership = [
            (author("a"), [affil("f1")].into()),
            (author("b"), [affil("f1")].into()),
        ]
        .into();

        let projected = project_author_edges(&edges, &scores, &membership);
        assert!(projected.is_empty());
    }

    #[test]
    fn projection_accumulates_source_scores() {
        let edges = vec![
            (author("a"), author("b"), 1.0),
            (author("c"), author("b"), 1.0),
        ];
        let scores = [(author("a"), 3.0), (author("c"), 6.0)].into();
        let membership: Membership = [
            (author("a"), [affil("f1")].into()),
            (author("b"), [affil("f2")].into()),
            (author("c"), [affil("f1")].into()),
        ]
        .into();

        let projected = project_author_edges(&edges, &scores, &membership);
        assert_eq!(projected.len(), 1);

        let (f1, f2, weight) = &projected[0];
        assert_eq!((f1, f2), (&affil("f1"), &affil("f2")));
        // 3.0 + 6.0 accumulated, then log10(1 + 9) = 1.
        assert!((weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn projection_skips_unknown_membership() {
        let edges = vec![(author("a"), author("b"), 1.0)];
        let scores = [(author("a"), 3.0)].into();
        let membership: Membership = [(author("a"), [affil("f1")].into())].into();

        assert!(project_author_edges(&edges, &scores, &membership).is_empty());
    }

    #[test]
    fn score_rollup_is_additive() {
        let scores = [(author("a"), 0.3), (author("b"), 0.2)].into();
        let membership: Membership = [
            (author("a"), [affil("f1"), affil("f2")].into()),
            (author("b"), [affil("f1")].into()),
        ]
        .into();

        let rolled = project_scores(&scores, &membership);
        assert!((rolled[&affil("f1")] - 0.5).abs() < 1e-12);
        assert!((rolled[&affil("f2")] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn author_citation_edges_connect_citing_to_cited() {
        let records = [
            (paper("p1"), record(2015, &[("a1", &[])])),
            (paper("p2"), record(2015, &[("a2", &[])])),
        ]
        .into();
        let citations = [(paper("p1"), paper("p2"))].into();

        let edges = author_citation_edges(&citations, &records, &NO_DECAY);
        assert_eq!(edges.len(), 1);
        let (from, to, weight) = &edges[0];
        assert_eq!((from, to), (&author("a1"), &author("a2")));
        // One undecayed contribution: log10(2).
        assert!((weight - 2.0_f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn coauthorship_edges_accumulate_per_paper() {
        let records = [
            (paper("p1"), record(2015, &[("x", &[]), ("y", &[])])),
            (paper("p2"), record(2015, &[("x", &[]), ("y", &[])])),
            (paper("p3"), record(2015, &[("x", &[]), ("y", &[])])),
        ]
        .into();

        let edges = coauthorship_edges(&records, &NO_DECAY);
        assert_eq!(edges.len(), 1);
        // Three shared papers, undecayed: log10(1 + 3).
        assert!((edges[0].2 - 4.0_f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn affil_citation_edges_skip_self_pairs() {
        let records = [
            (paper("p1"), record(2015, &[("a1", &["f1"])])),
            (paper("p2"), record(2015, &[("a2", &["f1"])])),
        ]
        .into();
        let citations = [(paper("p1"), paper("p2"))].into();

        assert!(affil_citation_edges(&citations, &records, &NO_DECAY).is_empty());
    }

    #[test]
    fn author_activity_tallies_pubs_and_decayed_cites() {
        let params = DecayParams {
            age_relevance: 1.0,
            old_year: 2000,
            current_year: 2015,
        };
        let records = [
            (paper("p1"), record(2014, &[("a1", &[])])),
            (paper("p2"), record(2015, &[("a2", &[])])),
        ]
        .into();
        let citations = [(paper("p1"), paper("p2"))].into();

        let activity = author_activity(&records, &citations, &params);
        assert!((activity.publications[&author("a1")] - 1.0).abs() < 1e-12);
        // a2 is cited by p1 (year 2014): decay = e^-1.
        assert!((activity.citations[&author("a2")] - (-1.0_f64).exp()).abs() < 1e-12);
        assert!(!activity.citations.contains_key(&author("a1")));
    }
}
