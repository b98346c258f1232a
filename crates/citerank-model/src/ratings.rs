//! Per-year publication-count ratings.
//!
//! # Overview
//!
//! The cheap, oracle-free rating used to seed year-indexed score
//! histories: one point per paper per author (or per distinct affiliation).
//! The full-history builders iterate a year range, producing the maps that
//! are persisted in the snapshot stores and consumed by
//! [`crate::trend`].
//!
//! Archive years are read from the conference-expansion table, recent years
//! from the directly selected records — the same split the source data
//! imposes.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use tracing::{debug, instrument};

use citerank_core::catalog::{Catalog, PubSource};
use citerank_core::model::{AffilId, AuthorId, PaperId, PubRecord, VenueId, Year};
use citerank_core::snapshot::{AuthorAffils, YearAffilRatings, YearAuthorRatings};

use crate::project::Membership;

/// One point per paper per author, plus the membership seen along the way.
#[must_use]
pub fn author_rating(
    records: &BTreeMap<PaperId, PubRecord>,
) -> (BTreeMap<AuthorId, f64>, Membership) {
    let mut scores: BTreeMap<AuthorId, f64> = BTreeMap::new();
    let mut membership = Membership::new();

    for record in records.values() {
        for (author, affils) in &record.authors {
            *scores.entry(author.clone()).or_insert(0.0) += 1.0;
            membership
                .entry(author.clone())
                .or_default()
                .extend(affils.iter().cloned());
        }
    }

    (scores, membership)
}

/// One point per paper per distinct affiliation on that paper.
#[must_use]
pub fn affil_rating(records: &BTreeMap<PaperId, PubRecord>) -> BTreeMap<AffilId, f64> {
    let mut scores: BTreeMap<AffilId, f64> = BTreeMap::new();

    for record in records.values() {
        // Distinct per paper: two authors sharing an affiliation count it
        // once.
        let affils: BTreeSet<AffilId> = record.affiliations();
        for affil in affils {
            *scores.entry(affil).or_insert(0.0) += 1.0;
        }
    }

    scores
}

/// Build the year-indexed author rating history for one venue.
///
/// `archive_years` are read from the expansion table, `recent_years` from
/// the selected records. Returns the per-year ratings plus the author →
/// affiliations membership accumulated across all years.
///
/// # Errors
///
/// Returns an error if a catalog query fails.
#[instrument(skip(catalog))]
pub fn year_author_ratings(
    catalog: &dyn Catalog,
    venue: &VenueId,
    archive_years: &[Year],
    recent_years: &[Year],
) -> Result<(YearAuthorRatings, AuthorAffils)> {
    let mut ratings = YearAuthorRatings::new();
    let mut membership = AuthorAffils::new();

    for (years, source) in [
        (archive_years, PubSource::Expanded),
        (recent_years, PubSource::Selected),
    ] {
        for &year in years {
            let records = catalog.pub_records(venue, &[year], source)?;
            let (scores, year_membership) = author_rating(&records);
            debug!(year, authors = scores.len(), "year author rating");

            for (author, affils) in year_membership {
                membership.entry(author).or_default().extend(affils);
            }
            ratings.insert(year, scores);
        }
    }

    Ok((ratings, membership))
}

/// Build the year-indexed affiliation rating history for one venue.
///
/// # Errors
///
/// Returns an error if a catalog query fails.
#[instrument(skip(catalog))]
pub fn year_affil_ratings(
    catalog: &dyn Catalog,
    venue: &VenueId,
    archive_years: &[Year],
    recent_years: &[Year],
) -> Result<YearAffilRatings> {
    let mut ratings = YearAffilRatings::new();

    for (years, source) in [
        (archive_years, PubSource::Expanded),
        (recent_years, PubSource::Selected),
    ] {
        for &year in years {
            let records = catalog.pub_records(venue, &[year], source)?;
            let scores = affil_rating(&records);
            debug!(year, affils = scores.len(), "year affil rating");
            ratings.insert(year, scores);
        }
    }

    Ok(ratings)
}

/// Entities active in any of the `window` years — the set worth tracking
/// for trend prediction.
#[must_use]
pub fn watching_list<K: Ord + Clone>(
    ratings: &BTreeMap<Year, BTreeMap<K, f64>>,
    window: &[Year],
) -> BTreeSet<K> {
    let mut watched = BTreeSet::new();
    for year in window {
        if let Some(scores) = ratings.get(year) {
            watched.extend(scores.keys().cloned());
        }
    }
    watched
}

/// Mean score over the requested years.
///
/// The divisor is the number of requested years, not the number of years
/// the entity was active in, so inactive years drag the mean down.
#[must_use]
pub fn history_rating<K: Ord + Clone>(
    ratings: &BTreeMap<Year, BTreeMap<K, f64>>,
    years: &[Year],
) -> BTreeMap<K, f64> {
    if years.is_empty() {
        return BTreeMap::new();
    }

    let mut sums: BTreeMap<K, f64> = BTreeMap::new();
    for year in years {
        if let Some(scores) = ratings.get(year) {
            for (entity, score) in scores {
                *sums.entry(entity.clone()).or_insert(0.0) += score;
            }
        }
    }

    let span = years.len() as f64;
    sums.into_iter().map(|(k, sum)| (k, sum / span)).collect()
}
