//! Year-over-year trend prediction.
//!
//! # Overview
//!
//! Takes the year-indexed score histories produced by [`crate::ratings`]
//! and derives a bounded adjustment factor per entity: positive when the
//! history suggests upward pressure, negative when it suggests decline,
//! zero when the series is flat or too thin to read. Static scores are
//! then adjusted as `score · (1 + factor)`.
//!
//! # Algorithm
//!
//! For one series restricted to years ≤ `end_year`, ascending:
//!
//! 1. Skip the cold-start prefix: find the first score > 0, then back up
//!    one index when that is not already the start (observed to perform
//!    better in practice; kept exactly as found).
//! 2. Volatility `sigma` = mean absolute difference between consecutive
//!    scores, excluding exactly-equal pairs; fewer than 2 points → 0.
//! 3. With `last` and `mean` of the truncated series: inside the
//!    `0.4 · sigma` band around the mean the trend is 0; below the mean
//!    the trend is `+min(|last − mean| / sigma, 1)` (mean reversion:
//!    below-mean implies upward pressure); above it, the negation.
//! 4. Factor = `sigmoid(scalar · trend · sigma / mean)` with the odd
//!    sigmoid `2eˣ/(1+eˣ) − 1`, so factors live in (−1, 1).

use std::collections::{BTreeMap, BTreeSet};

use citerank_core::model::Year;

/// One entity's sparse year → score history.
pub type YearSeries = BTreeMap<Year, f64>;

/// Scalar applied inside the sigmoid; the empirically tuned default.
pub const DEFAULT_TREND_SCALAR: f64 = 0.4;

/// Half-width of the "flat" band, in units of sigma.
const FLAT_BAND: f64 = 0.4;

// ---------------------------------------------------------------------------
// Series extraction
// ---------------------------------------------------------------------------

/// Expand per-year ratings into dense series for the watched entities.
///
/// Every year present in `ratings` contributes a point to every watched
/// entity's series, explicitly 0.0 where the entity is absent — missing
/// keys mean "no activity", not "no data".
#[must_use]
pub fn series_for<K: Ord + Clone>(
    ratings: &BTreeMap<Year, BTreeMap<K, f64>>,
    watched: &BTreeSet<K>,
) -> BTreeMap<K, YearSeries> {
    let mut series: BTreeMap<K, YearSeries> = BTreeMap::new();

    for entity in watched {
        let entry = series.entry(entity.clone()).or_default();
        for (year, scores) in ratings {
            entry.insert(*year, scores.get(entity).copied().unwrap_or(0.0));
        }
    }

    series
}

// ---------------------------------------------------------------------------
// Trend prediction
// ---------------------------------------------------------------------------

/// The intermediate quantities behind one trend prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSignal {
    /// Mean absolute step between consecutive unequal scores.
    pub sigma: f64,
    /// Mean of the truncated series.
    pub mean: f64,
    /// Last score of the truncated series.
    pub last: f64,
    /// Direction and strength in `[-1, 1]`; positive means rising.
    pub trend: f64,
}

/// Compute the trend signal for `series` up to and including `end_year`.
///
/// Returns `None` when the restricted series is empty or never rises above
/// zero — there is nothing to predict for an entity with no recorded
/// activity.
#[must_use]
pub fn trend_signal(series: &YearSeries, end_year: Year) -> Option<TrendSignal> {
    // BTreeMap iteration is ascending by year already.
    let scores: Vec<f64> = series
        .iter()
        .filter(|(year, _)| **year <= end_year)
        .map(|(_, score)| *score)
        .collect();

    let first_positive = scores.iter().position(|score| *score > 0.0)?;
    // Keep one leading zero when there is one: the ramp-up step carries
    // signal.
    let start = first_positive.saturating_sub(1);
    let scores = &scores[start..];

    let sigma = if scores.len() > 1 {
        let steps: Vec<f64> = scores
            .windows(2)
            .filter(|pair| pair[0] != pair[1])
            .map(|pair| (pair[0] - pair[1]).abs())
            .collect();
        if steps.is_empty() {
            0.0
        } else {
            steps.iter().sum::<f64>() / steps.len() as f64
        }
    } else {
        0.0
    };

    let last = *scores.last()?;
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;

    let trend = if sigma == 0.0 || (last - mean).abs() <= FLAT_BAND * sigma {
        0.0
    } else if last < mean {
        ((last - mean).abs() / sigma).min(1.0)
    } else {
        -((last - mean).abs() / sigma).min(1.0)
    };

    Some(TrendSignal {
        sigma,
        mean,
        last,
        trend,
    })
}

/// Trend adjustment factor for one series, in (−1, 1).
#[must_use]
pub fn predict_trend(series: &YearSeries, end_year: Year, scalar: f64) -> Option<f64> {
    let signal = trend_signal(series, end_year)?;
    Some(sigmoid(scalar * signal.trend * signal.sigma / signal.mean))
}

/// Trend factors for every entity with a predictable series.
#[must_use]
pub fn predict_trends<K: Ord + Clone>(
    series: &BTreeMap<K, YearSeries>,
    end_year: Year,
    scalar: f64,
) -> BTreeMap<K, f64> {
    series
        .iter()
        .filter_map(|(entity, history)| {
            predict_trend(history, end_year, scalar).map(|factor| (entity.clone(), factor))
        })
        .collect()
}

/// Apply trend factors to static scores: `score · (1 + factor)`.
///
/// Entities with a factor but no base score are skipped.
#[must_use]
pub fn temporal_scores<K: Ord + Clone>(
    base: &BTreeMap<K, f64>,
    trends: &BTreeMap<K, f64>,
) -> BTreeMap<K, f64> {
    trends
        .iter()
        .filter_map(|(entity, factor)| {
            base.get(entity)
                .map(|score| (entity.clone(), score * (1.0 + factor)))
        })
        .collect()
}

/// Odd sigmoid `2eˣ/(1+eˣ) − 1`: strictly increasing, zero at zero,
/// asymptotes at ±1.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    2.0 * x.exp() / (1.0 + x.exp()) - 1.0
}
