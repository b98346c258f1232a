//! Ranking oracle boundary.
//!
//! The node-ranking primitive (a PageRank-family stationary-score
//! computation) is an external collaborator: this crate produces the graph
//! it consumes and consumes the scores it produces, but owns none of its
//! internals.

use std::collections::HashMap;

use anyhow::Result;
use petgraph::graph::NodeIndex;

use crate::graph::assemble::ModelGraph;

/// Damping factor used when a caller has no tuned value.
pub const DEFAULT_DAMPING: f64 = 0.85;

/// External graph-ranking primitive.
///
/// Contract: given a directed weighted graph and a damping factor, produce
/// non-negative scores over reachable nodes, normalized to sum ≈ 1.
/// Relationship edges are inserted in both directions during assembly, so
/// implementations must not assume a simple graph — antiparallel edge
/// pairs are the norm.
pub trait RankingOracle {
    /// Rank every node of `graph`.
    ///
    /// # Errors
    ///
    /// Implementations may fail on malformed graphs or failed convergence;
    /// callers surface the failure for that build.
    fn rank(&self, graph: &ModelGraph, damping: f64) -> Result<HashMap<NodeIndex, f64>>;
}
