//! Multi-layer bibliographic graph construction.
//!
//! # Overview
//!
//! Three stages, leaves first:
//!
//! ```text
//! citation pairs from the catalog
//!        ↓  index::EdgeIndex::from_pairs()
//! EdgeIndex (bidirectional adjacency, hop expansion, induced subgraphs)
//!        ↓  layers::paper_layer() / author_layer() / affiliation_layer()
//! per-type node and weighted-edge sets
//!        ↓  assemble::ModelGraph::assemble()
//! ModelGraph (unified, stably-identified, multi-typed directed graph)
//! ```
//!
//! The assembled graph is what a [`crate::oracle::RankingOracle`]
//! implementation consumes. Node ids are dense and assigned in a fixed
//! layer order (papers, then authors, then affiliations) so an id is
//! meaningful only within the build that produced it.

pub mod assemble;
pub mod index;
pub mod layers;

pub use assemble::{Layers, ModelGraph};
pub use index::EdgeIndex;
pub use layers::{ExpansionPolicy, normalize_edges};
