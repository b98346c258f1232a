#![forbid(unsafe_code)]
//! citerank-model library.
//!
//! # Overview
//!
//! The influence-model engine: assembles a multi-layer bibliographic graph
//! (papers, authors, affiliations) from catalog facts, projects scores and
//! edges from fine-grained layers onto coarser ones with age decay, and
//! adjusts static scores with a year-over-year trend signal.
//!
//! ## Pipeline
//!
//! ```text
//! Catalog facts
//!        ↓  graph::index::EdgeIndex          (adjacency over citations)
//!        ↓  graph::layers                    (per-type node/edge sets)
//!        ↓  graph::assemble::ModelGraph      (unified multi-typed graph)
//!        ↓  oracle::RankingOracle            (external ranking primitive)
//!        ↓  project                          (fine layer → coarse layer)
//!        ↓  ratings / trend                  (year histories → adjusted scores)
//! ```
//!
//! Everything is rebuilt fresh per build; the only state that survives is
//! the year-indexed rating snapshots owned by `citerank_core::snapshot`.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`,
//!   `debug!`, `trace!`).

pub mod builder;
pub mod graph;
pub mod oracle;
pub mod project;
pub mod ratings;
pub mod trend;

pub use builder::{BuildContext, VenueSelection};
pub use graph::assemble::{Layers, ModelGraph, NodeKind, UnifiedNode};
pub use graph::index::EdgeIndex;
pub use graph::layers::ExpansionPolicy;
pub use oracle::RankingOracle;
pub use project::{DecayParams, Membership};
