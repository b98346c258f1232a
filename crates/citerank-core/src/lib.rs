#![forbid(unsafe_code)]
//! citerank-core library.
//!
//! Domain model, the read-only [`catalog::Catalog`] query boundary, the
//! [`resolve::AffiliationResolver`] boundary, and the persisted year-indexed
//! rating snapshot stores.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types; module-local
//!   `thiserror` enums at serialization/I-O boundaries.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`,
//!   `debug!`, `trace!`).

pub mod catalog;
pub mod error;
pub mod model;
pub mod resolve;
pub mod snapshot;

pub use catalog::Catalog;
pub use error::ErrorCode;
pub use model::{AffilId, AuthorId, PaperId, PubRecord, VenueId, Year};
pub use resolve::{AffiliationResolver, NoResolver};
pub use snapshot::SnapshotStore;
