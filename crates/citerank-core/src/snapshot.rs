//! Persisted year-indexed rating snapshots.
//!
//! # Overview
//!
//! The only state that outlives a single build: per-venue JSON documents
//! mapping year → entity → score, plus the author → affiliations membership
//! accumulated while building them. Three stores exist per venue:
//!
//! - `{venue}_year_author_rating.json`
//! - `{venue}_author_affils.json`
//! - `{venue}_year_affil_rating.json`
//!
//! Guarantees:
//!
//! - **Atomic replace**: documents are written to a temp file in the target
//!   directory and renamed over the destination, so readers never observe a
//!   partial snapshot.
//! - **Deterministic output**: all maps are `BTreeMap`s, so the serialized
//!   JSON is byte-stable for identical contents.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::model::{AffilId, AuthorId, VenueId, Year};

/// Year → author → score.
pub type YearAuthorRatings = BTreeMap<Year, BTreeMap<AuthorId, f64>>;

/// Year → affiliation → score.
pub type YearAffilRatings = BTreeMap<Year, BTreeMap<AffilId, f64>>;

/// Author → known affiliations.
pub type AuthorAffils = BTreeMap<AuthorId, BTreeSet<AffilId>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Read/write failure on a rating snapshot. Fatal for the operation, never
/// leaves a partial file behind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure reading or replacing a snapshot document.
    #[error("snapshot io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure for a snapshot document.
    #[error("snapshot serialization failure at {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Machine-readable code for this failure.
    #[must_use]
    pub const fn code(&self) -> crate::error::ErrorCode {
        crate::error::ErrorCode::SnapshotIoFailed
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Directory of per-venue rating snapshot documents.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store rooted at `dir`. The directory must already exist.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the year-author-rating document for `venue`.
    #[must_use]
    pub fn year_author_rating_path(&self, venue: &VenueId) -> PathBuf {
        self.dir.join(format!("{venue}_year_author_rating.json"))
    }

    /// Path of the author-affiliation-membership document for `venue`.
    #[must_use]
    pub fn author_affils_path(&self, venue: &VenueId) -> PathBuf {
        self.dir.join(format!("{venue}_author_affils.json"))
    }

    /// Path of the year-affiliation-rating document for `venue`.
    #[must_use]
    pub fn year_affil_rating_path(&self, venue: &VenueId) -> PathBuf {
        self.dir.join(format!("{venue}_year_affil_rating.json"))
    }

    /// Write the year-author-rating document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O or serialization failure.
    pub fn write_year_author_rating(
        &self,
        venue: &VenueId,
        ratings: &YearAuthorRatings,
    ) -> Result<(), StoreError> {
        self.write_json(&self.year_author_rating_path(venue), ratings)
    }

    /// Read the year-author-rating document back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file is missing, unreadable, or not
    /// valid JSON of the expected shape.
    pub fn read_year_author_rating(&self, venue: &VenueId) -> Result<YearAuthorRatings, StoreError> {
        self.read_json(&self.year_author_rating_path(venue))
    }

    /// Write the author-affiliation-membership document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O or serialization failure.
    pub fn write_author_affils(
        &self,
        venue: &VenueId,
        affils: &AuthorAffils,
    ) -> Result<(), StoreError> {
        self.write_json(&self.author_affils_path(venue), affils)
    }

    /// Read the author-affiliation-membership document back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file is missing, unreadable, or not
    /// valid JSON of the expected shape.
    pub fn read_author_affils(&self, venue: &VenueId) -> Result<AuthorAffils, StoreError> {
        self.read_json(&self.author_affils_path(venue))
    }

    /// Write the year-affiliation-rating document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O or serialization failure.
    pub fn write_year_affil_rating(
        &self,
        venue: &VenueId,
        ratings: &YearAffilRatings,
    ) -> Result<(), StoreError> {
        self.write_json(&self.year_affil_rating_path(venue), ratings)
    }

    /// Read the year-affiliation-rating document back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file is missing, unreadable, or not
    /// valid JSON of the expected shape.
    pub fn read_year_affil_rating(&self, venue: &VenueId) -> Result<YearAffilRatings, StoreError> {
        self.read_json(&self.year_affil_rating_path(venue))
    }

    /// Serialize `value` and atomically replace `path` with it.
    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let json = serde_json::to_vec(value).map_err(|source| StoreError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

        // Write beside the destination so the rename stays on one
        // filesystem.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        debug!(path = %path.display(), bytes = json.len(), "snapshot written");
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialize {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path());
        (dir, store)
    }

    fn sample_ratings() -> YearAuthorRatings {
        let mut by_author = BTreeMap::new();
        by_author.insert(AuthorId::new("a1"), 3.0);
        by_author.insert(AuthorId::new("a2"), 1.5);

        let mut ratings = BTreeMap::new();
        ratings.insert(2014, by_author);
        ratings.insert(2015, BTreeMap::new());
        ratings
    }

    #[test]
    fn year_author_rating_round_trips() {
        let (_dir, store) = store();
        let venue = VenueId::new("kdd");
        let ratings = sample_ratings();

        store
            .write_year_author_rating(&venue, &ratings)
            .expect("write");
        let loaded = store.read_year_author_rating(&venue).expect("read");

        assert_eq!(loaded, ratings);
    }

    #[test]
    fn author_affils_round_trips() {
        let (_dir, store) = store();
        let venue = VenueId::new("kdd");

        let mut affils = AuthorAffils::new();
        affils.insert(
            AuthorId::new("a1"),
            [AffilId::new("f1"), AffilId::new("f2")].into(),
        );

        store.write_author_affils(&venue, &affils).expect("write");
        assert_eq!(store.read_author_affils(&venue).expect("read"), affils);
    }

    #[test]
    fn write_is_deterministic() {
        let (_dir, store) = store();
        let venue = VenueId::new("kdd");
        let ratings = sample_ratings();

        store
            .write_year_author_rating(&venue, &ratings)
            .expect("first write");
        let first = std::fs::read(store.year_author_rating_path(&venue)).expect("read bytes");

        store
            .write_year_author_rating(&venue, &ratings)
            .expect("second write");
        let second = std::fs::read(store.year_author_rating_path(&venue)).expect("read bytes");

        assert_eq!(first, second);
    }

    #[test]
    fn missing_file_is_an_error() {
        let (_dir, store) = store();
        let err = store
            .read_year_affil_rating(&VenueId::new("none"))
            .expect_err("missing file");
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(err.code(), crate::error::ErrorCode::SnapshotIoFailed);
    }

    #[test]
    fn corrupt_file_reports_serialization_error() {
        let (_dir, store) = store();
        let venue = VenueId::new("kdd");
        std::fs::write(store.year_author_rating_path(&venue), b"{not json")
            .expect("write corrupt");

        let err = store
            .read_year_author_rating(&venue)
            .expect_err("corrupt file");
        assert!(matches!(err, StoreError::Serialize { .. }));
    }

    #[test]
    fn failed_write_keeps_previous_snapshot() {
        let (_dir, store) = store();
        let venue = VenueId::new("kdd");
        let ratings = sample_ratings();
        store
            .write_year_author_rating(&venue, &ratings)
            .expect("write");

        // A store pointed at a missing directory cannot create its temp
        // file, so the original document must remain untouched.
        let broken = SnapshotStore::new(store.year_author_rating_path(&venue).join("nope"));
        let err = broken
            .write_year_author_rating(&venue, &YearAuthorRatings::new())
            .expect_err("broken dir");
        assert!(matches!(err, StoreError::Io { .. }));

        assert_eq!(
            store.read_year_author_rating(&venue).expect("read"),
            ratings
        );
    }
}
