//! SQLite-backed [`Catalog`] implementation.
//!
//! # Overview
//!
//! Owns every piece of SQL in the repository. Batch membership tests are
//! expressed as bound placeholder lists (`IN (?,?,…)`), never as
//! interpolated value strings, so identifiers containing quotes cannot
//! corrupt a query.
//!
//! ## Schema
//!
//! ```sql
//! venues(id, abbr_name)
//! papers(id, venue_id, year)
//! paper_refs(paper_id, paper_ref_id)          -- paper_id cites paper_ref_id
//! paper_author_affils(paper_id, author_id, affil_id)  -- affil_id nullable
//! expanded_conf_papers(conf_id, paper_id, year)
//! ```
//!
//! [`init_schema`] creates the tables; production deployments are expected
//! to load the tables from an external ingest step, tests insert fixture
//! rows directly.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, ToSql, params, params_from_iter};

use crate::model::{AffilId, AuthorId, PaperId, PubRecord, VenueId, Year};

use super::{AffiliationRow, Catalog, PubSource};

/// Upper bound on waiting for a locked catalog database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only catalog over a SQLite database.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Wrap an existing connection.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open a catalog database file.
    ///
    /// A busy timeout bounds how long a query blocks on a locked database;
    /// catalog reads are the only I/O boundary of a build, so they must not
    /// hang indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open catalog db {}", path.as_ref().display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("set catalog busy timeout")?;
        Ok(Self::new(conn))
    }

    /// Open an in-memory catalog with the schema applied. Fixture helper.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory catalog")?;
        init_schema(&conn)?;
        Ok(Self::new(conn))
    }

    /// Borrow the underlying connection (fixture inserts in tests).
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Create the catalog tables if they do not exist.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS venues (
             id        TEXT PRIMARY KEY,
             abbr_name TEXT NOT NULL UNIQUE
         );
         CREATE TABLE IF NOT EXISTS papers (
             id       TEXT PRIMARY KEY,
             venue_id TEXT NOT NULL,
             year     INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS paper_refs (
             paper_id     TEXT NOT NULL,
             paper_ref_id TEXT NOT NULL,
             PRIMARY KEY (paper_id, paper_ref_id)
         );
         CREATE TABLE IF NOT EXISTS paper_author_affils (
             paper_id  TEXT NOT NULL,
             author_id TEXT NOT NULL,
             affil_id  TEXT
         );
         CREATE TABLE IF NOT EXISTS expanded_conf_papers (
             conf_id  TEXT NOT NULL,
             paper_id TEXT NOT NULL,
             year     INTEGER NOT NULL,
             PRIMARY KEY (conf_id, paper_id)
         );
         CREATE INDEX IF NOT EXISTS idx_papers_venue_year ON papers (venue_id, year);
         CREATE INDEX IF NOT EXISTS idx_refs_from ON paper_refs (paper_id);
         CREATE INDEX IF NOT EXISTS idx_refs_to ON paper_refs (paper_ref_id);
         CREATE INDEX IF NOT EXISTS idx_paa_paper ON paper_author_affils (paper_id);",
    )
    .context("create catalog schema")
}

/// `?,?,…` placeholder list for an `n`-element bound batch.
fn placeholders(n: usize) -> String {
    let mut out = String::with_capacity(n.saturating_mul(2));
    for i in 0..n {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

/// Treat NULL and blank affiliations the same: both mean "unknown".
fn non_blank_affil(raw: Option<String>) -> Option<AffilId> {
    raw.filter(|s| !s.trim().is_empty()).map(AffilId::new)
}

impl Catalog for SqliteCatalog {
    fn papers_by_venue(&self, venue: &VenueId, years: &[Year]) -> Result<Vec<(PaperId, Year)>> {
        if years.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, year FROM papers WHERE venue_id = ? AND year IN ({})",
            placeholders(years.len())
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare papers_by_venue")?;

        let mut bind: Vec<&dyn ToSql> = vec![venue];
        bind.extend(years.iter().map(|y| y as &dyn ToSql));

        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((PaperId::new(row.get::<_, String>(0)?), row.get::<_, Year>(1)?))
            })
            .context("execute papers_by_venue")?
            .collect::<Result<Vec<_>, _>>()
            .context("collect papers_by_venue")?;

        Ok(rows)
    }

    fn citations_touching(&self, papers: &BTreeSet<PaperId>) -> Result<Vec<(PaperId, PaperId)>> {
        if papers.is_empty() {
            return Ok(Vec::new());
        }

        let marks = placeholders(papers.len());
        let sql = format!(
            "SELECT paper_id, paper_ref_id FROM paper_refs
             WHERE paper_id IN ({marks}) OR paper_ref_id IN ({marks})"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare citations_touching")?;

        let mut bind: Vec<&dyn ToSql> = Vec::with_capacity(papers.len() * 2);
        bind.extend(papers.iter().map(|p| p as &dyn ToSql));
        bind.extend(papers.iter().map(|p| p as &dyn ToSql));

        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((
                    PaperId::new(row.get::<_, String>(0)?),
                    PaperId::new(row.get::<_, String>(1)?),
                ))
            })
            .context("execute citations_touching")?
            .collect::<Result<Vec<_>, _>>()
            .context("collect citations_touching")?;

        Ok(rows)
    }

    fn authorships(&self, papers: &BTreeSet<PaperId>) -> Result<Vec<(PaperId, AuthorId)>> {
        if papers.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT DISTINCT paper_id, author_id FROM paper_author_affils
             WHERE paper_id IN ({})",
            placeholders(papers.len())
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare authorships")?;

        let rows = stmt
            .query_map(params_from_iter(papers.iter()), |row| {
                Ok((
                    PaperId::new(row.get::<_, String>(0)?),
                    AuthorId::new(row.get::<_, String>(1)?),
                ))
            })
            .context("execute authorships")?
            .collect::<Result<Vec<_>, _>>()
            .context("collect authorships")?;

        Ok(rows)
    }

    fn author_affiliations(
        &self,
        authors: &BTreeSet<AuthorId>,
        papers: &BTreeSet<PaperId>,
    ) -> Result<Vec<AffiliationRow>> {
        if authors.is_empty() || papers.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT paper_id, author_id, affil_id FROM paper_author_affils
             WHERE author_id IN ({}) AND paper_id IN ({})",
            placeholders(authors.len()),
            placeholders(papers.len())
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare author_affiliations")?;

        let mut bind: Vec<&dyn ToSql> = Vec::with_capacity(authors.len() + papers.len());
        bind.extend(authors.iter().map(|a| a as &dyn ToSql));
        bind.extend(papers.iter().map(|p| p as &dyn ToSql));

        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok(AffiliationRow {
                    paper: PaperId::new(row.get::<_, String>(0)?),
                    author: AuthorId::new(row.get::<_, String>(1)?),
                    affil: non_blank_affil(row.get::<_, Option<String>>(2)?),
                })
            })
            .context("execute author_affiliations")?
            .collect::<Result<Vec<_>, _>>()
            .context("collect author_affiliations")?;

        Ok(rows)
    }

    fn resolve_venue(&self, abbr: &str) -> Result<Option<VenueId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM venues WHERE abbr_name = ?1 LIMIT 1")
            .context("prepare resolve_venue")?;

        let mut rows = stmt
            .query_map(params![abbr], |row| {
                Ok(VenueId::new(row.get::<_, String>(0)?))
            })
            .context("execute resolve_venue")?;

        rows.next().transpose().context("collect resolve_venue")
    }

    fn expanded_papers(&self, venue: &VenueId, years: &[Year]) -> Result<Vec<(PaperId, Year)>> {
        if years.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT paper_id, year FROM expanded_conf_papers
             WHERE conf_id = ? AND year IN ({})",
            placeholders(years.len())
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare expanded_papers")?;

        let mut bind: Vec<&dyn ToSql> = vec![venue];
        bind.extend(years.iter().map(|y| y as &dyn ToSql));

        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((PaperId::new(row.get::<_, String>(0)?), row.get::<_, Year>(1)?))
            })
            .context("execute expanded_papers")?
            .collect::<Result<Vec<_>, _>>()
            .context("collect expanded_papers")?;

        Ok(rows)
    }

    fn pub_records(
        &self,
        venue: &VenueId,
        years: &[Year],
        source: PubSource,
    ) -> Result<BTreeMap<PaperId, PubRecord>> {
        if years.is_empty() {
            return Ok(BTreeMap::new());
        }

        let sql = match source {
            PubSource::Selected => format!(
                "SELECT p.id, p.year, a.author_id, a.affil_id
                 FROM papers p
                 LEFT JOIN paper_author_affils a ON a.paper_id = p.id
                 WHERE p.venue_id = ? AND p.year IN ({})",
                placeholders(years.len())
            ),
            PubSource::Expanded => format!(
                "SELECT e.paper_id, e.year, a.author_id, a.affil_id
                 FROM expanded_conf_papers e
                 LEFT JOIN paper_author_affils a ON a.paper_id = e.paper_id
                 WHERE e.conf_id = ? AND e.year IN ({})",
                placeholders(years.len())
            ),
        };
        let mut stmt = self.conn.prepare(&sql).context("prepare pub_records")?;

        let mut bind: Vec<&dyn ToSql> = vec![venue];
        bind.extend(years.iter().map(|y| y as &dyn ToSql));

        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((
                    PaperId::new(row.get::<_, String>(0)?),
                    row.get::<_, Year>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .context("execute pub_records")?
            .collect::<Result<Vec<_>, _>>()
            .context("collect pub_records")?;

        let mut records: BTreeMap<PaperId, PubRecord> = BTreeMap::new();
        for (paper, year, author, affil) in rows {
            let record = records
                .entry(paper)
                .or_insert_with(|| PubRecord::with_year(year));

            if let Some(author) = author {
                let affils = record.authors.entry(AuthorId::new(author)).or_default();
                if let Some(affil) = non_blank_affil(affil) {
                    affils.insert(affil);
                }
            }
        }

        Ok(records)
    }
}

impl ToSql for PaperId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

impl ToSql for AuthorId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

impl ToSql for VenueId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}
