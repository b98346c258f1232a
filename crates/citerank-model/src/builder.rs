//! Per-build orchestration.
//!
//! # Overview
//!
//! [`BuildContext`] bundles the external collaborators (catalog,
//! affiliation resolver) for one build invocation and exposes the
//! pipelines that combine layers, projection, and the ranking oracle.
//! Everything a build accumulates lives in the values it returns — there
//! is no module-level mutable state, and a context can be dropped and
//! rebuilt freely between builds.
//!
//! ## Pipelines
//!
//! - [`BuildContext::build_citation_model`] — the full three-layer graph
//!   (papers, authors, affiliations) for a venue selection.
//! - [`BuildContext::projected_author_layer`] — the paper layer projected
//!   onto authors with age decay.
//! - [`BuildContext::rank_affils_by_authors`] — projected author layer →
//!   oracle → additive roll-up onto affiliations.
//! - [`BuildContext::build_projected_model`] — author layer plus the
//!   projected affiliation layer in one unified graph, scores attached.
//! - [`BuildContext::refresh_rating_snapshots`] — rebuild and persist the
//!   three year-indexed snapshot documents for a venue.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use citerank_core::catalog::{Catalog, PubSource};
use citerank_core::model::{AffilId, AuthorId, PaperId, PubRecord, VenueId, Year};
use citerank_core::resolve::AffiliationResolver;
use citerank_core::snapshot::SnapshotStore;

use crate::graph::assemble::{
    AffilSection, AuthorSection, Layers, ModelGraph, PaperSection,
};
use crate::graph::index::EdgeIndex;
use crate::graph::layers::{
    self, ExpansionPolicy, ResolutionStats, affiliation_layer, author_layer, paper_layer,
};
use crate::oracle::RankingOracle;
use crate::project::{
    self, DecayParams, Membership, author_citation_edges, coauthorship_edges,
    membership_from_records,
};
use crate::ratings;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The venue/year window one build targets.
#[derive(Debug, Clone, Default)]
pub struct VenueSelection {
    /// Venue abbreviation, resolved through the catalog.
    pub venue: String,
    /// Directly selected years.
    pub years: Vec<Year>,
    /// Archive years read from the conference-expansion table.
    pub archive_years: Vec<Year>,
    /// Related venues contributing expansion papers: `(abbr, years)`.
    pub related: Vec<(String, Vec<Year>)>,
    /// Papers excluded from every expansion step.
    pub exclude: BTreeSet<PaperId>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Result of a full three-layer build.
#[derive(Debug)]
pub struct CitationModel {
    pub graph: ModelGraph,
    /// Affiliation-resolution bookkeeping for observability.
    pub resolution: ResolutionStats,
}

/// The paper layer projected onto authors, with age decay.
#[derive(Debug)]
pub struct ProjectedAuthorLayer {
    pub authors: BTreeSet<AuthorId>,
    /// Author-citation edges (projected from paper citations).
    pub author_citation_edges: Vec<(AuthorId, AuthorId, f64)>,
    /// Age-decayed co-authorship edges.
    pub coauthorship_edges: Vec<(AuthorId, AuthorId, f64)>,
    /// Author → affiliations membership seen in the records.
    pub membership: Membership,
    /// Fingerprint of the citation universe the layer was cut from.
    pub citation_hash: String,
}

// ---------------------------------------------------------------------------
// BuildContext
// ---------------------------------------------------------------------------

/// External collaborators for one build invocation.
pub struct BuildContext<'a> {
    catalog: &'a dyn Catalog,
    resolver: &'a dyn AffiliationResolver,
}

impl<'a> BuildContext<'a> {
    #[must_use]
    pub const fn new(catalog: &'a dyn Catalog, resolver: &'a dyn AffiliationResolver) -> Self {
        Self { catalog, resolver }
    }

    fn venue_id(&self, abbr: &str) -> Result<VenueId> {
        match self.catalog.resolve_venue(abbr)? {
            Some(id) => Ok(id),
            None => bail!("venue abbreviation `{abbr}` not found in catalog"),
        }
    }

    /// Build the full papers + authors + affiliations graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the venue cannot be resolved or a catalog query
    /// fails.
    #[instrument(skip(self, selection, policy), fields(venue = %selection.venue))]
    pub fn build_citation_model(
        &self,
        selection: &VenueSelection,
        policy: &ExpansionPolicy,
        weighted: bool,
    ) -> Result<CitationModel> {
        let venue = self.venue_id(&selection.venue)?;

        let papers = paper_layer(
            self.catalog,
            &venue,
            &selection.years,
            policy,
            &selection.exclude,
        )?;
        info!(
            papers = papers.nodes.len(),
            citations = papers.edges.len(),
            "paper layer"
        );

        let authors = author_layer(self.catalog, &papers.nodes, weighted)?;
        info!(
            authors = authors.authors.len(),
            coauthorships = authors.coauthorships.len(),
            "author layer"
        );

        let affils = affiliation_layer(
            self.catalog,
            self.resolver,
            &authors.authors,
            &papers.nodes,
        )?;
        info!(
            affils = affils.affils.len(),
            resolved = affils.stats.resolved,
            missing = affils.stats.missing,
            "affiliation layer"
        );

        let resolution = affils.stats;
        let graph = ModelGraph::assemble(&Layers {
            papers: Some(PaperSection {
                nodes: papers.nodes,
                citation_edges: papers.edges,
                years: papers.years,
            }),
            authors: Some(AuthorSection {
                nodes: authors.authors,
                coauthorship_edges: authors.coauthorships,
                authorship_edges: authors.authorships,
                ..AuthorSection::default()
            }),
            affils: Some(AffilSection {
                nodes: affils.affils,
                author_affil_edges: affils.author_affil_edges,
                ..AffilSection::default()
            }),
        });

        Ok(CitationModel { graph, resolution })
    }

    /// Collect publication records for the selection: selected years,
    /// archive years, and related-venue archive years, with exclusions
    /// removed.
    fn collect_records(&self, selection: &VenueSelection) -> Result<BTreeMap<PaperId, PubRecord>> {
        let venue = self.venue_id(&selection.venue)?;

        let mut records =
            self.catalog
                .pub_records(&venue, &selection.years, PubSource::Selected)?;

        let archive =
            self.catalog
                .pub_records(&venue, &selection.archive_years, PubSource::Expanded)?;
        records.extend(archive);

        for (abbr, years) in &selection.related {
            let related_venue = self
                .venue_id(abbr)
                .with_context(|| format!("related venue `{abbr}`"))?;
            let expanded =
                self.catalog
                    .pub_records(&related_venue, years, PubSource::Expanded)?;
            records.extend(expanded);
        }

        for excluded in &selection.exclude {
            records.remove(excluded);
        }

        Ok(records)
    }

    /// Project the paper layer onto authors with age decay.
    ///
    /// # Errors
    ///
    /// Returns an error if the venue cannot be resolved or a catalog query
    /// fails.
    #[instrument(skip(self, selection, decay), fields(venue = %selection.venue))]
    pub fn projected_author_layer(
        &self,
        selection: &VenueSelection,
        decay: &DecayParams,
    ) -> Result<ProjectedAuthorLayer> {
        let records = self.collect_records(selection)?;
        let docs: BTreeSet<PaperId> = records.keys().cloned().collect();

        let index = EdgeIndex::from_pairs(self.catalog.citations_touching(&docs)?);
        let citations = index.induced_subgraph(&docs);

        let authors: BTreeSet<AuthorId> = records
            .values()
            .flat_map(|record| record.authors.keys().cloned())
            .collect();

        info!(
            papers = docs.len(),
            citations = citations.len(),
            authors = authors.len(),
            "projected author layer"
        );

        Ok(ProjectedAuthorLayer {
            authors,
            author_citation_edges: author_citation_edges(&citations, &records, decay),
            coauthorship_edges: coauthorship_edges(&records, decay),
            membership: membership_from_records(&records),
            citation_hash: index.content_hash().to_owned(),
        })
    }

    /// Rank the projected author layer and roll scores up onto
    /// affiliations.
    ///
    /// # Errors
    ///
    /// Returns an error if layer construction or the oracle fails.
    #[instrument(skip_all, fields(venue = %selection.venue))]
    pub fn rank_affils_by_authors(
        &self,
        selection: &VenueSelection,
        decay: &DecayParams,
        oracle: &dyn RankingOracle,
        damping: f64,
    ) -> Result<BTreeMap<AffilId, f64>> {
        let layer = self.projected_author_layer(selection, decay)?;

        let graph = ModelGraph::assemble(&Layers {
            authors: Some(AuthorSection {
                nodes: layer.authors.clone(),
                author_citation_edges: layer.author_citation_edges.clone(),
                ..AuthorSection::default()
            }),
            ..Layers::default()
        });

        let raw = oracle.rank(&graph, damping).context("ranking oracle")?;
        let author_scores = graph.author_scores(&raw);

        Ok(project::project_scores(&author_scores, &layer.membership))
    }

    /// Assemble the author layer and the projected affiliation layer into
    /// one unified graph, with oracle scores attached to both layers.
    ///
    /// # Errors
    ///
    /// Returns an error if layer construction or the oracle fails.
    #[instrument(skip_all, fields(venue = %selection.venue))]
    pub fn build_projected_model(
        &self,
        selection: &VenueSelection,
        decay: &DecayParams,
        oracle: &dyn RankingOracle,
        damping: f64,
    ) -> Result<ModelGraph> {
        let layer = self.projected_author_layer(selection, decay)?;

        // Rank the author-citation layer on its own first.
        let author_graph = ModelGraph::assemble(&Layers {
            authors: Some(AuthorSection {
                nodes: layer.authors.clone(),
                author_citation_edges: layer.author_citation_edges.clone(),
                ..AuthorSection::default()
            }),
            ..Layers::default()
        });
        let raw = oracle.rank(&author_graph, damping).context("ranking oracle")?;
        let author_scores = author_graph.author_scores(&raw);

        let affil_scores = project::project_scores(&author_scores, &layer.membership);
        let affil_affil_edges = project::project_author_edges(
            &layer.author_citation_edges,
            &author_scores,
            &layer.membership,
        );

        let affils: BTreeSet<AffilId> = layer
            .membership
            .values()
            .flat_map(|affils| affils.iter().cloned())
            .collect();
        let author_affil_edges: Vec<(AuthorId, AffilId, f64)> = layer
            .membership
            .iter()
            .flat_map(|(author, affils)| {
                affils
                    .iter()
                    .map(move |affil| (author.clone(), affil.clone(), 1.0))
            })
            .collect();

        Ok(ModelGraph::assemble(&Layers {
            authors: Some(AuthorSection {
                nodes: layer.authors,
                author_citation_edges: layer.author_citation_edges,
                scores: Some(author_scores),
                ..AuthorSection::default()
            }),
            affils: Some(AffilSection {
                nodes: affils,
                author_affil_edges,
                affil_affil_edges,
                scores: Some(affil_scores),
            }),
            ..Layers::default()
        }))
    }

    /// Rebuild the three year-indexed snapshot documents for a venue and
    /// persist them atomically.
    ///
    /// The write happens only after every per-year computation completed,
    /// so a failed build never leaves a partially updated store.
    ///
    /// # Errors
    ///
    /// Returns an error if a catalog query or a snapshot write fails.
    #[instrument(skip(self, store), fields(venue = %venue_abbr))]
    pub fn refresh_rating_snapshots(
        &self,
        store: &SnapshotStore,
        venue_abbr: &str,
        archive_years: &[Year],
        recent_years: &[Year],
    ) -> Result<()> {
        let venue = self.venue_id(venue_abbr)?;

        let (author_ratings, author_affils) =
            ratings::year_author_ratings(self.catalog, &venue, archive_years, recent_years)?;
        let affil_ratings =
            ratings::year_affil_ratings(self.catalog, &venue, archive_years, recent_years)?;

        // Snapshot documents are named by the abbreviation callers address
        // venues with.
        let key = VenueId::new(venue_abbr);
        store
            .write_year_author_rating(&key, &author_ratings)
            .context("persist year-author-rating")?;
        store
            .write_author_affils(&key, &author_affils)
            .context("persist author-affils")?;
        store
            .write_year_affil_rating(&key, &affil_ratings)
            .context("persist year-affil-rating")?;

        info!(
            years = author_ratings.len(),
            authors = author_affils.len(),
            "rating snapshots refreshed"
        );
        Ok(())
    }
}

// Keep the policy parser reachable from the builder namespace; callers
// configure builds with selector strings.
pub use layers::parse_policy;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_policy_is_reexported() {
        assert!(parse_policy("n_hops", 1, Vec::new(), Vec::new()).is_ok());
        assert!(parse_policy("bogus", 1, Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn expansion_policy_reexport_matches() {
        let policy = ExpansionPolicy::NHops { hops: 1 };
        assert_eq!(policy.selector(), "n_hops");
    }
}
