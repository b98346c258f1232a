//! Unified multi-typed graph assembly.
//!
//! # Overview
//!
//! Merges the per-type layers into one directed, weighted
//! [`petgraph`] graph suitable for a ranking oracle. Every node gets a
//! dense integer id exactly once, assigned in a fixed layer order:
//! papers, then authors, then affiliations. Side maps translate natural
//! entity keys to node indices and back.
//!
//! ## Edge Direction Policy
//!
//! Causal edges go one way; relationship edges go both ways so an
//! undirected-walk oracle can traverse them in either direction:
//!
//! - citation (paper → cited paper): single direction
//! - affiliation → affiliation (derived): single direction
//! - authorship (paper ↔ author): both directions
//! - co-authorship, author-citation (author ↔ author): both directions
//! - author ↔ affiliation: both directions
//!
//! Inserting the same directed pair twice replaces the weight rather than
//! creating a parallel edge, so overlapping edge families stay one edge.
//!
//! An edge referencing a key with no assigned node id is a caller ordering
//! bug and panics; it is not a recoverable runtime condition.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, instrument};

use citerank_core::model::{AffilId, AuthorId, PaperId, Year};

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

/// Entity type tag carried by every unified node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Paper,
    Author,
    Affil,
}

impl NodeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Author => "author",
            Self::Affil => "affil",
        }
    }
}

/// One node of the assembled graph: type tag, natural key, and the scalar
/// attribute the ranking stage cares about (publication year for papers,
/// precomputed score for authors/affiliations, when supplied).
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedNode {
    pub kind: NodeKind,
    pub key: String,
    pub year: Option<Year>,
    pub score: Option<f64>,
}

// ---------------------------------------------------------------------------
// Layer input bundle
// ---------------------------------------------------------------------------

/// Paper layer input: nodes, induced citation edges, years.
#[derive(Debug, Default)]
pub struct PaperSection {
    pub nodes: BTreeSet<PaperId>,
    pub citation_edges: Vec<(PaperId, PaperId, f64)>,
    pub years: BTreeMap<PaperId, Year>,
}

/// Author layer input: nodes plus the three author edge families.
#[derive(Debug, Default)]
pub struct AuthorSection {
    pub nodes: BTreeSet<AuthorId>,
    /// Author-citation edges (projected from the citation relation).
    pub author_citation_edges: Vec<(AuthorId, AuthorId, f64)>,
    /// Co-authorship edges.
    pub coauthorship_edges: Vec<(AuthorId, AuthorId, f64)>,
    /// `(paper, author)` authorship pairs, weight 1.0 both ways.
    pub authorship_edges: Vec<(PaperId, AuthorId)>,
    /// Precomputed scores to attach to author nodes.
    pub scores: Option<BTreeMap<AuthorId, f64>>,
}

/// Affiliation layer input.
#[derive(Debug, Default)]
pub struct AffilSection {
    pub nodes: BTreeSet<AffilId>,
    pub author_affil_edges: Vec<(AuthorId, AffilId, f64)>,
    /// Derived affiliation-affiliation edges, inserted as produced.
    pub affil_affil_edges: Vec<(AffilId, AffilId, f64)>,
    /// Precomputed scores to attach to affiliation nodes.
    pub scores: Option<BTreeMap<AffilId, f64>>,
}

/// The (possibly absent) per-type inputs to one assembly.
#[derive(Debug, Default)]
pub struct Layers {
    pub papers: Option<PaperSection>,
    pub authors: Option<AuthorSection>,
    pub affils: Option<AffilSection>,
}

// ---------------------------------------------------------------------------
// ModelGraph
// ---------------------------------------------------------------------------

/// The unified, stably-identified graph handed to the ranking oracle.
///
/// Built once per build invocation and discarded after ranking; node
/// indices are meaningful only within the graph that assigned them.
#[derive(Debug)]
pub struct ModelGraph {
    /// Directed weighted graph over [`UnifiedNode`]s.
    pub graph: DiGraph<UnifiedNode, f64>,
    paper_ids: HashMap<PaperId, NodeIndex>,
    author_ids: HashMap<AuthorId, NodeIndex>,
    affil_ids: HashMap<AffilId, NodeIndex>,
}

impl ModelGraph {
    /// Assemble the unified graph from the given layers.
    ///
    /// Node ids are assigned strictly in papers → authors → affiliations
    /// order by a single incrementing counter, so
    /// `node_count == Σ |non-empty layer|` afterwards.
    ///
    /// # Panics
    ///
    /// Panics if an edge references an entity that is not a node of its
    /// layer — that is a caller ordering bug, not a runtime condition.
    #[must_use]
    #[instrument(skip(layers))]
    pub fn assemble(layers: &Layers) -> Self {
        let mut graph = DiGraph::new();
        let mut paper_ids = HashMap::new();
        let mut author_ids = HashMap::new();
        let mut affil_ids = HashMap::new();

        if let Some(papers) = &layers.papers {
            for paper in &papers.nodes {
                let idx = graph.add_node(UnifiedNode {
                    kind: NodeKind::Paper,
                    key: paper.as_str().to_owned(),
                    year: papers.years.get(paper).copied(),
                    score: None,
                });
                paper_ids.insert(paper.clone(), idx);
            }

            // Citation edges are causal: single direction.
            for (citing, cited, weight) in &papers.citation_edges {
                graph.update_edge(
                    lookup(&paper_ids, citing, "citing paper"),
                    lookup(&paper_ids, cited, "cited paper"),
                    *weight,
                );
            }
        }

        if let Some(authors) = &layers.authors {
            for author in &authors.nodes {
                let idx = graph.add_node(UnifiedNode {
                    kind: NodeKind::Author,
                    key: author.as_str().to_owned(),
                    year: None,
                    score: authors.scores.as_ref().and_then(|s| s.get(author).copied()),
                });
                author_ids.insert(author.clone(), idx);
            }

            for (a1, a2, weight) in &authors.author_citation_edges {
                let (n1, n2) = (
                    lookup(&author_ids, a1, "author"),
                    lookup(&author_ids, a2, "author"),
                );
                graph.update_edge(n1, n2, *weight);
                graph.update_edge(n2, n1, *weight);
            }

            for (a1, a2, weight) in &authors.coauthorship_edges {
                let (n1, n2) = (
                    lookup(&author_ids, a1, "author"),
                    lookup(&author_ids, a2, "author"),
                );
                graph.update_edge(n1, n2, *weight);
                graph.update_edge(n2, n1, *weight);
            }

            for (paper, author) in &authors.authorship_edges {
                let paper_idx = lookup(&paper_ids, paper, "authored paper");
                let author_idx = lookup(&author_ids, author, "author");
                graph.update_edge(paper_idx, author_idx, 1.0);
                graph.update_edge(author_idx, paper_idx, 1.0);
            }
        }

        if let Some(affils) = &layers.affils {
            for affil in &affils.nodes {
                let idx = graph.add_node(UnifiedNode {
                    kind: NodeKind::Affil,
                    key: affil.as_str().to_owned(),
                    year: None,
                    score: affils.scores.as_ref().and_then(|s| s.get(affil).copied()),
                });
                affil_ids.insert(affil.clone(), idx);
            }

            for (author, affil, weight) in &affils.author_affil_edges {
                let author_idx = lookup(&author_ids, author, "author");
                let affil_idx = lookup(&affil_ids, affil, "affiliation");
                graph.update_edge(author_idx, affil_idx, *weight);
                graph.update_edge(affil_idx, author_idx, *weight);
            }

            // Derived edges are causal: inserted exactly as produced.
            for (f1, f2, weight) in &affils.affil_affil_edges {
                graph.update_edge(
                    lookup(&affil_ids, f1, "affiliation"),
                    lookup(&affil_ids, f2, "affiliation"),
                    *weight,
                );
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "unified graph assembled"
        );

        Self {
            graph,
            paper_ids,
            author_ids,
            affil_ids,
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node index of a paper, if present.
    #[must_use]
    pub fn paper_index(&self, paper: &PaperId) -> Option<NodeIndex> {
        self.paper_ids.get(paper).copied()
    }

    /// Node index of an author, if present.
    #[must_use]
    pub fn author_index(&self, author: &AuthorId) -> Option<NodeIndex> {
        self.author_ids.get(author).copied()
    }

    /// Node index of an affiliation, if present.
    #[must_use]
    pub fn affil_index(&self, affil: &AffilId) -> Option<NodeIndex> {
        self.affil_ids.get(affil).copied()
    }

    /// The node payload at `idx`, if present.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> Option<&UnifiedNode> {
        self.graph.node_weight(idx)
    }

    /// Map oracle output back to paper keys, dropping non-paper nodes.
    #[must_use]
    pub fn paper_scores(&self, scores: &HashMap<NodeIndex, f64>) -> BTreeMap<PaperId, f64> {
        self.paper_ids
            .iter()
            .filter_map(|(key, idx)| scores.get(idx).map(|s| (key.clone(), *s)))
            .collect()
    }

    /// Map oracle output back to author keys, dropping non-author nodes.
    #[must_use]
    pub fn author_scores(&self, scores: &HashMap<NodeIndex, f64>) -> BTreeMap<AuthorId, f64> {
        self.author_ids
            .iter()
            .filter_map(|(key, idx)| scores.get(idx).map(|s| (key.clone(), *s)))
            .collect()
    }

    /// Map oracle output back to affiliation keys, dropping other nodes.
    #[must_use]
    pub fn affil_scores(&self, scores: &HashMap<NodeIndex, f64>) -> BTreeMap<AffilId, f64> {
        self.affil_ids
            .iter()
            .filter_map(|(key, idx)| scores.get(idx).map(|s| (key.clone(), *s)))
            .collect()
    }
}

fn lookup<K: std::hash::Hash + Eq + std::fmt::Display>(
    ids: &HashMap<K, NodeIndex>,
    key: &K,
    role: &str,
) -> NodeIndex {
    *ids.get(key)
        .unwrap_or_else(|| panic!("edge references unknown {role} `{key}`; layer ordering bug"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(raw: &str) -> PaperId {
        PaperId::new(raw)
    }

    fn author(raw: &str) -> AuthorId {
        AuthorId::new(raw)
    }

    fn affil(raw: &str) -> AffilId {
        AffilId::new(raw)
    }

    fn two_paper_layers() -> Layers {
        Layers {
            papers: Some(PaperSection {
                nodes: [paper("p1"), paper("p2")].into(),
                citation_edges: vec![(paper("p1"), paper("p2"), 1.0)],
                years: [(paper("p1"), 2010), (paper("p2"), 2012)].into(),
            }),
            authors: Some(AuthorSection {
                nodes: [author("a1"), author("a2")].into(),
                authorship_edges: vec![(paper("p1"), author("a1")), (paper("p2"), author("a2"))],
                ..AuthorSection::default()
            }),
            affils: None,
        }
    }

    #[test]
    fn node_count_is_sum_of_layers() {
        let model = ModelGraph::assemble(&two_paper_layers());
        assert_eq!(model.node_count(), 4);
    }

    #[test]
    fn ids_are_dense_and_layer_ordered() {
        let model = ModelGraph::assemble(&two_paper_layers());

        // Papers first, then authors, each dense from zero.
        let p1 = model.paper_index(&paper("p1")).expect("p1");
        let p2 = model.paper_index(&paper("p2")).expect("p2");
        let a1 = model.author_index(&author("a1")).expect("a1");

        assert!(p1.index() < 2 && p2.index() < 2);
        assert!(a1.index() >= 2);
    }

    #[test]
    fn citation_edges_are_single_direction() {
        let model = ModelGraph::assemble(&two_paper_layers());
        let p1 = model.paper_index(&paper("p1")).expect("p1");
        let p2 = model.paper_index(&paper("p2")).expect("p2");

        assert!(model.graph.contains_edge(p1, p2));
        assert!(!model.graph.contains_edge(p2, p1));
    }

    #[test]
    fn authorship_edges_are_bidirectional() {
        let model = ModelGraph::assemble(&two_paper_layers());
        let p1 = model.paper_index(&paper("p1")).expect("p1");
        let a1 = model.author_index(&author("a1")).expect("a1");

        assert!(model.graph.contains_edge(p1, a1));
        assert!(model.graph.contains_edge(a1, p1));
    }

    #[test]
    fn paper_nodes_carry_years() {
        let model = ModelGraph::assemble(&two_paper_layers());
        let p2 = model.paper_index(&paper("p2")).expect("p2");
        assert_eq!(model.node(p2).expect("node").year, Some(2012));
    }

    #[test]
    fn author_scores_attach_when_supplied() {
        let layers = Layers {
            authors: Some(AuthorSection {
                nodes: [author("a1")].into(),
                scores: Some([(author("a1"), 0.7)].into()),
                ..AuthorSection::default()
            }),
            ..Layers::default()
        };

        let model = ModelGraph::assemble(&layers);
        let a1 = model.author_index(&author("a1")).expect("a1");
        assert_eq!(model.node(a1).expect("node").score, Some(0.7));
    }

    #[test]
    fn affil_affil_edges_stay_single_direction() {
        let layers = Layers {
            affils: Some(AffilSection {
                nodes: [affil("f1"), affil("f2")].into(),
                affil_affil_edges: vec![(affil("f1"), affil("f2"), 0.4)],
                ..AffilSection::default()
            }),
            ..Layers::default()
        };

        let model = ModelGraph::assemble(&layers);
        let f1 = model.affil_index(&affil("f1")).expect("f1");
        let f2 = model.affil_index(&affil("f2")).expect("f2");

        assert!(model.graph.contains_edge(f1, f2));
        assert!(!model.graph.contains_edge(f2, f1));
    }

    #[test]
    #[should_panic(expected = "layer ordering bug")]
    fn edge_to_unknown_node_panics() {
        let layers = Layers {
            papers: Some(PaperSection {
                nodes: [paper("p1")].into(),
                citation_edges: vec![(paper("p1"), paper("ghost"), 1.0)],
                years: BTreeMap::new(),
            }),
            ..Layers::default()
        };

        let _ = ModelGraph::assemble(&layers);
    }
}
