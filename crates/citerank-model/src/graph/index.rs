//! Bidirectional adjacency index over the citation relation.
//!
//! # Overview
//!
//! Stores the raw `(citing, cited)` pairs as two adjacency maps so that
//! one-hop expansion and induced-subgraph extraction run in time
//! proportional to the degrees of the queried nodes, not to the total edge
//! count. This is the workhorse behind both paper-expansion policies.
//!
//! Identifiers are normalized (trimmed) by [`PaperId::new`] at
//! construction, so keys from messy catalog dumps compare equal to clean
//! ones.
//!
//! ## Cache Invalidation
//!
//! [`EdgeIndex::content_hash`] is a BLAKE3 hash of the sorted pair list.
//! Callers that persist oracle output keyed by the citation universe can
//! compare it against a stored value to detect when a re-rank is needed.

use std::collections::{BTreeSet, HashMap};

use citerank_core::model::PaperId;

/// In-memory bidirectional adjacency over directed `(from, to)` pairs.
///
/// Immutable once built; rebuild it for every build invocation rather than
/// reusing it across node universes.
#[derive(Debug, Default)]
pub struct EdgeIndex {
    /// from → targets it cites.
    citing: HashMap<PaperId, Vec<PaperId>>,
    /// to → sources citing it.
    cited: HashMap<PaperId, Vec<PaperId>>,
    /// BLAKE3 hash of the sorted edge list.
    content_hash: String,
}

impl EdgeIndex {
    /// Build the index from raw directed pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (PaperId, PaperId)>) -> Self {
        let mut citing: HashMap<PaperId, Vec<PaperId>> = HashMap::new();
        let mut cited: HashMap<PaperId, Vec<PaperId>> = HashMap::new();
        let mut sorted: BTreeSet<(PaperId, PaperId)> = BTreeSet::new();

        // `PaperId::new` already trims, so keys arrive normalized.
        for (from, to) in pairs {
            citing.entry(from.clone()).or_default().push(to.clone());
            cited.entry(to.clone()).or_default().push(from.clone());
            sorted.insert((from, to));
        }

        let content_hash = hash_pairs(&sorted);

        Self {
            citing,
            cited,
            content_hash,
        }
    }

    /// All nodes exactly one edge away from the given nodes, in either
    /// direction. Callers loop for multi-hop expansion.
    #[must_use]
    pub fn follow_nodes(&self, nodes: &BTreeSet<PaperId>) -> BTreeSet<PaperId> {
        let mut reached = BTreeSet::new();
        for node in nodes {
            if let Some(targets) = self.citing.get(node) {
                reached.extend(targets.iter().cloned());
            }
            if let Some(sources) = self.cited.get(node) {
                reached.extend(sources.iter().cloned());
            }
        }
        reached
    }

    /// All raw directed edges with both endpoints inside `nodes`,
    /// excluding self-loops.
    ///
    /// Runs in O(Σ degree(n) for n ∈ nodes): each queried node contributes
    /// only its own adjacency lists, so the cost is independent of the
    /// total edge count.
    #[must_use]
    pub fn induced_subgraph(&self, nodes: &BTreeSet<PaperId>) -> BTreeSet<(PaperId, PaperId)> {
        let mut edges = BTreeSet::new();

        for node in nodes {
            if let Some(targets) = self.citing.get(node) {
                for target in targets {
                    if target != node && nodes.contains(target) {
                        edges.insert((node.clone(), target.clone()));
                    }
                }
            }

            if let Some(sources) = self.cited.get(node) {
                for source in sources {
                    if source != node && nodes.contains(source) {
                        edges.insert((source.clone(), node.clone()));
                    }
                }
            }
        }

        edges
    }

    /// BLAKE3 fingerprint of the edge set, for external cache
    /// invalidation.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Number of distinct source nodes with at least one outgoing edge.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.citing.len()
    }
}

fn hash_pairs(pairs: &BTreeSet<(PaperId, PaperId)>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (from, to) in pairs {
        hasher.update(from.as_str().as_bytes());
        hasher.update(b"\x00");
        hasher.update(to.as_str().as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> PaperId {
        PaperId::new(raw)
    }

    fn index(pairs: &[(&str, &str)]) -> EdgeIndex {
        EdgeIndex::from_pairs(pairs.iter().map(|(f, t)| (id(f), id(t))))
    }

    fn set(ids: &[&str]) -> BTreeSet<PaperId> {
        ids.iter().map(|raw| id(raw)).collect()
    }

    #[test]
    fn follow_nodes_is_one_hop_both_directions() {
        let idx = index(&[("a", "b"), ("c", "a"), ("b", "d")]);

        let reached = idx.follow_nodes(&set(&["a"]));
        // Forward: a→b. Backward: c→a. Not d (two hops away).
        assert_eq!(reached, set(&["b", "c"]));
    }

    #[test]
    fn follow_nodes_unions_over_members() {
        let idx = index(&[("a", "b"), ("b", "d")]);
        let reached = idx.follow_nodes(&set(&["a", "b"]));
        assert_eq!(reached, set(&["a", "b", "d"]));
    }

    #[test]
    fn induced_subgraph_keeps_internal_edges_only() {
        let idx = index(&[("a", "b"), ("b", "c"), ("a", "d")]);

        let edges = idx.induced_subgraph(&set(&["a", "b", "c"]));
        assert_eq!(edges.len(), 2);
        assert!(edges.contains(&(id("a"), id("b"))));
        assert!(edges.contains(&(id("b"), id("c"))));
        assert!(!edges.iter().any(|(_, t)| *t == id("d")));
    }

    #[test]
    fn induced_subgraph_excludes_self_loops() {
        let idx = index(&[("a", "a"), ("a", "b")]);
        let edges = idx.induced_subgraph(&set(&["a", "b"]));
        assert_eq!(edges, [(id("a"), id("b"))].into());
    }

    #[test]
    fn induced_subgraph_deduplicates() {
        // Same pair inserted twice in the raw relation.
        let idx = index(&[("a", "b"), ("a", "b")]);
        let edges = idx.induced_subgraph(&set(&["a", "b"]));
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn identifiers_are_trimmed() {
        let idx = EdgeIndex::from_pairs([(id("a\r\n"), id(" b "))]);
        let reached = idx.follow_nodes(&set(&["a"]));
        assert_eq!(reached, set(&["b"]));
    }

    #[test]
    fn content_hash_ignores_insertion_order() {
        let forward = index(&[("a", "b"), ("c", "d")]);
        let reversed = index(&[("c", "d"), ("a", "b")]);
        assert_eq!(forward.content_hash(), reversed.content_hash());

        let different = index(&[("a", "b")]);
        assert_ne!(forward.content_hash(), different.content_hash());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn small_id() -> impl Strategy<Value = PaperId> {
            (0u8..12).prop_map(|n| PaperId::new(format!("p{n}")))
        }

        proptest! {
            /// Every emitted pair has both endpoints in the queried set,
            /// is not a self-loop, and exists in the raw relation.
            #[test]
            fn induced_subgraph_is_sound(
                pairs in proptest::collection::vec((small_id(), small_id()), 0..40),
                queried in proptest::collection::btree_set(small_id(), 0..12),
            ) {
                let raw: BTreeSet<(PaperId, PaperId)> = pairs.iter().cloned().collect();
                let idx = EdgeIndex::from_pairs(pairs);

                for (from, to) in idx.induced_subgraph(&queried) {
                    prop_assert!(queried.contains(&from));
                    prop_assert!(queried.contains(&to));
                    prop_assert_ne!(&from, &to);
                    prop_assert!(raw.contains(&(from, to)));
                }
            }

            /// Querying the full universe recovers exactly the raw relation
            /// minus self-loops.
            #[test]
            fn induced_subgraph_over_universe_is_complete(
                pairs in proptest::collection::vec((small_id(), small_id()), 0..40),
            ) {
                let universe: BTreeSet<PaperId> = pairs
                    .iter()
                    .flat_map(|(f, t)| [f.clone(), t.clone()])
                    .collect();
                let expected: BTreeSet<(PaperId, PaperId)> = pairs
                    .iter()
                    .filter(|(f, t)| f != t)
                    .cloned()
                    .collect();

                let idx = EdgeIndex::from_pairs(pairs);
                prop_assert_eq!(idx.induced_subgraph(&universe), expected);
            }
        }
    }
}
