//! The composed traceability graph.
//!
//! One [`Graph`] holds every node and edge of the whole module hierarchy:
//! modules insert into the root-owned arena during loading and keep only
//! their ordered identifier lists, never a private copy. Nodes are keyed
//! by their prefix-qualified identifier; edges carry a parsed
//! [`LinkType`].

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::{
    Direction,
    algo::tarjan_scc,
    stable_graph::{NodeIndex, StableDiGraph},
    visit::{EdgeRef, IntoEdgeReferences},
};

use crate::domain::LinkType;

mod node;
pub use node::{Marker, Node, NodeKind, StatusMap};

/// Errors that violate the integrity of the traceability graph.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IntegrityError {
    /// A link of one kind was asserted in both directions between the same
    /// pair of nodes.
    #[error("'{kind}' link between '{from}' and '{to}' is asserted in both directions")]
    TwoWay {
        /// The source of the rejected link.
        from: String,
        /// The target of the rejected link.
        to: String,
        /// The link kind asserted both ways.
        kind: String,
    },
}

/// The single shared graph of nodes and typed links.
#[derive(Debug, Default)]
pub struct Graph {
    arena: StableDiGraph<Node, LinkType>,
    ids: HashMap<String, NodeIndex>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.node_count()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.node_count() == 0
    }

    /// Whether a node with the given identifier exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Looks up a node by identifier.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.ids.get(id).and_then(|&idx| self.arena.node_weight(idx))
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.ids
            .get(id)
            .copied()
            .and_then(|idx| self.arena.node_weight_mut(idx))
    }

    /// Iterates over all nodes, in arbitrary order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.arena.node_weights()
    }

    /// Iterates over all nodes matching a predicate.
    pub fn nodes_matching<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Node> + 'a
    where
        P: Fn(&Node) -> bool + 'a,
    {
        self.nodes().filter(move |node| predicate(node))
    }

    /// Iterates over all links as `(source, target, type)` triples.
    pub fn links(&self) -> impl Iterator<Item = (&str, &str, &LinkType)> + '_ {
        self.arena.edge_references().map(|edge| {
            (
                self.arena[edge.source()].id(),
                self.arena[edge.target()].id(),
                edge.weight(),
            )
        })
    }

    /// Iterates over the links from `source` to `target`.
    pub fn links_between<'a>(
        &'a self,
        source: &str,
        target: &str,
    ) -> impl Iterator<Item = &'a LinkType> + 'a {
        self.ids
            .get(source)
            .copied()
            .zip(self.ids.get(target).copied())
            .map(|(s, t)| self.arena.edges_connecting(s, t).map(|e| e.weight()))
            .into_iter()
            .flatten()
    }

    /// Returns the node for the given identifier, creating an unresolved
    /// placeholder if it does not exist yet.
    pub(crate) fn ensure(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.ids.get(id) {
            return idx;
        }
        tracing::debug!("creating placeholder node '{id}'");
        let idx = self.arena.add_node(Node::placeholder(id));
        self.ids.insert(id.to_owned(), idx);
        idx
    }

    /// Adds a typed link from `source` to `target`, creating placeholder
    /// nodes for missing endpoints.
    ///
    /// Re-adding a link of the same kind in the same direction replaces
    /// the stored quota, so rebuilding a record is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError::TwoWay`] if a link of the same kind
    /// already exists in the opposite direction between the same pair.
    pub fn add_link(
        &mut self,
        source: &str,
        target: &str,
        link: LinkType,
    ) -> Result<(), IntegrityError> {
        let s = self.ensure(source);
        let t = self.ensure(target);

        if s != t
            && self
                .arena
                .edges_connecting(t, s)
                .any(|e| e.weight().kind() == link.kind())
        {
            return Err(IntegrityError::TwoWay {
                from: source.to_owned(),
                to: target.to_owned(),
                kind: link.kind().to_owned(),
            });
        }

        let existing = self
            .arena
            .edges_connecting(s, t)
            .find(|e| e.weight().kind() == link.kind())
            .map(|e| e.id());
        if let Some(edge) = existing {
            if let Some(weight) = self.arena.edge_weight_mut(edge) {
                *weight = link;
            }
        } else {
            self.arena.add_edge(s, t, link);
        }
        Ok(())
    }

    /// The related subgraph of a node: its ancestors, its descendants and
    /// the node itself.
    ///
    /// Returns `None` if the identifier is unknown.
    #[must_use]
    pub fn related(&self, id: &str) -> Option<Related> {
        let &idx = self.ids.get(id)?;
        Some(Related {
            focus: id.to_owned(),
            ancestors: self.reachable(idx, Direction::Incoming),
            descendants: self.reachable(idx, Direction::Outgoing),
        })
    }

    fn reachable(&self, start: NodeIndex, direction: Direction) -> BTreeSet<String> {
        let mut seen = HashSet::from([start]);
        let mut stack = vec![start];
        let mut out = BTreeSet::new();
        while let Some(idx) = stack.pop() {
            for next in self.arena.neighbors_directed(idx, direction) {
                if seen.insert(next) {
                    out.insert(self.arena[next].id().to_owned());
                    stack.push(next);
                }
            }
        }
        out
    }

    /// Return all link cycles in the graph as sorted identifier sets.
    ///
    /// Propagation refuses to run on a cyclic graph; this reports the
    /// offending strongly connected components.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();

        for component in tarjan_scc(&self.arena) {
            if component.len() > 1 {
                let mut ids: Vec<_> = component
                    .iter()
                    .map(|&idx| self.arena[idx].id().to_owned())
                    .collect();
                ids.sort();
                cycles.push(ids);
                continue;
            }

            let Some(&idx) = component.first() else {
                continue;
            };

            if self.arena.find_edge(idx, idx).is_some() {
                cycles.push(vec![self.arena[idx].id().to_owned()]);
            }
        }

        cycles.sort();
        cycles
    }

    pub(crate) fn indices(&self) -> Vec<NodeIndex> {
        self.arena.node_indices().collect()
    }

    /// Distinct direct children of a node, in first-edge order.
    pub(crate) fn child_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children = Vec::new();
        for next in self.arena.neighbors_directed(idx, Direction::Outgoing) {
            if !children.contains(&next) {
                children.push(next);
            }
        }
        children
    }

    /// Per-edge direct status contributions of a node, as
    /// `(status key, credit)` pairs.
    pub(crate) fn direct_credits(&self, idx: NodeIndex) -> Vec<(String, f64)> {
        self.arena
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (edge.weight().status_key(), edge.weight().credit()))
            .collect()
    }

    /// # Panics
    ///
    /// Panics if the index does not refer to a live node.
    pub(crate) fn node_at(&self, idx: NodeIndex) -> &Node {
        &self.arena[idx]
    }

    /// # Panics
    ///
    /// Panics if the index does not refer to a live node.
    pub(crate) fn node_at_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.arena[idx]
    }
}

/// The related subgraph of one node: ancestors ∪ descendants ∪ the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Related {
    focus: String,
    ancestors: BTreeSet<String>,
    descendants: BTreeSet<String>,
}

impl Related {
    /// The node the subgraph was computed for.
    #[must_use]
    pub fn focus(&self) -> &str {
        &self.focus
    }

    /// All nodes with a path to the focus.
    #[must_use]
    pub const fn ancestors(&self) -> &BTreeSet<String> {
        &self.ancestors
    }

    /// All nodes reachable from the focus.
    #[must_use]
    pub const fn descendants(&self) -> &BTreeSet<String> {
        &self.descendants
    }

    /// Iterates over every member of the subgraph, focus included.
    pub fn members(&self) -> impl Iterator<Item = &str> + '_ {
        self.ancestors
            .iter()
            .chain(self.descendants.iter())
            .map(String::as_str)
            .chain(std::iter::once(self.focus.as_str()))
    }

    /// Whether an identifier is part of the subgraph.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.focus == id || self.ancestors.contains(id) || self.descendants.contains(id)
    }
}
