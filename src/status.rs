//! Link status propagation.
//!
//! Rolls leaf-level fulfilment up the graph: every node ends up with a
//! mapping from `<kind>_link_status` keys to completion fractions that
//! reflects both its own direct links (with graded partial credit) and
//! the weakest branch beneath it.

use std::collections::{BTreeMap, HashSet};

use petgraph::stable_graph::NodeIndex;
use tracing::instrument;

use crate::graph::{Graph, StatusMap};

/// Errors that prevent status propagation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StatusError {
    /// The graph contains a link cycle, so a bottom-up rollup has no
    /// well-defined order. Pairwise two-way checking only rejects cycles
    /// of a single kind; mixed-kind cycles surface here.
    #[error("link cycle through {}", members.join(" -> "))]
    Cycle {
        /// The identifiers on the cycle, sorted.
        members: Vec<String>,
    },
}

/// Computes the status map of every node in the graph.
///
/// Nodes are visited exactly once, in post order, so every descendant's
/// map is finalised before it is read. For each node:
///
/// 1. every outgoing link contributes its credit to the node's own value
///    for the link's status key, summed over the node's direct links;
/// 2. every key reported by a direct child is averaged over exactly the
///    children that report it;
/// 3. where both a direct value and a child average exist for a key, the
///    smaller of the two wins: a node is never more fulfilled than its
///    weakest subtree.
///
/// Re-running without mutating the graph is a no-op: already computed
/// nodes are skipped, so the maps stay identical.
///
/// # Errors
///
/// Returns [`StatusError::Cycle`] if the graph is cyclic.
#[instrument(skip(graph), fields(nodes = graph.len()))]
pub fn propagate(graph: &mut Graph) -> Result<(), StatusError> {
    if let Some(members) = graph.cycles().into_iter().next() {
        return Err(StatusError::Cycle { members });
    }

    let mut visited: HashSet<NodeIndex> = HashSet::new();
    for start in graph.indices() {
        if visited.contains(&start) {
            continue;
        }

        // Explicit work stack; the second visit of an entry finalises it.
        let mut stack = vec![(start, false)];
        while let Some((idx, finalise)) = stack.pop() {
            if finalise {
                compute(graph, idx);
                continue;
            }
            if !visited.insert(idx) {
                continue;
            }
            stack.push((idx, true));
            for child in graph.child_indices(idx) {
                if !visited.contains(&child) {
                    stack.push((child, false));
                }
            }
        }
    }

    Ok(())
}

/// Computes and stores one node's status map from its direct links and
/// its children's finalised maps.
fn compute(graph: &mut Graph, idx: NodeIndex) {
    if graph.node_at(idx).is_computed() {
        return;
    }

    let mut direct: StatusMap = BTreeMap::new();
    for (key, credit) in graph.direct_credits(idx) {
        *direct.entry(key).or_insert(0.0) += credit;
    }

    // Children missing a key are excluded from the average, not zeroed.
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for child in graph.child_indices(idx) {
        for (key, value) in graph.node_at(child).status() {
            let slot = sums.entry(key.clone()).or_insert((0.0, 0));
            slot.0 += value;
            slot.1 += 1;
        }
    }

    let mut merged: StatusMap = BTreeMap::new();
    for (key, (sum, count)) in sums {
        #[allow(clippy::cast_precision_loss)]
        let rollup = sum / count as f64;
        let value = direct
            .remove(&key)
            .map_or(rollup, |own| if own < rollup { own } else { rollup });
        merged.insert(key, value);
    }
    merged.extend(direct);

    graph.node_at_mut(idx).set_status(merged);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LinkType;

    fn status(graph: &Graph, id: &str, key: &str) -> f64 {
        *graph
            .node(id)
            .unwrap()
            .status()
            .get(key)
            .unwrap_or_else(|| panic!("no '{key}' on '{id}'"))
    }

    fn link(graph: &mut Graph, source: &str, target: &str, kind: &str) {
        graph
            .add_link(source, target, kind.parse::<LinkType>().unwrap())
            .unwrap();
    }

    /// Three requirements over partial verification leaves: the rollup at
    /// the top is the mean of the children's verification fractions.
    fn three_level_graph() -> Graph {
        let mut graph = Graph::new();
        link(&mut graph, "Req_2", "Test_1", "partly_verifies(1/2)");
        link(&mut graph, "Req_2", "Test_2", "partly_verifies(1/2)");
        link(&mut graph, "Req_3", "Test_3", "partly_verifies(1/2)");
        link(&mut graph, "Req_1", "Req_2", "partly_refines(1/2)");
        link(&mut graph, "Req_1", "Req_3", "partly_refines(1/2)");
        link(&mut graph, "Req_2", "Impl_2", "implements");
        link(&mut graph, "Req_3", "Impl_3", "implements");
        graph
    }

    #[test]
    fn partial_credits_sum_and_roll_up() {
        let mut graph = three_level_graph();
        propagate(&mut graph).unwrap();

        // Two half verifications make a whole.
        assert!((status(&graph, "Req_2", "verifies_link_status") - 1.0).abs() < f64::EPSILON);
        assert!((status(&graph, "Req_2", "implements_link_status") - 1.0).abs() < f64::EPSILON);

        // A single half verification stays at one half.
        assert!((status(&graph, "Req_3", "verifies_link_status") - 0.5).abs() < f64::EPSILON);
        assert!((status(&graph, "Req_3", "implements_link_status") - 1.0).abs() < f64::EPSILON);

        // Two half refinements make a whole; verification averages the
        // fully and the partly verified child: (1 + 1/2) / 2.
        assert!((status(&graph, "Req_1", "refines_link_status") - 1.0).abs() < f64::EPSILON);
        assert!((status(&graph, "Req_1", "verifies_link_status") - 0.75).abs() < f64::EPSILON);
        assert!((status(&graph, "Req_1", "implements_link_status") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn leaves_have_empty_maps() {
        let mut graph = three_level_graph();
        propagate(&mut graph).unwrap();

        for leaf in ["Test_1", "Test_2", "Test_3", "Impl_2", "Impl_3"] {
            assert!(graph.node(leaf).unwrap().status().is_empty(), "{leaf}");
        }
    }

    #[test]
    fn status_keys_come_only_from_links_and_descendants() {
        let mut graph = three_level_graph();
        propagate(&mut graph).unwrap();

        let keys: Vec<_> = graph.node("Req_1").unwrap().status().keys().collect();
        assert_eq!(
            keys,
            vec![
                "implements_link_status",
                "refines_link_status",
                "verifies_link_status"
            ]
        );
    }

    #[test]
    fn min_merge_caps_direct_credit_at_weakest_subtree() {
        let mut graph = Graph::new();
        // Direct: full verification claimed. Subtree: only half achieved.
        link(&mut graph, "Req", "Child", "verifies");
        link(&mut graph, "Child", "Leaf", "partly_verifies(1/2)");
        propagate(&mut graph).unwrap();

        let value = status(&graph, "Req", "verifies_link_status");
        assert!((value - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rollup_above_direct_keeps_direct() {
        let mut graph = Graph::new();
        link(&mut graph, "Req", "Child", "partly_verifies(1/4)");
        link(&mut graph, "Child", "Leaf", "verifies");
        propagate(&mut graph).unwrap();

        // Direct 1/4 beats the child's full verification.
        let value = status(&graph, "Req", "verifies_link_status");
        assert!((value - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn repropagation_is_idempotent() {
        let mut graph = three_level_graph();
        propagate(&mut graph).unwrap();
        let before: Vec<StatusMap> = graph.nodes().map(|n| n.status().clone()).collect();

        propagate(&mut graph).unwrap();
        let after: Vec<StatusMap> = graph.nodes().map(|n| n.status().clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn mixed_kind_cycle_is_rejected() {
        let mut graph = Graph::new();
        link(&mut graph, "A", "B", "refines");
        link(&mut graph, "B", "A", "verifies");

        let err = propagate(&mut graph).unwrap_err();
        assert_eq!(
            err,
            StatusError::Cycle {
                members: vec!["A".to_owned(), "B".to_owned()],
            }
        );
    }

    #[test]
    fn diamond_children_are_averaged_once() {
        let mut graph = Graph::new();
        link(&mut graph, "Top", "Left", "refines");
        link(&mut graph, "Top", "Right", "refines");
        link(&mut graph, "Left", "Shared", "verifies");
        link(&mut graph, "Right", "Shared", "verifies");
        propagate(&mut graph).unwrap();

        // Both branches report full verification; the average stays 1.
        let value = status(&graph, "Top", "verifies_link_status");
        assert!((value - 1.0).abs() < f64::EPSILON);
    }
}
