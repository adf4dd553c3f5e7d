//! Attaching test execution outcomes to the graph.
//!
//! An outcome becomes a leaf node named after the test, linked from the
//! requirement or test case it verifies. The target is taken from a
//! `reqtrace: <target> <link-type>` annotation embedded in the test name
//! (the `git-reqs:` spelling is also accepted), falling back to the test
//! case whose description the name contains.
//! Failed outcomes keep their structural link but carry zero credit, so
//! propagation reports the loss of fulfilment.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    domain::LinkType,
    graph::{Graph, Marker, NodeKind},
    module::LoadError,
};

// Both tag spellings are accepted; `git-reqs` is the historical one.
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:reqtrace|git-reqs):\s*(\S+)\s+(\S+)").expect("valid pattern"));

/// The verdict of one test execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The test passed.
    Passed,
    /// The test failed, with the reported failure kind.
    Failed(String),
}

impl Verdict {
    /// Whether the verdict is a pass.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// A short label for reports: `Passed`, or the failure kind.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Passed => "Passed",
            Self::Failed(kind) => kind,
        }
    }
}

/// The outcome of one test execution, as reported by the test runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    name: String,
    verdict: Verdict,
}

impl TestOutcome {
    /// Creates an outcome from a test name and verdict.
    #[must_use]
    pub fn new(name: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            name: name.into(),
            verdict,
        }
    }

    /// Creates a passing outcome.
    #[must_use]
    pub fn passed(name: impl Into<String>) -> Self {
        Self::new(name, Verdict::Passed)
    }

    /// Creates a failing outcome.
    #[must_use]
    pub fn failed(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(name, Verdict::Failed(kind.into()))
    }

    /// The full test name, annotations included.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The verdict.
    #[must_use]
    pub const fn verdict(&self) -> &Verdict {
        &self.verdict
    }
}

/// Attaches an outcome as a leaf node and returns the node's identifier.
///
/// The node is keyed by the test name, so re-attaching a rerun of the same
/// test updates the existing leaf in place.
///
/// # Errors
///
/// Returns an error if the annotated link type is malformed or the link
/// violates graph integrity.
pub fn attach(graph: &mut Graph, outcome: &TestOutcome) -> Result<String, LoadError> {
    let id = outcome.name.clone();
    let idx = graph.ensure(&id);
    {
        let node = graph.node_at_mut(idx);
        node.set_kind(NodeKind::TestResult);
        node.set_internal(true);
        node.set_marker(if outcome.verdict.is_pass() {
            Marker::Pass
        } else {
            Marker::Fail
        });
        node.fields_mut().insert("result", outcome.verdict.label());
    }

    if let Some(captures) = TAG_PATTERN.captures(outcome.name()) {
        let target = captures[1].to_owned();
        let link: LinkType = captures[2].parse()?;
        graph.add_link(&target, &id, graded(link, outcome))?;
        return Ok(id);
    }

    // No annotation: match the test case whose description the test name
    // contains.
    let fallback = graph
        .nodes()
        .find(|node| {
            node.kind() == NodeKind::Testcase
                && !node.description().is_empty()
                && outcome.name.contains(node.description())
        })
        .map(|node| node.id().to_owned());

    if let Some(target) = fallback {
        let link = LinkType::Full("verifies".to_owned());
        graph.add_link(&target, &id, graded(link, outcome))?;
    } else {
        tracing::debug!("no node matched test outcome '{}'", outcome.name);
    }
    Ok(id)
}

fn graded(link: LinkType, outcome: &TestOutcome) -> LinkType {
    if outcome.verdict.is_pass() {
        link
    } else {
        link.zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::propagate;

    fn testcase(graph: &mut Graph, id: &str, description: &str) {
        let idx = graph.ensure(id);
        let node = graph.node_at_mut(idx);
        node.set_kind(NodeKind::Testcase);
        node.set_description(description);
    }

    #[test]
    fn annotated_outcome_links_to_the_named_target() {
        let mut graph = Graph::new();
        let name = "heading_hold reqtrace: M_2 partly_verifies(1/2)";

        let id = attach(&mut graph, &TestOutcome::passed(name)).unwrap();

        assert_eq!(id, name);
        let node = graph.node(name).unwrap();
        assert_eq!(node.kind(), NodeKind::TestResult);
        assert_eq!(node.marker(), Marker::Pass);
        assert_eq!(node.fields().get("result"), Some("Passed"));

        let links: Vec<_> = graph.links_between("M_2", name).collect();
        assert_eq!(links.len(), 1);
        assert!((links[0].credit() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn historical_tag_spelling_is_accepted() {
        let mut graph = Graph::new();
        let name = "heading_hold git-reqs: M_2 verifies nominal";

        attach(&mut graph, &TestOutcome::passed(name)).unwrap();

        let links: Vec<_> = graph.links_between("M_2", name).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind(), "verifies");
        assert!((links[0].credit() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failed_outcome_contributes_zero_credit() {
        let mut graph = Graph::new();
        let name = "heading_hold reqtrace: M_2 verifies";

        attach(&mut graph, &TestOutcome::failed(name, "AssertionError")).unwrap();
        propagate(&mut graph).unwrap();

        let node = graph.node(name).unwrap();
        assert_eq!(node.marker(), Marker::Fail);
        assert_eq!(node.fields().get("result"), Some("AssertionError"));

        let status = graph.node("M_2").unwrap().status();
        assert!(status["verifies_link_status"].abs() < f64::EPSILON);
    }

    #[test]
    fn unannotated_outcome_falls_back_to_description_match() {
        let mut graph = Graph::new();
        testcase(&mut graph, "SYS_TST_1", "Engagement test");

        attach(&mut graph, &TestOutcome::passed("suite::Engagement test::run_3")).unwrap();

        let links: Vec<_> = graph
            .links_between("SYS_TST_1", "suite::Engagement test::run_3")
            .collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind(), "verifies");
        assert!((links[0].credit() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unmatched_outcome_becomes_an_isolated_leaf() {
        let mut graph = Graph::new();

        attach(&mut graph, &TestOutcome::passed("stray_test")).unwrap();

        assert!(graph.contains("stray_test"));
        assert_eq!(graph.links().count(), 0);
    }

    #[test]
    fn reattaching_a_rerun_updates_the_leaf_in_place() {
        let mut graph = Graph::new();
        let name = "heading_hold reqtrace: M_2 verifies";

        attach(&mut graph, &TestOutcome::failed(name, "AssertionError")).unwrap();
        attach(&mut graph, &TestOutcome::passed(name)).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node(name).unwrap().marker(), Marker::Pass);
        let links: Vec<_> = graph.links_between("M_2", name).collect();
        assert_eq!(links.len(), 1);
        assert!((links[0].credit() - 1.0).abs() < f64::EPSILON);
    }
}
