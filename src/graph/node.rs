use std::collections::BTreeMap;

use crate::domain::{Record, prefix};

/// Per-node link status: a mapping from `<kind>_link_status` keys to
/// fulfilment fractions.
///
/// Computed by [`propagate`](crate::status::propagate) and never persisted.
pub type StatusMap = BTreeMap<String, f64>;

/// The kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A traceable statement of intent.
    Requirement,
    /// A test case specification.
    Testcase,
    /// The outcome of one test execution, attached as a leaf.
    TestResult,
    /// A placeholder for a link target whose own record has not been
    /// loaded: a forward reference or an identifier outside the project.
    Unresolved,
}

impl NodeKind {
    /// The record `Type` field value for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requirement => "Requirement",
            Self::Testcase => "Testcase",
            Self::TestResult => "Test-Result",
            Self::Unresolved => "Unresolved",
        }
    }

    /// Parses a record `Type` field value.
    #[must_use]
    pub fn from_field(value: &str) -> Option<Self> {
        match value {
            "Requirement" => Some(Self::Requirement),
            "Testcase" => Some(Self::Testcase),
            "Test-Result" => Some(Self::TestResult),
            "Unresolved" => Some(Self::Unresolved),
            _ => None,
        }
    }
}

/// A display marker hint for rendering collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Marker {
    /// An ordinary internal node.
    #[default]
    Default,
    /// A low-priority node: unresolved or external to the project.
    Muted,
    /// A passing test result.
    Pass,
    /// A failing test result.
    Fail,
}

impl Marker {
    /// The conventional colour name for this marker.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Default => "black",
            Self::Muted => "gray",
            Self::Pass => "green",
            Self::Fail => "red",
        }
    }
}

/// A node of the traceability graph.
///
/// A node is created either from a loaded record or as a placeholder on
/// first reference as a link target. A placeholder is upgraded in place if
/// its record is loaded later; the already-attached edges are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: String,
    kind: NodeKind,
    description: String,
    fields: Record,
    internal: bool,
    marker: Marker,
    deleted: bool,
    status: StatusMap,
    computed: bool,
}

impl Node {
    pub(crate) fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Unresolved,
            description: String::new(),
            fields: Record::new(),
            internal: false,
            marker: Marker::Muted,
            deleted: false,
            status: StatusMap::new(),
            computed: false,
        }
    }

    /// The globally unique, prefix-qualified identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The local part of the identifier (the segment after the last `_`).
    #[must_use]
    pub fn local_id(&self) -> &str {
        prefix::local_part(&self.id)
    }

    /// The node kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The description text. Empty for placeholders.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The open-ended extension fields, in first-seen order.
    #[must_use]
    pub const fn fields(&self) -> &Record {
        &self.fields
    }

    /// Whether the node belongs to a module of this project.
    #[must_use]
    pub const fn internal(&self) -> bool {
        self.internal
    }

    /// The display marker hint.
    #[must_use]
    pub const fn marker(&self) -> Marker {
        self.marker
    }

    /// Whether the node has been removed from its module's active list.
    ///
    /// Tombstoned nodes are retained, never erased.
    #[must_use]
    pub const fn deleted(&self) -> bool {
        self.deleted
    }

    /// The computed link status map. Empty until propagation has run.
    #[must_use]
    pub const fn status(&self) -> &StatusMap {
        &self.status
    }

    /// Looks up a field value by its tabular export column name.
    ///
    /// `Req-Id` resolves to the full identifier; `Type` and `Description`
    /// resolve to the typed core; anything else is an extension field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        use crate::domain::record::{DESCRIPTION_FIELD, ID_FIELD, TYPE_FIELD};
        match name {
            ID_FIELD => Some(&self.id),
            TYPE_FIELD => Some(self.kind.as_str()),
            DESCRIPTION_FIELD => Some(&self.description),
            _ => self.fields.get(name),
        }
    }

    pub(crate) const fn set_kind(&mut self, kind: NodeKind) {
        self.kind = kind;
    }

    pub(crate) fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub(crate) const fn set_internal(&mut self, internal: bool) {
        self.internal = internal;
    }

    pub(crate) const fn set_marker(&mut self, marker: Marker) {
        self.marker = marker;
    }

    pub(crate) const fn fields_mut(&mut self) -> &mut Record {
        &mut self.fields
    }

    /// Marks the node as removed from its module's active list without
    /// erasing it.
    pub(crate) fn tombstone(&mut self) {
        self.deleted = true;
        self.fields.insert("Status", "deleted");
    }

    pub(crate) const fn is_computed(&self) -> bool {
        self.computed
    }

    pub(crate) fn set_status(&mut self, status: StatusMap) {
        self.status = status;
        self.computed = true;
    }
}
