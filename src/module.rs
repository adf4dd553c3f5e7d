//! The module hierarchy and its composition into a project.
//!
//! A [`Module`] owns an ordered list of node identifiers, an identifier
//! [`Allocator`] and its child modules; the nodes themselves live in the
//! project-wide [`Graph`]. A [`Project`] composes the root module, its
//! descendants and the shared graph, loading everything from plain
//! [`ModuleData`] handed over by the storage collaborator.

use std::collections::HashMap;

use tracing::instrument;

use crate::{
    domain::{Descriptor, ParseError, Record, prefix, record::CANONICAL_FIELDS},
    graph::{Graph, IntegrityError},
    outcome::{self, TestOutcome},
    status::{self, StatusError},
};

mod allocator;
pub use allocator::{Allocator, ValidationError};

mod builder;

/// Errors raised while loading or extending a project.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// An explicit identifier was rejected by the module's allocator.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A link violated the integrity of the graph.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// A link field could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A module's order list names an identifier with no record.
    #[error("module '{module}' lists id '{id}' but carries no record for it")]
    MissingRecord {
        /// The module whose order list is inconsistent.
        module: String,
        /// The local identifier without a record.
        id: String,
    },

    /// A record's `Type` field names no known node kind.
    #[error("record '{id}' has unknown type '{kind}'")]
    UnknownKind {
        /// The full identifier of the offending record.
        id: String,
        /// The unrecognised `Type` value.
        kind: String,
    },

    /// A module path did not resolve to a module.
    #[error("no module at path '{path}'")]
    UnknownModule {
        /// The path that failed to resolve, `/`-joined.
        path: String,
    },
}

/// The raw content of one module, as handed over by storage.
///
/// `order` lists local identifiers; `records` maps each of them to its
/// field bag. Children are `(name, data)` pairs in composition order.
#[derive(Debug, Clone)]
pub struct ModuleData {
    /// The module's descriptor.
    pub descriptor: Descriptor,
    /// Local identifiers, in document order.
    pub order: Vec<String>,
    /// The record of each listed identifier.
    pub records: HashMap<String, Record>,
    /// Child modules, in composition order.
    pub children: Vec<(String, ModuleData)>,
}

impl ModuleData {
    /// Creates empty module data around a descriptor.
    #[must_use]
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            order: Vec::new(),
            records: HashMap::new(),
            children: Vec::new(),
        }
    }

    /// Appends a record under the given local identifier.
    #[must_use]
    pub fn with_record(mut self, local: impl Into<String>, record: Record) -> Self {
        let local = local.into();
        if !self.order.contains(&local) {
            self.order.push(local.clone());
        }
        self.records.insert(local, record);
        self
    }

    /// Appends a child module.
    #[must_use]
    pub fn with_child(mut self, name: impl Into<String>, data: Self) -> Self {
        self.children.push((name.into(), data));
        self
    }
}

/// One module of the hierarchy.
///
/// The module holds its identifier bookkeeping and the names of its
/// children; the nodes live in the project's [`Graph`]. The full prefix is
/// the `_`-joined chain of ancestor prefixes and namespaces every
/// identifier the module allocates.
#[derive(Debug)]
pub struct Module {
    name: String,
    prefix: String,
    parent_prefix: String,
    full_prefix: String,
    root: bool,
    allocator: Allocator,
    fields: Vec<String>,
    order: Vec<String>,
    children: Vec<Module>,
}

impl Module {
    fn load(
        name: String,
        data: ModuleData,
        parent_prefix: &str,
        graph: &mut Graph,
    ) -> Result<Self, LoadError> {
        let ModuleData {
            descriptor,
            order,
            records,
            children,
        } = data;

        let full_prefix = prefix::join(parent_prefix, descriptor.prefix());
        tracing::debug!("loading module '{name}' with prefix '{full_prefix}'");

        let mut module = Self {
            name,
            prefix: descriptor.prefix().to_owned(),
            parent_prefix: parent_prefix.to_owned(),
            full_prefix: full_prefix.clone(),
            root: descriptor.root,
            allocator: Allocator::restore(
                descriptor.numbering(),
                descriptor.next_id(),
                descriptor.used_ids().to_vec(),
            ),
            fields: CANONICAL_FIELDS.iter().map(|&f| f.to_owned()).collect(),
            order: Vec::new(),
            children: Vec::new(),
        };

        // The order list is authoritative for identifiers; the record's
        // own `Req-Id` field is ignored on this path.
        for local in &order {
            let record = records.get(local).ok_or_else(|| LoadError::MissingRecord {
                module: module.name.clone(),
                id: local.clone(),
            })?;
            module.load_record(graph, local, record)?;
        }

        for (child_name, child_data) in children {
            let child = Self::load(child_name, child_data, &full_prefix, graph)?;
            module.children.push(child);
        }

        Ok(module)
    }

    /// The module's name within its parent.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's own prefix segment.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn parent_prefix(&self) -> &str {
        &self.parent_prefix
    }

    /// The `_`-joined chain of ancestor prefixes, including this module's.
    #[must_use]
    pub fn full_prefix(&self) -> &str {
        &self.full_prefix
    }

    /// Whether this module is a root of its own identifier namespace.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.root
    }

    /// The module's identifier allocator.
    #[must_use]
    pub const fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub(crate) const fn allocator_mut(&mut self) -> &mut Allocator {
        &mut self.allocator
    }

    /// The field names seen in this module, canonical columns first and
    /// extensions in first-seen order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub(crate) const fn fields_mut(&mut self) -> &mut Vec<String> {
        &mut self.fields
    }

    /// The full identifiers of this module's nodes, in document order.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub(crate) const fn order_mut(&mut self) -> &mut Vec<String> {
        &mut self.order
    }

    /// The local identifiers of this module's nodes, in document order.
    pub fn local_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(|id| prefix::local_part(id))
    }

    /// The child modules, in composition order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Looks up a direct child module by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Full identifiers that were allocated here but are no longer listed:
    /// the module's tombstones.
    #[must_use]
    pub fn tombstoned_ids(&self) -> Vec<String> {
        self.allocator
            .used()
            .iter()
            .filter(|local| !self.local_order().any(|l| l == local.as_str()))
            .map(|local| prefix::join(&self.full_prefix, local))
            .collect()
    }

    /// Synthesises the descriptor reflecting the module's current state.
    #[must_use]
    pub fn descriptor(&self) -> Descriptor {
        let mut descriptor = Descriptor::new(self.prefix.clone(), self.allocator.numbering());
        descriptor.root = self.root;
        for child in &self.children {
            descriptor.add_module(child.name.clone());
        }
        descriptor.set_allocator_state(self.allocator.used().to_vec(), self.allocator.next_id());
        descriptor
    }
}

/// A loaded project: the root module, its descendants and the one shared
/// graph their nodes live in.
#[derive(Debug)]
pub struct Project {
    root: Module,
    graph: Graph,
}

impl Project {
    /// Loads a project from the root module's data.
    ///
    /// Records are built in document order, depth first, so forward
    /// references within and across modules resolve once every module has
    /// been loaded. Identifiers in each module's used set that are no
    /// longer listed are tombstoned in the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if an order list names a missing record, a record
    /// carries an unknown `Type`, a link field is malformed, or a link
    /// violates graph integrity.
    #[instrument(skip(data))]
    pub fn load(name: &str, data: ModuleData) -> Result<Self, LoadError> {
        let mut graph = Graph::new();
        let root = Module::load(name.to_owned(), data, "", &mut graph)?;
        mark_tombstones(&root, &mut graph);
        Ok(Self { root, graph })
    }

    /// The shared traceability graph.
    #[must_use]
    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the shared graph, for external collaborators that
    /// add ad-hoc links.
    pub const fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// The root module.
    #[must_use]
    pub const fn root(&self) -> &Module {
        &self.root
    }

    /// Resolves a module by its name path below the root.
    ///
    /// The empty path resolves to the root module.
    #[must_use]
    pub fn module(&self, path: &[&str]) -> Option<&Module> {
        find_module(&self.root, path)
    }

    /// Every module of the hierarchy, root first, in depth-first order.
    #[must_use]
    pub fn modules(&self) -> Vec<&Module> {
        let mut out = Vec::new();
        collect_modules(&self.root, &mut out);
        out
    }

    /// Adds a record to the module at the given path and returns the full
    /// identifier of the new node.
    ///
    /// # Errors
    ///
    /// Returns an error if the path resolves to no module, or if building
    /// the record fails.
    pub fn add_record(
        &mut self,
        path: &[&str],
        record: &Record,
        position: Option<usize>,
    ) -> Result<String, LoadError> {
        let module = find_module_mut(&mut self.root, path).ok_or_else(|| {
            LoadError::UnknownModule {
                path: path.join("/"),
            }
        })?;
        module.add_record(&mut self.graph, record, position)
    }

    /// Attaches a test outcome as a leaf of the graph and returns the
    /// identifier of its node.
    ///
    /// # Errors
    ///
    /// Returns an error if the outcome names a link that violates graph
    /// integrity.
    pub fn attach_outcome(&mut self, outcome: &TestOutcome) -> Result<String, LoadError> {
        outcome::attach(&mut self.graph, outcome)
    }

    /// Computes the link status map of every node.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph is cyclic.
    pub fn propagate(&mut self) -> Result<(), StatusError> {
        status::propagate(&mut self.graph)
    }

    /// Tombstones every node whose local identifier is in its module's
    /// used set but no longer in the ordered list.
    ///
    /// Runs once as part of [`Project::load`]; idempotent, so re-running
    /// after further edits is safe.
    pub fn apply_tombstones(&mut self) {
        mark_tombstones(&self.root, &mut self.graph);
    }
}

fn find_module<'a>(module: &'a Module, path: &[&str]) -> Option<&'a Module> {
    match path.split_first() {
        None => Some(module),
        Some((head, rest)) => find_module(module.child(head)?, rest),
    }
}

fn find_module_mut<'a>(module: &'a mut Module, path: &[&str]) -> Option<&'a mut Module> {
    match path.split_first() {
        None => Some(module),
        Some((head, rest)) => {
            let child = module.children.iter_mut().find(|c| c.name == *head)?;
            find_module_mut(child, rest)
        }
    }
}

fn collect_modules<'a>(module: &'a Module, out: &mut Vec<&'a Module>) {
    out.push(module);
    for child in module.children() {
        collect_modules(child, out);
    }
}

fn mark_tombstones(module: &Module, graph: &mut Graph) {
    for id in module.tombstoned_ids() {
        if let Some(node) = graph.node_mut(&id) {
            tracing::debug!("tombstoning '{id}'");
            node.tombstone();
        }
    }
    for child in module.children() {
        mark_tombstones(child, graph);
    }
}
