//! Hierarchical requirements traceability.
//!
//! Requirements, test cases and test outcomes are nodes in one directed
//! graph. Typed links ("refines", "verifies", "implements", cross-boundary
//! "extern") express satisfaction relationships between them. Requirements
//! are organised into a nested hierarchy of prefixed modules; every module
//! allocates locally-unique identifiers which are disambiguated globally by
//! concatenating the prefixes of its ancestors.
//!
//! The crate builds the composed graph from loaded records, resolving link
//! targets against module prefixes and rejecting contradictory links, and
//! then rolls leaf-level fulfilment (including graded partial credit) up
//! into a per-link-type completion fraction at every ancestor node.
//!
//! Storage formats, import/export and rendering are external collaborators;
//! they consume the query surface exposed by [`Graph`], [`Module`] and
//! [`Project`].

pub mod domain;
pub use domain::{Descriptor, LinkDirection, LinkType, Numbering, ParseError, Record};

/// The composed traceability graph and its nodes.
pub mod graph;
pub use graph::{Graph, IntegrityError, Marker, Node, NodeKind, Related};

/// Modules, identifier allocation and record-to-graph building.
pub mod module;
pub use module::{Allocator, LoadError, Module, ModuleData, Project, ValidationError};

/// Test outcome leaf nodes.
pub mod outcome;
pub use outcome::{TestOutcome, Verdict};

/// Link status propagation.
pub mod status;
pub use status::{StatusError, propagate};
