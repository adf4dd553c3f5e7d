//! Domain models for requirements traceability.
//!
//! This module contains the storage-agnostic building blocks: loaded
//! records, the typed link mini-language, module descriptors and the
//! prefix concatenation rules.

/// Loaded record field bags.
pub mod record;
pub use record::Record;

/// The typed link mini-language (`type:target`, `partly_<kind>(<a>/<b>)`).
pub mod link;
pub use link::{LinkDirection, LinkType, ParseError};

mod descriptor;
pub use descriptor::{Descriptor, FORMAT_VERSION, Numbering};

/// Prefix concatenation rules for globally unique identifiers.
pub mod prefix;
