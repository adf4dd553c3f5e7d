use serde::{Deserialize, Serialize};

/// The current module descriptor format version.
pub const FORMAT_VERSION: u32 = 2;

/// The identifier numbering strategy of a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Numbering {
    /// Monotonically increasing decimal counter.
    #[serde(rename = "sequential")]
    Sequential,
    /// Fixed-width value derived from a changing seed, retried until it
    /// avoids the module's used-id set.
    #[default]
    #[serde(rename = "content-hash")]
    ContentHash,
}

/// A module descriptor: the boundary contract describing one module of the
/// hierarchy.
///
/// The descriptor carries everything a module needs besides its records:
/// its own prefix segment, its numbering strategy and allocator state, and
/// the names of its child modules. How descriptors are stored is up to the
/// storage collaborator; [`Descriptor::from_yaml`] and
/// [`Descriptor::to_yaml`] cover the common case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Descriptor {
    /// The module's own prefix segment.
    prefix: String,

    /// The numbering strategy for locally allocated identifiers.
    numbering: Numbering,

    /// Whether this module is a root of its own identifier namespace.
    pub root: bool,

    /// Names of the child modules, in composition order.
    modules: Vec<String>,

    /// Every local identifier ever allocated in this module. Append-only;
    /// identifiers are never reused, even after their node is removed.
    used_ids: Vec<String>,

    /// The next value of the sequential counter.
    next_id: u64,
}

impl Descriptor {
    /// Creates a descriptor for a fresh, empty module.
    #[must_use]
    pub fn new(prefix: impl Into<String>, numbering: Numbering) -> Self {
        Self {
            prefix: prefix.into(),
            numbering,
            root: false,
            modules: Vec::new(),
            used_ids: Vec::new(),
            next_id: 1,
        }
    }

    /// The module's own prefix segment.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The numbering strategy.
    #[must_use]
    pub const fn numbering(&self) -> Numbering {
        self.numbering
    }

    /// Names of the child modules, in composition order.
    #[must_use]
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Registers a child module name, if not already present.
    ///
    /// Returns `true` if the name was added.
    pub fn add_module(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.modules.contains(&name) {
            false
        } else {
            self.modules.push(name);
            true
        }
    }

    /// The used local identifiers.
    #[must_use]
    pub fn used_ids(&self) -> &[String] {
        &self.used_ids
    }

    /// The next sequential counter value.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Replaces the allocator state with the given used-id set and counter.
    pub fn set_allocator_state(&mut self, used_ids: Vec<String>, next_id: u64) {
        self.used_ids = used_ids;
        self.next_id = next_id;
    }

    /// Parses a descriptor from its YAML representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid YAML or does not match a
    /// known format version.
    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    /// Serialises the descriptor to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// The serialised versions of the descriptor.
///
/// New format versions are added as variants, keeping old descriptors
/// readable without touching the domain type.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "2")]
    V2 {
        prefix: String,

        #[serde(default)]
        numbering: Numbering,

        #[serde(default)]
        root: bool,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        modules: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        used_ids: Vec<String>,

        #[serde(default = "default_next_id")]
        next_id: u64,
    },
}

const fn default_next_id() -> u64 {
    1
}

impl From<Versions> for Descriptor {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V2 {
                prefix,
                numbering,
                root,
                modules,
                used_ids,
                next_id,
            } => Self {
                prefix,
                numbering,
                root,
                modules,
                used_ids,
                next_id,
            },
        }
    }
}

impl From<Descriptor> for Versions {
    fn from(descriptor: Descriptor) -> Self {
        Self::V2 {
            prefix: descriptor.prefix,
            numbering: descriptor.numbering,
            root: descriptor.root,
            modules: descriptor.modules,
            used_ids: descriptor.used_ids,
            next_id: descriptor.next_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_round_trip() {
        let mut descriptor = Descriptor::new("SYS", Numbering::Sequential);
        descriptor.root = true;
        descriptor.add_module("auth");
        descriptor.set_allocator_state(vec!["1".to_owned(), "2".to_owned()], 3);

        let yaml = descriptor.to_yaml().unwrap();
        let parsed = Descriptor::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn minimal_yaml_uses_defaults() {
        let descriptor = Descriptor::from_yaml("_version: '2'\nprefix: SYS\n").unwrap();

        assert_eq!(descriptor.prefix(), "SYS");
        assert_eq!(descriptor.numbering(), Numbering::ContentHash);
        assert!(!descriptor.root);
        assert!(descriptor.modules().is_empty());
        assert!(descriptor.used_ids().is_empty());
        assert_eq!(descriptor.next_id(), 1);
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert!(Descriptor::from_yaml("_version: '9'\nprefix: SYS\n").is_err());
    }

    #[test]
    fn duplicate_child_is_not_added_twice() {
        let mut descriptor = Descriptor::new("SYS", Numbering::ContentHash);
        assert!(descriptor.add_module("auth"));
        assert!(!descriptor.add_module("auth"));
        assert_eq!(descriptor.modules(), ["auth".to_owned()]);
    }
}
