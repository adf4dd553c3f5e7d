//! Prefix concatenation rules.
//!
//! A node's global identifier is its module's full prefix and its local
//! identifier joined with `_`: `<ancestor-prefixes>_<local-id>`. The root
//! of the hierarchy has an empty parent prefix, so identifiers written at
//! the root level are used verbatim.

/// Joins a prefix and a local identifier.
///
/// An empty prefix yields the local identifier unchanged.
#[must_use]
pub fn join(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_owned()
    } else {
        format!("{prefix}_{local}")
    }
}

/// Returns the local part of an identifier: the segment after the last `_`.
///
/// Identifiers without a `_` are their own local part.
#[must_use]
pub fn local_part(id: &str) -> &str {
    id.rsplit('_').next().unwrap_or(id)
}

/// Whether an identifier belongs to the namespace of the given prefix.
///
/// Membership is substring containment, so a parent module's prefix also
/// claims every descendant module's identifiers.
#[must_use]
pub fn belongs_to(id: &str, prefix: &str) -> bool {
    id.contains(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_concatenates_with_underscore() {
        assert_eq!(join("ROOT_SYS", "12"), "ROOT_SYS_12");
    }

    #[test]
    fn join_with_empty_prefix_is_verbatim() {
        assert_eq!(join("", "Ext_1"), "Ext_1");
    }

    #[test]
    fn local_part_is_last_segment() {
        assert_eq!(local_part("ROOT_SYS_12"), "12");
        assert_eq!(local_part("12"), "12");
    }

    #[test]
    fn nested_ids_belong_to_ancestor_prefixes() {
        assert!(belongs_to("ROOT_SYS_12", "ROOT"));
        assert!(belongs_to("ROOT_SYS_12", "ROOT_SYS"));
        assert!(!belongs_to("Ext_1", "ROOT"));
    }
}
