use std::fmt;

/// The field name carrying the record's identifier.
pub const ID_FIELD: &str = "Req-Id";

/// The field name carrying the record's node kind.
pub const TYPE_FIELD: &str = "Type";

/// The field name carrying the record's description.
pub const DESCRIPTION_FIELD: &str = "Description";

/// The canonical field names, in the order they appear in tabular exports.
///
/// Fields discovered on loaded records that are not in this list are
/// appended to a module's field list in first-seen order.
pub const CANONICAL_FIELDS: [&str; 5] = [
    ID_FIELD,
    TYPE_FIELD,
    DESCRIPTION_FIELD,
    "downward_links",
    "upward_links",
];

/// A loaded record: an insertion-ordered mapping from field name to value.
///
/// Records are the boundary format between the external storage
/// collaborator and the graph builder. A record carries at minimum a
/// `Type` and a `Description`; any field whose name contains `links` is
/// interpreted as a comma-separated list of `type:target` pairs. All
/// other fields are open-ended extensions, preserved in first-seen order
/// so that tabular exports reproduce them deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Sets a field, replacing the value in place if the name is already
    /// present, otherwise appending it.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl<K: Into<String> + Clone, V: Into<String> + Clone, const N: usize> From<[(K, V); N]>
    for Record
{
    fn from(fields: [(K, V); N]) -> Self {
        fields.into_iter().collect()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_insertion_order() {
        let mut record = Record::new();
        record.insert("Type", "Requirement");
        record.insert("Zeta", "z");
        record.insert("Alpha", "a");

        let names: Vec<_> = record.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Type", "Zeta", "Alpha"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut record = Record::from([("Type", "Requirement"), ("Description", "old")]);
        record.insert("Description", "new");

        assert_eq!(record.get("Description"), Some("new"));
        assert_eq!(record.len(), 2);
        let names: Vec<_> = record.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Type", "Description"]);
    }

    #[test]
    fn missing_field_is_none() {
        let record = Record::from([("Type", "Testcase")]);
        assert_eq!(record.get("Description"), None);
    }
}
