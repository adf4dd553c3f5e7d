//! Record-to-graph building.
//!
//! Converts one loaded [`Record`] into a node plus its typed links,
//! resolving link targets against the owning module's *parent* prefix
//! (link targets are always written relative to the level above) and
//! rejecting links asserted in both directions.

use crate::{
    domain::{
        LinkDirection, Record,
        link::parse_link_field,
        prefix,
        record::{DESCRIPTION_FIELD, ID_FIELD, TYPE_FIELD},
    },
    graph::{Graph, Marker, NodeKind},
    module::{LoadError, Module},
};

impl Module {
    /// Adds a record to this module, allocating an identifier if the
    /// record's `Req-Id` field is empty, and returns the full identifier.
    ///
    /// `position` inserts the identifier at the given index of the
    /// module's ordered list; `None` appends.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit identifier fails validation, a
    /// link field is malformed, a link of one kind would be asserted in
    /// both directions, or the record's `Type` is unknown.
    pub fn add_record(
        &mut self,
        graph: &mut Graph,
        record: &Record,
        position: Option<usize>,
    ) -> Result<String, LoadError> {
        let explicit = record.get(ID_FIELD).unwrap_or_default();
        let full_prefix = self.full_prefix().to_owned();
        let local = self.allocator_mut().allocate(explicit, &full_prefix)?;
        let full_id = prefix::join(&full_prefix, &local);
        self.apply_record(graph, &full_id, record, position)?;
        Ok(full_id)
    }

    /// Builds a record from the module's stored order list, trusting the
    /// listed local identifier over the record's own `Req-Id` field.
    pub(crate) fn load_record(
        &mut self,
        graph: &mut Graph,
        local: &str,
        record: &Record,
    ) -> Result<(), LoadError> {
        self.allocator_mut().record(local);
        let full_id = prefix::join(self.full_prefix(), local);
        self.apply_record(graph, &full_id, record, None)
    }

    fn apply_record(
        &mut self,
        graph: &mut Graph,
        full_id: &str,
        record: &Record,
        position: Option<usize>,
    ) -> Result<(), LoadError> {
        let idx = graph.ensure(full_id);

        let kind = match record.get(TYPE_FIELD) {
            Some(value) => {
                NodeKind::from_field(value).ok_or_else(|| LoadError::UnknownKind {
                    id: full_id.to_owned(),
                    kind: value.to_owned(),
                })?
            }
            // A record without a `Type` resolves a placeholder into a
            // requirement but never demotes an already-typed node.
            None => match graph.node_at(idx).kind() {
                NodeKind::Unresolved => NodeKind::Requirement,
                kind => kind,
            },
        };

        {
            let node = graph.node_at_mut(idx);
            node.set_kind(kind);
            node.set_internal(true);
            node.set_marker(Marker::Default);
            if let Some(description) = record.get(DESCRIPTION_FIELD) {
                node.set_description(description);
            }
            for (name, value) in record.iter() {
                if !matches!(name, ID_FIELD | TYPE_FIELD | DESCRIPTION_FIELD) {
                    node.fields_mut().insert(name, value);
                }
            }
        }

        self.discover_fields(record);
        self.build_links(graph, full_id, record)?;
        self.place(full_id, position);
        Ok(())
    }

    /// Appends field names not yet seen by this module, in first-seen
    /// order, for tabular export.
    fn discover_fields(&mut self, record: &Record) {
        for (name, _) in record.iter() {
            if !self.fields().iter().any(|f| f == name) {
                self.fields_mut().push(name.to_owned());
            }
        }
    }

    fn build_links(
        &mut self,
        graph: &mut Graph,
        full_id: &str,
        record: &Record,
    ) -> Result<(), LoadError> {
        for (name, value) in record.iter().filter(|(name, _)| name.contains("links")) {
            for (link, target) in parse_link_field(value)? {
                // Targets are written relative to the parent level;
                // extern targets are taken verbatim.
                let target_id = if link.is_extern() {
                    target
                } else {
                    prefix::join(self.parent_prefix(), &target)
                };
                tracing::debug!("linking '{full_id}' {} '{target_id}'", link.kind());

                let target_idx = graph.ensure(&target_id);
                if prefix::belongs_to(&target_id, self.full_prefix()) {
                    let node = graph.node_at_mut(target_idx);
                    node.set_internal(true);
                    node.set_marker(Marker::Default);
                }

                match LinkDirection::of_field(name) {
                    LinkDirection::Upward => graph.add_link(&target_id, full_id, link)?,
                    LinkDirection::Downward => graph.add_link(full_id, &target_id, link)?,
                }
            }
        }
        Ok(())
    }

    fn place(&mut self, full_id: &str, position: Option<usize>) {
        if self.order().iter().any(|id| id == full_id) {
            return;
        }
        let order = self.order_mut();
        match position {
            Some(index) if index < order.len() => order.insert(index, full_id.to_owned()),
            _ => order.push(full_id.to_owned()),
        }
    }
}
