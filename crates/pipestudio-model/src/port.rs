//! Ports: named, directed attachment points on a node.

use indexmap::IndexSet;
use pipestudio_geometry::{Point, PortAlignment};
use pipestudio_types::{EntityCategory, EntityId};

use crate::entity::{Entity, EntityBase};

pub const DEFAULT_PORT: &str = "default";

/// Name of the input port created by the connection helpers.
pub const PORT_IN: &str = "In";
/// Name of the output port created by the connection helpers.
pub const PORT_OUT: &str = "Out";

/// A connection point on a node.
///
/// A port belongs to exactly one node and tracks the links currently attached
/// to it. Its position is derived from the owning node's bounds.
#[derive(Debug)]
pub struct PortModel {
    base: EntityBase,
    parent: Option<EntityId>,
    name: String,
    is_in: bool,
    alignment: PortAlignment,
    position: Point,
    links: IndexSet<EntityId>,
}

impl PortModel {
    /// Input ports sit on the left edge and output ports on the right.
    pub fn new(name: impl Into<String>, is_in: bool) -> Self {
        Self::with_id(EntityId::generate(), DEFAULT_PORT, name, is_in)
    }

    pub fn with_id(
        id: EntityId,
        type_tag: impl Into<String>,
        name: impl Into<String>,
        is_in: bool,
    ) -> Self {
        let alignment = if is_in {
            PortAlignment::Left
        } else {
            PortAlignment::Right
        };
        Self {
            base: EntityBase::new(id, type_tag),
            parent: None,
            name: name.into(),
            is_in,
            alignment,
            position: Point::default(),
            links: IndexSet::new(),
        }
    }

    pub fn with_alignment(mut self, alignment: PortAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_in(&self) -> bool {
        self.is_in
    }

    pub fn alignment(&self) -> PortAlignment {
        self.alignment
    }

    /// Id of the owning node, once the port has been added to one.
    pub fn parent(&self) -> Option<&EntityId> {
        self.parent.as_ref()
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Ids of links attached to this port, in attachment order.
    pub fn links(&self) -> &IndexSet<EntityId> {
        &self.links
    }

    pub(crate) fn set_parent(&mut self, node: EntityId) {
        self.parent = Some(node);
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub(crate) fn attach_link(&mut self, link: EntityId) {
        self.links.insert(link);
    }

    pub(crate) fn detach_link(&mut self, link: &EntityId) -> bool {
        self.links.shift_remove(link)
    }
}

impl Entity for PortModel {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn category(&self) -> EntityCategory {
        EntityCategory::Port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alignment_follows_direction() {
        assert_eq!(PortModel::new(PORT_IN, true).alignment(), PortAlignment::Left);
        assert_eq!(PortModel::new(PORT_OUT, false).alignment(), PortAlignment::Right);
        assert_eq!(
            PortModel::new("top", true)
                .with_alignment(PortAlignment::Top)
                .alignment(),
            PortAlignment::Top
        );
    }

    #[test]
    fn links_are_a_set() {
        let mut port = PortModel::new(PORT_OUT, false);
        port.attach_link("l1".into());
        port.attach_link("l1".into());
        port.attach_link("l2".into());
        assert_eq!(port.links().len(), 2);
        assert!(port.detach_link(&"l1".into()));
        assert!(!port.detach_link(&"l1".into()));
    }
}
