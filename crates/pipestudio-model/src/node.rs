//! Positioned nodes and their port tables.

use indexmap::{IndexMap, IndexSet};
use pipestudio_geometry::{Point, PortAlignment, Rect, Size};
use pipestudio_types::{DiagramError, EntityCategory, EntityId, Result};

use crate::entity::{Entity, EntityBase};
use crate::events::DiagramEvent;
use crate::port::PortModel;

/// Type tags of the built-in node kinds.
pub mod kinds {
    pub const DEFAULT_NODE: &str = "default";
    pub const START_NODE: &str = "start";
    pub const DIAMOND_NODE: &str = "diamond";
    pub const CREATE_NEW_NODE: &str = "create-new";
    pub const EMPTY_ANCHOR_NODE: &str = "empty-anchor";
}

pub const DEFAULT_NODE_SIZE: Size = Size::new(90.0, 40.0);

/// A positioned node with ordered input and output ports.
#[derive(Debug)]
pub struct NodeModel {
    base: EntityBase,
    position: Point,
    /// Set once a position is given explicitly or assigned by the diagram.
    positioned: bool,
    size: Size,
    name: String,
    icon: Option<String>,
    secondary_icon: Option<String>,
    custom_style: IndexMap<String, String>,
    allow_add: bool,
    can_delete: bool,
    /// Kind-specific state, owned by the factory registered for the type tag.
    props: serde_json::Map<String, serde_json::Value>,
    ports: IndexMap<EntityId, PortModel>,
    in_ports: Vec<EntityId>,
    out_ports: Vec<EntityId>,
}

impl NodeModel {
    pub fn new(type_tag: impl Into<String>, id: EntityId, name: impl Into<String>) -> Self {
        Self {
            base: EntityBase::new(id, type_tag),
            position: Point::default(),
            positioned: false,
            size: DEFAULT_NODE_SIZE,
            name: name.into(),
            icon: None,
            secondary_icon: None,
            custom_style: IndexMap::new(),
            allow_add: false,
            can_delete: true,
            props: serde_json::Map::new(),
            ports: IndexMap::new(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self.positioned = true;
        self.layout_ports();
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self.layout_ports();
        self
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_secondary_icon(mut self, icon: Option<String>) -> Self {
        self.secondary_icon = icon;
        self
    }

    pub fn with_allow_add(mut self, allow_add: bool) -> Self {
        self.allow_add = allow_add;
        self
    }

    pub fn with_can_delete(mut self, can_delete: bool) -> Self {
        self.can_delete = can_delete;
        self
    }

    pub fn with_custom_style(mut self, style: IndexMap<String, String>) -> Self {
        self.custom_style = style;
        self
    }

    // --- accessors ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Whether the node has a position yet. A node at the origin may well
    /// have been put there on purpose.
    pub fn is_positioned(&self) -> bool {
        self.positioned
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn secondary_icon(&self) -> Option<&str> {
        self.secondary_icon.as_deref()
    }

    pub fn custom_style(&self) -> &IndexMap<String, String> {
        &self.custom_style
    }

    pub fn allow_add(&self) -> bool {
        self.allow_add
    }

    pub fn set_allow_add(&mut self, allow_add: bool) {
        self.allow_add = allow_add;
    }

    pub fn can_delete(&self) -> bool {
        self.can_delete
    }

    pub fn props(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.props
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(|v| v.as_str())
    }

    // --- ports ---

    /// Add a port to this node. The port's direction decides which ordered
    /// sequence it joins.
    pub fn add_port(&mut self, mut port: PortModel) -> Result<EntityId> {
        if self.is_locked() {
            return Err(DiagramError::Locked { id: self.id().clone() });
        }
        let id = port.id().clone();
        if self.ports.contains_key(&id) {
            return Err(DiagramError::DuplicateId {
                category: EntityCategory::Port,
                id,
            });
        }
        port.set_parent(self.id().clone());
        if port.is_in() {
            self.in_ports.push(id.clone());
        } else {
            self.out_ports.push(id.clone());
        }
        self.ports.insert(id.clone(), port);
        self.layout_ports();
        Ok(id)
    }

    pub fn port(&self, id: &EntityId) -> Option<&PortModel> {
        self.ports.get(id)
    }

    pub(crate) fn port_mut(&mut self, id: &EntityId) -> Option<&mut PortModel> {
        self.ports.get_mut(id)
    }

    pub fn port_by_name(&self, name: &str) -> Option<&PortModel> {
        self.ports.values().find(|p| p.name() == name)
    }

    /// Every port in the node's port table, in insertion order.
    pub fn ports(&self) -> impl Iterator<Item = &PortModel> {
        self.ports.values()
    }

    pub fn input_ports(&self) -> impl Iterator<Item = &PortModel> {
        self.in_ports.iter().filter_map(|id| self.ports.get(id))
    }

    pub fn output_ports(&self) -> impl Iterator<Item = &PortModel> {
        self.out_ports.iter().filter_map(|id| self.ports.get(id))
    }

    pub fn input_port_ids(&self) -> &[EntityId] {
        &self.in_ports
    }

    pub fn output_port_ids(&self) -> &[EntityId] {
        &self.out_ports
    }

    /// First input port.
    pub fn in_port(&self) -> Option<&PortModel> {
        self.input_ports().next()
    }

    /// First output port.
    pub fn out_port(&self) -> Option<&PortModel> {
        self.output_ports().next()
    }

    /// Ids of every link attached to any of this node's ports.
    pub fn link_ids(&self) -> IndexSet<EntityId> {
        self.ports
            .values()
            .flat_map(|p| p.links().iter().cloned())
            .collect()
    }

    /// Move the node and re-derive its port positions. Attached link endpoints
    /// are the diagram model's concern, see `DiagramModel::set_node_position`.
    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
        self.positioned = true;
        self.layout_ports();
        let entity = self.id().clone();
        self.fire_event(DiagramEvent::PositionChanged {
            entity,
            x: position.x,
            y: position.y,
        });
    }

    /// Spread ports evenly along the edge named by their alignment.
    fn layout_ports(&mut self) {
        let bounds = self.bounds();
        for alignment in [
            PortAlignment::Left,
            PortAlignment::Right,
            PortAlignment::Top,
            PortAlignment::Bottom,
        ] {
            let ids: Vec<EntityId> = self
                .ports
                .values()
                .filter(|p| p.alignment() == alignment)
                .map(|p| p.id().clone())
                .collect();
            let n = ids.len() as f64;
            for (i, id) in ids.iter().enumerate() {
                let step = (i as f64 + 1.0) / (n + 1.0);
                let position = match alignment {
                    PortAlignment::Left => Point::new(bounds.min_x, bounds.min_y + bounds.height() * step),
                    PortAlignment::Right => Point::new(bounds.max_x, bounds.min_y + bounds.height() * step),
                    PortAlignment::Top => Point::new(bounds.min_x + bounds.width() * step, bounds.min_y),
                    PortAlignment::Bottom => Point::new(bounds.min_x + bounds.width() * step, bounds.max_y),
                };
                if let Some(port) = self.ports.get_mut(id) {
                    port.set_position(position);
                }
            }
        }
    }
}

impl Entity for NodeModel {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn category(&self) -> EntityCategory {
        EntityCategory::Node
    }

    fn as_node_mut(&mut self) -> Option<&mut NodeModel> {
        Some(self)
    }

    fn remove(&mut self) -> bool {
        if self.is_removed() {
            return false;
        }
        for port in self.ports.values_mut() {
            port.remove();
        }
        self.base.mark_removed(EntityCategory::Node)
    }
}
