//! The diagram model: structural layers, grouping layers, connection helpers,
//! and spatial queries.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use pipestudio_geometry::{Point, Rect};
use pipestudio_types::{DiagramError, EngineConfig, EntityCategory, EntityId, Result};

use crate::entity::{Entity, EntityBase};
use crate::events::DiagramEvent;
use crate::grouping::GroupingLayer;
use crate::layer::LayerModel;
use crate::link::{LinkModel, DEFAULT_LINK};
use crate::node::{kinds, NodeModel};
use crate::port::{PortModel, PORT_IN, PORT_OUT};

pub const DIAGRAM: &str = "diagram";

/// Per-level shift applied to an empty-anchor parent's contribution to a
/// fan-in elbow.
pub const ANCHOR_ELBOW_SHIFT: f64 = 20.0;

/// Result of a spatial query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Node(EntityId),
    Link(EntityId),
}

impl EntityRef {
    pub fn id(&self) -> &EntityId {
        match self {
            EntityRef::Node(id) | EntityRef::Link(id) => id,
        }
    }
}

/// Styling for links created by the connection helpers.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub link_type: String,
    pub allow_add: bool,
    pub dash_pattern: Option<String>,
    pub color: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            link_type: DEFAULT_LINK.to_string(),
            allow_add: false,
            dash_pattern: None,
            color: None,
        }
    }
}

/// The graph container.
///
/// Owns one structural node layer, one structural link layer, and any number
/// of grouping layers. Structural mutations fire `nodesUpdated` /
/// `linksUpdated` on the model's own listeners, after the entity's own
/// events.
#[derive(Debug)]
pub struct DiagramModel {
    base: EntityBase,
    config: EngineConfig,
    nodes: LayerModel<NodeModel>,
    links: LayerModel<LinkModel>,
    groups: IndexMap<EntityId, GroupingLayer>,
    active_group: Option<EntityId>,
    /// Port id -> owning node id.
    port_owners: HashMap<EntityId, EntityId>,
    /// Nodes added without a position, waiting for their first connection.
    unplaced: IndexSet<EntityId>,
    offset: Point,
    zoom: f64,
    grid_size: f64,
}

impl Default for DiagramModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagramModel {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_id(EntityId::generate(), config)
    }

    pub fn with_id(id: EntityId, config: EngineConfig) -> Self {
        let grid_size = config.grid_size;
        Self {
            base: EntityBase::new(id, DIAGRAM),
            config,
            nodes: LayerModel::new("nodes"),
            links: LayerModel::new("links"),
            groups: IndexMap::new(),
            active_group: None,
            port_owners: HashMap::new(),
            unplaced: IndexSet::new(),
            offset: Point::default(),
            zoom: 100.0,
            grid_size,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- read-only traversal ---

    pub fn node(&self, id: &EntityId) -> Option<&NodeModel> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &EntityId) -> Option<&mut NodeModel> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeModel> {
        self.nodes.iter()
    }

    pub fn node_layer(&self) -> &LayerModel<NodeModel> {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link(&self, id: &EntityId) -> Option<&LinkModel> {
        self.links.get(id)
    }

    pub fn link_mut(&mut self, id: &EntityId) -> Option<&mut LinkModel> {
        self.links.get_mut(id)
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkModel> {
        self.links.iter()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Resolve a port through the node that owns it.
    pub fn port(&self, id: &EntityId) -> Option<&PortModel> {
        let owner = self.port_owners.get(id)?;
        self.nodes.get(owner)?.port(id)
    }

    pub fn port_owner(&self, port: &EntityId) -> Option<&EntityId> {
        self.port_owners.get(port)
    }

    fn port_mut(&mut self, id: &EntityId) -> Option<&mut PortModel> {
        let owner = self.port_owners.get(id)?;
        self.nodes.get_mut(owner)?.port_mut(id)
    }

    pub fn is_unplaced(&self, id: &EntityId) -> bool {
        self.unplaced.contains(id)
    }

    // --- structural mutation ---

    /// Add a node to the structural node layer, and to the active grouping
    /// layer if there is one.
    ///
    /// With auto-positioning enabled, a node without a position is moved to
    /// the start offset if the diagram is empty; otherwise it is placed when
    /// first connected to a parent.
    pub fn add_node(&mut self, node: NodeModel) -> Result<EntityId> {
        self.insert_node(node, self.config.auto_position.enabled)
    }

    pub(crate) fn insert_node(&mut self, mut node: NodeModel, auto_position: bool) -> Result<EntityId> {
        let id = node.id().clone();
        if self.nodes.contains(&id) {
            return Err(DiagramError::DuplicateId {
                category: EntityCategory::Node,
                id,
            });
        }
        if let Some(port) = node.ports().find(|p| self.port_owners.contains_key(p.id())) {
            return Err(DiagramError::DuplicateId {
                category: EntityCategory::Port,
                id: port.id().clone(),
            });
        }
        if let Some(group) = self.active_group.as_ref().and_then(|g| self.groups.get(g)) {
            if group.is_locked() {
                return Err(DiagramError::Locked { id: group.id().clone() });
            }
        }

        let mut unplaced = false;
        if auto_position && !node.is_positioned() {
            if self.nodes.is_empty() {
                let auto = &self.config.auto_position;
                node.set_position(Point::new(auto.start_x, auto.start_y));
            } else {
                unplaced = true;
            }
        }

        for port in node.ports() {
            self.port_owners.insert(port.id().clone(), id.clone());
        }
        let kind = node.type_tag().to_string();
        let node = self.nodes.insert(node)?;
        if unplaced {
            self.unplaced.insert(id.clone());
        }

        if let Some(group_id) = &self.active_group {
            if let Some(group) = self.groups.get_mut(group_id) {
                group.add_model(node)?;
            }
        }

        tracing::debug!(node = %id, kind = %kind, "Node added");
        self.fire_event(DiagramEvent::NodesUpdated {
            node: id.clone(),
            added: true,
        });
        Ok(id)
    }

    /// Add a port to a node already in the diagram. Locked nodes are
    /// rejected.
    pub fn add_port(&mut self, node: &EntityId, port: PortModel) -> Result<EntityId> {
        if self.port_owners.contains_key(port.id()) {
            return Err(DiagramError::DuplicateId {
                category: EntityCategory::Port,
                id: port.id().clone(),
            });
        }
        self.unlocked_node(node)?;
        let owner = self.nodes.get_mut(node).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Node,
            id: node.clone(),
        })?;
        let port_id = owner.add_port(port)?;
        self.port_owners.insert(port_id.clone(), node.clone());

        // Ports on the same edge were re-spread.
        for link in self.nodes.get(node).map(|n| n.link_ids()).unwrap_or_default() {
            self.sync_link_endpoints(&link);
        }
        Ok(port_id)
    }

    /// Add a link. Its endpoints must resolve to ports already in the diagram;
    /// the end points are snapped to the ports' positions.
    pub fn add_link(&mut self, link: LinkModel) -> Result<EntityId> {
        let id = link.id().clone();
        if self.links.contains(&id) {
            return Err(DiagramError::DuplicateId {
                category: EntityCategory::Link,
                id,
            });
        }
        for port in [link.source_port(), link.target_port()].into_iter().flatten() {
            if !self.port_owners.contains_key(port) {
                return Err(DiagramError::UnresolvedReference {
                    from: id.clone(),
                    to: port.clone(),
                });
            }
        }

        let source = link.source_port().cloned();
        let target = link.target_port().cloned();
        for port in [&source, &target].into_iter().flatten() {
            if let Some(port) = self.port_mut(port) {
                port.attach_link(id.clone());
            }
        }
        self.links.insert(link)?;
        self.sync_link_endpoints(&id);

        tracing::debug!(link = %id, source = ?source, target = ?target, "Link added");
        self.fire_event(DiagramEvent::LinksUpdated {
            link: id.clone(),
            added: true,
        });
        Ok(id)
    }

    /// Remove a link. Missing links are ignored; locked links are rejected.
    pub fn remove_link(&mut self, id: &EntityId) -> Result<Option<LinkModel>> {
        let Some(link) = self.links.get(id) else {
            return Ok(None);
        };
        if link.is_locked() {
            tracing::debug!(link = %id, "Rejected removal of locked link");
            return Err(DiagramError::Locked { id: id.clone() });
        }
        Ok(self.detach_link(id))
    }

    fn detach_link(&mut self, id: &EntityId) -> Option<LinkModel> {
        let mut link = self.links.take(id)?;
        for port in [link.source_port().cloned(), link.target_port().cloned()]
            .into_iter()
            .flatten()
        {
            if let Some(port) = self.port_mut(&port) {
                port.detach_link(id);
            }
        }
        link.remove();
        tracing::debug!(link = %id, "Link removed");
        self.fire_event(DiagramEvent::LinksUpdated {
            link: id.clone(),
            added: false,
        });
        Some(link)
    }

    /// Remove a node and every link attached to its ports.
    ///
    /// Fails without changing anything if the node or any attached link is
    /// locked. Removing a missing node is a no-op.
    pub fn remove_node(&mut self, id: &EntityId) -> Result<Option<NodeModel>> {
        let Some(node) = self.nodes.get(id) else {
            return Ok(None);
        };
        if node.is_locked() {
            return Err(DiagramError::Locked { id: id.clone() });
        }
        let attached = node.link_ids();
        if let Some(locked) = attached
            .iter()
            .find(|l| self.links.get(l).is_some_and(|l| l.is_locked()))
        {
            tracing::debug!(node = %id, link = %locked, "Rejected removal of node with locked link");
            return Err(DiagramError::Locked { id: locked.clone() });
        }
        Ok(self.detach_node(id, &attached))
    }

    fn detach_node(&mut self, id: &EntityId, attached: &IndexSet<EntityId>) -> Option<NodeModel> {
        for link in attached {
            self.detach_link(link);
        }
        let mut node = self.nodes.take(id)?;
        for port in node.ports() {
            self.port_owners.remove(port.id());
        }
        self.unplaced.shift_remove(id);
        node.remove();
        tracing::debug!(node = %id, links = attached.len(), "Node removed");
        self.fire_event(DiagramEvent::NodesUpdated {
            node: id.clone(),
            added: false,
        });
        Some(node)
    }

    /// Remove every link, then every node, then every grouping layer. Locks
    /// are ignored.
    pub fn clear_all(&mut self) {
        let links: Vec<EntityId> = self.links.ids().cloned().collect();
        for link in &links {
            self.detach_link(link);
        }
        let nodes: Vec<EntityId> = self.nodes.ids().cloned().collect();
        for node in &nodes {
            self.detach_node(node, &IndexSet::new());
        }
        let groups: Vec<EntityId> = self.groups.keys().cloned().collect();
        for group in &groups {
            self.remove_grouping_layer(group);
        }
        self.active_group = None;
        tracing::info!(links = links.len(), nodes = nodes.len(), groups = groups.len(), "Diagram cleared");
    }

    // --- grouping layers ---

    /// Push `layer` (unless a layer with the same id is already present) and
    /// make it active. Nodes added afterwards become members until
    /// [`use_structural_layer`](Self::use_structural_layer) is called.
    ///
    /// The layer's anchor nodes are added on first use.
    pub fn use_grouping_layer(&mut self, mut layer: GroupingLayer) -> Result<EntityId> {
        let id = layer.id().clone();
        if !self.groups.contains_key(&id) {
            let anchors = layer.take_pending_anchors();
            self.groups.insert(id.clone(), layer);
            tracing::debug!(layer = %id, "Grouping layer pushed");
            self.active_group = Some(id.clone());
            for anchor in anchors {
                if !self.nodes.contains(anchor.id()) {
                    self.add_node(anchor)?;
                }
            }
        }
        self.active_group = Some(id.clone());
        Ok(id)
    }

    /// Re-activate a grouping layer already in the diagram.
    pub fn activate_grouping_layer(&mut self, id: &EntityId) -> Result<()> {
        if !self.groups.contains_key(id) {
            return Err(DiagramError::NotFound {
                category: EntityCategory::Layer,
                id: id.clone(),
            });
        }
        self.active_group = Some(id.clone());
        Ok(())
    }

    /// Stop recording insertions into a grouping layer.
    pub fn use_structural_layer(&mut self) {
        self.active_group = None;
    }

    pub fn active_grouping_layer(&self) -> Option<&GroupingLayer> {
        self.active_group.as_ref().and_then(|id| self.groups.get(id))
    }

    pub fn grouping_layer(&self, id: &EntityId) -> Option<&GroupingLayer> {
        self.groups.get(id)
    }

    pub fn grouping_layer_mut(&mut self, id: &EntityId) -> Option<&mut GroupingLayer> {
        self.groups.get_mut(id)
    }

    pub fn grouping_layers(&self) -> impl Iterator<Item = &GroupingLayer> {
        self.groups.values()
    }

    /// Record an existing node as a member of an existing grouping layer.
    pub fn add_to_grouping_layer(&mut self, layer: &EntityId, node: &EntityId) -> Result<()> {
        let group = self.groups.get_mut(layer).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Layer,
            id: layer.clone(),
        })?;
        let node = self.nodes.get_mut(node).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Node,
            id: node.clone(),
        })?;
        group.add_model(node)
    }

    /// Drop a grouping layer. Its members stay in the node layer.
    pub fn remove_grouping_layer(&mut self, id: &EntityId) -> Option<GroupingLayer> {
        let mut group = self.groups.shift_remove(id)?;
        group.detach(&mut self.nodes);
        group.remove();
        if self.active_group.as_ref() == Some(id) {
            self.active_group = None;
        }
        tracing::debug!(layer = %id, "Grouping layer removed");
        Some(group)
    }

    /// Rendered extent of a grouping layer.
    pub fn group_bounds(&self, id: &EntityId) -> Option<Rect> {
        self.groups.get(id)?.bounds(&self.nodes)
    }

    /// Nesting depth of the grouping layer containing `node`, or 0.
    pub fn group_depth_of(&self, node: &EntityId) -> u32 {
        self.groups
            .values()
            .filter(|g| g.contains(node))
            .map(|g| g.depth())
            .max()
            .unwrap_or(0)
    }

    // --- connection helpers ---

    /// The node, provided it exists and is not locked.
    fn unlocked_node(&self, id: &EntityId) -> Result<&NodeModel> {
        let node = self.nodes.get(id).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Node,
            id: id.clone(),
        })?;
        if node.is_locked() {
            tracing::debug!(node = %id, "Rejected change to locked node");
            return Err(DiagramError::Locked { id: id.clone() });
        }
        Ok(node)
    }

    fn ensure_port(&mut self, node: &EntityId, is_in: bool) -> Result<EntityId> {
        let existing = self.nodes.get(node).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Node,
            id: node.clone(),
        })?;
        let first = if is_in {
            existing.in_port()
        } else {
            existing.out_port()
        };
        match first {
            Some(port) => Ok(port.id().clone()),
            None => {
                let name = if is_in { PORT_IN } else { PORT_OUT };
                self.add_port(node, PortModel::new(name, is_in))
            }
        }
    }

    /// Link `parent`'s output port to `child`'s input port, creating either
    /// port if it is missing.
    ///
    /// Idempotent: returns `Ok(None)` when a link from `parent` already
    /// enters the child's input port. Fails with nothing created if either
    /// node is locked.
    pub fn connect_parent_to_child(
        &mut self,
        child: &EntityId,
        parent: &EntityId,
        options: &ConnectOptions,
    ) -> Result<Option<EntityId>> {
        self.unlocked_node(child)?;
        self.unlocked_node(parent)?;
        let in_port = self.ensure_port(child, true)?;
        let out_port = self.ensure_port(parent, false)?;

        if self.link_between(parent, &in_port).is_some() {
            return Ok(None);
        }

        if self.unplaced.contains(child) {
            if let (Some(p), Some(c)) = (self.nodes.get(parent), self.nodes.get(child)) {
                let x = p.position().x + p.size().width + self.config.auto_position.gap;
                let y = p.position().y + (p.size().height - c.size().height) / 2.0;
                self.place(child, Point::new(x, y));
            }
        }

        let mut link = LinkModel::new(options.link_type.clone())
            .between(out_port, in_port)
            .with_curvature(self.config.default_curvature)
            .with_allow_add(options.allow_add)
            .with_dash_pattern(options.dash_pattern.clone());
        if let Some(color) = &options.color {
            link = link.with_color(color.clone());
        }
        let id = self.add_link(link)?;
        tracing::debug!(parent = %parent, child = %child, link = %id, "Connected parent to child");
        Ok(Some(id))
    }

    /// First link entering `in_port` whose source port belongs to `parent`.
    fn link_between(&self, parent: &EntityId, in_port: &EntityId) -> Option<EntityId> {
        let port = self.port(in_port)?;
        port.links()
            .iter()
            .find(|l| {
                self.links
                    .get(l)
                    .and_then(|l| l.source_port())
                    .and_then(|p| self.port_owners.get(p))
                    == Some(parent)
            })
            .cloned()
    }

    /// Connect every parent to `child` and make the incoming links share one
    /// elbow.
    ///
    /// The elbow is the average over parents of the midpoint between the
    /// parent's output port and the child's input port. An empty-anchor
    /// parent's term is shifted right by [`ANCHOR_ELBOW_SHIFT`] per nesting
    /// level of the group it belongs to.
    pub fn connect_multiple_parents_to_child(
        &mut self,
        child: &EntityId,
        parents: &[EntityId],
        options: &ConnectOptions,
    ) -> Result<Vec<EntityId>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }
        self.unlocked_node(child)?;
        for parent in parents {
            self.unlocked_node(parent)?;
        }

        if self.unplaced.contains(child) {
            let parent_nodes: Vec<&NodeModel> =
                parents.iter().filter_map(|p| self.nodes.get(p)).collect();
            if !parent_nodes.is_empty() {
                let right = parent_nodes
                    .iter()
                    .map(|p| p.bounds().max_x)
                    .fold(f64::MIN, f64::max);
                let y = parent_nodes.iter().map(|p| p.position().y).sum::<f64>()
                    / parent_nodes.len() as f64;
                let target = Point::new(right + self.config.auto_position.gap, y);
                self.place(child, target);
            }
        }

        let mut created = Vec::new();
        for parent in parents {
            if let Some(link) = self.connect_parent_to_child(child, parent, options)? {
                created.push(link);
            }
        }

        let in_port = self.ensure_port(child, true)?;
        let Some(child_x) = self.port(&in_port).map(|p| p.position().x) else {
            return Ok(created);
        };
        let mut total = 0.0;
        let mut count = 0usize;
        for parent in parents {
            let Some(node) = self.nodes.get(parent) else {
                continue;
            };
            let Some(out) = node.out_port() else {
                continue;
            };
            let mut term = (out.position().x + child_x) / 2.0;
            if node.type_tag() == kinds::EMPTY_ANCHOR_NODE {
                term += ANCHOR_ELBOW_SHIFT * f64::from(self.group_depth_of(parent));
            }
            total += term;
            count += 1;
        }
        if count > 0 {
            let elbow = total / count as f64;
            for parent in parents {
                if let Some(link) = self.link_between(parent, &in_port) {
                    if let Some(link) = self.links.get_mut(&link) {
                        link.set_elbow_x(Some(elbow));
                    }
                }
            }
            tracing::debug!(child = %child, parents = parents.len(), elbow, "Fan-in elbow computed");
        }
        Ok(created)
    }

    // --- movement ---

    /// Move a node, snapping to the grid when one is set, and drag the
    /// endpoints of every attached link along.
    pub fn set_node_position(&mut self, id: &EntityId, position: Point) -> Result<()> {
        let node = self.nodes.get(id).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Node,
            id: id.clone(),
        })?;
        if node.is_locked() {
            return Err(DiagramError::Locked { id: id.clone() });
        }
        let position = self.snap(position);
        self.place(id, position);
        Ok(())
    }

    fn snap(&self, p: Point) -> Point {
        let grid = self.grid_size;
        if grid > 0.0 {
            Point::new((p.x / grid).round() * grid, (p.y / grid).round() * grid)
        } else {
            p
        }
    }

    fn place(&mut self, id: &EntityId, position: Point) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.set_position(position);
        let links = node.link_ids();
        self.unplaced.shift_remove(id);
        for link in &links {
            self.sync_link_endpoints(link);
        }
    }

    /// Snap a link's end points onto its attached ports.
    pub(crate) fn sync_link_endpoints(&mut self, id: &EntityId) {
        let Some(link) = self.links.get(id) else {
            return;
        };
        let source = link.source_port().and_then(|p| self.port(p)).map(|p| p.position());
        let target = link.target_port().and_then(|p| self.port(p)).map(|p| p.position());
        if let Some(link) = self.links.get_mut(id) {
            if let Some(p) = source {
                link.set_first_point(p);
            }
            if let Some(p) = target {
                link.set_last_point(p);
            }
        }
    }

    // --- spatial queries ---

    /// Resolve a point to the entity under it.
    ///
    /// Exactly one node hit wins, even if links overlap it. With no node hit,
    /// exactly one link hit (by path bounds) wins. Any other count is treated
    /// as no selection.
    pub fn find_entity_at_position(&self, point: Point) -> Option<EntityRef> {
        let mut node_hits = self.nodes.iter().filter(|n| n.bounds().contains(point));
        match (node_hits.next(), node_hits.next()) {
            (Some(node), None) => return Some(EntityRef::Node(node.id().clone())),
            (Some(_), Some(_)) => return None,
            (None, _) => {}
        }

        let mut link_hits = self.links.iter().filter(|l| {
            self.link_path(l.id())
                .is_some_and(|path| path.bounds().contains(point))
        });
        match (link_hits.next(), link_hits.next()) {
            (Some(link), None) => Some(EntityRef::Link(link.id().clone())),
            _ => None,
        }
    }

    /// Select the entity under `point`, clearing every other selection first.
    pub fn highlight_entity_at_position(&mut self, point: Point) -> Option<EntityRef> {
        self.clear_selection();
        let hit = self.find_entity_at_position(point)?;
        match &hit {
            EntityRef::Node(id) => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.set_selected(true);
                }
            }
            EntityRef::Link(id) => {
                if let Some(link) = self.links.get_mut(id) {
                    link.set_selected(true);
                }
            }
        }
        Some(hit)
    }

    pub fn clear_selection(&mut self) {
        for node in self.nodes.iter_mut() {
            node.set_selected(false);
        }
        for link in self.links.iter_mut() {
            link.set_selected(false);
        }
    }

    pub fn selected(&self) -> Vec<EntityRef> {
        let nodes = self
            .nodes
            .iter()
            .filter(|n| n.is_selected())
            .map(|n| EntityRef::Node(n.id().clone()));
        let links = self
            .links
            .iter()
            .filter(|l| l.is_selected())
            .map(|l| EntityRef::Link(l.id().clone()));
        nodes.chain(links).collect()
    }

    // --- canvas ---

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.offset = Point::new(x, y);
        self.fire_event(DiagramEvent::OffsetUpdated { x, y });
    }

    /// Zoom level in percent.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if !(zoom.is_finite() && zoom > 0.0) {
            tracing::warn!(zoom, "Ignoring non-positive zoom level");
            return;
        }
        self.zoom = zoom;
        self.fire_event(DiagramEvent::ZoomUpdated { zoom });
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn set_grid_size(&mut self, size: f64) {
        self.grid_size = size.max(0.0);
        self.fire_event(DiagramEvent::GridUpdated {
            size: self.grid_size,
        });
    }
}

impl Entity for DiagramModel {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn category(&self) -> EntityCategory {
        EntityCategory::Diagram
    }
}
