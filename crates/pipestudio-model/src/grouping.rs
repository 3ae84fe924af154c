//! Grouping layers: visual bounds around a contiguous run of nodes.
//!
//! A grouping layer never owns nodes. Its membership is an index of node ids
//! into the diagram's structural node layer, kept in sync through an
//! `entityRemoved` listener registered on every member.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use pipestudio_geometry::{Point, Rect, Size};
use pipestudio_types::{DiagramError, EntityCategory, EntityId, Result};

use crate::entity::{Entity, EntityBase};
use crate::events::{DiagramEvent, EventKind, ListenerHandle};
use crate::layer::LayerModel;
use crate::node::{kinds, NodeModel};

pub const GROUPING_LAYER: &str = "grouping";

/// Extra space above the topmost member per nesting level, for the header.
pub const GROUP_HEADER_PADDING: f64 = 40.0;
/// Extra total height per nesting level.
pub const GROUP_HEIGHT_PADDING: f64 = 150.0;

pub const ANCHOR_SIZE: Size = Size::new(10.0, 10.0);

/// Node ids starting with this prefix are reserved for group anchors.
pub const ANCHOR_ID_PREFIX: &str = "anchor:";

/// Start and end anchor ids of the group `group_id`.
pub fn anchor_ids(group_id: &str) -> (EntityId, EntityId) {
    (
        EntityId::new(format!("{ANCHOR_ID_PREFIX}{group_id}:start")),
        EntityId::new(format!("{ANCHOR_ID_PREFIX}{group_id}:end")),
    )
}

pub fn is_anchor_id(id: &EntityId) -> bool {
    id.as_str().starts_with(ANCHOR_ID_PREFIX)
}

type Membership = Rc<RefCell<IndexMap<EntityId, ListenerHandle>>>;

#[derive(Debug)]
pub struct GroupingLayer {
    base: EntityBase,
    label: String,
    depth: u32,
    group_id: String,
    collapsed: bool,
    start_anchor: EntityId,
    end_anchor: EntityId,
    /// Anchor nodes not yet handed to a diagram.
    pending_anchors: Vec<NodeModel>,
    members: Membership,
}

impl GroupingLayer {
    /// Create a layer for `group_id` together with its start and end anchor
    /// nodes. The anchors join the diagram when the layer is first used.
    pub fn new(label: impl Into<String>, depth: u32, group_id: impl Into<String>) -> Self {
        let group_id = group_id.into();
        let (start_anchor, end_anchor) = anchor_ids(&group_id);
        let pending_anchors = vec![
            NodeModel::new(kinds::EMPTY_ANCHOR_NODE, start_anchor.clone(), "").with_size(ANCHOR_SIZE),
            NodeModel::new(kinds::EMPTY_ANCHOR_NODE, end_anchor.clone(), "").with_size(ANCHOR_SIZE),
        ];
        Self {
            base: EntityBase::new(EntityId::new(group_id.clone()), GROUPING_LAYER),
            label: label.into(),
            depth,
            group_id,
            collapsed: false,
            start_anchor,
            end_anchor,
            pending_anchors,
            members: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    /// Layer restored from a saved document, whose anchors already exist as
    /// ordinary node records.
    pub fn restored(
        label: impl Into<String>,
        depth: u32,
        group_id: impl Into<String>,
        collapsed: bool,
    ) -> Self {
        let mut layer = Self::new(label, depth, group_id);
        layer.pending_anchors.clear();
        layer.collapsed = collapsed;
        layer
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Nesting depth only affects the rendered extent, never connectivity.
    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    pub fn start_anchor(&self) -> &EntityId {
        &self.start_anchor
    }

    pub fn end_anchor(&self) -> &EntityId {
        &self.end_anchor
    }

    pub(crate) fn take_pending_anchors(&mut self) -> Vec<NodeModel> {
        std::mem::take(&mut self.pending_anchors)
    }

    // --- collapse ---

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        if self.collapsed == collapsed {
            return;
        }
        self.collapsed = collapsed;
        let layer = self.id().clone();
        self.fire_event(DiagramEvent::GroupToggled { layer, collapsed });
    }

    pub fn toggle(&mut self) -> bool {
        self.set_collapsed(!self.collapsed);
        self.collapsed
    }

    // --- membership ---

    /// Record `entity` as a member. Only nodes are accepted, and a locked
    /// layer accepts nothing.
    ///
    /// The node gets an `entityRemoved` listener that drops it from this
    /// layer, so membership never outlives the node.
    pub fn add_model(&mut self, entity: &mut dyn Entity) -> Result<()> {
        if self.is_locked() {
            return Err(DiagramError::Locked { id: self.id().clone() });
        }
        let category = entity.category();
        let id = entity.id().clone();
        let Some(node) = entity.as_node_mut() else {
            return Err(DiagramError::InvalidLayerMember { id, category });
        };
        if self.members.borrow().contains_key(&id) {
            return Ok(());
        }

        let members: Weak<_> = Rc::downgrade(&self.members);
        let member_id = id.clone();
        let handle = node.add_listener(EventKind::EntityRemoved, move |_| {
            if let Some(members) = members.upgrade() {
                members.borrow_mut().shift_remove(&member_id);
            }
        });
        self.members.borrow_mut().insert(id.clone(), handle);
        tracing::debug!(layer = %self.group_id, node = %id, "Node joined grouping layer");
        Ok(())
    }

    /// Drop `node` from the layer and release the listener registered on it.
    pub fn remove_model(&mut self, node: &mut NodeModel) -> bool {
        let handle = self.members.borrow_mut().shift_remove(node.id());
        match handle {
            Some(handle) => {
                node.remove_listener(handle);
                true
            }
            None => false,
        }
    }

    /// Release every membership listener. Used when the layer leaves the
    /// diagram.
    pub fn detach(&mut self, nodes: &mut LayerModel<NodeModel>) {
        let drained: Vec<(EntityId, ListenerHandle)> = self.members.borrow_mut().drain(..).collect();
        for (id, handle) in drained {
            if let Some(node) = nodes.get_mut(&id) {
                node.remove_listener(handle);
            }
        }
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.members.borrow().contains_key(id)
    }

    pub fn member_ids(&self) -> Vec<EntityId> {
        self.members.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- geometry ---

    /// Bounds derived from member node positions, padded by nesting depth.
    /// `None` when no member is present in `nodes`.
    pub fn bounds(&self, nodes: &LayerModel<NodeModel>) -> Option<Rect> {
        let members = self.members.borrow();
        let extent = Rect::from_points(
            members
                .keys()
                .filter_map(|id| nodes.get(id))
                .map(|n| n.position()),
        )?;
        let depth = f64::from(self.depth);
        Some(Rect::from_origin_size(
            Point::new(extent.min_x, extent.min_y - GROUP_HEADER_PADDING * depth),
            Size::new(
                extent.width(),
                extent.height() + GROUP_HEIGHT_PADDING * depth,
            ),
        ))
    }
}

impl Entity for GroupingLayer {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn category(&self) -> EntityCategory {
        EntityCategory::Layer
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::label::LabelModel;

    fn nodes() -> LayerModel<NodeModel> {
        let mut layer = LayerModel::new("nodes");
        for (id, x, y) in [("a", 100.0, 50.0), ("b", 300.0, 120.0)] {
            layer
                .insert(NodeModel::new(kinds::DEFAULT_NODE, id.into(), id).with_position(Point::new(x, y)))
                .unwrap();
        }
        layer
    }

    fn group_with_members(nodes: &mut LayerModel<NodeModel>, depth: u32) -> GroupingLayer {
        let mut group = GroupingLayer::new("Deploy", depth, "deploy");
        for id in ["a", "b"] {
            group.add_model(nodes.get_mut(&id.into()).unwrap()).unwrap();
        }
        group
    }

    #[test]
    fn construction_creates_two_anchors() {
        let mut group = GroupingLayer::new("Deploy", 1, "deploy");
        assert_eq!(group.start_anchor().as_str(), "anchor:deploy:start");
        assert_eq!(group.end_anchor().as_str(), "anchor:deploy:end");
        assert!(is_anchor_id(group.start_anchor()));
        assert!(!is_anchor_id(&"deploy-start".into()));

        let anchors = group.take_pending_anchors();
        assert_eq!(anchors.len(), 2);
        assert!(anchors.iter().all(|a| a.type_tag() == kinds::EMPTY_ANCHOR_NODE));
        assert!(group.take_pending_anchors().is_empty());
    }

    #[test]
    fn non_nodes_are_rejected() {
        let mut group = GroupingLayer::new("Deploy", 1, "deploy");
        let mut label = LabelModel::new("not a node");
        let err = group.add_model(&mut label).unwrap_err();
        assert!(matches!(
            err,
            DiagramError::InvalidLayerMember {
                category: EntityCategory::Label,
                ..
            }
        ));
        assert!(group.is_empty());
    }

    #[test]
    fn removed_node_leaves_membership() {
        let mut nodes = nodes();
        let group = group_with_members(&mut nodes, 1);
        assert_eq!(group.len(), 2);

        nodes.get_mut(&"a".into()).unwrap().remove();
        assert_eq!(group.member_ids(), vec![EntityId::from("b")]);
    }

    #[test]
    fn remove_model_releases_listener() {
        let mut nodes = nodes();
        let mut group = group_with_members(&mut nodes, 1);
        let node = nodes.get_mut(&"a".into()).unwrap();
        assert_eq!(node.base().listeners().len(), 1);

        assert!(group.remove_model(node));
        assert!(node.base().listeners().is_empty());
        assert!(!group.remove_model(node));
    }

    #[test]
    fn detach_releases_every_listener() {
        let mut nodes = nodes();
        let mut group = group_with_members(&mut nodes, 1);
        group.detach(&mut nodes);
        assert!(group.is_empty());
        assert!(nodes.iter().all(|n| n.base().listeners().is_empty()));
    }

    #[test]
    fn bounds_pad_by_depth() {
        let mut nodes = nodes();
        let group = group_with_members(&mut nodes, 1);
        let b = group.bounds(&nodes).unwrap();
        assert_approx_eq!(f64, b.min_x, 100.0);
        assert_approx_eq!(f64, b.min_y, 10.0);
        assert_approx_eq!(f64, b.width(), 200.0);
        assert_approx_eq!(f64, b.height(), 220.0);
    }

    #[test]
    fn deeper_nesting_grows_padding_and_height() {
        let mut nodes = nodes();
        let mut group = group_with_members(&mut nodes, 1);
        let shallow = group.bounds(&nodes).unwrap();
        group.set_depth(2);
        let deep = group.bounds(&nodes).unwrap();

        assert!(deep.min_y < shallow.min_y);
        assert!(deep.height() > shallow.height());
        assert_eq!(nodes.get(&"a".into()).unwrap().position(), Point::new(100.0, 50.0));
    }

    #[test]
    fn empty_group_has_no_bounds() {
        let group = GroupingLayer::new("Empty", 1, "empty");
        assert!(group.bounds(&nodes()).is_none());
    }

    #[test]
    fn toggle_fires_group_toggled() {
        let mut group = GroupingLayer::new("Deploy", 1, "deploy");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        group.add_listener(EventKind::GroupToggled, move |e| s.borrow_mut().push(e.clone()));

        assert!(group.toggle());
        group.set_collapsed(true);
        assert!(!group.toggle());

        assert_eq!(seen.borrow().len(), 2);
    }
}
