//! Renderer-agnostic view descriptions produced by the factory registry.
//!
//! Views say what to draw and where; how to paint it is up to the renderer.

use indexmap::IndexMap;
use pipestudio_geometry::{Point, PortAlignment, Rect};
use pipestudio_model::{DiagramModel, Entity, LinkModel, NodeModel};
use pipestudio_types::EntityId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeShape {
    Rectangle,
    Circle,
    Diamond,
    Placeholder,
    /// Not drawn; only links attach to it.
    Anchor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortView {
    pub id: EntityId,
    pub name: String,
    pub position: Point,
    pub alignment: PortAlignment,
    pub is_in: bool,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: EntityId,
    pub kind: String,
    pub shape: NodeShape,
    pub bounds: Rect,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub style: IndexMap<String, String>,
    pub selected: bool,
    pub locked: bool,
    pub allow_add: bool,
    pub ports: Vec<PortView>,
}

impl NodeView {
    /// View with every structural field taken from `node`.
    pub fn from_node(node: &NodeModel, shape: NodeShape) -> Self {
        Self {
            id: node.id().clone(),
            kind: node.type_tag().to_string(),
            shape,
            bounds: node.bounds(),
            name: node.name().to_string(),
            icon: node.icon().map(str::to_string),
            secondary_icon: node.secondary_icon().map(str::to_string),
            border_color: None,
            style: node.custom_style().clone(),
            selected: node.is_selected(),
            locked: node.is_locked(),
            allow_add: node.allow_add(),
            ports: node
                .ports()
                .map(|p| PortView {
                    id: p.id().clone(),
                    name: p.name().to_string(),
                    position: p.position(),
                    alignment: p.alignment(),
                    is_in: p.is_in(),
                    connected: !p.links().is_empty(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelView {
    pub text: String,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    pub id: EntityId,
    pub kind: String,
    /// SVG path data.
    pub path: String,
    pub stroke: String,
    pub width: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_pattern: Option<String>,
    pub selected: bool,
    pub dangling: bool,
    /// Waypoint handles, end points excluded.
    pub waypoints: Vec<Point>,
    /// Position of the "add" control, for links that allow insertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_control: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelView>,
}

impl LinkView {
    /// `None` when the link has no drawable path.
    pub fn from_link(link: &LinkModel, diagram: &DiagramModel) -> Option<Self> {
        let path = diagram.link_path(link.id())?;
        let midpoint = path.midpoint();
        let positions = link.positions();
        Some(Self {
            id: link.id().clone(),
            kind: link.type_tag().to_string(),
            path: path.to_path_data(),
            stroke: link.stroke_color().to_string(),
            width: link.width(),
            dash_pattern: link.dash_pattern().map(str::to_string),
            selected: link.is_selected(),
            dangling: link.is_dangling(),
            waypoints: positions[1..positions.len() - 1].to_vec(),
            add_control: link.allow_add().then_some(midpoint),
            label: link.label().map(|l| LabelView {
                text: l.text().to_string(),
                position: midpoint + l.offset(),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: EntityId,
    pub label: String,
    pub depth: u32,
    pub collapsed: bool,
    pub bounds: Rect,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramView {
    pub offset: Point,
    pub zoom: f64,
    pub grid_size: f64,
    pub groups: Vec<GroupView>,
    pub links: Vec<LinkView>,
    pub nodes: Vec<NodeView>,
}

impl DiagramView {
    pub fn node(&self, id: &EntityId) -> Option<&NodeView> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn link(&self, id: &EntityId) -> Option<&LinkView> {
        self.links.iter().find(|l| &l.id == id)
    }
}
