//! Serialized records and whole-diagram documents.
//!
//! Every entity serializes to a structurally-typed record carrying its type
//! tag and id. A [`RecordCodec`] converts between live entities and records;
//! the provided methods handle the structural fields, and an engine can
//! override them to dispatch on the type tag.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use pipestudio_geometry::{Point, PortAlignment, Size};
use pipestudio_types::{DiagramError, EngineConfig, EntityId, Result};
use serde::{Deserialize, Serialize};

use crate::diagram::DiagramModel;
use crate::entity::Entity;
use crate::grouping::GroupingLayer;
use crate::label::LabelModel;
use crate::link::{LinkModel, LinkPoint};
use crate::node::NodeModel;
use crate::port::PortModel;

/// Schema version written into every document.
pub const DOCUMENT_VERSION: u32 = 1;

fn is_false(b: &bool) -> bool {
    !*b
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRecord {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub id: EntityId,
    pub name: String,
    pub alignment: PortAlignment,
    /// Links attached when the document was written.
    #[serde(default)]
    pub links: Vec<EntityId>,
}

impl PortRecord {
    pub fn from_port(port: &PortModel) -> Self {
        Self {
            type_tag: port.type_tag().to_string(),
            id: port.id().clone(),
            name: port.name().to_string(),
            alignment: port.alignment(),
            links: port.links().iter().cloned().collect(),
        }
    }

    /// Direction comes from the node's port id lists, not from the record.
    pub fn into_port(self, is_in: bool) -> PortModel {
        PortModel::with_id(self.id, self.type_tag, self.name, is_in).with_alignment(self.alignment)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub id: EntityId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_icon: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub custom_style: IndexMap<String, String>,
    #[serde(default)]
    pub allow_add: bool,
    #[serde(default = "default_true")]
    pub can_delete: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    /// The node's port table.
    #[serde(default)]
    pub ports: Vec<PortRecord>,
    /// Ordered input port ids, resolved through `ports`.
    #[serde(default)]
    pub in_ports: Vec<EntityId>,
    /// Ordered output port ids, resolved through `ports`.
    #[serde(default)]
    pub out_ports: Vec<EntityId>,
    /// Kind-specific fields.
    #[serde(flatten)]
    pub props: serde_json::Map<String, serde_json::Value>,
}

impl NodeRecord {
    pub fn from_node(node: &NodeModel, codec: &(impl RecordCodec + ?Sized)) -> Result<Self> {
        let ports = node
            .ports()
            .map(|p| codec.encode_port(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            type_tag: node.type_tag().to_string(),
            id: node.id().clone(),
            name: node.name().to_string(),
            x: node.position().x,
            y: node.position().y,
            width: node.size().width,
            height: node.size().height,
            icon: node.icon().map(str::to_string),
            secondary_icon: node.secondary_icon().map(str::to_string),
            custom_style: node.custom_style().clone(),
            allow_add: node.allow_add(),
            can_delete: node.can_delete(),
            locked: node.is_locked(),
            ports,
            in_ports: node.input_port_ids().to_vec(),
            out_ports: node.output_port_ids().to_vec(),
            props: node.props().clone(),
        })
    }

    /// Rebuild the node. Port id lists are resolved through the record's own
    /// port table, so the ports keep their ids and connected links still
    /// resolve to them.
    pub fn into_node(self, codec: &(impl RecordCodec + ?Sized)) -> Result<NodeModel> {
        let mut table: IndexMap<EntityId, PortRecord> =
            self.ports.into_iter().map(|p| (p.id.clone(), p)).collect();
        let mut node = NodeModel::new(self.type_tag, self.id.clone(), self.name)
            .with_position(Point::new(self.x, self.y))
            .with_size(Size::new(self.width, self.height))
            .with_icon(self.icon)
            .with_secondary_icon(self.secondary_icon)
            .with_custom_style(self.custom_style)
            .with_allow_add(self.allow_add)
            .with_can_delete(self.can_delete);
        *node.props_mut() = self.props;

        for (ids, is_in) in [(&self.in_ports, true), (&self.out_ports, false)] {
            for id in ids {
                let record = table.shift_remove(id).ok_or_else(|| DiagramError::UnresolvedReference {
                    from: self.id.clone(),
                    to: id.clone(),
                })?;
                node.add_port(codec.decode_port(record, is_in)?)?;
            }
        }
        if let Some(orphan) = table.keys().next() {
            return Err(DiagramError::Validation(format!(
                "port '{orphan}' of node '{}' is in neither port list",
                self.id
            )));
        }
        if self.locked {
            node.set_locked(true);
        }
        Ok(node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRecord {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub id: EntityId,
    pub text: String,
    #[serde(default)]
    pub offset: Point,
}

impl LabelRecord {
    pub fn from_label(label: &LabelModel) -> Self {
        Self {
            type_tag: label.type_tag().to_string(),
            id: label.id().clone(),
            text: label.text().to_string(),
            offset: label.offset(),
        }
    }

    pub fn into_label(self) -> LabelModel {
        let mut label = LabelModel::with_id(self.id, self.type_tag, self.text);
        label.set_offset(self.offset);
        label
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub id: EntityId,
    #[serde(default)]
    pub source_port: Option<EntityId>,
    #[serde(default)]
    pub target_port: Option<EntityId>,
    pub points: Vec<PointRecord>,
    pub color: String,
    pub selected_color: String,
    pub width: f64,
    pub curvature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_pattern: Option<String>,
    #[serde(default)]
    pub allow_add: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elbow_x: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelRecord>,
}

impl LinkRecord {
    pub fn from_link(link: &LinkModel, codec: &(impl RecordCodec + ?Sized)) -> Result<Self> {
        Ok(Self {
            type_tag: link.type_tag().to_string(),
            id: link.id().clone(),
            source_port: link.source_port().cloned(),
            target_port: link.target_port().cloned(),
            points: link
                .points()
                .iter()
                .map(|p| PointRecord {
                    id: p.id.clone(),
                    x: p.position.x,
                    y: p.position.y,
                })
                .collect(),
            color: link.color().to_string(),
            selected_color: link.selected_color().to_string(),
            width: link.width(),
            curvature: link.curvature(),
            dash_pattern: link.dash_pattern().map(str::to_string),
            allow_add: link.allow_add(),
            elbow_x: link.elbow_x(),
            locked: link.is_locked(),
            label: link.label().map(|l| codec.encode_label(l)).transpose()?,
        })
    }

    pub fn into_link(self, codec: &(impl RecordCodec + ?Sized)) -> Result<LinkModel> {
        let points = self
            .points
            .into_iter()
            .map(|p| LinkPoint {
                id: p.id,
                position: Point::new(p.x, p.y),
            })
            .collect();
        let mut link = LinkModel::with_id(self.id, self.type_tag)
            .with_points(points)
            .with_color(self.color)
            .with_selected_color(self.selected_color)
            .with_width(self.width)
            .with_curvature(self.curvature)
            .with_dash_pattern(self.dash_pattern)
            .with_allow_add(self.allow_add);
        link.set_source(self.source_port);
        link.set_target(self.target_port);
        link.set_elbow_x(self.elbow_x);
        if let Some(label) = self.label {
            link.set_label(codec.decode_label(label)?)?;
        }
        if self.locked {
            link.set_locked(true);
        }
        Ok(link)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: EntityId,
    pub label: String,
    pub depth: u32,
    #[serde(default)]
    pub collapsed: bool,
    pub members: Vec<EntityId>,
}

impl GroupRecord {
    pub fn from_layer(layer: &GroupingLayer) -> Self {
        Self {
            id: layer.id().clone(),
            label: layer.label().to_string(),
            depth: layer.depth(),
            collapsed: layer.is_collapsed(),
            members: layer.member_ids(),
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Converts entities to and from records.
pub trait RecordCodec {
    fn encode_node(&self, node: &NodeModel) -> Result<NodeRecord> {
        NodeRecord::from_node(node, self)
    }

    fn decode_node(&self, record: NodeRecord) -> Result<NodeModel> {
        record.into_node(self)
    }

    fn encode_port(&self, port: &PortModel) -> Result<PortRecord> {
        Ok(PortRecord::from_port(port))
    }

    fn decode_port(&self, record: PortRecord, is_in: bool) -> Result<PortModel> {
        Ok(record.into_port(is_in))
    }

    fn encode_link(&self, link: &LinkModel) -> Result<LinkRecord> {
        LinkRecord::from_link(link, self)
    }

    fn decode_link(&self, record: LinkRecord) -> Result<LinkModel> {
        record.into_link(self)
    }

    fn encode_label(&self, label: &LabelModel) -> Result<LabelRecord> {
        Ok(LabelRecord::from_label(label))
    }

    fn decode_label(&self, record: LabelRecord) -> Result<LabelModel> {
        Ok(record.into_label())
    }
}

/// Codec using only the structural fields; kind-specific state rides along
/// in `props` untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralCodec;

impl RecordCodec for StructuralCodec {}

// ---------------------------------------------------------------------------
// DiagramDocument
// ---------------------------------------------------------------------------

/// A whole diagram as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDocument {
    pub version: u32,
    pub id: EntityId,
    #[serde(default)]
    pub offset: Point,
    pub zoom: f64,
    #[serde(default)]
    pub grid_size: f64,
    /// RFC 3339 timestamp of when the document was produced.
    pub saved_at: String,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

impl DiagramDocument {
    /// Write the document as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), nodes = self.nodes.len(), links = self.links.len(), "Diagram saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let document = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), "Diagram loaded");
        Ok(document)
    }

    /// Parse a document, refusing versions newer than this build writes.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        if document.version > DOCUMENT_VERSION {
            return Err(DiagramError::Validation(format!(
                "document version {} is newer than supported version {DOCUMENT_VERSION}",
                document.version
            )));
        }
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Serialize `model` with the structural codec.
pub fn serialize(model: &DiagramModel) -> Result<DiagramDocument> {
    serialize_with(model, &StructuralCodec)
}

pub fn serialize_with(model: &DiagramModel, codec: &(impl RecordCodec + ?Sized)) -> Result<DiagramDocument> {
    Ok(DiagramDocument {
        version: DOCUMENT_VERSION,
        id: model.id().clone(),
        offset: model.offset(),
        zoom: model.zoom(),
        grid_size: model.grid_size(),
        saved_at: chrono::Utc::now().to_rfc3339(),
        nodes: model
            .nodes()
            .map(|n| codec.encode_node(n))
            .collect::<Result<_>>()?,
        links: model
            .links()
            .map(|l| codec.encode_link(l))
            .collect::<Result<_>>()?,
        groups: model.grouping_layers().map(GroupRecord::from_layer).collect(),
    })
}

/// Rebuild a model with the structural codec.
pub fn from_document(document: DiagramDocument, config: EngineConfig) -> Result<DiagramModel> {
    from_document_with(document, config, &StructuralCodec)
}

/// Rebuild a model: nodes first, then links (which must resolve to ports in
/// the node records), then grouping layers. Positions are taken as saved.
pub fn from_document_with(
    document: DiagramDocument,
    config: EngineConfig,
    codec: &(impl RecordCodec + ?Sized),
) -> Result<DiagramModel> {
    let mut model = DiagramModel::with_id(document.id, config);
    for record in document.nodes {
        let node = codec.decode_node(record)?;
        model.insert_node(node, false)?;
    }
    for record in document.links {
        let link = codec.decode_link(record)?;
        model.add_link(link)?;
    }
    for record in document.groups {
        let layer = GroupingLayer::restored(record.label, record.depth, record.id.as_str(), record.collapsed);
        let id = model.use_grouping_layer(layer)?;
        model.use_structural_layer();
        let members: IndexSet<EntityId> = record.members.into_iter().collect();
        for member in &members {
            model.add_to_grouping_layer(&id, member)?;
        }
    }
    model.set_offset(document.offset.x, document.offset.y);
    model.set_zoom(document.zoom);
    model.set_grid_size(document.grid_size);
    tracing::info!(
        nodes = model.node_count(),
        links = model.link_count(),
        "Diagram restored from document"
    );
    Ok(model)
}
