//! Factory traits and the per-category factory registry.
//!
//! Every entity category (node, link, port, label) has its own
//! [`FactoryBank`] mapping a type tag to a factory. A factory knows how to
//! build the model for its tag, how to describe it to a renderer, and how to
//! convert it to and from its serialized record.

use indexmap::IndexMap;
use pipestudio_geometry::{Point, Size};
use pipestudio_model::{
    DiagramModel, LabelModel, LabelRecord, LinkModel, LinkRecord, NodeModel, NodeRecord, PortModel,
    PortRecord, RecordCodec,
};
use pipestudio_types::{DiagramError, EntityCategory, EntityId, Result};
use serde::{Deserialize, Serialize};

use crate::views::{LinkView, NodeView};

// ---------------------------------------------------------------------------
// Factory traits
// ---------------------------------------------------------------------------

/// The type tag a factory is registered under.
pub trait Factory {
    fn type_tag(&self) -> &str;
}

/// Options a caller hands to a node factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeOptions {
    pub name: String,
    pub icon: Option<String>,
    pub secondary_icon: Option<String>,
    /// `None` leaves the node for auto-positioning.
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub allow_add: bool,
    pub can_delete: bool,
    pub show_in_port: bool,
    pub show_out_port: bool,
    pub custom_style: IndexMap<String, String>,
    /// Start nodes only.
    pub border_color: Option<String>,
    /// Kind-specific extras copied into the node's props.
    pub props: serde_json::Map<String, serde_json::Value>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            icon: None,
            secondary_icon: None,
            position: None,
            size: None,
            allow_add: false,
            can_delete: true,
            show_in_port: true,
            show_out_port: true,
            custom_style: IndexMap::new(),
            border_color: None,
            props: serde_json::Map::new(),
        }
    }
}

impl NodeOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub trait NodeFactory: Factory {
    fn generate_model(&self, id: EntityId, options: &NodeOptions) -> Result<NodeModel>;

    fn generate_view(&self, node: &NodeModel, diagram: &DiagramModel) -> NodeView;

    fn serialize(&self, node: &NodeModel, codec: &dyn RecordCodec) -> Result<NodeRecord> {
        NodeRecord::from_node(node, codec)
    }

    fn deserialize(&self, record: NodeRecord, codec: &dyn RecordCodec) -> Result<NodeModel> {
        record.into_node(codec)
    }
}

pub trait LinkFactory: Factory {
    fn generate_model(&self, id: EntityId) -> Result<LinkModel>;

    /// `None` suppresses rendering, e.g. for degenerate geometry.
    fn generate_view(&self, link: &LinkModel, diagram: &DiagramModel) -> Option<LinkView> {
        LinkView::from_link(link, diagram)
    }

    fn serialize(&self, link: &LinkModel, codec: &dyn RecordCodec) -> Result<LinkRecord> {
        LinkRecord::from_link(link, codec)
    }

    fn deserialize(&self, record: LinkRecord, codec: &dyn RecordCodec) -> Result<LinkModel> {
        record.into_link(codec)
    }
}

pub trait PortFactory: Factory {
    fn generate_model(&self, id: EntityId, name: &str, is_in: bool) -> Result<PortModel>;

    fn serialize(&self, port: &PortModel) -> Result<PortRecord> {
        Ok(PortRecord::from_port(port))
    }

    fn deserialize(&self, record: PortRecord, is_in: bool) -> Result<PortModel> {
        Ok(record.into_port(is_in))
    }
}

pub trait LabelFactory: Factory {
    fn generate_model(&self, id: EntityId, text: &str) -> Result<LabelModel>;

    fn serialize(&self, label: &LabelModel) -> Result<LabelRecord> {
        Ok(LabelRecord::from_label(label))
    }

    fn deserialize(&self, record: LabelRecord) -> Result<LabelModel> {
        Ok(record.into_label())
    }
}

// ---------------------------------------------------------------------------
// FactoryBank
// ---------------------------------------------------------------------------

/// Type tag -> factory table for one entity category.
pub struct FactoryBank<F: ?Sized> {
    category: EntityCategory,
    factories: IndexMap<String, Box<F>>,
}

impl<F: Factory + ?Sized> FactoryBank<F> {
    pub fn new(category: EntityCategory) -> Self {
        Self {
            category,
            factories: IndexMap::new(),
        }
    }

    /// Register a factory under its type tag. A later registration for the
    /// same tag replaces the earlier one.
    pub fn register(&mut self, factory: Box<F>) {
        let tag = factory.type_tag().to_string();
        if self.factories.insert(tag.clone(), factory).is_some() {
            tracing::debug!(category = %self.category, type_tag = %tag, "Factory overridden");
        } else {
            tracing::debug!(category = %self.category, type_tag = %tag, "Factory registered");
        }
    }

    /// Look up the factory for `type_tag`. Unknown tags are a configuration
    /// error; there is no fallback to a default kind.
    pub fn get(&self, type_tag: &str) -> Result<&F> {
        self.factories
            .get(type_tag)
            .map(Box::as_ref)
            .ok_or_else(|| DiagramError::FactoryNotFound {
                category: self.category,
                type_tag: type_tag.to_string(),
            })
    }

    pub fn has(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }

    pub fn type_tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
