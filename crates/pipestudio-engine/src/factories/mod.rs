//! Built-in node, link, port, and label kinds.

pub mod nodes;

pub use nodes::{
    CreateNewNodeFactory, DefaultNodeFactory, DiamondNodeFactory, EmptyAnchorNodeFactory,
    StartNodeFactory, BORDER_COLOR_PROP,
};

use pipestudio_model::label::DEFAULT_LABEL;
use pipestudio_model::link::DEFAULT_LINK;
use pipestudio_model::port::DEFAULT_PORT;
use pipestudio_model::{LabelModel, LinkModel, PortModel};
use pipestudio_types::{EntityId, Result};

use crate::registry::{Factory, LabelFactory, LinkFactory, PortFactory};

/// Plain curved link. Its curvature comes from the engine configuration.
pub struct DefaultLinkFactory {
    curvature: f64,
}

impl DefaultLinkFactory {
    pub fn new(curvature: f64) -> Self {
        Self { curvature }
    }
}

impl Factory for DefaultLinkFactory {
    fn type_tag(&self) -> &str {
        DEFAULT_LINK
    }
}

impl LinkFactory for DefaultLinkFactory {
    fn generate_model(&self, id: EntityId) -> Result<LinkModel> {
        Ok(LinkModel::with_id(id, DEFAULT_LINK).with_curvature(self.curvature))
    }
}

pub struct DefaultPortFactory;

impl Factory for DefaultPortFactory {
    fn type_tag(&self) -> &str {
        DEFAULT_PORT
    }
}

impl PortFactory for DefaultPortFactory {
    fn generate_model(&self, id: EntityId, name: &str, is_in: bool) -> Result<PortModel> {
        Ok(PortModel::with_id(id, DEFAULT_PORT, name, is_in))
    }
}

pub struct DefaultLabelFactory;

impl Factory for DefaultLabelFactory {
    fn type_tag(&self) -> &str {
        DEFAULT_LABEL
    }
}

impl LabelFactory for DefaultLabelFactory {
    fn generate_model(&self, id: EntityId, text: &str) -> Result<LabelModel> {
        Ok(LabelModel::with_id(id, DEFAULT_LABEL, text))
    }
}
