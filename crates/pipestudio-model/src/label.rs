//! Text labels carried by links.

use pipestudio_geometry::Point;
use pipestudio_types::{EntityCategory, EntityId};

use crate::entity::{Entity, EntityBase};

pub const DEFAULT_LABEL: &str = "default";

/// Free-form text attached to a link.
#[derive(Debug)]
pub struct LabelModel {
    base: EntityBase,
    text: String,
    /// Offset from the link midpoint.
    offset: Point,
}

impl LabelModel {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), DEFAULT_LABEL, text)
    }

    pub fn with_id(id: EntityId, type_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            base: EntityBase::new(id, type_tag),
            text: text.into(),
            offset: Point::default(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Point) {
        self.offset = offset;
    }
}

impl Entity for LabelModel {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn category(&self) -> EntityCategory {
        EntityCategory::Label
    }
}
