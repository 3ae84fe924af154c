//! Structural layers: the model's authoritative node and link containers.

use indexmap::IndexMap;
use pipestudio_types::{DiagramError, EntityCategory, EntityId, Result};

use crate::entity::{Entity, EntityBase};

pub const STRUCTURAL_LAYER: &str = "structural";

/// An ordered, id-keyed collection of entities of one kind.
#[derive(Debug)]
pub struct LayerModel<T> {
    base: EntityBase,
    name: String,
    items: IndexMap<EntityId, T>,
}

impl<T: Entity> LayerModel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: EntityBase::new(EntityId::generate(), STRUCTURAL_LAYER),
            name: name.into(),
            items: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert(&mut self, item: T) -> Result<&mut T> {
        let id = item.id().clone();
        if self.items.contains_key(&id) {
            return Err(DiagramError::DuplicateId {
                category: item.category(),
                id,
            });
        }
        let entry = self.items.entry(id).or_insert(item);
        Ok(entry)
    }

    /// Remove by id, preserving the order of the remaining items.
    pub fn take(&mut self, id: &EntityId) -> Option<T> {
        self.items.shift_remove(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut T> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.items.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.items.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.values_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Entity for LayerModel<T> {
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
