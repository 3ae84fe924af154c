//! Base state and behaviour shared by every graph entity.

use pipestudio_types::{EntityCategory, EntityId};

use crate::events::{DiagramEvent, EventKind, ListenerHandle, ListenerRegistry};
use crate::node::NodeModel;

/// Identity, type tag, flags, and listeners common to nodes, ports, links,
/// labels, and layers.
#[derive(Debug)]
pub struct EntityBase {
    id: EntityId,
    type_tag: String,
    locked: bool,
    selected: bool,
    removed: bool,
    listeners: ListenerRegistry,
}

impl EntityBase {
    pub fn new(id: EntityId, type_tag: impl Into<String>) -> Self {
        Self {
            id,
            type_tag: type_tag.into(),
            locked: false,
            selected: false,
            removed: false,
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Flag the entity removed, fire one `entityRemoved`, then drop every
    /// listener. Returns `false` if it was already removed.
    pub(crate) fn mark_removed(&mut self, category: EntityCategory) -> bool {
        if self.removed {
            return false;
        }
        self.removed = true;
        let event = DiagramEvent::EntityRemoved {
            entity: self.id.clone(),
            category,
        };
        self.listeners.fire(&event);
        self.listeners.clear();
        true
    }
}

/// Behaviour shared by every graph entity.
///
/// Implementors only provide access to their [`EntityBase`] and their
/// category; the rest is provided.
pub trait Entity {
    fn base(&self) -> &EntityBase;
    fn base_mut(&mut self) -> &mut EntityBase;
    fn category(&self) -> EntityCategory;

    /// Downcast used at boundaries that only accept nodes.
    fn as_node_mut(&mut self) -> Option<&mut NodeModel> {
        None
    }

    fn id(&self) -> &EntityId {
        &self.base().id
    }

    fn type_tag(&self) -> &str {
        &self.base().type_tag
    }

    fn is_locked(&self) -> bool {
        self.base().locked
    }

    fn set_locked(&mut self, locked: bool) {
        if self.base().locked == locked {
            return;
        }
        self.base_mut().locked = locked;
        let entity = self.id().clone();
        self.fire_event(DiagramEvent::LockChanged { entity, locked });
    }

    fn is_selected(&self) -> bool {
        self.base().selected
    }

    /// Returns `true` if the flag changed (and `selectionChanged` fired).
    fn set_selected(&mut self, selected: bool) -> bool {
        if self.base().selected == selected {
            return false;
        }
        self.base_mut().selected = selected;
        let entity = self.id().clone();
        self.fire_event(DiagramEvent::SelectionChanged { entity, selected });
        true
    }

    fn is_removed(&self) -> bool {
        self.base().removed
    }

    fn add_listener<F>(&mut self, kind: EventKind, listener: F) -> ListenerHandle
    where
        F: FnMut(&DiagramEvent) + 'static,
        Self: Sized,
    {
        self.base_mut().listeners.add(kind, listener)
    }

    fn remove_listener(&mut self, handle: ListenerHandle) -> bool {
        self.base_mut().listeners.remove(handle)
    }

    fn fire_event(&mut self, event: DiagramEvent) -> usize {
        self.base_mut().listeners.fire(&event)
    }

    /// Mark the entity removed, fire exactly one `entityRemoved`, then detach
    /// every listener. Returns `false` if the entity was already removed.
    ///
    /// This only concerns the entity itself; cascading to attached links is
    /// the diagram model's job.
    fn remove(&mut self) -> bool {
        let category = self.category();
        self.base_mut().mark_removed(category)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::label::LabelModel;

    #[test]
    fn remove_fires_once_and_detaches_listeners() {
        let mut label = LabelModel::new("deploy");
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        label.add_listener(EventKind::EntityRemoved, move |_| *c.borrow_mut() += 1);

        assert!(label.remove());
        assert!(!label.remove());

        assert_eq!(*count.borrow(), 1);
        assert!(label.base().listeners().is_empty());
        assert!(label.is_removed());
    }

    #[test]
    fn selection_fires_only_on_change() {
        let mut label = LabelModel::new("x");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        label.add_listener(EventKind::SelectionChanged, move |e| s.borrow_mut().push(e.clone()));

        assert!(label.set_selected(true));
        assert!(!label.set_selected(true));
        assert!(label.set_selected(false));

        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn lock_change_fires_event() {
        let mut label = LabelModel::new("x");
        let seen = Rc::new(RefCell::new(0));
        let s = Rc::clone(&seen);
        label.add_listener(EventKind::LockChanged, move |_| *s.borrow_mut() += 1);

        label.set_locked(true);
        label.set_locked(true);
        assert!(label.is_locked());
        assert_eq!(*seen.borrow(), 1);
    }
}
