//! Diagram event system.
//!
//! Every entity owns a [`ListenerRegistry`] keyed by [`EventKind`]. Mutations
//! fire [`DiagramEvent`]s synchronously: all listeners have run by the time
//! the mutating call returns, so a caller that mutates and then queries sees
//! a consistent model.

use std::collections::HashMap;
use std::fmt;

use pipestudio_types::{EntityCategory, EntityId};
use serde::{Deserialize, Serialize};

/// Events fired by entities and by the diagram model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagramEvent {
    EntityRemoved {
        entity: EntityId,
        category: EntityCategory,
    },
    NodesUpdated {
        node: EntityId,
        added: bool,
    },
    LinksUpdated {
        link: EntityId,
        added: bool,
    },
    SelectionChanged {
        entity: EntityId,
        selected: bool,
    },
    LockChanged {
        entity: EntityId,
        locked: bool,
    },
    ColorChanged {
        entity: EntityId,
        color: String,
    },
    WidthChanged {
        entity: EntityId,
        width: f64,
    },
    PositionChanged {
        entity: EntityId,
        x: f64,
        y: f64,
    },
    PointsUpdated {
        link: EntityId,
        count: usize,
    },
    OffsetUpdated {
        x: f64,
        y: f64,
    },
    ZoomUpdated {
        zoom: f64,
    },
    GridUpdated {
        size: f64,
    },
    AddLinkClicked {
        link: EntityId,
    },
    GroupToggled {
        layer: EntityId,
        collapsed: bool,
    },
}

impl DiagramEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DiagramEvent::EntityRemoved { .. } => EventKind::EntityRemoved,
            DiagramEvent::NodesUpdated { .. } => EventKind::NodesUpdated,
            DiagramEvent::LinksUpdated { .. } => EventKind::LinksUpdated,
            DiagramEvent::SelectionChanged { .. } => EventKind::SelectionChanged,
            DiagramEvent::LockChanged { .. } => EventKind::LockChanged,
            DiagramEvent::ColorChanged { .. } => EventKind::ColorChanged,
            DiagramEvent::WidthChanged { .. } => EventKind::WidthChanged,
            DiagramEvent::PositionChanged { .. } => EventKind::PositionChanged,
            DiagramEvent::PointsUpdated { .. } => EventKind::PointsUpdated,
            DiagramEvent::OffsetUpdated { .. } => EventKind::OffsetUpdated,
            DiagramEvent::ZoomUpdated { .. } => EventKind::ZoomUpdated,
            DiagramEvent::GridUpdated { .. } => EventKind::GridUpdated,
            DiagramEvent::AddLinkClicked { .. } => EventKind::AddLinkClicked,
            DiagramEvent::GroupToggled { .. } => EventKind::GroupToggled,
        }
    }
}

/// Event names listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    EntityRemoved,
    NodesUpdated,
    LinksUpdated,
    SelectionChanged,
    LockChanged,
    ColorChanged,
    WidthChanged,
    PositionChanged,
    PointsUpdated,
    OffsetUpdated,
    ZoomUpdated,
    GridUpdated,
    AddLinkClicked,
    GroupToggled,
}

impl EventKind {
    /// The event name as exposed to rendering layers.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::EntityRemoved => "entityRemoved",
            EventKind::NodesUpdated => "nodesUpdated",
            EventKind::LinksUpdated => "linksUpdated",
            EventKind::SelectionChanged => "selectionChanged",
            EventKind::LockChanged => "lockChanged",
            EventKind::ColorChanged => "colorChanged",
            EventKind::WidthChanged => "widthChanged",
            EventKind::PositionChanged => "positionChanged",
            EventKind::PointsUpdated => "pointsUpdated",
            EventKind::OffsetUpdated => "offsetUpdated",
            EventKind::ZoomUpdated => "zoomUpdated",
            EventKind::GridUpdated => "gridUpdated",
            EventKind::AddLinkClicked => "addLinkClicked",
            EventKind::GroupToggled => "groupToggled",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ListenerRegistry
// ---------------------------------------------------------------------------

pub type Listener = Box<dyn FnMut(&DiagramEvent)>;

/// Subscription handle returned by [`ListenerRegistry::add`]. Pass it back to
/// [`ListenerRegistry::remove`] to release the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    kind: EventKind,
    seq: u64,
}

impl ListenerHandle {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Publish/subscribe table keyed by event kind.
#[derive(Default)]
pub struct ListenerRegistry {
    next_seq: u64,
    listeners: HashMap<EventKind, Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, kind: EventKind, listener: F) -> ListenerHandle
    where
        F: FnMut(&DiagramEvent) + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((seq, Box::new(listener)));
        ListenerHandle { kind, seq }
    }

    /// Release a subscription. Returns `false` if the handle was unknown or
    /// already released.
    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        let Some(list) = self.listeners.get_mut(&handle.kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(seq, _)| *seq != handle.seq);
        list.len() != before
    }

    /// Notify every listener subscribed to the event's kind, in registration
    /// order. Returns how many listeners ran; zero is not an error.
    pub fn fire(&mut self, event: &DiagramEvent) -> usize {
        match self.listeners.get_mut(&event.kind()) {
            Some(list) => {
                for (_, listener) in list.iter_mut() {
                    listener(event);
                }
                list.len()
            }
            None => 0,
        }
    }

    /// Detach every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn removed(id: &str) -> DiagramEvent {
        DiagramEvent::EntityRemoved {
            entity: id.into(),
            category: EntityCategory::Node,
        }
    }

    #[test]
    fn listeners_receive_events_of_their_kind_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ListenerRegistry::new();

        let sink = Rc::clone(&seen);
        registry.add(EventKind::EntityRemoved, move |e| sink.borrow_mut().push(e.clone()));

        assert_eq!(registry.fire(&removed("a")), 1);
        assert_eq!(registry.fire(&DiagramEvent::ZoomUpdated { zoom: 2.0 }), 0);

        assert_eq!(*seen.borrow(), vec![removed("a")]);
    }

    #[test]
    fn fire_without_listeners_is_noop() {
        let mut registry = ListenerRegistry::new();
        assert_eq!(registry.fire(&removed("a")), 0);
    }

    #[test]
    fn removed_handle_stops_notifications() {
        let count = Rc::new(RefCell::new(0));
        let mut registry = ListenerRegistry::new();

        let c = Rc::clone(&count);
        let handle = registry.add(EventKind::ZoomUpdated, move |_| *c.borrow_mut() += 1);
        registry.fire(&DiagramEvent::ZoomUpdated { zoom: 1.5 });

        assert!(registry.remove(handle));
        assert!(!registry.remove(handle));
        registry.fire(&DiagramEvent::ZoomUpdated { zoom: 1.0 });

        assert_eq!(*count.borrow(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        for i in 0..3 {
            let o = Rc::clone(&order);
            registry.add(EventKind::GridUpdated, move |_| o.borrow_mut().push(i));
        }
        registry.fire(&DiagramEvent::GridUpdated { size: 10.0 });
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn event_names_match_rendering_contract() {
        assert_eq!(EventKind::EntityRemoved.name(), "entityRemoved");
        assert_eq!(EventKind::NodesUpdated.to_string(), "nodesUpdated");
        assert_eq!(
            serde_json::to_string(&EventKind::OffsetUpdated).unwrap(),
            "\"offsetUpdated\""
        );
        assert_eq!(
            DiagramEvent::AddLinkClicked { link: "l".into() }.kind(),
            EventKind::AddLinkClicked
        );
    }
}
