//! Pointer interaction with a single rendered link.

use std::fmt;

use pipestudio_geometry::Point;
use pipestudio_types::{DiagramError, EntityCategory, EntityId, Result};

use crate::diagram::DiagramModel;
use crate::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkWidgetState {
    Idle,
    Hovered,
    /// Terminal.
    Removed,
}

impl fmt::Display for LinkWidgetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkWidgetState::Idle => "idle",
            LinkWidgetState::Hovered => "hovered",
            LinkWidgetState::Removed => "removed",
        };
        f.write_str(name)
    }
}

/// Drives a link widget through idle -> hovered -> idle, and into removed on
/// a context-menu request.
///
/// Undefined transitions are rejected with `InvalidTransition` and leave the
/// state unchanged.
#[derive(Debug, Clone)]
pub struct LinkInteraction {
    link: EntityId,
    state: LinkWidgetState,
}

impl LinkInteraction {
    pub fn new(link: EntityId) -> Self {
        Self {
            link,
            state: LinkWidgetState::Idle,
        }
    }

    pub fn link(&self) -> &EntityId {
        &self.link
    }

    pub fn state(&self) -> LinkWidgetState {
        self.state
    }

    fn reject(&self, action: &str) -> DiagramError {
        DiagramError::InvalidTransition {
            from: self.state.to_string(),
            action: action.to_string(),
        }
    }

    pub fn pointer_enter(&mut self) -> Result<LinkWidgetState> {
        match self.state {
            LinkWidgetState::Idle => {
                self.state = LinkWidgetState::Hovered;
                Ok(self.state)
            }
            _ => Err(self.reject("pointer_enter")),
        }
    }

    pub fn pointer_leave(&mut self) -> Result<LinkWidgetState> {
        match self.state {
            LinkWidgetState::Hovered => {
                self.state = LinkWidgetState::Idle;
                Ok(self.state)
            }
            _ => Err(self.reject("pointer_leave")),
        }
    }

    /// Right-click: remove the link from `model` unless it is locked.
    pub fn context_menu(&mut self, model: &mut DiagramModel) -> Result<LinkWidgetState> {
        if self.state == LinkWidgetState::Removed {
            return Err(self.reject("context_menu"));
        }
        let link = model.link(&self.link).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Link,
            id: self.link.clone(),
        })?;
        if link.is_locked() {
            return Err(DiagramError::Locked {
                id: self.link.clone(),
            });
        }
        model.remove_link(&self.link)?;
        self.state = LinkWidgetState::Removed;
        Ok(self.state)
    }

    /// Click on a segment (not on a point handle): insert a waypoint there.
    pub fn segment_click(&mut self, model: &mut DiagramModel, position: Point) -> Result<EntityId> {
        if self.state == LinkWidgetState::Removed {
            return Err(self.reject("segment_click"));
        }
        model.insert_link_point(&self.link, position)
    }

    /// Click on the midpoint "add" control.
    pub fn add_control_click(&mut self, model: &mut DiagramModel) -> Result<bool> {
        if self.state == LinkWidgetState::Removed {
            return Err(self.reject("add_control_click"));
        }
        model.add_link_clicked(&self.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::ConnectOptions;
    use crate::node::{kinds, NodeModel};

    fn model_with_link() -> (DiagramModel, EntityId) {
        let mut model = DiagramModel::new();
        let a = model
            .add_node(NodeModel::new(kinds::DEFAULT_NODE, "a".into(), "A"))
            .unwrap();
        let b = model
            .add_node(NodeModel::new(kinds::DEFAULT_NODE, "b".into(), "B").with_position(Point::new(300.0, 40.0)))
            .unwrap();
        let link = model
            .connect_parent_to_child(&b, &a, &ConnectOptions::default())
            .unwrap()
            .unwrap();
        (model, link)
    }

    #[test]
    fn hover_round_trip() {
        let mut widget = LinkInteraction::new("l".into());
        assert_eq!(widget.pointer_enter().unwrap(), LinkWidgetState::Hovered);
        assert!(widget.pointer_enter().is_err());
        assert_eq!(widget.pointer_leave().unwrap(), LinkWidgetState::Idle);
        assert!(widget.pointer_leave().is_err());
    }

    #[test]
    fn context_menu_removes_and_is_terminal() {
        let (mut model, link) = model_with_link();
        let mut widget = LinkInteraction::new(link);
        widget.pointer_enter().unwrap();

        assert_eq!(widget.context_menu(&mut model).unwrap(), LinkWidgetState::Removed);
        assert_eq!(model.link_count(), 0);

        let err = widget.pointer_enter().unwrap_err();
        assert!(matches!(err, DiagramError::InvalidTransition { .. }));
        assert!(widget.context_menu(&mut model).is_err());
        assert!(widget.segment_click(&mut model, Point::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn locked_link_survives_context_menu() {
        let (mut model, link) = model_with_link();
        model.link_mut(&link).unwrap().set_locked(true);
        let mut widget = LinkInteraction::new(link);

        assert!(widget.context_menu(&mut model).is_err());
        assert_eq!(widget.state(), LinkWidgetState::Idle);
        assert_eq!(model.link_count(), 1);
    }

    #[test]
    fn segment_click_inserts_waypoint() {
        let (mut model, link) = model_with_link();
        let mut widget = LinkInteraction::new(link.clone());
        widget.pointer_enter().unwrap();
        widget.segment_click(&mut model, Point::new(200.0, 60.0)).unwrap();
        assert_eq!(model.link(&link).unwrap().points().len(), 3);
        assert_eq!(widget.state(), LinkWidgetState::Hovered);
    }
}
