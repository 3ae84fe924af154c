//! Interaction-mode state machine.
//!
//! States form a stack; only the top one is active. The bottom is always
//! [`EngineState::Idle`].

use std::fmt;

use pipestudio_types::EntityId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    DraggingCanvas,
    MovingItems { items: Vec<EntityId> },
    /// A new link is being dragged out of a port.
    DraggingLink { link: EntityId },
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => f.write_str("idle"),
            EngineState::DraggingCanvas => f.write_str("dragging-canvas"),
            EngineState::MovingItems { items } => write!(f, "moving-items({})", items.len()),
            EngineState::DraggingLink { link } => write!(f, "dragging-link({link})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateMachine {
    stack: Vec<EngineState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            stack: vec![EngineState::Idle],
        }
    }

    pub fn current(&self) -> &EngineState {
        self.stack.last().unwrap_or(&EngineState::Idle)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.current(), EngineState::Idle)
    }

    pub fn push(&mut self, state: EngineState) {
        tracing::debug!(from = %self.current(), to = %state, "Engine state pushed");
        self.stack.push(state);
    }

    /// Leave the active state. The idle base state is never popped.
    pub fn pop(&mut self) -> Option<EngineState> {
        if self.stack.len() <= 1 {
            return None;
        }
        let left = self.stack.pop();
        tracing::debug!(to = %self.current(), "Engine state popped");
        left
    }

    /// Swap the active state. Replacing idle pushes instead.
    pub fn replace(&mut self, state: EngineState) -> Option<EngineState> {
        let previous = self.pop();
        self.push(state);
        previous
    }

    /// Drop every state above idle.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
        tracing::debug!("Engine state reset");
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_never_pops_idle() {
        let mut sm = StateMachine::new();
        assert!(sm.is_idle());
        assert_eq!(sm.pop(), None);
        assert_eq!(sm.depth(), 1);
    }

    #[test]
    fn only_top_state_is_active() {
        let mut sm = StateMachine::new();
        sm.push(EngineState::DraggingCanvas);
        sm.push(EngineState::DraggingLink { link: "l".into() });
        assert_eq!(sm.current(), &EngineState::DraggingLink { link: "l".into() });

        assert_eq!(sm.pop(), Some(EngineState::DraggingLink { link: "l".into() }));
        assert_eq!(sm.current(), &EngineState::DraggingCanvas);
    }

    #[test]
    fn replace_swaps_top() {
        let mut sm = StateMachine::new();
        sm.push(EngineState::DraggingCanvas);
        let old = sm.replace(EngineState::MovingItems {
            items: vec!["a".into()],
        });
        assert_eq!(old, Some(EngineState::DraggingCanvas));
        assert_eq!(sm.depth(), 2);

        sm.reset();
        assert!(sm.is_idle());
    }

    #[test]
    fn replace_on_idle_pushes() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.replace(EngineState::DraggingCanvas), None);
        assert_eq!(sm.depth(), 2);
    }
}
