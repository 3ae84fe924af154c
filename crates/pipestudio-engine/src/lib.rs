//! Diagram engine for pipeline graphs.
//!
//! - [`registry`] - factory traits and per-category [`FactoryBank`]s
//! - [`factories`] - built-in node, link, port, and label kinds
//! - [`engine`] - [`DiagramEngine`]: registries, rendering, persistence
//! - [`views`] - renderer-agnostic [`DiagramView`]
//! - [`state`] - interaction-mode [`StateMachine`]
//! - [`validation`] - lint rules over saved documents
//! - [`builder`] - [`DiagramBuilder`]: pipeline outline to diagram

pub mod builder;
pub mod engine;
pub mod factories;
pub mod registry;
pub mod state;
pub mod validation;
pub mod views;

pub use builder::{BuildSummary, DiagramBuilder, OutlineEntry, PipelineOutline, StepSpec};
pub use engine::{default_engine, DiagramEngine};
pub use registry::{
    Factory, FactoryBank, LabelFactory, LinkFactory, NodeFactory, NodeOptions, PortFactory,
};
pub use state::{EngineState, StateMachine};
pub use validation::{validate, validate_or_raise, Diagnostic, LintRule, Severity};
pub use views::{DiagramView, GroupView, LabelView, LinkView, NodeShape, NodeView, PortView};
