//! Event-observable diagram model for pipeline graphs.
//!
//! - [`entity`] - identity, flags, and listeners shared by every entity
//! - [`events`] - [`DiagramEvent`] and the per-entity [`ListenerRegistry`]
//! - [`NodeModel`], [`PortModel`], [`LinkModel`], [`LabelModel`] - the graph entities
//! - [`LayerModel`] and [`GroupingLayer`] - structural and grouping layers
//! - [`DiagramModel`] - the graph container, connection helpers, spatial queries
//! - [`link_geometry`] - link paths, waypoint editing, segment hit-testing
//! - [`interaction`] - the link widget state machine
//! - [`serialize`] - records, [`DiagramDocument`], save/load
//!
//! Everything here is single-threaded: listeners run synchronously inside
//! the mutating call, so a caller sees a consistent model as soon as the
//! call returns.

pub mod diagram;
pub mod entity;
pub mod events;
pub mod grouping;
pub mod interaction;
pub mod label;
pub mod layer;
pub mod link;
pub mod link_geometry;
pub mod node;
pub mod port;
pub mod serialize;

pub use diagram::{ConnectOptions, DiagramModel, EntityRef};
pub use entity::{Entity, EntityBase};
pub use events::{DiagramEvent, EventKind, ListenerHandle, ListenerRegistry};
pub use grouping::{anchor_ids, is_anchor_id, GroupingLayer, ANCHOR_ID_PREFIX};
pub use interaction::{LinkInteraction, LinkWidgetState};
pub use label::LabelModel;
pub use layer::LayerModel;
pub use link::{LinkModel, LinkPoint};
pub use link_geometry::LinkPath;
pub use node::{kinds, NodeModel};
pub use port::{PortModel, PORT_IN, PORT_OUT};
pub use serialize::{
    from_document, from_document_with, serialize, serialize_with, DiagramDocument, GroupRecord,
    LabelRecord, LinkRecord, NodeRecord, PointRecord, PortRecord, RecordCodec, StructuralCodec,
};
