//! Shared types, errors, and configuration for the Pipestudio diagram engine.
//!
//! This crate provides the foundational types used across all other Pipestudio crates:
//! - `DiagramError` - unified error taxonomy
//! - `EntityId` - stable identifier for every graph entity
//! - `EntityCategory` - the kind of entity an id refers to
//! - `EngineConfig` - tunables for link editing, hit-testing, and auto-positioning

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Unified error type for all Pipestudio subsystems.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    // === Configuration Errors ===
    #[error("No {category} factory registered for type '{type_tag}'")]
    FactoryNotFound {
        category: EntityCategory,
        type_tag: String,
    },

    // === Structural Rejections ===
    #[error("Entity '{id}' is locked")]
    Locked { id: EntityId },

    #[error("Grouping layers only accept nodes, got {category} '{id}'")]
    InvalidLayerMember {
        id: EntityId,
        category: EntityCategory,
    },

    #[error("Duplicate {category} id '{id}'")]
    DuplicateId {
        category: EntityCategory,
        id: EntityId,
    },

    #[error("No {category} with id '{id}'")]
    NotFound {
        category: EntityCategory,
        id: EntityId,
    },

    #[error("Link '{link}' already has the maximum of {max} points")]
    PointLimit { link: EntityId, max: usize },

    #[error("Invalid transition from {from} on '{action}'")]
    InvalidTransition { from: String, action: String },

    // === Serialization Errors ===
    #[error("Unresolved reference from '{from}' to '{to}'")]
    UnresolvedReference { from: EntityId, to: EntityId },

    // === Diagram Errors ===
    #[error("Diagram validation failed: {0}")]
    Validation(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl DiagramError {
    /// Returns `true` for programmer-facing configuration mistakes such as an
    /// unknown type tag at factory lookup.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DiagramError::FactoryNotFound { .. })
    }

    /// Returns `true` if the error is a synchronous rejection that left the
    /// model untouched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DiagramError::Locked { .. }
                | DiagramError::InvalidLayerMember { .. }
                | DiagramError::PointLimit { .. }
                | DiagramError::InvalidTransition { .. }
                | DiagramError::DuplicateId { .. }
        )
    }
}

/// A convenience alias for `Result<T, DiagramError>`.
pub type Result<T> = std::result::Result<T, DiagramError>;

// ---------------------------------------------------------------------------
// EntityId - stable identity for graph entities
// ---------------------------------------------------------------------------

/// Identifier of a node, port, link, label, point, or layer.
///
/// Ids are opaque strings. Freshly created entities get a random UUID; nodes
/// built from pipeline steps reuse the step identifier so that rebuilding a
/// diagram resolves to the same entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// EntityCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Node,
    Port,
    Link,
    Label,
    Point,
    Layer,
    Diagram,
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityCategory::Node => "node",
            EntityCategory::Port => "port",
            EntityCategory::Link => "link",
            EntityCategory::Label => "label",
            EntityCategory::Point => "point",
            EntityCategory::Layer => "layer",
            EntityCategory::Diagram => "diagram",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Tunables shared by the engine and the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Upper bound on the number of points (endpoints included) a link may hold.
    pub max_points_per_link: usize,
    /// Extra pixels added to a link's stroke width when hit-testing segments.
    pub link_hit_padding: f64,
    /// Distance control points are pulled out of a port along its alignment.
    pub default_curvature: f64,
    pub auto_position: AutoPositionConfig,
    pub grid_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_points_per_link: 12,
            link_hit_padding: 20.0,
            default_curvature: 50.0,
            auto_position: AutoPositionConfig::default(),
            grid_size: 0.0,
        }
    }
}

/// Placement policy for nodes inserted without an explicit position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoPositionConfig {
    pub enabled: bool,
    pub start_x: f64,
    pub start_y: f64,
    /// Horizontal gap between a parent and a newly connected child.
    pub gap: f64,
}

impl Default for AutoPositionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_x: 40.0,
            start_y: 40.0,
            gap: 80.0,
        }
    }
}

impl EngineConfig {
    /// Serialize this config to JSON and write it to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a config from a JSON file at `path`. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        tracing::debug!(path = %path.display(), "Engine config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_factory_not_found() {
        let err = DiagramError::FactoryNotFound {
            category: EntityCategory::Node,
            type_tag: "approval".into(),
        };
        assert_eq!(
            err.to_string(),
            "No node factory registered for type 'approval'"
        );
    }

    #[test]
    fn error_display_locked() {
        let err = DiagramError::Locked { id: "n1".into() };
        assert_eq!(err.to_string(), "Entity 'n1' is locked");
    }

    #[test]
    fn error_display_invalid_layer_member() {
        let err = DiagramError::InvalidLayerMember {
            id: "l1".into(),
            category: EntityCategory::Link,
        };
        assert_eq!(
            err.to_string(),
            "Grouping layers only accept nodes, got link 'l1'"
        );
    }

    #[test]
    fn error_display_point_limit() {
        let err = DiagramError::PointLimit {
            link: "l1".into(),
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "Link 'l1' already has the maximum of 4 points"
        );
    }

    #[test]
    fn error_display_unresolved_reference() {
        let err = DiagramError::UnresolvedReference {
            from: "link".into(),
            to: "port".into(),
        };
        assert_eq!(err.to_string(), "Unresolved reference from 'link' to 'port'");
    }

    #[test]
    fn configuration_errors_are_classified() {
        let err = DiagramError::FactoryNotFound {
            category: EntityCategory::Link,
            type_tag: "x".into(),
        };
        assert!(err.is_configuration());
        assert!(!err.is_rejection());
    }

    #[test]
    fn rejections_are_classified() {
        assert!(DiagramError::Locked { id: "a".into() }.is_rejection());
        assert!(DiagramError::PointLimit {
            link: "a".into(),
            max: 2
        }
        .is_rejection());
        assert!(!DiagramError::Other("x".into()).is_rejection());
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: DiagramError = json_err.into();
        assert!(matches!(err, DiagramError::Json(_)));
    }

    // --- EntityId ---

    #[test]
    fn generated_ids_are_unique() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn entity_id_serializes_as_plain_string() {
        let id = EntityId::new("build-step");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"build-step\"");
        let back: EntityId = serde_json::from_str("\"build-step\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn entity_category_displays_lowercase() {
        assert_eq!(EntityCategory::Layer.to_string(), "layer");
        assert_eq!(
            serde_json::to_string(&EntityCategory::Port).unwrap(),
            "\"port\""
        );
    }

    // --- EngineConfig ---

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "maxPointsPerLink": 5 }"#).unwrap();
        assert_eq!(config.max_points_per_link, 5);
        assert_eq!(config.link_hit_padding, 20.0);
        assert!(config.auto_position.enabled);
    }

    #[test]
    fn config_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");

        let mut config = EngineConfig::default();
        config.max_points_per_link = 7;
        config.auto_position.gap = 120.0;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn config_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, DiagramError::Io(_)));
    }
}
