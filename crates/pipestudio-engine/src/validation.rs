//! Diagram validation: lint rules and diagnostics.
//!
//! Rules run over a [`DiagramDocument`] rather than a live model, so a file
//! that would fail to load can still be diagnosed. Call [`validate`] for
//! advisory diagnostics or [`validate_or_raise`] to fail on any
//! `Error`-severity issue.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use pipestudio_model::{kinds, DiagramDocument, LinkRecord};
use pipestudio_types::{DiagramError, EntityId, Result};
use regex::Regex;

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub entity: Option<EntityId>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
            Severity::Info => f.write_str("info"),
        }
    }
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule {
    fn name(&self) -> &str;
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Port id -> owning node id, over every node's port table.
fn port_table(document: &DiagramDocument) -> HashMap<&EntityId, &EntityId> {
    document
        .nodes
        .iter()
        .flat_map(|n| n.ports.iter().map(move |p| (&p.id, &n.id)))
        .collect()
}

/// Hex (`#rgb`, `#rrggbb`, `#rrggbbaa`) or a CSS custom property reference.
static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})|var\(--[A-Za-z0-9_-]+\))$")
        .expect("color pattern is valid")
});

fn is_valid_color(value: &str) -> bool {
    COLOR_RE.is_match(value)
}

fn link_ports(link: &LinkRecord) -> impl Iterator<Item = &EntityId> {
    link.source_port.iter().chain(link.target_port.iter())
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct UniqueIdsRule;
impl LintRule for UniqueIdsRule {
    fn name(&self) -> &str { "unique_ids" }
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic> {
        let mut seen = HashSet::new();
        let ids = document
            .nodes
            .iter()
            .map(|n| (&n.id, "node"))
            .chain(document.nodes.iter().flat_map(|n| n.ports.iter().map(|p| (&p.id, "port"))))
            .chain(document.links.iter().map(|l| (&l.id, "link")));
        ids.filter(|(id, kind)| !seen.insert((*id, *kind)))
            .map(|(id, kind)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Duplicate {kind} id '{id}'"),
                entity: Some(id.clone()),
                fix: Some(format!("Rename one of the {kind}s")),
            })
            .collect()
    }
}

struct StartNodeRule;
impl LintRule for StartNodeRule {
    fn name(&self) -> &str { "start_node" }
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic> {
        if document.nodes.is_empty() || document.nodes.iter().any(|n| n.type_tag == kinds::START_NODE) {
            return Vec::new();
        }
        vec![Diagnostic {
            rule: self.name().into(),
            severity: Severity::Warning,
            message: "Diagram has no start node".into(),
            entity: None,
            fix: Some(format!("Add a node of type '{}'", kinds::START_NODE)),
        }]
    }
}

struct LinkPortsExistRule;
impl LintRule for LinkPortsExistRule {
    fn name(&self) -> &str { "link_ports_exist" }
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic> {
        let ports = port_table(document);
        document
            .links
            .iter()
            .flat_map(|l| link_ports(l).map(move |p| (l, p)))
            .filter(|(_, port)| !ports.contains_key(port))
            .map(|(link, port)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Link '{}' references non-existent port '{port}'", link.id),
                entity: Some(link.id.clone()),
                fix: Some("Reconnect the link or remove it".into()),
            })
            .collect()
    }
}

struct DanglingLinkRule;
impl LintRule for DanglingLinkRule {
    fn name(&self) -> &str { "dangling_link" }
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic> {
        document
            .links
            .iter()
            .filter(|l| l.target_port.is_none())
            .map(|l| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!("Link '{}' has no target port", l.id),
                entity: Some(l.id.clone()),
                fix: Some("Attach the link to an input port".into()),
            })
            .collect()
    }
}

/// A port's recorded link list must agree with the links that reference it.
struct PortLinkConsistencyRule;
impl LintRule for PortLinkConsistencyRule {
    fn name(&self) -> &str { "port_link_consistency" }
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic> {
        let links: HashMap<&EntityId, &LinkRecord> =
            document.links.iter().map(|l| (&l.id, l)).collect();
        let mut diagnostics = Vec::new();
        for node in &document.nodes {
            for port in &node.ports {
                for link_id in &port.links {
                    let attached = links
                        .get(link_id)
                        .is_some_and(|l| link_ports(l).any(|p| p == &port.id));
                    if !attached {
                        diagnostics.push(Diagnostic {
                            rule: self.name().into(),
                            severity: Severity::Warning,
                            message: format!(
                                "Port '{}' of node '{}' lists link '{link_id}' which does not attach to it",
                                port.id, node.id
                            ),
                            entity: Some(port.id.clone()),
                            fix: Some("Re-save the diagram to refresh port link lists".into()),
                        });
                    }
                }
            }
        }
        diagnostics
    }
}

struct GroupMembersExistRule;
impl LintRule for GroupMembersExistRule {
    fn name(&self) -> &str { "group_members_exist" }
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic> {
        let nodes: HashSet<&EntityId> = document.nodes.iter().map(|n| &n.id).collect();
        document
            .groups
            .iter()
            .flat_map(|g| g.members.iter().map(move |m| (g, m)))
            .filter(|(_, member)| !nodes.contains(member))
            .map(|(group, member)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Group '{}' lists missing node '{member}'", group.id),
                entity: Some(group.id.clone()),
                fix: Some(format!("Remove '{member}' from the group")),
            })
            .collect()
    }
}

struct LinkColorRule;
impl LintRule for LinkColorRule {
    fn name(&self) -> &str { "link_color" }
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic> {
        document
            .links
            .iter()
            .flat_map(|l| [(l, &l.color), (l, &l.selected_color)])
            .filter(|(_, color)| !is_valid_color(color))
            .map(|(link, color)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Link '{}' has invalid color '{color}'", link.id),
                entity: Some(link.id.clone()),
                fix: Some("Use a hex color like '#9ca3af' or 'var(--name)'".into()),
            })
            .collect()
    }
}

struct LinkPointsRule;
impl LintRule for LinkPointsRule {
    fn name(&self) -> &str { "link_points" }
    fn apply(&self, document: &DiagramDocument) -> Vec<Diagnostic> {
        document
            .links
            .iter()
            .filter(|l| l.points.len() < 2)
            .map(|l| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Info,
                message: format!("Link '{}' has {} point(s); endpoints will be padded", l.id, l.points.len()),
                entity: Some(l.id.clone()),
                fix: None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every lint rule and return all diagnostics.
pub fn validate(document: &DiagramDocument) -> Vec<Diagnostic> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(UniqueIdsRule),
        Box::new(StartNodeRule),
        Box::new(LinkPortsExistRule),
        Box::new(DanglingLinkRule),
        Box::new(PortLinkConsistencyRule),
        Box::new(GroupMembersExistRule),
        Box::new(LinkColorRule),
        Box::new(LinkPointsRule),
    ];

    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(document));
    }
    diagnostics
}

/// Run all lint rules; return `Err` if any `Error`-severity diagnostic found.
pub fn validate_or_raise(document: &DiagramDocument) -> Result<Vec<Diagnostic>> {
    let diagnostics = validate(document);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    if !errors.is_empty() {
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        return Err(DiagramError::Validation(messages.join("; ")));
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::default_engine;
    use crate::registry::NodeOptions;
    use pipestudio_geometry::Point;
    use pipestudio_model::ConnectOptions;

    fn document() -> DiagramDocument {
        let engine = default_engine();
        let mut model = engine.new_model();
        let start = engine
            .add_node(&mut model, kinds::START_NODE, "start".into(), &NodeOptions::default())
            .unwrap();
        let build = engine
            .add_node(
                &mut model,
                kinds::DEFAULT_NODE,
                "build".into(),
                &NodeOptions {
                    position: Some(Point::new(200.0, 40.0)),
                    ..NodeOptions::named("Build")
                },
            )
            .unwrap();
        model
            .connect_parent_to_child(&build, &start, &ConnectOptions::default())
            .unwrap();
        engine.serialize_model(&model).unwrap()
    }

    #[test]
    fn valid_diagram_passes() {
        let diags = validate(&document());
        assert!(diags.is_empty(), "Expected no diagnostics, got: {diags:?}");
        assert!(validate_or_raise(&document()).is_ok());
    }

    #[test]
    fn missing_port_is_error() {
        let mut doc = document();
        doc.links[0].target_port = Some("ghost".into());
        let diags = validate(&doc);
        assert!(diags.iter().any(|d| d.rule == "link_ports_exist" && d.severity == Severity::Error));
        let err = validate_or_raise(&doc).unwrap_err();
        assert!(matches!(err, DiagramError::Validation(_)));
    }

    #[test]
    fn dangling_link_is_warning() {
        let mut doc = document();
        doc.links[0].target_port = None;
        let diags = validate(&doc);
        assert!(diags.iter().any(|d| d.rule == "dangling_link" && d.severity == Severity::Warning));
        // the build node's input port still lists the link
        assert!(diags.iter().any(|d| d.rule == "port_link_consistency"));
        assert!(validate_or_raise(&doc).is_ok());
    }

    #[test]
    fn invalid_color_is_error() {
        let mut doc = document();
        doc.links[0].color = "blue-ish".into();
        let diags = validate(&doc);
        assert!(diags.iter().any(|d| d.rule == "link_color"));
    }

    #[test]
    fn css_variable_color_is_accepted() {
        assert!(is_valid_color("var(--grey-400)"));
        assert!(is_valid_color("#fff"));
        assert!(is_valid_color("#0278d5"));
        assert!(!is_valid_color("#12"));
        assert!(!is_valid_color("red"));
    }

    #[test]
    fn group_member_missing_is_error() {
        let mut doc = document();
        doc.groups.push(pipestudio_model::GroupRecord {
            id: "g".into(),
            label: "Group".into(),
            depth: 1,
            collapsed: false,
            members: vec!["build".into(), "ghost".into()],
        });
        let diags = validate(&doc);
        let missing: Vec<_> = diags.iter().filter(|d| d.rule == "group_members_exist").collect();
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn duplicate_node_id_is_error() {
        let mut doc = document();
        let copy = doc.nodes[1].clone();
        doc.nodes.push(copy);
        assert!(validate(&doc).iter().any(|d| d.rule == "unique_ids"));
    }

    #[test]
    fn missing_start_node_is_warning() {
        let mut doc = document();
        doc.nodes.retain(|n| n.type_tag != kinds::START_NODE);
        assert!(validate(&doc)
            .iter()
            .any(|d| d.rule == "start_node" && d.severity == Severity::Warning));
    }
}
