//! Materialise a pipeline outline into a diagram.
//!
//! An outline is the editor's view of a pipeline: an ordered list of steps,
//! parallel step sets, and named groups. [`DiagramBuilder`] turns it into
//! nodes and links: a start node, the chain of steps with fan-out and
//! fan-in, grouping layers bracketed by their anchors, and a trailing
//! placeholder for adding the next step.
//!
//! Building is idempotent. Step ids become node ids and the connection
//! helpers never duplicate a link, so re-running the builder on a model it
//! already populated adds nothing.

use pipestudio_geometry::Point;
use pipestudio_model::{is_anchor_id, kinds, ConnectOptions, DiagramModel, GroupingLayer, ANCHOR_ID_PREFIX};
use pipestudio_types::{DiagramError, EntityId, Result};
use serde::{Deserialize, Serialize};

use crate::engine::DiagramEngine;
use crate::registry::NodeOptions;

pub const START_NODE_ID: &str = "start";
pub const PLACEHOLDER_NODE_ID: &str = "create-new";
pub const PLACEHOLDER_DASH: &str = "5 5";
/// Vertical distance between sibling branches of a parallel set.
pub const BRANCH_SPACING: f64 = 100.0;

fn default_true() -> bool {
    true
}

fn default_kind() -> String {
    kinds::DEFAULT_NODE.to_string()
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutline {
    #[serde(default)]
    pub entries: Vec<OutlineEntry>,
    /// Append a "create new" placeholder after the last step.
    #[serde(default = "default_true")]
    pub add_placeholder: bool,
    /// Options for the start node.
    #[serde(default)]
    pub start: Option<NodeOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineEntry {
    Step(StepSpec),
    Parallel(Vec<StepSpec>),
    Group {
        id: String,
        label: String,
        #[serde(default)]
        entries: Vec<OutlineEntry>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    pub id: EntityId,
    #[serde(rename = "type", default = "default_kind")]
    pub type_tag: String,
    #[serde(default)]
    pub options: NodeOptions,
}

impl StepSpec {
    pub fn new(id: impl Into<EntityId>, name: &str) -> Self {
        Self {
            id: id.into(),
            type_tag: default_kind(),
            options: NodeOptions::named(name),
        }
    }
}

/// What a build run changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub nodes_added: usize,
    pub links_added: usize,
    pub groups_added: usize,
    /// Nodes the placeholder (or the next step) hangs off.
    pub tails: Vec<EntityId>,
}

/// Ids of every group declared in `entries`, at any depth.
fn nested_group_ids(entries: &[OutlineEntry], out: &mut Vec<EntityId>) {
    for entry in entries {
        if let OutlineEntry::Group { id, entries, .. } = entry {
            out.push(EntityId::new(id.clone()));
            nested_group_ids(entries, out);
        }
    }
}

// ---------------------------------------------------------------------------
// DiagramBuilder
// ---------------------------------------------------------------------------

pub struct DiagramBuilder<'a> {
    engine: &'a DiagramEngine,
    links: ConnectOptions,
}

impl<'a> DiagramBuilder<'a> {
    pub fn new(engine: &'a DiagramEngine) -> Self {
        Self {
            engine,
            links: ConnectOptions {
                allow_add: true,
                ..ConnectOptions::default()
            },
        }
    }

    /// Options applied to every link between steps.
    pub fn with_link_options(mut self, options: ConnectOptions) -> Self {
        self.links = options;
        self
    }

    pub fn build(&self, model: &mut DiagramModel, outline: &PipelineOutline) -> Result<BuildSummary> {
        let nodes_before = model.node_count();
        let links_before = model.link_count();
        let groups_before = model.grouping_layers().count();

        model.use_structural_layer();
        let start_id = EntityId::new(START_NODE_ID);
        if model.node(&start_id).is_none() {
            let options = outline.start.clone().unwrap_or_default();
            self.engine
                .add_node(model, kinds::START_NODE, start_id.clone(), &options)?;
        }

        let tails = self.build_entries(model, &outline.entries, vec![start_id], 0, None)?;
        model.use_structural_layer();

        if outline.add_placeholder {
            self.attach_placeholder(model, &tails)?;
        }

        let summary = BuildSummary {
            nodes_added: model.node_count() - nodes_before,
            links_added: model.link_count().saturating_sub(links_before),
            groups_added: model.grouping_layers().count() - groups_before,
            tails,
        };
        tracing::info!(
            nodes_added = summary.nodes_added,
            links_added = summary.links_added,
            groups_added = summary.groups_added,
            "Diagram built from outline"
        );
        Ok(summary)
    }

    fn build_entries(
        &self,
        model: &mut DiagramModel,
        entries: &[OutlineEntry],
        mut tails: Vec<EntityId>,
        depth: u32,
        group: Option<&EntityId>,
    ) -> Result<Vec<EntityId>> {
        for entry in entries {
            tails = match entry {
                OutlineEntry::Step(step) => {
                    self.ensure_step(model, step)?;
                    self.connect(model, &step.id, &tails)?;
                    vec![step.id.clone()]
                }
                OutlineEntry::Parallel(steps) => self.build_parallel(model, steps, &tails)?,
                OutlineEntry::Group { id, label, entries } => {
                    let tails = self.build_group(model, id, label, entries, &tails, depth + 1)?;
                    match group {
                        Some(outer) => model.activate_grouping_layer(outer)?,
                        None => model.use_structural_layer(),
                    }
                    tails
                }
            };
        }
        Ok(tails)
    }

    /// Create the step's node unless it already exists. Returns whether it
    /// was created.
    fn ensure_step(&self, model: &mut DiagramModel, step: &StepSpec) -> Result<bool> {
        if is_anchor_id(&step.id) {
            return Err(DiagramError::Validation(format!(
                "step id '{}' uses the prefix '{ANCHOR_ID_PREFIX}' reserved for group anchors",
                step.id
            )));
        }
        if model.node(&step.id).is_some() {
            return Ok(false);
        }
        self.engine
            .add_node(model, &step.type_tag, step.id.clone(), &step.options)?;
        Ok(true)
    }

    fn connect(&self, model: &mut DiagramModel, child: &EntityId, parents: &[EntityId]) -> Result<()> {
        connect_all(model, child, parents, &self.links)
    }

    /// Fan out from `tails` to every step, spreading freshly placed branches
    /// vertically around the position the first placement chose.
    fn build_parallel(
        &self,
        model: &mut DiagramModel,
        steps: &[StepSpec],
        tails: &[EntityId],
    ) -> Result<Vec<EntityId>> {
        if steps.is_empty() {
            return Ok(tails.to_vec());
        }
        let centre = (steps.len() as f64 - 1.0) / 2.0;
        for (i, step) in steps.iter().enumerate() {
            let created = self.ensure_step(model, step)?;
            self.connect(model, &step.id, tails)?;
            if created && step.options.position.is_none() {
                if let Some(node) = model.node(&step.id) {
                    let p = node.position();
                    let y = p.y + (i as f64 - centre) * BRANCH_SPACING;
                    model.set_node_position(&step.id, Point::new(p.x, y))?;
                }
            }
        }
        Ok(steps.iter().map(|s| s.id.clone()).collect())
    }

    /// Bracket `entries` with the group's start and end anchors. Members of
    /// nested groups also count as members of this one.
    fn build_group(
        &self,
        model: &mut DiagramModel,
        id: &str,
        label: &str,
        entries: &[OutlineEntry],
        tails: &[EntityId],
        depth: u32,
    ) -> Result<Vec<EntityId>> {
        let layer_id = model.use_grouping_layer(GroupingLayer::new(label, depth, id))?;
        let (start, end) = match model.grouping_layer(&layer_id) {
            Some(layer) => (layer.start_anchor().clone(), layer.end_anchor().clone()),
            None => return Ok(tails.to_vec()),
        };

        self.connect(model, &start, tails)?;
        let inner = self.build_entries(model, entries, vec![start], depth, Some(&layer_id))?;
        model.activate_grouping_layer(&layer_id)?;
        self.connect(model, &end, &inner)?;

        let mut nested = Vec::new();
        nested_group_ids(entries, &mut nested);
        let members: Vec<EntityId> = nested
            .iter()
            .filter_map(|g| model.grouping_layer(g))
            .flat_map(|g| g.member_ids())
            .collect();
        for member in &members {
            model.add_to_grouping_layer(&layer_id, member)?;
        }
        Ok(vec![end])
    }

    /// Hang the placeholder off `tails`, dropping links into it from nodes
    /// that are no longer tails.
    fn attach_placeholder(&self, model: &mut DiagramModel, tails: &[EntityId]) -> Result<()> {
        let id = EntityId::new(PLACEHOLDER_NODE_ID);
        if model.node(&id).is_none() {
            self.engine
                .add_node(model, kinds::CREATE_NEW_NODE, id.clone(), &NodeOptions::default())?;
        }

        let stale: Vec<EntityId> = model
            .node(&id)
            .and_then(|n| n.in_port())
            .map(|port| {
                port.links()
                    .iter()
                    .filter(|l| {
                        let source = model
                            .link(l)
                            .and_then(|l| l.source_port())
                            .and_then(|p| model.port_owner(p));
                        !source.is_some_and(|owner| tails.contains(owner))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for link in &stale {
            model.remove_link(link)?;
        }

        let options = ConnectOptions {
            allow_add: false,
            dash_pattern: Some(PLACEHOLDER_DASH.to_string()),
            ..self.links.clone()
        };
        connect_all(model, &id, tails, &options)
    }
}

/// One parent links directly; several share a fan-in elbow.
fn connect_all(
    model: &mut DiagramModel,
    child: &EntityId,
    parents: &[EntityId],
    options: &ConnectOptions,
) -> Result<()> {
    match parents {
        [] => {}
        [parent] => {
            model.connect_parent_to_child(child, parent, options)?;
        }
        _ => {
            model.connect_multiple_parents_to_child(child, parents, options)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::default_engine;

    fn step(id: &str) -> OutlineEntry {
        OutlineEntry::Step(StepSpec::new(id, id))
    }

    fn outline(entries: Vec<OutlineEntry>) -> PipelineOutline {
        PipelineOutline {
            entries,
            add_placeholder: true,
            start: None,
        }
    }

    #[test]
    fn chain_of_steps() {
        let engine = default_engine();
        let mut model = engine.new_model();
        let summary = DiagramBuilder::new(&engine)
            .build(&mut model, &outline(vec![step("build"), step("test")]))
            .unwrap();

        // start, build, test, placeholder
        assert_eq!(summary.nodes_added, 4);
        assert_eq!(summary.links_added, 3);
        assert_eq!(summary.tails, vec![EntityId::new("test")]);

        let start = model.node(&START_NODE_ID.into()).unwrap().position();
        let build = model.node(&"build".into()).unwrap().position();
        let test = model.node(&"test".into()).unwrap().position();
        assert!(start.x < build.x && build.x < test.x);
    }

    #[test]
    fn empty_parallel_block_keeps_the_chain() {
        let engine = default_engine();
        let mut model = engine.new_model();
        let summary = DiagramBuilder::new(&engine)
            .build(
                &mut model,
                &outline(vec![step("build"), OutlineEntry::Parallel(Vec::new()), step("test")]),
            )
            .unwrap();

        assert_eq!(summary.links_added, 3);
        assert_eq!(summary.tails, vec![EntityId::new("test")]);

        let test_in = model.node(&"test".into()).unwrap().in_port().unwrap();
        let incoming: Vec<_> = test_in.links().iter().collect();
        assert_eq!(incoming.len(), 1);
        let source = model.link(incoming[0]).unwrap().source_port().unwrap();
        assert_eq!(model.port_owner(source), Some(&EntityId::new("build")));
    }

    #[test]
    fn step_ids_may_end_like_anchors_but_not_use_the_prefix() {
        let engine = default_engine();
        let mut model = engine.new_model();
        let plan = outline(vec![OutlineEntry::Group {
            id: "ship".into(),
            label: "Ship".into(),
            entries: vec![step("ship-start"), step("ship-end")],
        }]);
        DiagramBuilder::new(&engine).build(&mut model, &plan).unwrap();
        assert!(model.node(&"ship-start".into()).is_some());

        let mut model = engine.new_model();
        let err = DiagramBuilder::new(&engine)
            .build(&mut model, &outline(vec![step("anchor:ship:start")]))
            .unwrap_err();
        assert!(matches!(err, DiagramError::Validation(_)));
    }

    #[test]
    fn rebuilding_adds_nothing() {
        let engine = default_engine();
        let mut model = engine.new_model();
        let plan = outline(vec![
            step("build"),
            OutlineEntry::Parallel(vec![StepSpec::new("unit", "Unit"), StepSpec::new("lint", "Lint")]),
            OutlineEntry::Group {
                id: "ship".into(),
                label: "Ship".into(),
                entries: vec![step("deploy")],
            },
        ]);
        let builder = DiagramBuilder::new(&engine);
        builder.build(&mut model, &plan).unwrap();
        let nodes = model.node_count();
        let links = model.link_count();

        let again = builder.build(&mut model, &plan).unwrap();
        assert_eq!(again.nodes_added, 0);
        assert_eq!(again.links_added, 0);
        assert_eq!(model.node_count(), nodes);
        assert_eq!(model.link_count(), links);
    }

    #[test]
    fn parallel_fans_out_and_back_in() {
        let engine = default_engine();
        let mut model = engine.new_model();
        DiagramBuilder::new(&engine)
            .build(
                &mut model,
                &outline(vec![
                    OutlineEntry::Parallel(vec![StepSpec::new("a", "A"), StepSpec::new("b", "B")]),
                    step("merge"),
                ]),
            )
            .unwrap();

        let a = model.node(&"a".into()).unwrap().position();
        let b = model.node(&"b".into()).unwrap().position();
        assert_eq!(a.x, b.x);
        assert_eq!(b.y - a.y, BRANCH_SPACING);

        let merge = model.node(&"merge".into()).unwrap();
        let in_port = merge.in_port().unwrap();
        assert_eq!(in_port.links().len(), 2);
        let elbows: Vec<_> = in_port
            .links()
            .iter()
            .map(|l| model.link(l).unwrap().elbow_x())
            .collect();
        assert!(elbows[0].is_some());
        assert_eq!(elbows[0], elbows[1]);
    }

    #[test]
    fn groups_are_bracketed_by_anchors() {
        let engine = default_engine();
        let mut model = engine.new_model();
        let summary = DiagramBuilder::new(&engine)
            .build(
                &mut model,
                &outline(vec![OutlineEntry::Group {
                    id: "ship".into(),
                    label: "Ship".into(),
                    entries: vec![
                        step("deploy"),
                        OutlineEntry::Group {
                            id: "verify".into(),
                            label: "Verify".into(),
                            entries: vec![step("smoke")],
                        },
                    ],
                }]),
            )
            .unwrap();

        assert_eq!(summary.groups_added, 2);
        assert_eq!(summary.tails, vec![EntityId::new("anchor:ship:end")]);

        let ship = model.grouping_layer(&"ship".into()).unwrap();
        assert_eq!(ship.depth(), 1);
        assert!(ship.contains(&"deploy".into()));
        assert!(ship.contains(&"anchor:ship:start".into()));
        assert!(ship.contains(&"smoke".into()));

        let verify = model.grouping_layer(&"verify".into()).unwrap();
        assert_eq!(verify.depth(), 2);
        assert!(verify.contains(&"smoke".into()));
        assert!(!verify.contains(&"deploy".into()));

        // the placeholder stays outside every group
        assert!(!ship.contains(&PLACEHOLDER_NODE_ID.into()));
        assert!(model.active_grouping_layer().is_none());
    }

    #[test]
    fn placeholder_follows_new_tail() {
        let engine = default_engine();
        let mut model = engine.new_model();
        let builder = DiagramBuilder::new(&engine);
        builder.build(&mut model, &outline(vec![step("build")])).unwrap();
        builder
            .build(&mut model, &outline(vec![step("build"), step("test")]))
            .unwrap();

        let placeholder = model.node(&PLACEHOLDER_NODE_ID.into()).unwrap();
        let links = placeholder.in_port().unwrap().links();
        assert_eq!(links.len(), 1);
        let link = model.link(links.first().unwrap()).unwrap();
        assert_eq!(model.port_owner(link.source_port().unwrap()), Some(&"test".into()));
        assert_eq!(link.dash_pattern(), Some(PLACEHOLDER_DASH));
    }

    #[test]
    fn unknown_step_kind_is_configuration_error() {
        let engine = default_engine();
        let mut model = engine.new_model();
        let mut spec = StepSpec::new("gate", "Gate");
        spec.type_tag = "approval".into();
        let err = DiagramBuilder::new(&engine)
            .build(&mut model, &outline(vec![OutlineEntry::Step(spec)]))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn outline_parses_from_json() {
        let json = r#"{
            "entries": [
                { "step": { "id": "build", "options": { "name": "Build" } } },
                { "parallel": [ { "id": "a", "type": "diamond" }, { "id": "b" } ] },
                { "group": { "id": "g", "label": "Deploy", "entries": [] } }
            ]
        }"#;
        let outline: PipelineOutline = serde_json::from_str(json).unwrap();
        assert!(outline.add_placeholder);
        assert_eq!(outline.entries.len(), 3);
        match &outline.entries[1] {
            OutlineEntry::Parallel(steps) => {
                assert_eq!(steps[0].type_tag, kinds::DIAMOND_NODE);
                assert_eq!(steps[1].type_tag, kinds::DEFAULT_NODE);
            }
            other => panic!("expected parallel, got {other:?}"),
        }
    }
}
