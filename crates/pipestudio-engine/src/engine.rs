//! The diagram engine: factory registries, rendering, and persistence.

use std::path::Path;

use pipestudio_model::{
    from_document_with, serialize_with, DiagramDocument, DiagramModel, Entity, LabelModel,
    LabelRecord, LinkModel, LinkRecord, NodeModel, NodeRecord, PortModel, PortRecord, RecordCodec,
};
use pipestudio_types::{EngineConfig, EntityCategory, EntityId, Result};

use crate::factories::{
    CreateNewNodeFactory, DefaultLabelFactory, DefaultLinkFactory, DefaultNodeFactory,
    DefaultPortFactory, DiamondNodeFactory, EmptyAnchorNodeFactory, StartNodeFactory,
};
use crate::registry::{FactoryBank, LabelFactory, LinkFactory, NodeFactory, NodeOptions, PortFactory};
use crate::state::StateMachine;
use crate::views::{DiagramView, GroupView};

/// Owns one factory registry per entity category plus the interaction state.
///
/// An engine is plain constructed state: two engines never share
/// registrations, so independent diagrams can use different kinds.
pub struct DiagramEngine {
    config: EngineConfig,
    nodes: FactoryBank<dyn NodeFactory>,
    links: FactoryBank<dyn LinkFactory>,
    ports: FactoryBank<dyn PortFactory>,
    labels: FactoryBank<dyn LabelFactory>,
    state: StateMachine,
}

impl DiagramEngine {
    /// Engine with empty registries.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            nodes: FactoryBank::new(EntityCategory::Node),
            links: FactoryBank::new(EntityCategory::Link),
            ports: FactoryBank::new(EntityCategory::Port),
            labels: FactoryBank::new(EntityCategory::Label),
            state: StateMachine::new(),
        }
    }

    /// Engine with every built-in kind registered.
    pub fn with_defaults(config: EngineConfig) -> Self {
        let curvature = config.default_curvature;
        let mut engine = Self::new(config);
        engine.register_node_factory(DefaultNodeFactory);
        engine.register_node_factory(StartNodeFactory);
        engine.register_node_factory(DiamondNodeFactory);
        engine.register_node_factory(CreateNewNodeFactory);
        engine.register_node_factory(EmptyAnchorNodeFactory);
        engine.register_link_factory(DefaultLinkFactory::new(curvature));
        engine.register_port_factory(DefaultPortFactory);
        engine.register_label_factory(DefaultLabelFactory);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &StateMachine {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateMachine {
        &mut self.state
    }

    // --- registration ---

    pub fn register_node_factory(&mut self, factory: impl NodeFactory + 'static) {
        self.nodes.register(Box::new(factory));
    }

    pub fn register_link_factory(&mut self, factory: impl LinkFactory + 'static) {
        self.links.register(Box::new(factory));
    }

    pub fn register_port_factory(&mut self, factory: impl PortFactory + 'static) {
        self.ports.register(Box::new(factory));
    }

    pub fn register_label_factory(&mut self, factory: impl LabelFactory + 'static) {
        self.labels.register(Box::new(factory));
    }

    pub fn node_factories(&self) -> &FactoryBank<dyn NodeFactory> {
        &self.nodes
    }

    pub fn link_factories(&self) -> &FactoryBank<dyn LinkFactory> {
        &self.links
    }

    // --- construction ---

    pub fn create_node(&self, type_tag: &str, id: EntityId, options: &NodeOptions) -> Result<NodeModel> {
        let node = self.nodes.get(type_tag)?.generate_model(id, options)?;
        tracing::debug!(node = %node.id(), kind = %type_tag, "Node created");
        Ok(node)
    }

    pub fn create_link(&self, type_tag: &str) -> Result<LinkModel> {
        self.links.get(type_tag)?.generate_model(EntityId::generate())
    }

    pub fn create_port(&self, type_tag: &str, name: &str, is_in: bool) -> Result<PortModel> {
        self.ports
            .get(type_tag)?
            .generate_model(EntityId::generate(), name, is_in)
    }

    pub fn create_label(&self, type_tag: &str, text: &str) -> Result<LabelModel> {
        self.labels.get(type_tag)?.generate_model(EntityId::generate(), text)
    }

    /// Create a node and add it to `model` in one step.
    pub fn add_node(
        &self,
        model: &mut DiagramModel,
        type_tag: &str,
        id: EntityId,
        options: &NodeOptions,
    ) -> Result<EntityId> {
        let node = self.create_node(type_tag, id, options)?;
        model.add_node(node)
    }

    /// Fresh model carrying this engine's configuration.
    pub fn new_model(&self) -> DiagramModel {
        DiagramModel::with_config(self.config.clone())
    }

    // --- rendering ---

    /// Describe every group, link, and node of `model` for a renderer, in
    /// paint order. Links with degenerate geometry are left out.
    pub fn render(&self, model: &DiagramModel) -> Result<DiagramView> {
        let groups = model
            .grouping_layers()
            .filter_map(|layer| {
                let bounds = model.group_bounds(layer.id())?;
                Some(GroupView {
                    id: layer.id().clone(),
                    label: layer.label().to_string(),
                    depth: layer.depth(),
                    collapsed: layer.is_collapsed(),
                    bounds,
                })
            })
            .collect();

        let mut links = Vec::with_capacity(model.link_count());
        for link in model.links() {
            if let Some(view) = self.links.get(link.type_tag())?.generate_view(link, model) {
                links.push(view);
            }
        }

        let mut nodes = Vec::with_capacity(model.node_count());
        for node in model.nodes() {
            nodes.push(self.nodes.get(node.type_tag())?.generate_view(node, model));
        }

        Ok(DiagramView {
            offset: model.offset(),
            zoom: model.zoom(),
            grid_size: model.grid_size(),
            groups,
            links,
            nodes,
        })
    }

    // --- persistence ---

    pub fn serialize_model(&self, model: &DiagramModel) -> Result<DiagramDocument> {
        serialize_with(model, self)
    }

    /// Rebuild a model, dispatching every record to the factory registered
    /// for its type tag.
    pub fn deserialize_model(&self, document: DiagramDocument) -> Result<DiagramModel> {
        from_document_with(document, self.config.clone(), self)
    }

    pub fn save_model(&self, model: &DiagramModel, path: &Path) -> Result<()> {
        self.serialize_model(model)?.save(path)
    }

    pub fn load_model(&self, path: &Path) -> Result<DiagramModel> {
        self.deserialize_model(DiagramDocument::load(path)?)
    }
}

impl Default for DiagramEngine {
    fn default() -> Self {
        Self::with_defaults(EngineConfig::default())
    }
}

/// Engine with the built-in kinds and default configuration.
pub fn default_engine() -> DiagramEngine {
    DiagramEngine::default()
}

impl RecordCodec for DiagramEngine {
    fn encode_node(&self, node: &NodeModel) -> Result<NodeRecord> {
        self.nodes.get(node.type_tag())?.serialize(node, self)
    }

    fn decode_node(&self, record: NodeRecord) -> Result<NodeModel> {
        self.nodes.get(&record.type_tag)?.deserialize(record, self)
    }

    fn encode_port(&self, port: &PortModel) -> Result<PortRecord> {
        self.ports.get(port.type_tag())?.serialize(port)
    }

    fn decode_port(&self, record: PortRecord, is_in: bool) -> Result<PortModel> {
        self.ports.get(&record.type_tag)?.deserialize(record, is_in)
    }

    fn encode_link(&self, link: &LinkModel) -> Result<LinkRecord> {
        self.links.get(link.type_tag())?.serialize(link, self)
    }

    fn decode_link(&self, record: LinkRecord) -> Result<LinkModel> {
        self.links.get(&record.type_tag)?.deserialize(record, self)
    }

    fn encode_label(&self, label: &LabelModel) -> Result<LabelRecord> {
        self.labels.get(label.type_tag())?.serialize(label)
    }

    fn decode_label(&self, record: LabelRecord) -> Result<LabelModel> {
        self.labels.get(&record.type_tag)?.deserialize(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Factory;
    use crate::views::{NodeShape, NodeView};
    use pipestudio_geometry::Point;
    use pipestudio_model::{kinds, ConnectOptions};
    use pipestudio_types::DiagramError;

    fn at(name: &str, x: f64, y: f64) -> NodeOptions {
        NodeOptions {
            position: Some(Point::new(x, y)),
            ..NodeOptions::named(name)
        }
    }

    #[test]
    fn unknown_node_kind_fails_without_fallback() {
        let engine = default_engine();
        let err = engine
            .create_node("approval", "a".into(), &NodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, DiagramError::FactoryNotFound { .. }));
    }

    #[test]
    fn empty_engine_knows_no_kinds() {
        let engine = DiagramEngine::new(EngineConfig::default());
        assert!(engine.create_link("default").unwrap_err().is_configuration());
    }

    struct Wide;

    impl Factory for Wide {
        fn type_tag(&self) -> &str {
            kinds::DEFAULT_NODE
        }
    }

    impl NodeFactory for Wide {
        fn generate_model(&self, id: EntityId, options: &NodeOptions) -> Result<NodeModel> {
            Ok(NodeModel::new(kinds::DEFAULT_NODE, id, options.name.clone())
                .with_size(pipestudio_geometry::Size::new(300.0, 40.0)))
        }

        fn generate_view(&self, node: &NodeModel, _diagram: &DiagramModel) -> NodeView {
            NodeView::from_node(node, NodeShape::Diamond)
        }
    }

    #[test]
    fn registering_a_builtin_tag_overrides_it() {
        let mut engine = default_engine();
        engine.register_node_factory(Wide);
        let node = engine
            .create_node(kinds::DEFAULT_NODE, "a".into(), &NodeOptions::default())
            .unwrap();
        assert_eq!(node.size().width, 300.0);
    }

    #[test]
    fn link_curvature_comes_from_config() {
        let mut config = EngineConfig::default();
        config.default_curvature = 90.0;
        let engine = DiagramEngine::with_defaults(config);
        assert_eq!(engine.create_link("default").unwrap().curvature(), 90.0);
    }

    #[test]
    fn render_describes_nodes_and_links() {
        let engine = default_engine();
        let mut model = engine.new_model();
        let a = engine
            .add_node(&mut model, kinds::START_NODE, "start".into(), &at("", 40.0, 40.0))
            .unwrap();
        let b = engine
            .add_node(&mut model, kinds::DEFAULT_NODE, "build".into(), &at("Build", 200.0, 40.0))
            .unwrap();
        let options = ConnectOptions {
            allow_add: true,
            ..ConnectOptions::default()
        };
        let link = model.connect_parent_to_child(&b, &a, &options).unwrap().unwrap();

        let view = engine.render(&model).unwrap();
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.node(&a).unwrap().shape, NodeShape::Circle);
        assert_eq!(view.node(&b).unwrap().shape, NodeShape::Rectangle);

        let link_view = view.link(&link).unwrap();
        assert!(link_view.path.starts_with("M"));
        assert!(link_view.add_control.is_some());
        assert!(!link_view.dangling);
    }

    #[test]
    fn render_fails_on_unregistered_kind() {
        let engine = default_engine();
        let mut model = engine.new_model();
        model
            .add_node(NodeModel::new("approval", "x".into(), "Approve"))
            .unwrap();
        assert!(engine.render(&model).unwrap_err().is_configuration());
    }

    #[test]
    fn deserialize_dispatches_by_type_tag() {
        let engine = default_engine();
        let mut model = engine.new_model();
        engine
            .add_node(&mut model, kinds::START_NODE, "start".into(), &at("", 40.0, 40.0))
            .unwrap();
        let mut doc = engine.serialize_model(&model).unwrap();
        doc.nodes[0].props.remove(crate::factories::BORDER_COLOR_PROP);

        let restored = engine.deserialize_model(doc.clone()).unwrap();
        assert!(restored
            .node(&"start".into())
            .unwrap()
            .prop_str(crate::factories::BORDER_COLOR_PROP)
            .is_some());

        doc.nodes[0].type_tag = "approval".into();
        assert!(engine.deserialize_model(doc).unwrap_err().is_configuration());
    }

    #[test]
    fn save_and_load_through_engine() {
        let engine = default_engine();
        let mut model = engine.new_model();
        engine
            .add_node(&mut model, kinds::DEFAULT_NODE, "a".into(), &at("A", 40.0, 40.0))
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagram.json");

        engine.save_model(&model, &path).unwrap();
        let loaded = engine.load_model(&path).unwrap();
        assert_eq!(loaded.node(&"a".into()).unwrap().name(), "A");
    }
}
