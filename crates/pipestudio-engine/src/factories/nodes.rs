use pipestudio_geometry::Size;
use pipestudio_model::grouping::ANCHOR_SIZE;
use pipestudio_model::node::DEFAULT_NODE_SIZE;
use pipestudio_model::{kinds, DiagramModel, NodeModel, NodeRecord, PortModel, RecordCodec, PORT_IN, PORT_OUT};
use pipestudio_types::{EntityId, Result};

use crate::registry::{Factory, NodeFactory, NodeOptions};
use crate::views::{NodeShape, NodeView};

pub const START_NODE_SIZE: Size = Size::new(40.0, 40.0);
pub const DIAMOND_NODE_SIZE: Size = Size::new(57.0, 57.0);
pub const CREATE_NEW_NAME: &str = "Add Step";
pub const DEFAULT_START_BORDER: &str = "var(--green-500)";

/// Start-node prop holding its border color.
pub const BORDER_COLOR_PROP: &str = "borderColor";

/// Build a node of `type_tag` from the options every kind shares.
fn base_node(type_tag: &str, id: EntityId, options: &NodeOptions, size: Size) -> NodeModel {
    let mut node = NodeModel::new(type_tag, id, options.name.clone())
        .with_size(options.size.unwrap_or(size))
        .with_icon(options.icon.clone())
        .with_secondary_icon(options.secondary_icon.clone())
        .with_custom_style(options.custom_style.clone())
        .with_allow_add(options.allow_add)
        .with_can_delete(options.can_delete);
    if let Some(position) = options.position {
        node = node.with_position(position);
    }
    node.props_mut().extend(options.props.clone());
    node
}

fn add_ports(node: &mut NodeModel, with_in: bool, with_out: bool) -> Result<()> {
    if with_in {
        node.add_port(PortModel::new(PORT_IN, true))?;
    }
    if with_out {
        node.add_port(PortModel::new(PORT_OUT, false))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// default
// ---------------------------------------------------------------------------

/// Ordinary pipeline step: a rectangle with one input and one output port.
pub struct DefaultNodeFactory;

impl Factory for DefaultNodeFactory {
    fn type_tag(&self) -> &str {
        kinds::DEFAULT_NODE
    }
}

impl NodeFactory for DefaultNodeFactory {
    fn generate_model(&self, id: EntityId, options: &NodeOptions) -> Result<NodeModel> {
        let mut node = base_node(kinds::DEFAULT_NODE, id, options, DEFAULT_NODE_SIZE);
        add_ports(&mut node, options.show_in_port, options.show_out_port)?;
        Ok(node)
    }

    fn generate_view(&self, node: &NodeModel, _diagram: &DiagramModel) -> NodeView {
        NodeView::from_node(node, NodeShape::Rectangle)
    }
}

// ---------------------------------------------------------------------------
// start
// ---------------------------------------------------------------------------

/// Pipeline entry point: a circle with a single output port and a
/// configurable border color.
pub struct StartNodeFactory;

impl Factory for StartNodeFactory {
    fn type_tag(&self) -> &str {
        kinds::START_NODE
    }
}

impl NodeFactory for StartNodeFactory {
    fn generate_model(&self, id: EntityId, options: &NodeOptions) -> Result<NodeModel> {
        let mut node = base_node(kinds::START_NODE, id, options, START_NODE_SIZE);
        let border = options
            .border_color
            .clone()
            .unwrap_or_else(|| DEFAULT_START_BORDER.to_string());
        node.props_mut().insert(BORDER_COLOR_PROP.into(), border.into());
        add_ports(&mut node, false, true)?;
        Ok(node)
    }

    fn generate_view(&self, node: &NodeModel, _diagram: &DiagramModel) -> NodeView {
        let mut view = NodeView::from_node(node, NodeShape::Circle);
        view.border_color = node.prop_str(BORDER_COLOR_PROP).map(str::to_string);
        view
    }

    fn deserialize(&self, record: NodeRecord, codec: &dyn RecordCodec) -> Result<NodeModel> {
        let mut node = record.into_node(codec)?;
        if node.prop_str(BORDER_COLOR_PROP).is_none() {
            node.props_mut()
                .insert(BORDER_COLOR_PROP.into(), DEFAULT_START_BORDER.into());
        }
        Ok(node)
    }
}

// ---------------------------------------------------------------------------
// diamond
// ---------------------------------------------------------------------------

/// Decision / approval step.
pub struct DiamondNodeFactory;

impl Factory for DiamondNodeFactory {
    fn type_tag(&self) -> &str {
        kinds::DIAMOND_NODE
    }
}

impl NodeFactory for DiamondNodeFactory {
    fn generate_model(&self, id: EntityId, options: &NodeOptions) -> Result<NodeModel> {
        let mut node = base_node(kinds::DIAMOND_NODE, id, options, DIAMOND_NODE_SIZE);
        add_ports(&mut node, options.show_in_port, options.show_out_port)?;
        Ok(node)
    }

    fn generate_view(&self, node: &NodeModel, _diagram: &DiagramModel) -> NodeView {
        NodeView::from_node(node, NodeShape::Diamond)
    }
}

// ---------------------------------------------------------------------------
// create-new
// ---------------------------------------------------------------------------

/// Trailing "add a step" placeholder. Only has an input port and can never
/// be deleted by the user.
pub struct CreateNewNodeFactory;

impl Factory for CreateNewNodeFactory {
    fn type_tag(&self) -> &str {
        kinds::CREATE_NEW_NODE
    }
}

impl NodeFactory for CreateNewNodeFactory {
    fn generate_model(&self, id: EntityId, options: &NodeOptions) -> Result<NodeModel> {
        let mut options = options.clone();
        if options.name.is_empty() {
            options.name = CREATE_NEW_NAME.to_string();
        }
        options.can_delete = false;
        let mut node = base_node(kinds::CREATE_NEW_NODE, id, &options, DEFAULT_NODE_SIZE);
        add_ports(&mut node, true, false)?;
        Ok(node)
    }

    fn generate_view(&self, node: &NodeModel, _diagram: &DiagramModel) -> NodeView {
        NodeView::from_node(node, NodeShape::Placeholder)
    }
}

// ---------------------------------------------------------------------------
// empty-anchor
// ---------------------------------------------------------------------------

/// Invisible attachment point at the start or end of a grouping layer.
pub struct EmptyAnchorNodeFactory;

impl Factory for EmptyAnchorNodeFactory {
    fn type_tag(&self) -> &str {
        kinds::EMPTY_ANCHOR_NODE
    }
}

impl NodeFactory for EmptyAnchorNodeFactory {
    fn generate_model(&self, id: EntityId, options: &NodeOptions) -> Result<NodeModel> {
        let mut node = base_node(kinds::EMPTY_ANCHOR_NODE, id, options, ANCHOR_SIZE);
        add_ports(&mut node, true, true)?;
        Ok(node)
    }

    fn generate_view(&self, node: &NodeModel, _diagram: &DiagramModel) -> NodeView {
        NodeView::from_node(node, NodeShape::Anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipestudio_geometry::Point;
    use pipestudio_model::StructuralCodec;

    #[test]
    fn default_node_has_both_ports() {
        let node = DefaultNodeFactory
            .generate_model("build".into(), &NodeOptions::named("Build"))
            .unwrap();
        assert_eq!(node.size(), DEFAULT_NODE_SIZE);
        assert_eq!(node.in_port().unwrap().name(), PORT_IN);
        assert_eq!(node.out_port().unwrap().name(), PORT_OUT);
    }

    #[test]
    fn hidden_ports_are_not_created() {
        let options = NodeOptions {
            show_in_port: false,
            ..NodeOptions::named("Source")
        };
        let node = DefaultNodeFactory.generate_model("src".into(), &options).unwrap();
        assert!(node.in_port().is_none());
        assert!(node.out_port().is_some());
    }

    #[test]
    fn start_node_carries_border_color() {
        let options = NodeOptions {
            border_color: Some("#00ff00".into()),
            position: Some(Point::new(10.0, 20.0)),
            ..NodeOptions::default()
        };
        let node = StartNodeFactory.generate_model("start".into(), &options).unwrap();
        assert_eq!(node.prop_str(BORDER_COLOR_PROP), Some("#00ff00"));
        assert_eq!(node.size(), START_NODE_SIZE);
        assert_eq!(node.position(), Point::new(10.0, 20.0));
        assert!(node.in_port().is_none());

        let view = StartNodeFactory.generate_view(&node, &DiagramModel::new());
        assert_eq!(view.shape, NodeShape::Circle);
        assert_eq!(view.border_color.as_deref(), Some("#00ff00"));
    }

    #[test]
    fn start_node_record_without_border_gets_default() {
        let node = StartNodeFactory
            .generate_model("start".into(), &NodeOptions::default())
            .unwrap();
        let mut record = NodeRecord::from_node(&node, &StructuralCodec).unwrap();
        record.props.remove(BORDER_COLOR_PROP);

        let restored = StartNodeFactory.deserialize(record, &StructuralCodec).unwrap();
        assert_eq!(restored.prop_str(BORDER_COLOR_PROP), Some(DEFAULT_START_BORDER));
    }

    #[test]
    fn create_new_is_undeletable_placeholder() {
        let options = NodeOptions {
            can_delete: true,
            ..NodeOptions::default()
        };
        let node = CreateNewNodeFactory.generate_model("add".into(), &options).unwrap();
        assert_eq!(node.name(), CREATE_NEW_NAME);
        assert!(!node.can_delete());
        assert!(node.out_port().is_none());
        assert!(node.in_port().is_some());
    }

    #[test]
    fn kind_props_are_copied() {
        let mut options = NodeOptions::named("Approve");
        options.props.insert("stepType".into(), serde_json::json!("Approval"));
        let node = DiamondNodeFactory.generate_model("gate".into(), &options).unwrap();
        assert_eq!(node.prop_str("stepType"), Some("Approval"));
        assert_eq!(node.size(), DIAMOND_NODE_SIZE);
    }
}
