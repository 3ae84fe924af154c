//! Directed links between ports.

use pipestudio_geometry::Point;
use pipestudio_types::{DiagramError, EntityCategory, EntityId, Result};

use crate::entity::{Entity, EntityBase};
use crate::events::DiagramEvent;
use crate::label::LabelModel;

pub const DEFAULT_LINK: &str = "default";

pub const DEFAULT_LINK_COLOR: &str = "#9ca3af";
pub const DEFAULT_LINK_SELECTED_COLOR: &str = "#0278d5";
pub const DEFAULT_LINK_WIDTH: f64 = 2.0;
pub const DEFAULT_LINK_CURVATURE: f64 = 50.0;

/// A point on a link. The first and last points are the endpoints; anything
/// in between is a user-inserted waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPoint {
    pub id: EntityId,
    pub position: Point,
}

impl LinkPoint {
    pub fn new(position: Point) -> Self {
        Self {
            id: EntityId::generate(),
            position,
        }
    }
}

/// A directed edge from an optional source port to an optional target port.
///
/// A link always holds at least two points. While both endpoints are
/// attached, the first and last points coincide with the ports' positions;
/// the diagram model keeps them in sync.
#[derive(Debug)]
pub struct LinkModel {
    base: EntityBase,
    source_port: Option<EntityId>,
    target_port: Option<EntityId>,
    points: Vec<LinkPoint>,
    color: String,
    selected_color: String,
    width: f64,
    curvature: f64,
    dash_pattern: Option<String>,
    allow_add: bool,
    /// Shared bend line for fan-in links.
    elbow_x: Option<f64>,
    label: Option<LabelModel>,
}

impl LinkModel {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), type_tag)
    }

    pub fn with_id(id: EntityId, type_tag: impl Into<String>) -> Self {
        Self {
            base: EntityBase::new(id, type_tag),
            source_port: None,
            target_port: None,
            points: vec![LinkPoint::new(Point::default()), LinkPoint::new(Point::default())],
            color: DEFAULT_LINK_COLOR.to_string(),
            selected_color: DEFAULT_LINK_SELECTED_COLOR.to_string(),
            width: DEFAULT_LINK_WIDTH,
            curvature: DEFAULT_LINK_CURVATURE,
            dash_pattern: None,
            allow_add: false,
            elbow_x: None,
            label: None,
        }
    }

    /// Link from `source` to `target`; endpoints are positioned when the link
    /// is added to a diagram.
    pub fn between(mut self, source: EntityId, target: EntityId) -> Self {
        self.source_port = Some(source);
        self.target_port = Some(target);
        self
    }

    pub fn with_source_port(mut self, source: EntityId) -> Self {
        self.source_port = Some(source);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_selected_color(mut self, color: impl Into<String>) -> Self {
        self.selected_color = color.into();
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_curvature(mut self, curvature: f64) -> Self {
        self.curvature = curvature;
        self
    }

    pub fn with_dash_pattern(mut self, dash: Option<String>) -> Self {
        self.dash_pattern = dash;
        self
    }

    pub fn with_allow_add(mut self, allow_add: bool) -> Self {
        self.allow_add = allow_add;
        self
    }

    /// Replace every point. Fewer than two points are padded by repeating the
    /// last one (or the origin).
    pub fn with_points(mut self, mut points: Vec<LinkPoint>) -> Self {
        while points.len() < 2 {
            let p = points.last().map(|p| p.position).unwrap_or_default();
            points.push(LinkPoint::new(p));
        }
        self.points = points;
        self
    }

    // --- accessors ---

    pub fn source_port(&self) -> Option<&EntityId> {
        self.source_port.as_ref()
    }

    pub fn target_port(&self) -> Option<&EntityId> {
        self.target_port.as_ref()
    }

    pub fn points(&self) -> &[LinkPoint] {
        &self.points
    }

    pub fn positions(&self) -> Vec<Point> {
        self.points.iter().map(|p| p.position).collect()
    }

    pub fn first_point(&self) -> Point {
        self.points[0].position
    }

    pub fn last_point(&self) -> Point {
        self.points[self.points.len() - 1].position
    }

    /// A two-point link without a target port is still being dragged.
    pub fn is_dangling(&self) -> bool {
        self.points.len() == 2 && self.target_port.is_none()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn selected_color(&self) -> &str {
        &self.selected_color
    }

    /// Stroke colour for the current selection state.
    pub fn stroke_color(&self) -> &str {
        if self.is_selected() {
            &self.selected_color
        } else {
            &self.color
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    pub fn dash_pattern(&self) -> Option<&str> {
        self.dash_pattern.as_deref()
    }

    pub fn allow_add(&self) -> bool {
        self.allow_add
    }

    pub fn set_allow_add(&mut self, allow_add: bool) {
        self.allow_add = allow_add;
    }

    pub fn elbow_x(&self) -> Option<f64> {
        self.elbow_x
    }

    pub fn set_elbow_x(&mut self, elbow_x: Option<f64>) {
        self.elbow_x = elbow_x;
    }

    pub fn label(&self) -> Option<&LabelModel> {
        self.label.as_ref()
    }

    /// Attach a label, replacing (and removing) any previous one.
    pub fn set_label(&mut self, label: LabelModel) -> Result<Option<LabelModel>> {
        self.ensure_unlocked()?;
        let previous = self.label.replace(label);
        Ok(previous.map(|mut old| {
            old.remove();
            old
        }))
    }

    pub fn take_label(&mut self) -> Result<Option<LabelModel>> {
        self.ensure_unlocked()?;
        Ok(self.label.take())
    }

    // --- styling ---

    fn ensure_unlocked(&self) -> Result<()> {
        if self.is_locked() {
            tracing::debug!(link = %self.id(), "Rejected change to locked link");
            return Err(DiagramError::Locked { id: self.id().clone() });
        }
        Ok(())
    }

    pub fn set_color(&mut self, color: impl Into<String>) -> Result<()> {
        self.ensure_unlocked()?;
        let color = color.into();
        if self.color == color {
            return Ok(());
        }
        self.color = color.clone();
        let entity = self.id().clone();
        self.fire_event(DiagramEvent::ColorChanged { entity, color });
        Ok(())
    }

    pub fn set_selected_color(&mut self, color: impl Into<String>) -> Result<()> {
        self.ensure_unlocked()?;
        self.selected_color = color.into();
        Ok(())
    }

    pub fn set_width(&mut self, width: f64) -> Result<()> {
        self.ensure_unlocked()?;
        if self.width == width {
            return Ok(());
        }
        self.width = width;
        let entity = self.id().clone();
        self.fire_event(DiagramEvent::WidthChanged { entity, width });
        Ok(())
    }

    pub fn set_curvature(&mut self, curvature: f64) -> Result<()> {
        self.ensure_unlocked()?;
        self.curvature = curvature;
        Ok(())
    }

    // --- structure (kept consistent by the diagram model) ---

    pub(crate) fn set_source(&mut self, port: Option<EntityId>) {
        self.source_port = port;
    }

    pub(crate) fn set_target(&mut self, port: Option<EntityId>) {
        self.target_port = port;
    }

    pub(crate) fn set_first_point(&mut self, position: Point) {
        self.points[0].position = position;
    }

    pub(crate) fn set_last_point(&mut self, position: Point) {
        let last = self.points.len() - 1;
        self.points[last].position = position;
    }

    pub(crate) fn insert_point(&mut self, index: usize, point: LinkPoint) {
        self.points.insert(index, point);
        self.fire_points_updated();
    }

    pub(crate) fn remove_point_at(&mut self, index: usize) -> LinkPoint {
        let point = self.points.remove(index);
        self.fire_points_updated();
        point
    }

    fn fire_points_updated(&mut self) {
        let link = self.id().clone();
        let count = self.points.len();
        self.fire_event(DiagramEvent::PointsUpdated { link, count });
    }
}

impl Entity for LinkModel {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn category(&self) -> EntityCategory {
        EntityCategory::Link
    }

    fn remove(&mut self) -> bool {
        if self.is_removed() {
            return false;
        }
        if let Some(label) = self.label.as_mut() {
            label.remove();
        }
        self.base_mut().mark_removed(EntityCategory::Link)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::events::EventKind;

    #[test]
    fn new_link_is_dangling() {
        let link = LinkModel::new(DEFAULT_LINK);
        assert_eq!(link.points().len(), 2);
        assert!(link.is_dangling());

        let attached = LinkModel::new(DEFAULT_LINK).between("a".into(), "b".into());
        assert!(!attached.is_dangling());
    }

    #[test]
    fn with_points_pads_to_two() {
        let link = LinkModel::new(DEFAULT_LINK).with_points(vec![LinkPoint::new(Point::new(3.0, 4.0))]);
        assert_eq!(link.positions(), vec![Point::new(3.0, 4.0), Point::new(3.0, 4.0)]);
    }

    #[test]
    fn color_and_width_changes_fire_events() {
        let mut link = LinkModel::new(DEFAULT_LINK);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::ColorChanged, EventKind::WidthChanged] {
            let s = Rc::clone(&seen);
            link.add_listener(kind, move |e| s.borrow_mut().push(e.kind()));
        }

        link.set_color("#ff0000").unwrap();
        link.set_color("#ff0000").unwrap();
        link.set_width(4.0).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![EventKind::ColorChanged, EventKind::WidthChanged]
        );
    }

    #[test]
    fn stroke_color_follows_selection() {
        let mut link = LinkModel::new(DEFAULT_LINK);
        assert_eq!(link.stroke_color(), DEFAULT_LINK_COLOR);
        link.set_selected(true);
        assert_eq!(link.stroke_color(), DEFAULT_LINK_SELECTED_COLOR);
    }

    #[test]
    fn removing_link_removes_its_label() {
        let mut link = LinkModel::new(DEFAULT_LINK);
        link.set_label(LabelModel::new("on success")).unwrap();
        assert!(link.remove());
        assert!(link.label().unwrap().is_removed());
    }

    #[test]
    fn replacing_label_removes_previous() {
        let mut link = LinkModel::new(DEFAULT_LINK);
        link.set_label(LabelModel::new("a")).unwrap();
        let old = link.set_label(LabelModel::new("b")).unwrap().unwrap();
        assert!(old.is_removed());
        assert_eq!(link.label().unwrap().text(), "b");
    }

    #[test]
    fn locked_link_rejects_styling_and_label_changes() {
        let mut link = LinkModel::new(DEFAULT_LINK).with_width(3.0);
        link.set_label(LabelModel::new("on success")).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::ColorChanged, EventKind::WidthChanged] {
            let s = Rc::clone(&seen);
            link.add_listener(kind, move |e| s.borrow_mut().push(e.kind()));
        }
        link.set_locked(true);

        assert!(matches!(link.set_color("#ff0000"), Err(DiagramError::Locked { .. })));
        assert!(link.set_selected_color("#00ff00").unwrap_err().is_rejection());
        assert!(link.set_width(6.0).unwrap_err().is_rejection());
        assert!(link.set_curvature(10.0).unwrap_err().is_rejection());
        assert!(link.set_label(LabelModel::new("on failure")).unwrap_err().is_rejection());
        assert!(link.take_label().unwrap_err().is_rejection());

        assert_eq!(link.color(), DEFAULT_LINK_COLOR);
        assert_eq!(link.selected_color(), DEFAULT_LINK_SELECTED_COLOR);
        assert_eq!(link.width(), 3.0);
        assert_eq!(link.curvature(), DEFAULT_LINK_CURVATURE);
        assert_eq!(link.label().unwrap().text(), "on success");
        assert!(seen.borrow().is_empty());
    }
}
