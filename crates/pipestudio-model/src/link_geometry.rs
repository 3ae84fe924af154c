//! Per-link path geometry, waypoint editing, and segment hit-testing.

use pipestudio_geometry::{
    point_along_polyline, polyline_distance, polyline_length, polyline_path_data, segment_distance,
    BezierCurve, Point, Rect,
};
use pipestudio_types::{DiagramError, EntityCategory, EntityId, Result};

use crate::diagram::DiagramModel;
use crate::entity::Entity;
use crate::events::DiagramEvent;
use crate::link::{LinkModel, LinkPoint};

/// Coincident points closer than this make a link degenerate.
const DEGENERATE_EPSILON: f64 = 1e-6;

/// The rendered shape of a link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkPath {
    /// A two-point link, curved away from its ports.
    Curve(BezierCurve),
    /// A link with waypoints, drawn as straight segments.
    Polyline(Vec<Point>),
}

impl LinkPath {
    pub fn length(&self) -> f64 {
        match self {
            LinkPath::Curve(curve) => curve.length(),
            LinkPath::Polyline(points) => polyline_length(points),
        }
    }

    /// Point at `fraction` of the path's arc length.
    pub fn point_at_length(&self, fraction: f64) -> Point {
        match self {
            LinkPath::Curve(curve) => curve.point_at_length(fraction),
            LinkPath::Polyline(points) => point_along_polyline(points, fraction).unwrap_or_default(),
        }
    }

    /// Halfway along the path, measured by length rather than by averaging
    /// the end points.
    pub fn midpoint(&self) -> Point {
        self.point_at_length(0.5)
    }

    pub fn bounds(&self) -> Rect {
        match self {
            LinkPath::Curve(curve) => curve.bounds(),
            LinkPath::Polyline(points) => Rect::from_points(points.iter().copied()).unwrap_or_default(),
        }
    }

    pub fn distance_to(&self, point: Point) -> f64 {
        match self {
            LinkPath::Curve(curve) => curve.distance_to(point),
            LinkPath::Polyline(points) => polyline_distance(points, point).unwrap_or(f64::MAX),
        }
    }

    /// SVG path data.
    pub fn to_path_data(&self) -> String {
        match self {
            LinkPath::Curve(curve) => curve.to_path_data(),
            LinkPath::Polyline(points) => polyline_path_data(points),
        }
    }
}

impl DiagramModel {
    /// Path for a link, or `None` if the link is unknown or degenerate (its
    /// points all coincide, as at the very start of a drag).
    pub fn link_path(&self, id: &EntityId) -> Option<LinkPath> {
        let link = self.link(id)?;
        let points = link.positions();
        if points.len() == 2 {
            let (source, target) = (points[0], points[1]);
            if source.distance(target) < DEGENERATE_EPSILON {
                return None;
            }
            let curve = match link.elbow_x() {
                Some(elbow) => BezierCurve::with_elbow(source, target, elbow),
                None => BezierCurve::between_ports(
                    source,
                    link.source_port().and_then(|p| self.port(p)).map(|p| p.alignment()),
                    target,
                    link.target_port().and_then(|p| self.port(p)).map(|p| p.alignment()),
                    link.curvature(),
                ),
            };
            Some(LinkPath::Curve(curve))
        } else if polyline_length(&points) < DEGENERATE_EPSILON {
            None
        } else {
            Some(LinkPath::Polyline(points))
        }
    }

    /// Where a link's "add" control sits.
    pub fn link_midpoint(&self, id: &EntityId) -> Option<Point> {
        self.link_path(id).map(|path| path.midpoint())
    }

    fn editable_link(&mut self, id: &EntityId) -> Result<&mut LinkModel> {
        let link = self.link_mut(id).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Link,
            id: id.clone(),
        })?;
        if link.is_locked() {
            return Err(DiagramError::Locked { id: id.clone() });
        }
        Ok(link)
    }

    /// Insert a waypoint at `position`, on the segment closest to it.
    ///
    /// Rejected when the link is locked or its existing points (end points
    /// included) already exceed the configured maximum; the link is unchanged
    /// in both cases.
    pub fn insert_link_point(&mut self, id: &EntityId, position: Point) -> Result<EntityId> {
        let max = self.config().max_points_per_link;
        let link = self.editable_link(id)?;
        if link.points().len() > max {
            tracing::debug!(link = %id, max, "Rejected waypoint beyond point ceiling");
            return Err(DiagramError::PointLimit {
                link: id.clone(),
                max,
            });
        }

        let positions = link.positions();
        let index = positions
            .windows(2)
            .enumerate()
            .map(|(i, w)| (i + 1, segment_distance(position, w[0], w[1])))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .unwrap_or(1);

        let point = LinkPoint::new(position);
        let point_id = point.id.clone();
        link.insert_point(index, point);
        tracing::debug!(link = %id, index, "Waypoint inserted");
        Ok(point_id)
    }

    /// Remove a waypoint. End points cannot be removed; `Ok(false)` if the
    /// point is unknown or an end point.
    pub fn remove_link_point(&mut self, id: &EntityId, point: &EntityId) -> Result<bool> {
        let link = self.editable_link(id)?;
        let last = link.points().len() - 1;
        match link.points().iter().position(|p| &p.id == point) {
            Some(index) if index > 0 && index < last => {
                link.remove_point_at(index);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// The link whose widened hit band contains `point`, preferring the
    /// closest when bands overlap.
    ///
    /// The band is the stroke width plus the configured padding, centred on
    /// the path.
    pub fn link_at_segment(&self, point: Point) -> Option<EntityId> {
        let padding = self.config().link_hit_padding;
        self.links()
            .filter_map(|link| {
                let distance = self.link_path(link.id())?.distance_to(point);
                let band = (link.width() + padding) / 2.0;
                (distance <= band).then(|| (link.id().clone(), distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Activate a link's "add" control. Fires `addLinkClicked` on the link
    /// and on the diagram when the link allows insertion.
    pub fn add_link_clicked(&mut self, id: &EntityId) -> Result<bool> {
        let link = self.link_mut(id).ok_or_else(|| DiagramError::NotFound {
            category: EntityCategory::Link,
            id: id.clone(),
        })?;
        if !link.allow_add() {
            return Ok(false);
        }
        let event = DiagramEvent::AddLinkClicked { link: id.clone() };
        link.fire_event(event.clone());
        self.fire_event(event);
        Ok(true)
    }
}
