//! Geometric primitives for diagram layout, link curves, and hit-testing.
//!
//! - [`Point`] - A 2D coordinate in canvas space
//! - [`Size`] - Width and height dimensions
//! - [`Rect`] - An axis-aligned bounding box
//! - [`PortAlignment`] - The node edge a port sits on
//! - [`BezierCurve`] - The cubic curve drawn for a two-point link
//!
//! Coordinates follow the SVG convention: origin at the top-left, X grows to
//! the right and Y grows downward.

mod bezier;
mod polyline;

pub use bezier::BezierCurve;
pub use polyline::{point_along_polyline, polyline_distance, polyline_length, polyline_path_data};

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A 2D point in canvas coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the midpoint between this point and another point
    pub fn midpoint(self, other: Point) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn scale(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Linear interpolation: `t = 0` yields `self`, `t = 1` yields `other`.
    pub fn lerp(self, other: Point, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle defined by its minimum and maximum corners.
///
/// Containment is inclusive on every edge, so a zero-height box still
/// contains the points on its line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
        }
    }

    /// Rectangle whose top-left corner is `origin`.
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x + size.width,
            origin.y + size.height,
        )
    }

    /// Smallest rectangle containing every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for p in iter {
            rect.min_x = rect.min_x.min(p.x);
            rect.min_y = rect.min_y.min(p.y);
            rect.max_x = rect.max_x.max(p.x);
            rect.max_y = rect.max_y.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn origin(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Point-in-rectangle test, inclusive of the border.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn merge(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow the rectangle by `padding` on every side.
    pub fn expand(&self, padding: f64) -> Rect {
        Rect::new(
            self.min_x - padding,
            self.min_y - padding,
            self.max_x + padding,
            self.max_y + padding,
        )
    }
}

/// The node edge a port is attached to.
///
/// Links leave and enter a port perpendicular to its edge, so the alignment
/// decides which way a curve's control point is pulled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortAlignment {
    Top,
    Bottom,
    Left,
    Right,
}

impl PortAlignment {
    /// Offset vector from a port to its curve control point.
    pub fn control_offset(self, curvature: f64) -> Point {
        match self {
            PortAlignment::Right => Point::new(curvature, 0.0),
            PortAlignment::Left => Point::new(-curvature, 0.0),
            PortAlignment::Top => Point::new(0.0, -curvature),
            PortAlignment::Bottom => Point::new(0.0, curvature),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            PortAlignment::Top => PortAlignment::Bottom,
            PortAlignment::Bottom => PortAlignment::Top,
            PortAlignment::Left => PortAlignment::Right,
            PortAlignment::Right => PortAlignment::Left,
        }
    }
}

/// Shortest distance from `point` to the segment `a`–`b`.
pub fn segment_distance(point: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let ap = point - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq < f64::EPSILON {
        // Degenerate segment
        return point.distance(a);
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    point.distance(a.lerp(b, t))
}


#[cfg(test)]
mod proptest_tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    fn coord() -> impl Strategy<Value = f64> {
        -1000.0f64..1000.0
    }

    fn point() -> impl Strategy<Value = Point> {
        (coord(), coord()).prop_map(|(x, y)| Point::new(x, y))
    }

    proptest! {
        #[test]
        fn rect_from_points_contains_every_point(points in prop::collection::vec(point(), 1..20)) {
            let rect = Rect::from_points(points.iter().copied()).unwrap();
            for p in &points {
                prop_assert!(rect.contains(*p));
            }
        }

        #[test]
        fn merge_is_commutative(a in point(), b in point(), c in point(), d in point()) {
            let r1 = Rect::new(a.x, a.y, b.x, b.y);
            let r2 = Rect::new(c.x, c.y, d.x, d.y);
            prop_assert_eq!(r1.merge(&r2), r2.merge(&r1));
        }

        #[test]
        fn midpoint_is_equidistant(a in point(), b in point()) {
            let mid = a.midpoint(b);
            prop_assert!(approx_eq!(f64, a.distance(mid), b.distance(mid), epsilon = 1e-9));
        }

        #[test]
        fn segment_distance_never_exceeds_endpoint_distance(p in point(), a in point(), b in point()) {
            let d = segment_distance(p, a, b);
            prop_assert!(d <= p.distance(a) + 1e-9);
            prop_assert!(d <= p.distance(b) + 1e-9);
        }
    }
}
