//! Cubic Bezier curves for two-point links.

use crate::{segment_distance, Point, PortAlignment, Rect};

/// Number of line segments used to approximate a curve for length, bounds and
/// hit-testing.
const SAMPLES: usize = 32;

/// A cubic Bezier curve from `source` to `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierCurve {
    pub source: Point,
    pub source_control: Point,
    pub target_control: Point,
    pub target: Point,
}

impl BezierCurve {
    pub fn new(source: Point, target: Point, source_control: Point, target_control: Point) -> Self {
        Self {
            source,
            source_control,
            target_control,
            target,
        }
    }

    /// Curve whose control points are pulled `curvature` away from each end
    /// along the port alignment.
    ///
    /// An unattached source behaves like a right-aligned port and an
    /// unattached target like a left-aligned one, which matches the
    /// left-to-right flow of a pipeline.
    pub fn between_ports(
        source: Point,
        source_alignment: Option<PortAlignment>,
        target: Point,
        target_alignment: Option<PortAlignment>,
        curvature: f64,
    ) -> Self {
        let source_offset = source_alignment
            .unwrap_or(PortAlignment::Right)
            .control_offset(curvature);
        let target_offset = target_alignment
            .unwrap_or(PortAlignment::Left)
            .control_offset(curvature);
        Self::new(source, target, source + source_offset, target + target_offset)
    }

    /// Curve that bends at a shared vertical line `x = elbow_x`.
    ///
    /// Used for fan-in so every incoming link turns at the same place.
    pub fn with_elbow(source: Point, target: Point, elbow_x: f64) -> Self {
        Self::new(
            source,
            target,
            Point::new(elbow_x, source.y),
            Point::new(elbow_x, target.y),
        )
    }

    /// Evaluate the curve at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.source.x + b * self.source_control.x + c * self.target_control.x + d * self.target.x,
            a * self.source.y + b * self.source_control.y + c * self.target_control.y + d * self.target.y,
        )
    }

    /// `segments + 1` evenly spaced (in `t`) points along the curve.
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect()
    }

    /// Approximate arc length.
    pub fn length(&self) -> f64 {
        crate::polyline_length(&self.sample(SAMPLES))
    }

    /// Point at `fraction` of the curve's arc length.
    ///
    /// Unlike `point_at(0.5)` this accounts for uneven parameter speed, so
    /// `point_at_length(0.5)` is the visual middle of the curve.
    pub fn point_at_length(&self, fraction: f64) -> Point {
        crate::point_along_polyline(&self.sample(SAMPLES), fraction)
            .unwrap_or(self.source)
    }

    /// Bounding box of the sampled curve.
    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.sample(SAMPLES)).unwrap_or_default()
    }

    /// Approximate shortest distance from `point` to the curve.
    pub fn distance_to(&self, point: Point) -> f64 {
        self.sample(SAMPLES)
            .windows(2)
            .map(|w| segment_distance(point, w[0], w[1]))
            .fold(f64::MAX, f64::min)
    }

    /// SVG path data: `M sx sy C c1x c1y, c2x c2y, tx ty`.
    pub fn to_path_data(&self) -> String {
        format!(
            "M{} {} C{} {}, {} {}, {} {}",
            self.source.x,
            self.source.y,
            self.source_control.x,
            self.source_control.y,
            self.target_control.x,
            self.target_control.y,
            self.target.x,
            self.target.y
        )
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn between_ports_uses_alignment_offsets() {
        let curve = BezierCurve::between_ports(
            Point::new(0.0, 0.0),
            Some(PortAlignment::Bottom),
            Point::new(100.0, 100.0),
            Some(PortAlignment::Top),
            40.0,
        );
        assert_eq!(curve.source_control, Point::new(0.0, 40.0));
        assert_eq!(curve.target_control, Point::new(100.0, 60.0));
    }

    #[test]
    fn between_ports_defaults_to_left_to_right() {
        let curve = BezierCurve::between_ports(
            Point::new(0.0, 0.0),
            None,
            Point::new(200.0, 0.0),
            None,
            50.0,
        );
        assert_eq!(curve.source_control, Point::new(50.0, 0.0));
        assert_eq!(curve.target_control, Point::new(150.0, 0.0));
    }

    #[test]
    fn straight_curve_length_and_midpoint() {
        let curve = BezierCurve::new(
            Point::new(0.0, 0.0),
            Point::new(90.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(60.0, 0.0),
        );
        assert!(approx_eq!(f64, curve.length(), 90.0, epsilon = 1e-6));
        let mid = curve.point_at_length(0.5);
        assert!(approx_eq!(f64, mid.x, 45.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, mid.y, 0.0, epsilon = 1e-9));
    }

    #[test]
    fn elbow_curve_controls_share_x() {
        let curve = BezierCurve::with_elbow(Point::new(0.0, 0.0), Point::new(100.0, 80.0), 60.0);
        assert_eq!(curve.source_control, Point::new(60.0, 0.0));
        assert_eq!(curve.target_control, Point::new(60.0, 80.0));
    }

    #[test]
    fn distance_to_curve_is_zero_on_curve() {
        let curve = BezierCurve::between_ports(
            Point::new(0.0, 0.0),
            None,
            Point::new(100.0, 50.0),
            None,
            50.0,
        );
        let on = curve.point_at(0.25);
        assert!(curve.distance_to(on) < 1.0);
        assert!(curve.distance_to(Point::new(50.0, 200.0)) > 100.0);
    }

    #[test]
    fn path_data_format() {
        let curve = BezierCurve::new(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(5.0, 0.0),
            Point::new(5.0, 10.0),
        );
        assert_eq!(curve.to_path_data(), "M0 0 C5 0, 5 10, 10 10");
    }

    proptest! {
        #[test]
        fn curve_interpolates_its_endpoints(
            sx in -500.0f64..500.0, sy in -500.0f64..500.0,
            tx in -500.0f64..500.0, ty in -500.0f64..500.0,
            curvature in 0.0f64..200.0,
        ) {
            let curve = BezierCurve::between_ports(
                Point::new(sx, sy), None, Point::new(tx, ty), None, curvature,
            );
            let start = curve.point_at(0.0);
            let end = curve.point_at(1.0);
            prop_assert!(approx_eq!(f64, start.x, sx, epsilon = 1e-9));
            prop_assert!(approx_eq!(f64, start.y, sy, epsilon = 1e-9));
            prop_assert!(approx_eq!(f64, end.x, tx, epsilon = 1e-9));
            prop_assert!(approx_eq!(f64, end.y, ty, epsilon = 1e-9));
            prop_assert!(curve.bounds().expand(1e-6).contains(curve.point_at_length(0.5)));
        }
    }
}
