//! Helpers for links drawn as straight segments through their waypoints.

use crate::{segment_distance, Point};

/// Total length of the polyline through `points`.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Point at `fraction` (clamped to `[0, 1]`) of the polyline's length.
///
/// Returns `None` for an empty slice.
pub fn point_along_polyline(points: &[Point], fraction: f64) -> Option<Point> {
    let first = *points.first()?;
    let total = polyline_length(points);
    if total <= f64::EPSILON {
        return Some(first);
    }
    let mut remaining = total * fraction.clamp(0.0, 1.0);
    for w in points.windows(2) {
        let seg = w[0].distance(w[1]);
        if remaining <= seg {
            if seg <= f64::EPSILON {
                return Some(w[0]);
            }
            return Some(w[0].lerp(w[1], remaining / seg));
        }
        remaining -= seg;
    }
    points.last().copied()
}

/// Shortest distance from `point` to any segment of the polyline.
pub fn polyline_distance(points: &[Point], point: Point) -> Option<f64> {
    match points {
        [] => None,
        [only] => Some(only.distance(point)),
        _ => Some(
            points
                .windows(2)
                .map(|w| segment_distance(point, w[0], w[1]))
                .fold(f64::MAX, f64::min),
        ),
    }
}

/// SVG path data: `M x0 y0 L x1 y1 L ...`.
pub fn polyline_path_data(points: &[Point]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}{} {}", if i == 0 { "M" } else { "L" }, p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}
