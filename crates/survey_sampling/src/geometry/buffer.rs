//! Outward buffering of geometries.
//!
//! Dilation by a disk is assembled from primitive pieces and merged with
//! boolean union: the original area, one capsule per boundary edge and one
//! circle per vertex. The disk is approximated by a regular polygon with a
//! configurable segment count, so buffered outlines are slightly inscribed,
//! matching the segmentized buffers of common GIS backends.
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use glam::DVec2;

use crate::error::{Error, Result};
use crate::geometry::{coord, dvec, Geometry};

/// Circle polygon with `segments` vertices around `center`.
pub(crate) fn circle(center: DVec2, radius: f64, segments: usize) -> Polygon<f64> {
    let segments = segments.max(8);
    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(segments + 1);
    for i in 0..segments {
        let theta = i as f64 * (2.0 * std::f64::consts::PI / segments as f64);
        ring.push(coord(center + radius * DVec2::new(theta.cos(), theta.sin())));
    }
    ring.push(ring[0]);
    Polygon::new(LineString::from(ring), Vec::new())
}

/// Rectangle covering one edge offset by `distance` on both sides.
///
/// Joins between consecutive edges are covered by the vertex circles, so the
/// rectangle alone does not need mitering.
fn edge_rectangle(a: DVec2, b: DVec2, distance: f64) -> Option<Polygon<f64>> {
    let direction = b - a;
    let length = direction.length();
    if length <= f64::EPSILON {
        return None;
    }
    let normal = DVec2::new(-direction.y, direction.x) / length * distance;
    let ring = vec![
        coord(a + normal),
        coord(b + normal),
        coord(b - normal),
        coord(a - normal),
        coord(a + normal),
    ];
    Some(Polygon::new(LineString::from(ring), Vec::new()))
}

fn ring_pieces(ring: &LineString<f64>, distance: f64, segments: usize, out: &mut Vec<Polygon<f64>>) {
    for line in ring.lines() {
        if let Some(rect) = edge_rectangle(dvec(line.start), dvec(line.end), distance) {
            out.push(rect);
        }
    }
    for vertex in ring.coords() {
        out.push(circle(dvec(*vertex), distance, segments));
    }
}

fn merge(pieces: Vec<Polygon<f64>>) -> Result<MultiPolygon<f64>> {
    let mut pieces = pieces.into_iter();
    let first = pieces
        .next()
        .ok_or_else(|| Error::Geometry("buffer produced no geometry".into()))?;
    let mut merged = MultiPolygon::new(vec![first]);
    for piece in pieces {
        merged = merged.union(&MultiPolygon::new(vec![piece]));
    }
    if merged.0.is_empty() {
        return Err(Error::Geometry("buffer produced an empty geometry".into()));
    }
    Ok(merged)
}

/// Outward buffer of `geometry` by `distance`.
pub(crate) fn dilate(geometry: &Geometry, distance: f64, segments: usize) -> Result<Geometry> {
    if !distance.is_finite() || distance < 0.0 {
        return Err(Error::Geometry(format!(
            "buffer distance must be finite and non-negative, got {distance}"
        )));
    }
    if distance == 0.0 {
        return Ok(geometry.clone());
    }

    let mut pieces: Vec<Polygon<f64>> = Vec::new();
    match geometry {
        Geometry::Point(g) => {
            return Ok(Geometry::Polygon(circle(
                DVec2::new(g.x(), g.y()),
                distance,
                segments,
            )))
        }
        Geometry::Line(g) => ring_pieces(g, distance, segments, &mut pieces),
        Geometry::Polygon(g) => {
            pieces.push(g.clone());
            for ring in geometry.rings() {
                ring_pieces(ring, distance, segments, &mut pieces);
            }
        }
        Geometry::MultiPolygon(g) => {
            pieces.extend(g.0.iter().cloned());
            for ring in geometry.rings() {
                ring_pieces(ring, distance, segments, &mut pieces);
            }
        }
    }

    Ok(Geometry::MultiPolygon(merge(pieces)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_buffer_is_a_circle_of_requested_radius() {
        let buffered = Geometry::point(DVec2::new(3.0, 4.0))
            .buffer(2.0, 64)
            .unwrap();
        assert!(buffered.contains(DVec2::new(3.0, 4.0)));
        assert!(buffered.contains(DVec2::new(4.9, 4.0)));
        assert!(!buffered.contains(DVec2::new(5.1, 4.0)));
        // Inscribed polygon area approaches pi * r^2 from below.
        let area = buffered.area();
        assert!(area > 0.98 * std::f64::consts::PI * 4.0);
        assert!(area <= std::f64::consts::PI * 4.0 + 1e-9);
    }

    #[test]
    fn polygon_buffer_grows_the_square_on_every_side() {
        let square = Geometry::rectangle(DVec2::ZERO, DVec2::new(10.0, 10.0));
        let buffered = square.buffer(2.0, 32).unwrap();

        assert!(buffered.contains(DVec2::new(-1.9, 5.0)));
        assert!(buffered.contains(DVec2::new(11.9, 5.0)));
        assert!(buffered.contains(DVec2::new(5.0, -1.9)));
        assert!(!buffered.contains(DVec2::new(-2.5, 5.0)));
        // Corner is rounded: the full diagonal offset is outside.
        assert!(!buffered.contains(DVec2::new(-1.9, -1.9)));
        assert!(buffered.contains(DVec2::new(-1.3, -1.3)));
    }

    #[test]
    fn zero_distance_returns_the_original_shape() {
        let square = Geometry::rectangle(DVec2::ZERO, DVec2::new(10.0, 10.0));
        let buffered = square.buffer(0.0, 32).unwrap();
        assert!((buffered.area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn negative_distance_is_rejected() {
        let square = Geometry::rectangle(DVec2::ZERO, DVec2::new(10.0, 10.0));
        assert!(square.buffer(-1.0, 32).is_err());
    }

    #[test]
    fn multi_polygon_buffer_keeps_distant_parts_separate() {
        let a = Geometry::rectangle(DVec2::ZERO, DVec2::new(10.0, 10.0));
        let b = Geometry::rectangle(DVec2::new(40.0, 0.0), DVec2::new(50.0, 10.0));
        let combined = crate::geometry::union(&[a, b]).unwrap();
        let buffered = combined.buffer(1.0, 32).unwrap();
        assert!(buffered.contains(DVec2::new(10.9, 5.0)));
        assert!(buffered.contains(DVec2::new(39.1, 5.0)));
        assert!(!buffered.contains(DVec2::new(25.0, 5.0)));
    }
}
