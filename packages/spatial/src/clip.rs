//! Polygon clipping against a [`Boundary`].
//!
//! Parcels (rice fields and other area features) are intersected with the
//! boundary polygon using [`geo::BooleanOps`], which handles non-convex
//! and multi-part shapes. Subjects are validated first; degenerate or
//! self-intersecting parcels are reported as a [`GeometryError`] the
//! caller can skip.

use geo::{
    Area, BooleanOps, Coord, Line, LineString, MultiPolygon, Polygon,
    line_intersection::{LineIntersection, line_intersection},
};
use rstar::Envelope;

use crate::{Boundary, GeometryError, compute_envelope, dedup_ring};

impl Boundary {
    /// Intersects `subject` with the boundary polygon.
    ///
    /// Returns `Ok(None)` when the intersection is empty (including when
    /// the bounding boxes do not overlap). Zero-area slivers produced by
    /// edge-touching shapes are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if any polygon of `subject` is invalid
    /// (see [`validate_polygon`]).
    pub fn clip(
        &self,
        subject: &MultiPolygon<f64>,
    ) -> Result<Option<MultiPolygon<f64>>, GeometryError> {
        for polygon in &subject.0 {
            validate_polygon(polygon)?;
        }

        let overlaps = subject
            .0
            .iter()
            .any(|polygon| compute_envelope(polygon).intersects(&self.envelope()));
        if !overlaps {
            return Ok(None);
        }

        let clipped = subject.intersection(self.polygon());
        let parts: Vec<Polygon<f64>> = clipped
            .into_iter()
            .filter(|polygon| polygon.unsigned_area() > 0.0)
            .collect();

        if parts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(MultiPolygon(parts)))
        }
    }
}

/// Checks that a polygon can be clipped.
///
/// Every ring must have finite coordinates, at least three distinct
/// vertices and no self-intersections, and the polygon must enclose a
/// non-zero area.
///
/// # Errors
///
/// Returns the first [`GeometryError`] found.
pub fn validate_polygon(polygon: &Polygon<f64>) -> Result<(), GeometryError> {
    validate_ring(polygon.exterior(), "exterior ring")?;
    for (i, interior) in polygon.interiors().iter().enumerate() {
        validate_ring(interior, &format!("interior ring {}", i + 1))?;
    }

    if polygon.unsigned_area() <= 0.0 {
        return Err(GeometryError::ZeroArea);
    }

    Ok(())
}

fn validate_ring(ring: &LineString<f64>, name: &str) -> Result<(), GeometryError> {
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate {
            ring: name.to_string(),
        });
    }

    let vertices = dedup_ring(&ring.0);
    if vertices.len() < 3 {
        return Err(GeometryError::DegenerateRing {
            ring: name.to_string(),
            vertices: vertices.len(),
        });
    }

    if has_self_intersection(&vertices) {
        return Err(GeometryError::SelfIntersection {
            ring: name.to_string(),
        });
    }

    Ok(())
}

/// Tests all pairs of ring edges for crossings.
///
/// `vertices` is an open ring without repeated consecutive vertices. Two
/// edges crossing through each other's interiors, or overlapping along a
/// segment, make a self-intersection. Edges that only touch at a point are
/// allowed, so a ring pinched at one vertex is valid.
fn has_self_intersection(vertices: &[Coord<f64>]) -> bool {
    let n = vertices.len();
    let edges: Vec<Line<f64>> = (0..n)
        .map(|i| Line::new(vertices[i], vertices[(i + 1) % n]))
        .collect();

    for i in 0..n {
        for j in (i + 1)..n {
            match line_intersection(edges[i], edges[j]) {
                Some(
                    LineIntersection::Collinear { .. }
                    | LineIntersection::SinglePoint {
                        is_proper: true, ..
                    },
                ) => return true,
                Some(LineIntersection::SinglePoint { .. }) | None => {}
            }
        }
    }

    false
}
