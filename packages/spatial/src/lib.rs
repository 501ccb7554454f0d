#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planar geometry primitives for village boundary extraction.
//!
//! Coordinates are `(longitude, latitude)` pairs treated as plain planar
//! `x`/`y` values. No projection, datum, or scale correction is applied.
//!
//! Containment is a ray-casting parity check with the edge semantics
//! described on [`point_in_polygon`], and lines are tested by their
//! vertices only ([`line_intersects_polygon`]). Polygon clipping delegates
//! to the boolean operations in [`geo`], see [`clip`].

pub mod clip;

use geo::{BoundingRect, Coord, LineString, Polygon};
use rstar::{AABB, Envelope};
use thiserror::Error;

/// Errors raised when a ring or polygon cannot be used for containment
/// or clipping.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// Ring has fewer than three distinct vertices.
    #[error("Degenerate {ring}: {vertices} distinct vertices (need at least 3)")]
    DegenerateRing {
        /// Which ring was rejected (e.g. "exterior ring", "interior ring 2").
        ring: String,
        /// Number of distinct vertices found.
        vertices: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("Non-finite coordinate in {ring}")]
    NonFiniteCoordinate {
        /// Which ring contained the coordinate.
        ring: String,
    },

    /// The polygon encloses no area.
    #[error("Polygon has zero area")]
    ZeroArea,

    /// Two edges of a ring cross or overlap.
    #[error("{ring} has a self-intersection")]
    SelfIntersection {
        /// Which ring crosses itself.
        ring: String,
    },
}

/// Ray-casting parity test: is `point` inside `ring`?
///
/// For every edge `(i, j)` with `j` the previous vertex (wrapping), the
/// `inside` flag toggles when the edge straddles the horizontal line through
/// the point (`(yi > y) != (yj > y)`) and the point lies left of the edge's
/// x-intercept. The ring may be open or closed; a closing duplicate vertex
/// forms a zero-length edge that never crosses.
///
/// Horizontal edges never straddle the ray, so the intercept division is
/// only evaluated when `yi != yj`. Rings with fewer than three vertices
/// contain nothing.
///
/// Points lying exactly on an edge or vertex get whatever answer the parity
/// count happens to produce; callers must not rely on it either way.
#[must_use]
pub fn point_in_polygon(point: Coord<f64>, ring: &[Coord<f64>]) -> bool {
    let Coord { x, y } = point;
    let Some(mut prev) = ring.last().copied() else {
        return false;
    };

    let mut inside = false;
    for &cur in ring {
        if (cur.y > y) != (prev.y > y)
            && x < (prev.x - cur.x) * (y - cur.y) / (prev.y - cur.y) + cur.x
        {
            inside = !inside;
        }
        prev = cur;
    }

    inside
}

/// Returns `true` if any vertex of `line` lies inside `ring`.
///
/// This is a vertex test, not a segment intersection test: a line whose
/// segments cross the ring without any vertex landing inside is reported
/// as not intersecting. Existing extracted road and river layers were
/// produced with this rule.
#[must_use]
pub fn line_intersects_polygon(line: &[Coord<f64>], ring: &[Coord<f64>]) -> bool {
    line.iter().any(|&vertex| point_in_polygon(vertex, ring))
}

/// The single enclosing polygon an extraction job filters against.
///
/// Only the outer ring is kept; holes in the source polygon are ignored.
#[derive(Debug, Clone)]
pub struct Boundary {
    ring: Vec<Coord<f64>>,
    polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl Boundary {
    /// Builds a boundary from its outer ring.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the ring has non-finite coordinates or
    /// fewer than three distinct vertices.
    pub fn new(ring: Vec<Coord<f64>>) -> Result<Self, GeometryError> {
        let name = "boundary ring";

        if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GeometryError::NonFiniteCoordinate {
                ring: name.to_string(),
            });
        }

        let vertices = distinct_vertex_count(&ring);
        if vertices < 3 {
            return Err(GeometryError::DegenerateRing {
                ring: name.to_string(),
                vertices,
            });
        }

        let polygon = Polygon::new(LineString::from(ring.clone()), vec![]);
        let envelope = compute_envelope(&polygon);

        Ok(Self {
            ring,
            polygon,
            envelope,
        })
    }

    /// The outer ring exactly as loaded.
    #[must_use]
    pub fn ring(&self) -> &[Coord<f64>] {
        &self.ring
    }

    /// Number of vertices in the outer ring (including any closing vertex).
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.ring.len()
    }

    /// The outer ring as a hole-free polygon, used for clipping.
    #[must_use]
    pub const fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Axis-aligned bounding box of the ring.
    #[must_use]
    pub const fn envelope(&self) -> AABB<[f64; 2]> {
        self.envelope
    }

    /// [`point_in_polygon`] against the boundary ring.
    ///
    /// Points outside the closed bounding box are rejected before the ray
    /// cast. The parity count can never be odd for such points, so the
    /// answer is identical to calling [`point_in_polygon`] directly.
    #[must_use]
    pub fn contains_point(&self, point: Coord<f64>) -> bool {
        self.envelope.contains_point(&[point.x, point.y]) && point_in_polygon(point, &self.ring)
    }

    /// [`line_intersects_polygon`] against the boundary ring.
    #[must_use]
    pub fn intersects_line(&self, line: &[Coord<f64>]) -> bool {
        line.iter().any(|&vertex| self.contains_point(vertex))
    }
}

/// Counts vertices after collapsing consecutive duplicates and the closing
/// vertex.
pub(crate) fn distinct_vertex_count(ring: &[Coord<f64>]) -> usize {
    dedup_ring(ring).len()
}

/// Returns the ring's vertices with consecutive duplicates and the closing
/// vertex removed.
pub(crate) fn dedup_ring(ring: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut coords = ring.to_vec();
    coords.dedup();
    while coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}

/// Compute the bounding box envelope for a [`Polygon`].
pub(crate) fn compute_envelope(polygon: &Polygon<f64>) -> AABB<[f64; 2]> {
    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
