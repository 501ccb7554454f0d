//! Per-feature inclusion decisions.
//!
//! Each [`GeometryPolicy`] maps one source feature to a [`Decision`].
//! Point and line filters pass features through untouched; the area
//! clipper replaces the geometry and keeps the attributes.

use desa_map_extract_models::GeometryPolicy;
use desa_map_spatial::{Boundary, GeometryError};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, Position, Value};

/// Outcome of testing one feature against the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Write this feature to the output.
    Keep(Feature),
    /// Outside the boundary, or a geometry type the policy ignores.
    Drop,
    /// A polygon that could not be clipped. Skipped, but counted.
    ClipFailed(GeometryError),
}

/// Applies `policy` to one feature.
#[must_use]
pub fn apply_policy(policy: GeometryPolicy, boundary: &Boundary, feature: Feature) -> Decision {
    match policy {
        GeometryPolicy::PointContainment => keep_if(point_inside(boundary, &feature), feature),
        GeometryPolicy::LineIntersection => keep_if(line_intersects(boundary, &feature), feature),
        GeometryPolicy::PolygonClip => clip_area(boundary, feature),
    }
}

fn keep_if(keep: bool, feature: Feature) -> Decision {
    if keep {
        Decision::Keep(feature)
    } else {
        Decision::Drop
    }
}

/// `true` for `Point` features inside the boundary. Any other geometry
/// is `false`.
#[must_use]
pub fn point_inside(boundary: &Boundary, feature: &Feature) -> bool {
    match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Point(position)) => {
            to_coord(position).is_some_and(|point| boundary.contains_point(point))
        }
        _ => false,
    }
}

/// `true` for `LineString` features with a vertex inside the boundary, and
/// for `MultiLineString` features where any part has one.
#[must_use]
pub fn line_intersects(boundary: &Boundary, feature: &Feature) -> bool {
    match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::LineString(line)) => {
            to_coords(line).is_some_and(|line| boundary.intersects_line(&line))
        }
        Some(Value::MultiLineString(parts)) => parts.iter().any(|line| {
            to_coords(line).is_some_and(|line| boundary.intersects_line(&line))
        }),
        _ => false,
    }
}

/// Clips a `Polygon`/`MultiPolygon` feature to the boundary polygon.
///
/// The result is a new feature with the clipped geometry (a `Polygon`
/// when one part remains, otherwise a `MultiPolygon`) and the source
/// attributes and id. Empty intersections and non-polygonal features are
/// dropped.
#[must_use]
pub fn clip_area(boundary: &Boundary, feature: Feature) -> Decision {
    let subject = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Polygon(rings)) => to_polygon(rings).map(|p| MultiPolygon::new(vec![p])),
        Some(Value::MultiPolygon(polygons)) => polygons
            .iter()
            .map(|rings| to_polygon(rings))
            .collect::<Option<Vec<_>>>()
            .map(MultiPolygon::new),
        _ => return Decision::Drop,
    };

    let Some(subject) = subject else {
        log::debug!("Skipping polygon with malformed positions");
        return Decision::Drop;
    };

    match boundary.clip(&subject) {
        Ok(Some(clipped)) => {
            let value = if clipped.0.len() == 1 {
                Value::from(&clipped.0[0])
            } else {
                Value::from(&clipped)
            };
            Decision::Keep(Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(value)),
                id: feature.id,
                properties: feature.properties,
                foreign_members: None,
            })
        }
        Ok(None) => Decision::Drop,
        Err(e) => {
            log::debug!("Skipping polygon that could not be clipped: {e}");
            Decision::ClipFailed(e)
        }
    }
}

fn to_coord(position: &Position) -> Option<Coord<f64>> {
    match position.as_slice() {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn to_coords(positions: &[Position]) -> Option<Vec<Coord<f64>>> {
    positions.iter().map(to_coord).collect()
}

fn to_polygon(rings: &[Vec<Position>]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| to_coords(ring).map(LineString::new));
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn square_boundary() -> Boundary {
        Boundary::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 10.0, y: 0.0 },
        ])
        .unwrap()
    }

    fn feature(geometry: serde_json::Value, properties: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(serde_json::from_value(geometry).unwrap()),
            id: None,
            properties: properties.as_object().cloned(),
            foreign_members: None,
        }
    }

    fn point(x: f64, y: f64) -> Feature {
        feature(
            serde_json::json!({"type": "Point", "coordinates": [x, y]}),
            serde_json::json!({"NAMOBJ": "Masjid"}),
        )
    }

    #[test]
    fn facility_points_inside_are_kept() {
        let boundary = square_boundary();
        let kept: Vec<_> = [point(5.0, 5.0), point(15.0, 15.0)]
            .into_iter()
            .filter_map(|f| match apply_policy(GeometryPolicy::PointContainment, &boundary, f) {
                Decision::Keep(f) => Some(f),
                _ => None,
            })
            .collect();

        assert_eq!(kept, vec![point(5.0, 5.0)]);
    }

    #[test]
    fn point_policy_ignores_other_geometry_types() {
        let boundary = square_boundary();
        let line = feature(
            serde_json::json!({"type": "LineString", "coordinates": [[1.0, 1.0], [2.0, 2.0]]}),
            serde_json::json!({}),
        );
        assert_eq!(
            apply_policy(GeometryPolicy::PointContainment, &boundary, line),
            Decision::Drop
        );
    }

    #[test]
    fn lines_need_a_vertex_inside() {
        let boundary = square_boundary();
        let through = feature(
            serde_json::json!({"type": "LineString", "coordinates": [[-5.0, -5.0], [5.0, 5.0], [20.0, 20.0]]}),
            serde_json::json!({"NAMOBJ": "Jalan Desa"}),
        );
        let crossing_without_vertex = feature(
            serde_json::json!({"type": "LineString", "coordinates": [[-5.0, -5.0], [20.0, 20.0]]}),
            serde_json::json!({"NAMOBJ": "Jalan Raya"}),
        );

        assert_eq!(
            apply_policy(GeometryPolicy::LineIntersection, &boundary, through.clone()),
            Decision::Keep(through)
        );
        assert_eq!(
            apply_policy(
                GeometryPolicy::LineIntersection,
                &boundary,
                crossing_without_vertex
            ),
            Decision::Drop
        );
    }

    #[test]
    fn multi_line_is_kept_when_any_part_intersects() {
        let boundary = square_boundary();
        let river = feature(
            serde_json::json!({
                "type": "MultiLineString",
                "coordinates": [
                    [[20.0, 20.0], [30.0, 30.0]],
                    [[-1.0, 5.0], [3.0, 5.0]]
                ]
            }),
            serde_json::json!({"NAMOBJ": "Kali Serang"}),
        );
        assert!(line_intersects(&boundary, &river));

        let outside = feature(
            serde_json::json!({
                "type": "MultiLineString",
                "coordinates": [[[20.0, 20.0], [30.0, 30.0]], [[-1.0, -1.0], [-3.0, 5.0]]]
            }),
            serde_json::json!({}),
        );
        assert!(!line_intersects(&boundary, &outside));
    }

    #[test]
    fn rice_field_is_clipped_with_attributes_kept() {
        let boundary = square_boundary();
        let field = feature(
            serde_json::json!({
                "type": "Polygon",
                "coordinates": [[[5.0, 5.0], [5.0, 15.0], [15.0, 15.0], [15.0, 5.0], [5.0, 5.0]]]
            }),
            serde_json::json!({"NAMOBJ": "Sawah Irigasi", "LUASHA": 1.5}),
        );
        let expected_properties = field.properties.clone();

        let Decision::Keep(clipped) = apply_policy(GeometryPolicy::PolygonClip, &boundary, field)
        else {
            panic!("expected the field to be kept");
        };

        assert_eq!(clipped.properties, expected_properties);
        let geometry = clipped.geometry.unwrap();
        let Value::Polygon(rings) = &geometry.value else {
            panic!("expected a single polygon, got {}", geometry.value.type_name());
        };
        let polygon = to_polygon(rings).unwrap();
        assert!((polygon.unsigned_area() - 25.0).abs() < 1e-6);

        let mut corners: Vec<_> = polygon
            .exterior()
            .coords()
            .map(|c| ((c.x * 1e4).round() as i64, (c.y * 1e4).round() as i64))
            .collect();
        corners.sort_unstable();
        corners.dedup();
        assert_eq!(
            corners,
            vec![
                (50_000, 50_000),
                (50_000, 100_000),
                (100_000, 50_000),
                (100_000, 100_000)
            ]
        );
    }

    #[test]
    fn clipping_into_two_parts_yields_multipolygon() {
        let boundary = square_boundary();
        let field = feature(
            serde_json::json!({
                "type": "MultiPolygon",
                "coordinates": [
                    [[[1.0, 1.0], [1.0, 3.0], [3.0, 3.0], [3.0, 1.0], [1.0, 1.0]]],
                    [[[6.0, 6.0], [6.0, 8.0], [8.0, 8.0], [8.0, 6.0], [6.0, 6.0]]]
                ]
            }),
            serde_json::json!({"NAMOBJ": "Sawah"}),
        );

        let Decision::Keep(clipped) = clip_area(&boundary, field) else {
            panic!("expected the field to be kept");
        };
        let geometry = clipped.geometry.unwrap();
        let Value::MultiPolygon(parts) = &geometry.value else {
            panic!("expected a multipolygon, got {}", geometry.value.type_name());
        };
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn disjoint_polygon_is_dropped() {
        let boundary = square_boundary();
        let far = feature(
            serde_json::json!({
                "type": "Polygon",
                "coordinates": [[[20.0, 20.0], [20.0, 30.0], [30.0, 30.0], [20.0, 20.0]]]
            }),
            serde_json::json!({}),
        );
        assert_eq!(clip_area(&boundary, far), Decision::Drop);
    }

    #[test]
    fn self_intersecting_polygon_is_a_clip_failure() {
        let boundary = square_boundary();
        let bowtie = feature(
            serde_json::json!({
                "type": "Polygon",
                "coordinates": [[[1.0, 1.0], [5.0, 5.0], [5.0, 1.0], [1.0, 5.0], [1.0, 1.0]]]
            }),
            serde_json::json!({}),
        );
        assert!(matches!(
            clip_area(&boundary, bowtie),
            Decision::ClipFailed(GeometryError::SelfIntersection { .. })
        ));
    }

    #[test]
    fn clip_policy_ignores_points() {
        let boundary = square_boundary();
        assert_eq!(
            apply_policy(GeometryPolicy::PolygonClip, &boundary, point(5.0, 5.0)),
            Decision::Drop
        );
    }

    #[test]
    fn feature_without_geometry_is_dropped() {
        let boundary = square_boundary();
        let empty = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        for policy in [
            GeometryPolicy::PointContainment,
            GeometryPolicy::LineIntersection,
            GeometryPolicy::PolygonClip,
        ] {
            assert_eq!(apply_policy(policy, &boundary, empty.clone()), Decision::Drop);
        }
    }
}
