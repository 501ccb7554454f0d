//! Streaming shapefile reader.
//!
//! Decodes `.shp`/`.dbf` record pairs one at a time into
//! [`SourceFeature`]s with `GeoJSON` geometry and a JSON attribute map.
//! The stream is forward-only and single-pass: a reader is read once, and
//! a second pass opens a new reader.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use desa_map_extract_models::SourceFeature;
use geojson::{JsonObject, Value};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Point, PointM, PointZ, PolygonRing, Shape};

use crate::ExtractError;

type ShapefileReader = shapefile::Reader<BufReader<File>, BufReader<File>>;

/// An open shapefile whose records are read lazily.
pub struct FeatureReader {
    path: PathBuf,
    reader: ShapefileReader,
    next_index: u64,
}

impl FeatureReader {
    /// Opens a shapefile, checking that all three components exist.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MissingComponent`] if the `.shp`, `.shx` or
    /// `.dbf` file is absent, or [`ExtractError::Shapefile`] if the headers
    /// cannot be read.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        for component in ["shp", "shx", "dbf"] {
            let component_path = path.with_extension(component);
            if !component_path.is_file() {
                return Err(ExtractError::MissingComponent {
                    path: component_path,
                    component,
                });
            }
        }

        let reader = shapefile::Reader::from_path(path)?;
        log::debug!("Opened shapefile {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            next_index: 0,
        })
    }

    /// Path of the `.shp` file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records listed in the `.shx` index, when it can be read.
    #[must_use]
    pub fn record_count(&self) -> Option<u64> {
        self.reader
            .shape_count()
            .ok()
            .and_then(|count| u64::try_from(count).ok())
    }

    /// Iterates the records in storage order.
    ///
    /// [`SourceFeature::index`] is the record's position in the file,
    /// counted by the reader rather than by each iterator. A record that fails to decode yields an error; callers are
    /// expected to stop at the first one.
    pub fn features(&mut self) -> impl Iterator<Item = Result<SourceFeature, ExtractError>> + '_ {
        let next_index = &mut self.next_index;
        self.reader.iter_shapes_and_records().map(move |result| {
            let index = *next_index;
            *next_index += 1;
            let (shape, record) = result?;
            Ok(SourceFeature {
                index,
                feature: geojson::Feature {
                    bbox: None,
                    geometry: shape_to_geometry(&shape),
                    id: None,
                    properties: Some(record_to_properties(record)),
                    foreign_members: None,
                },
            })
        })
    }
}

/// Converts a shape to `GeoJSON` geometry.
///
/// Single-part polylines become `LineString`s and multi-part ones
/// `MultiLineString`s. Polygon rings are grouped as each outer ring
/// followed by its holes; one group becomes a `Polygon`, several a
/// `MultiPolygon`. Measures and elevations are dropped. Null shapes,
/// multipatches and empty shapes have no geometry.
#[must_use]
pub fn shape_to_geometry(shape: &Shape) -> Option<geojson::Geometry> {
    let value = match shape {
        Shape::NullShape | Shape::Multipatch(_) => None,
        Shape::Point(p) => Some(Value::Point(position(p))),
        Shape::PointM(p) => Some(Value::Point(position(p))),
        Shape::PointZ(p) => Some(Value::Point(position(p))),
        Shape::Multipoint(mp) => multipoint_value(mp.points()),
        Shape::MultipointM(mp) => multipoint_value(mp.points()),
        Shape::MultipointZ(mp) => multipoint_value(mp.points()),
        Shape::Polyline(line) => polyline_value(line.parts()),
        Shape::PolylineM(line) => polyline_value(line.parts()),
        Shape::PolylineZ(line) => polyline_value(line.parts()),
        Shape::Polygon(polygon) => polygon_value(polygon.rings()),
        Shape::PolygonM(polygon) => polygon_value(polygon.rings()),
        Shape::PolygonZ(polygon) => polygon_value(polygon.rings()),
    };

    value.map(geojson::Geometry::new)
}

/// Converts a dBASE record to a JSON attribute map.
#[must_use]
pub fn record_to_properties(record: Record) -> JsonObject {
    record
        .into_iter()
        .map(|(name, value)| (name, field_value_to_json(value)))
        .collect()
}

/// Converts one dBASE field value to JSON.
///
/// Character fields are trimmed of padding; empty values become `null`.
/// Whole numbers are emitted as JSON integers.
#[must_use]
pub fn field_value_to_json(value: FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String(trimmed.to_string())
            }
        }
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => {
            number_value(n)
        }
        FieldValue::Float(Some(f)) => number_value(f64::from(f)),
        FieldValue::Integer(i) => serde_json::Value::from(i),
        FieldValue::Logical(Some(b)) => serde_json::Value::Bool(b),
        FieldValue::Date(Some(date)) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        _ => serde_json::Value::Null,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number_value(n: f64) -> serde_json::Value {
    // 2^53: beyond this not every integer is representable as f64.
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;

    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

/// Shapefile point types reduced to their planar coordinates.
trait Planar {
    fn xy(&self) -> (f64, f64);
}

impl Planar for Point {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl Planar for PointM {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl Planar for PointZ {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

fn position<P: Planar>(point: &P) -> Vec<f64> {
    let (x, y) = point.xy();
    vec![x, y]
}

fn positions<P: Planar>(points: &[P]) -> Vec<Vec<f64>> {
    points.iter().map(position).collect()
}

fn multipoint_value<P: Planar>(points: &[P]) -> Option<Value> {
    if points.is_empty() {
        None
    } else {
        Some(Value::MultiPoint(positions(points)))
    }
}

fn polyline_value<P: Planar>(parts: &[Vec<P>]) -> Option<Value> {
    match parts {
        [] => None,
        [single] => Some(Value::LineString(positions(single))),
        _ => Some(Value::MultiLineString(
            parts.iter().map(|part| positions(part)).collect(),
        )),
    }
}

fn polygon_value<P: Planar>(rings: &[PolygonRing<P>]) -> Option<Value> {
    let mut polygons: Vec<Vec<Vec<Vec<f64>>>> = Vec::new();

    for ring in rings {
        let coords = positions(ring.points());
        match ring {
            PolygonRing::Outer(_) => polygons.push(vec![coords]),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some(polygon) => polygon.push(coords),
                None => {
                    log::warn!("Polygon hole with no preceding outer ring; treating it as outer");
                    polygons.push(vec![coords]);
                }
            },
        }
    }

    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Value::Polygon),
        _ => Some(Value::MultiPolygon(polygons)),
    }
}
