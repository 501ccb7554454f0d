//! Loading the village boundary produced by a boundary job.
//!
//! Only the outer ring of the first feature is used. Holes and any
//! further features are ignored.

use std::path::Path;

use desa_map_spatial::Boundary;
use geo::Coord;
use geojson::{GeoJson, Value};

use crate::ExtractError;

/// Reads and parses a boundary `GeoJSON` file.
///
/// # Errors
///
/// Returns [`ExtractError`] if the file cannot be read, is not valid
/// `GeoJSON`, or holds no usable polygon (see [`parse_boundary`]).
pub fn load_boundary(path: &Path) -> Result<Boundary, ExtractError> {
    let text = std::fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    parse_boundary(&text, path)
}

/// Parses boundary `GeoJSON` text. `path` is only used in error messages.
///
/// Accepts a `FeatureCollection` (first feature used), a single `Feature`,
/// or a bare geometry. The geometry must be a `Polygon` (first ring used)
/// or `MultiPolygon` (first ring of the first polygon used).
///
/// # Errors
///
/// Returns [`ExtractError::GeoJson`] for malformed documents and
/// [`ExtractError::InvalidBoundary`] when there is no feature, no
/// geometry, a non-polygonal geometry, or a degenerate ring.
pub fn parse_boundary(text: &str, path: &Path) -> Result<Boundary, ExtractError> {
    let invalid = |message: &str| ExtractError::InvalidBoundary {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let geojson: GeoJson = text.parse()?;
    let geometry = match geojson {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .next()
            .ok_or_else(|| invalid("FeatureCollection has no features"))?
            .geometry
            .ok_or_else(|| invalid("first feature has no geometry"))?,
        GeoJson::Feature(feature) => feature
            .geometry
            .ok_or_else(|| invalid("feature has no geometry"))?,
        GeoJson::Geometry(geometry) => geometry,
    };

    let ring = match geometry.value {
        Value::Polygon(rings) => rings.into_iter().next(),
        Value::MultiPolygon(polygons) => polygons
            .into_iter()
            .next()
            .and_then(|rings| rings.into_iter().next()),
        other => {
            return Err(invalid(&format!(
                "expected Polygon or MultiPolygon, found {}",
                other.type_name()
            )));
        }
    }
    .ok_or_else(|| invalid("polygon has no rings"))?;

    let coords = ring
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(invalid("ring position has fewer than two coordinates")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Boundary::new(coords).map_err(|e| invalid(&e.to_string()))
}
