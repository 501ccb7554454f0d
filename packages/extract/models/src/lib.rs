#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Extraction job definitions and the feature types flowing through them.
//!
//! A [`JobDefinition`] is deserialized from TOML and describes one
//! extraction: which shapefile to read, where to write the resulting
//! `GeoJSON`, and what to do with each feature ([`JobKind`]). A single
//! generic engine runs every job, replacing one hand-written script per
//! dataset.

use std::path::PathBuf;

use geojson::JsonObject;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Label used when none of the configured name fields has a value.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Default boundary file, relative to the output directory.
pub const DEFAULT_BOUNDARY_FILE: &str = "village_boundaries.geojson";

// ── Features ─────────────────────────────────────────────────────────────

/// A feature decoded from a source dataset together with its position in
/// the source stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFeature {
    /// Zero-based record index in source storage order.
    pub index: u64,
    /// Geometry and attributes. Geometry is `None` for null shapes.
    pub feature: geojson::Feature,
}

impl SourceFeature {
    /// Attribute map of the feature, if any.
    #[must_use]
    pub const fn properties(&self) -> Option<&JsonObject> {
        self.feature.properties.as_ref()
    }

    /// Display label from the first populated field in `keys`, or
    /// [`UNKNOWN_LABEL`].
    #[must_use]
    pub fn label(&self, keys: &[String]) -> String {
        feature_label(self.properties(), keys)
    }
}

/// Returns the first populated value among `keys` as a string.
///
/// A value counts as populated when it is a non-empty string, a non-zero
/// number, or `true`. Other values (null, empty strings, zero, `false`,
/// arrays, objects) fall through to the next key.
#[must_use]
pub fn first_populated(properties: Option<&JsonObject>, keys: &[String]) -> Option<String> {
    let properties = properties?;
    keys.iter().find_map(|key| match properties.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) if n.as_f64().is_some_and(|v| v != 0.0) => {
            Some(n.to_string())
        }
        serde_json::Value::Bool(true) => Some("true".to_string()),
        _ => None,
    })
}

/// Display label for a feature: the first populated field among `keys`,
/// or [`UNKNOWN_LABEL`].
#[must_use]
pub fn feature_label(properties: Option<&JsonObject>, keys: &[String]) -> String {
    first_populated(properties, keys).unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

// ── Job definitions ──────────────────────────────────────────────────────

/// How features of an extraction job are tested against the boundary.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeometryPolicy {
    /// Keep `Point` features inside the boundary ring.
    PointContainment,
    /// Keep `LineString`/`MultiLineString` features with at least one
    /// vertex inside the boundary ring.
    LineIntersection,
    /// Replace `Polygon`/`MultiPolygon` geometry with its intersection
    /// with the boundary polygon.
    PolygonClip,
}

/// A complete extraction job, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Unique identifier (e.g., `"roads"`).
    pub id: String,
    /// Human-readable name (e.g., `"Roads"`).
    pub name: String,
    /// Source shapefile (`.shp`). Relative paths resolve against the
    /// configured source directory.
    pub source: PathBuf,
    /// Output `GeoJSON` file. Relative paths resolve against the
    /// configured output directory.
    pub output: PathBuf,
    /// Boundary `GeoJSON` file used by extraction jobs. Relative paths
    /// resolve against the configured output directory, since the
    /// boundary is itself the output of a boundary job.
    #[serde(default = "default_boundary")]
    pub boundary: PathBuf,
    /// Attribute keys tried in order when labelling features in logs.
    #[serde(default = "default_label_fields")]
    pub label_fields: Vec<String>,
    /// Write an empty `FeatureCollection` when nothing matches instead of
    /// leaving the previous output in place.
    #[serde(default)]
    pub write_empty: bool,
    /// What the job does with each feature.
    pub kind: JobKind,
}

impl JobDefinition {
    /// Returns the job identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable job name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this job produces the boundary other jobs depend on.
    #[must_use]
    pub const fn is_boundary(&self) -> bool {
        matches!(self.kind, JobKind::Boundary(_))
    }
}

/// What an extraction job does with each source feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Select the village polygon(s) out of an administrative dataset by
    /// name.
    Boundary(BoundarySelector),
    /// Filter or clip features against a previously extracted boundary.
    Extract {
        /// Inclusion policy applied to each feature.
        policy: GeometryPolicy,
    },
}

/// Name matching rules for picking the village out of an administrative
/// boundary dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySelector {
    /// Case-insensitive substring of the village name to look for.
    pub village: String,
    /// Case-insensitive substring of the district (kecamatan) name.
    #[serde(default)]
    pub district: Option<String>,
    /// Attribute keys holding the village name, tried in order.
    #[serde(default = "default_village_fields")]
    pub village_fields: Vec<String>,
    /// Attribute keys holding the district name, tried in order.
    #[serde(default = "default_district_fields")]
    pub district_fields: Vec<String>,
}

impl BoundarySelector {
    /// Village name of a feature, or the empty string.
    #[must_use]
    pub fn village_name(&self, properties: Option<&JsonObject>) -> String {
        first_populated(properties, &self.village_fields).unwrap_or_default()
    }

    /// District name of a feature, or the empty string.
    #[must_use]
    pub fn district_name(&self, properties: Option<&JsonObject>) -> String {
        first_populated(properties, &self.district_fields).unwrap_or_default()
    }

    /// Whether a feature is the village being extracted.
    ///
    /// The district clause is nested inside the village clause, so a
    /// village name match alone decides the result and the district term
    /// never narrows the selection. Existing boundary files were produced
    /// with this rule; it is kept as written until a dataset with
    /// duplicate village names shows which narrowing is wanted.
    #[must_use]
    #[allow(clippy::nonminimal_bool, clippy::overly_complex_bool_expr)]
    pub fn matches(&self, properties: Option<&JsonObject>) -> bool {
        let village = self.village.to_lowercase();
        let village_match = self
            .village_name(properties)
            .to_lowercase()
            .contains(&village);
        let district_match = self.district.as_ref().is_some_and(|district| {
            self.district_name(properties)
                .to_lowercase()
                .contains(&district.to_lowercase())
        });

        village_match || (village_match && district_match)
    }
}

fn default_boundary() -> PathBuf {
    PathBuf::from(DEFAULT_BOUNDARY_FILE)
}

fn default_label_fields() -> Vec<String> {
    vec!["NAMOBJ".to_string(), "REMARK".to_string()]
}

fn default_village_fields() -> Vec<String> {
    ["NAMOBJ", "DESA", "NAMA_DESA", "WADMDES"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_district_fields() -> Vec<String> {
    ["WADMKC", "KECAMATAN", "NAMA_KEC"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ── Job results ──────────────────────────────────────────────────────────

/// What a finished job did with its output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Matching features were written to `path`.
    Written {
        /// Output file.
        path: PathBuf,
    },
    /// Nothing matched; an empty collection was written to `path`.
    WrittenEmpty {
        /// Output file.
        path: PathBuf,
    },
    /// Nothing matched; no file was written.
    NoMatches,
}

/// Summary of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// Identifier of the job that ran.
    pub job_id: String,
    /// Records read from the source.
    pub scanned: u64,
    /// Features written to the output.
    pub kept: u64,
    /// Polygon features skipped because they could not be clipped.
    pub clip_failures: u64,
    /// What happened to the output file.
    pub outcome: JobOutcome,
}

impl JobReport {
    /// `true` when the job completed without finding anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.kept == 0
    }
}
