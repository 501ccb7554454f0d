#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Village boundary extraction jobs.
//!
//! Reads regional shapefiles, keeps (or clips) the features that fall
//! inside one village boundary, and writes `GeoJSON` `FeatureCollection`s
//! for the map front end. Jobs are defined as TOML files embedded at
//! compile time, following the same registry pattern for every dataset:
//! a boundary job picks the village polygon out of the administrative
//! dataset, then extraction jobs filter facilities, roads, rivers and rice
//! fields against it.
//!
//! Each job loads its boundary, streams its source once, and writes its
//! output once. Jobs run sequentially and share no state.

pub mod boundary;
pub mod config;
pub mod filter;
pub mod job;
pub mod output;
pub mod progress;
pub mod reader;
pub mod registry;

use std::path::PathBuf;

use thiserror::Error;

pub use config::ExtractConfig;
pub use job::{BoundaryJob, ExtractionJob, ResolvedJob, run_all, run_job};

/// Errors that abort an extraction job.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A `GeoJSON` document could not be parsed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A shapefile record could not be decoded.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// One of the `.shp`/`.shx`/`.dbf` files of a shapefile is missing.
    #[error("Missing .{component} component for shapefile {path}")]
    MissingComponent {
        /// Path of the missing file.
        path: PathBuf,
        /// Missing extension (`"shp"`, `"shx"` or `"dbf"`).
        component: &'static str,
    },

    /// The boundary file exists but does not hold a usable polygon.
    #[error("Invalid boundary in {path}: {message}")]
    InvalidBoundary {
        /// Boundary file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// A job definition could not be parsed.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// No job with the requested id exists.
    #[error("Unknown job: {id}")]
    UnknownJob {
        /// Requested job id.
        id: String,
    },
}

impl ExtractError {
    /// Wraps an I/O error with the path it occurred on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Operator-facing hints for fixing the error, if any apply.
    #[must_use]
    pub const fn hints(&self) -> &'static [&'static str] {
        match self {
            Self::MissingComponent { .. } | Self::Shapefile(_) => &[
                "Check that the shapefile path is correct",
                "Check that the shapefile is not corrupted",
                "Shapefiles need their .shx and .dbf files next to the .shp",
            ],
            Self::InvalidBoundary { .. } | Self::GeoJson(_) => &[
                "Run the boundary job first to produce the village boundary file",
                "The boundary file must be a FeatureCollection whose first feature is a Polygon",
            ],
            Self::Io { .. } => &["Check the DESA_MAP_SOURCE_DIR and DESA_MAP_OUTPUT_DIR settings"],
            Self::Json(_) | Self::Config { .. } | Self::UnknownJob { .. } => &[],
        }
    }
}
