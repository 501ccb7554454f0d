//! Directory configuration for extraction jobs.
//!
//! Read once from the environment at startup and passed explicitly to
//! every job, so job code never consults ambient state.

use std::path::{Path, PathBuf};

/// Environment variable holding the directory of source shapefiles.
pub const SOURCE_DIR_ENV: &str = "DESA_MAP_SOURCE_DIR";

/// Environment variable holding the directory `GeoJSON` outputs go to.
pub const OUTPUT_DIR_ENV: &str = "DESA_MAP_OUTPUT_DIR";

/// Default source directory when [`SOURCE_DIR_ENV`] is unset.
pub const DEFAULT_SOURCE_DIR: &str = "data/shapefiles";

/// Default output directory when [`OUTPUT_DIR_ENV`] is unset. This is
/// where the web front end loads its map layers from.
pub const DEFAULT_OUTPUT_DIR: &str = "public/data";

/// Where job inputs and outputs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Base directory for relative source shapefile paths.
    pub source_dir: PathBuf,
    /// Base directory for relative output and boundary paths.
    pub output_dir: PathBuf,
}

impl ExtractConfig {
    /// Creates a config with explicit directories.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Reads [`SOURCE_DIR_ENV`] and [`OUTPUT_DIR_ENV`], falling back to
    /// the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let source_dir = std::env::var(SOURCE_DIR_ENV).unwrap_or_else(|_| {
            log::debug!("{SOURCE_DIR_ENV} not set; using {DEFAULT_SOURCE_DIR}");
            DEFAULT_SOURCE_DIR.to_string()
        });
        let output_dir = std::env::var(OUTPUT_DIR_ENV).unwrap_or_else(|_| {
            log::debug!("{OUTPUT_DIR_ENV} not set; using {DEFAULT_OUTPUT_DIR}");
            DEFAULT_OUTPUT_DIR.to_string()
        });

        Self::new(source_dir, output_dir)
    }

    /// Resolves a source shapefile path.
    #[must_use]
    pub fn source_path(&self, path: &Path) -> PathBuf {
        resolve(&self.source_dir, path)
    }

    /// Resolves an output or boundary path.
    #[must_use]
    pub fn output_path(&self, path: &Path) -> PathBuf {
        resolve(&self.output_dir, path)
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_DIR, DEFAULT_OUTPUT_DIR)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
