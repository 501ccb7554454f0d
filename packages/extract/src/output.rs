//! `GeoJSON` output files.

use std::path::Path;

use geojson::{Feature, FeatureCollection};

use crate::ExtractError;

/// Writes `features` as a pretty-printed `FeatureCollection`, replacing
/// any existing file and creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ExtractError`] if serialization or any filesystem operation
/// fails.
pub fn write_feature_collection(path: &Path, features: Vec<Feature>) -> Result<(), ExtractError> {
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let json = serde_json::to_string_pretty(&collection)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }
    std::fs::write(path, json).map_err(|e| ExtractError::io(path, e))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}
