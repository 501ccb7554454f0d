//! Job registry: built-in job definitions from embedded TOML configs,
//! plus optional operator-supplied job files.
//!
//! Each `.toml` file in `packages/extract/jobs/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a dataset means adding a
//! TOML file and listing it below.

use std::path::Path;

use desa_map_extract_models::JobDefinition;
use serde::Deserialize;

use crate::ExtractError;

/// TOML configs embedded at compile time.
const JOB_TOMLS: &[(&str, &str)] = &[
    // ── Boundary ─────────────────────────────────────────────────────
    (
        "village_boundary",
        include_str!("../jobs/village_boundary.toml"),
    ),
    // ── Facilities (points) ──────────────────────────────────────────
    (
        "government_facilities",
        include_str!("../jobs/government_facilities.toml"),
    ),
    (
        "education_facilities",
        include_str!("../jobs/education_facilities.toml"),
    ),
    (
        "health_facilities",
        include_str!("../jobs/health_facilities.toml"),
    ),
    (
        "worship_facilities",
        include_str!("../jobs/worship_facilities.toml"),
    ),
    // ── Networks (lines) ─────────────────────────────────────────────
    ("roads", include_str!("../jobs/roads.toml")),
    ("rivers", include_str!("../jobs/rivers.toml")),
    // ── Land use (areas) ─────────────────────────────────────────────
    ("rice_fields", include_str!("../jobs/rice_fields.toml")),
];

/// Total number of built-in jobs (used in tests).
#[cfg(test)]
const EXPECTED_JOB_COUNT: usize = 8;

/// A jobs file: a `[[jobs]]` array of job definitions.
#[derive(Debug, Deserialize)]
struct JobsFile {
    jobs: Vec<JobDefinition>,
}

/// Parses a single [`JobDefinition`] from a TOML string.
///
/// # Errors
///
/// Returns [`ExtractError::Config`] if the TOML is malformed or missing
/// required fields.
pub fn parse_job_toml(toml_str: &str) -> Result<JobDefinition, ExtractError> {
    toml::de::from_str(toml_str).map_err(|e| ExtractError::Config {
        message: e.to_string(),
    })
}

/// Returns all built-in job definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_jobs() -> Vec<JobDefinition> {
    JOB_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_job_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Parses a `[[jobs]]` file.
///
/// # Errors
///
/// Returns [`ExtractError::Config`] if the TOML is malformed or two jobs
/// share an id.
pub fn parse_jobs_file(toml_str: &str) -> Result<Vec<JobDefinition>, ExtractError> {
    let file: JobsFile = toml::de::from_str(toml_str).map_err(|e| ExtractError::Config {
        message: e.to_string(),
    })?;

    let mut ids: Vec<&str> = file.jobs.iter().map(JobDefinition::id).collect();
    ids.sort_unstable();
    if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(ExtractError::Config {
            message: format!("duplicate job id '{}'", pair[0]),
        });
    }

    Ok(file.jobs)
}

/// Reads a `[[jobs]]` file from disk.
///
/// # Errors
///
/// Returns [`ExtractError`] if the file cannot be read or parsed.
pub fn load_jobs_file(path: &Path) -> Result<Vec<JobDefinition>, ExtractError> {
    let text = std::fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    let jobs = parse_jobs_file(&text)?;
    log::info!("Loaded {} jobs from {}", jobs.len(), path.display());
    Ok(jobs)
}

/// Built-in jobs merged with the jobs in `jobs_file`, if given.
///
/// A job from the file replaces the built-in job with the same id; other
/// file jobs are appended in file order.
///
/// # Errors
///
/// Returns [`ExtractError`] if the jobs file cannot be read or parsed.
pub fn available_jobs(jobs_file: Option<&Path>) -> Result<Vec<JobDefinition>, ExtractError> {
    let mut jobs = all_jobs();
    let Some(path) = jobs_file else {
        return Ok(jobs);
    };

    for job in load_jobs_file(path)? {
        if let Some(existing) = jobs.iter_mut().find(|j| j.id == job.id) {
            log::debug!("{} overrides built-in job {}", path.display(), job.id);
            *existing = job;
        } else {
            jobs.push(job);
        }
    }

    Ok(jobs)
}

/// Looks up a job by id.
///
/// # Errors
///
/// Returns [`ExtractError::UnknownJob`] if no job has that id.
pub fn find_job<'a>(jobs: &'a [JobDefinition], id: &str) -> Result<&'a JobDefinition, ExtractError> {
    jobs.iter()
        .find(|job| job.id == id)
        .ok_or_else(|| ExtractError::UnknownJob { id: id.to_string() })
}
