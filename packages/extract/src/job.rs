//! Running extraction jobs.
//!
//! A [`JobDefinition`] is resolved against an [`ExtractConfig`] into a
//! [`ResolvedJob`] with concrete paths, then run in a single pass over
//! its source shapefile.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use desa_map_extract_models::{
    BoundarySelector, GeometryPolicy, JobDefinition, JobKind, JobOutcome, JobReport,
    SourceFeature, UNKNOWN_LABEL, feature_label,
};
use desa_map_spatial::Boundary;
use geojson::Feature;

use crate::boundary::load_boundary;
use crate::filter::{Decision, apply_policy};
use crate::output::write_feature_collection;
use crate::progress::ProgressCallback;
use crate::reader::FeatureReader;
use crate::{ExtractConfig, ExtractError};

/// Number of leading features whose attributes are logged at debug level,
/// to help discover the schema of an unfamiliar dataset.
const SAMPLE_PROPERTIES: u64 = 2;

/// An extraction job with its paths resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionJob {
    /// Job identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Source `.shp` file.
    pub source: PathBuf,
    /// Boundary `GeoJSON` file.
    pub boundary: PathBuf,
    /// Output `GeoJSON` file.
    pub output: PathBuf,
    /// How features are tested against the boundary.
    pub policy: GeometryPolicy,
    /// Attribute keys used for log labels.
    pub label_fields: Vec<String>,
    /// Write an empty collection when nothing is kept.
    pub write_empty: bool,
}

/// A boundary job with its paths resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryJob {
    /// Job identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Administrative boundary `.shp` file.
    pub source: PathBuf,
    /// Output `GeoJSON` file, read back by extraction jobs.
    pub output: PathBuf,
    /// Which village to select.
    pub selector: BoundarySelector,
    /// Write an empty collection when nothing matches.
    pub write_empty: bool,
}

/// A job ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedJob {
    /// Produces the village boundary.
    Boundary(BoundaryJob),
    /// Filters or clips a dataset against the boundary.
    Extraction(ExtractionJob),
}

impl ResolvedJob {
    /// Resolves the paths of `definition` against `config`.
    #[must_use]
    pub fn resolve(definition: &JobDefinition, config: &ExtractConfig) -> Self {
        let source = config.source_path(&definition.source);
        let output = config.output_path(&definition.output);

        match &definition.kind {
            JobKind::Boundary(selector) => Self::Boundary(BoundaryJob {
                id: definition.id.clone(),
                name: definition.name.clone(),
                source,
                output,
                selector: selector.clone(),
                write_empty: definition.write_empty,
            }),
            JobKind::Extract { policy } => Self::Extraction(ExtractionJob {
                id: definition.id.clone(),
                name: definition.name.clone(),
                source,
                boundary: config.output_path(&definition.boundary),
                output,
                policy: *policy,
                label_fields: definition.label_fields.clone(),
                write_empty: definition.write_empty,
            }),
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Boundary(job) => &job.id,
            Self::Extraction(job) => &job.id,
        }
    }

    /// Returns the human-readable job name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Boundary(job) => &job.name,
            Self::Extraction(job) => &job.name,
        }
    }

    /// Runs the job.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the job aborts. Nothing is written in
    /// that case.
    pub fn run(&self, progress: &dyn ProgressCallback) -> Result<JobReport, ExtractError> {
        let start = Instant::now();
        log::info!("Running {} ({})", self.name(), self.id());

        let report = match self {
            Self::Boundary(job) => job.run(progress),
            Self::Extraction(job) => job.run(progress),
        }?;

        log::info!(
            "{}: kept {} of {} features, took {:.1}s",
            self.name(),
            report.kept,
            report.scanned,
            start.elapsed().as_secs_f64()
        );
        Ok(report)
    }
}

/// Features kept by one pass over a source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    /// Features to write, in source order.
    pub features: Vec<Feature>,
    /// Records read.
    pub scanned: u64,
    /// Polygons skipped because clipping failed.
    pub clip_failures: u64,
    /// How many kept features carry each label.
    pub labels: BTreeMap<String, u64>,
}

impl Extraction {
    fn keep(&mut self, feature: Feature, label: String) {
        *self.labels.entry(label).or_default() += 1;
        self.features.push(feature);
    }
}

impl ExtractionJob {
    /// Loads the boundary, filters the source and writes the output.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the boundary or source cannot be read,
    /// a record fails to decode, or the output cannot be written.
    pub fn run(&self, progress: &dyn ProgressCallback) -> Result<JobReport, ExtractError> {
        let boundary = load_boundary(&self.boundary)?;
        log::info!(
            "Loaded boundary from {} ({} vertices)",
            self.boundary.display(),
            boundary.vertex_count()
        );

        let mut reader = open_source(&self.source)?;
        progress.start(&format!("{}: scanning", self.name), reader.record_count());

        let extraction = self.extract_features(&boundary, reader.features(), progress)?;
        progress.finish(format!(
            "{}: {} of {}",
            self.name,
            extraction.features.len(),
            extraction.scanned
        ));

        if extraction.features.is_empty() && extraction.scanned > 0 {
            log::warn!(
                "{}: nothing inside the boundary; check that {} and {} use the same coordinate system",
                self.name,
                self.source.display(),
                self.boundary.display()
            );
        }

        finish_job(&self.id, &self.output, self.write_empty, extraction)
    }

    /// Applies the job's policy to each feature of `features`.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by `features`.
    pub fn extract_features<I>(
        &self,
        boundary: &Boundary,
        features: I,
        progress: &dyn ProgressCallback,
    ) -> Result<Extraction, ExtractError>
    where
        I: IntoIterator<Item = Result<SourceFeature, ExtractError>>,
    {
        let mut extraction = Extraction::default();

        for feature in features {
            let feature = feature?;
            extraction.scanned += 1;
            progress.record_read();
            log_sample(&feature);

            match apply_policy(self.policy, boundary, feature.feature) {
                Decision::Keep(kept) => {
                    let label = feature_label(kept.properties.as_ref(), &self.label_fields);
                    log::info!("Found: {label}");
                    extraction.keep(kept, label);
                }
                Decision::Drop => {}
                Decision::ClipFailed(_) => extraction.clip_failures += 1,
            }
        }

        if extraction.clip_failures > 0 {
            log::info!(
                "{}: skipped {} polygons that could not be clipped",
                self.name,
                extraction.clip_failures
            );
        }

        Ok(extraction)
    }
}

impl BoundaryJob {
    /// Selects the village feature(s) and writes the boundary file.
    ///
    /// When nothing matches, the source is read a second time to list the
    /// village names it does contain.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the source cannot be read, a record
    /// fails to decode, or the output cannot be written.
    pub fn run(&self, progress: &dyn ProgressCallback) -> Result<JobReport, ExtractError> {
        let mut reader = open_source(&self.source)?;
        progress.start(&format!("{}: scanning", self.name), reader.record_count());

        let extraction = self.select_features(reader.features(), progress)?;
        progress.finish(format!("{}: {} matched", self.name, extraction.features.len()));

        if extraction.features.is_empty() {
            let mut reader = FeatureReader::open(&self.source)?;
            let names = distinct_village_names(&self.selector, reader.features())?;
            log::warn!(
                "No village matching '{}' found. Available villages: {}",
                self.selector.village,
                names.join(", ")
            );
        }

        finish_job(&self.id, &self.output, self.write_empty, extraction)
    }

    /// Keeps the features whose names match the selector.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by `features`.
    pub fn select_features<I>(
        &self,
        features: I,
        progress: &dyn ProgressCallback,
    ) -> Result<Extraction, ExtractError>
    where
        I: IntoIterator<Item = Result<SourceFeature, ExtractError>>,
    {
        let mut extraction = Extraction::default();

        for feature in features {
            let feature = feature?;
            extraction.scanned += 1;
            progress.record_read();
            log_sample(&feature);

            if self.selector.matches(feature.properties()) {
                let village = self.selector.village_name(feature.properties());
                log::info!(
                    "Found village: {village} (district: {})",
                    self.selector.district_name(feature.properties())
                );
                extraction.keep(feature.feature, village);
            }
        }

        Ok(extraction)
    }
}

/// Sorted distinct village names in `features`, with [`UNKNOWN_LABEL`]
/// standing in for unnamed records.
///
/// # Errors
///
/// Returns the first error yielded by `features`.
pub fn distinct_village_names<I>(
    selector: &BoundarySelector,
    features: I,
) -> Result<Vec<String>, ExtractError>
where
    I: IntoIterator<Item = Result<SourceFeature, ExtractError>>,
{
    let mut names = BTreeSet::new();
    for feature in features {
        let name = selector.village_name(feature?.properties());
        names.insert(if name.is_empty() {
            UNKNOWN_LABEL.to_string()
        } else {
            name
        });
    }
    Ok(names.into_iter().collect())
}

fn open_source(source: &Path) -> Result<FeatureReader, ExtractError> {
    let reader = FeatureReader::open(source)?;
    match reader.record_count() {
        Some(count) => log::info!("Reading {} ({count} records)", reader.path().display()),
        None => log::info!("Reading {}", reader.path().display()),
    }
    Ok(reader)
}

fn log_sample(feature: &SourceFeature) {
    if feature.index < SAMPLE_PROPERTIES && log::log_enabled!(log::Level::Debug) {
        let properties = feature
            .properties()
            .map(|p| serde_json::Value::Object(p.clone()))
            .unwrap_or_default();
        log::debug!("Sample properties #{}: {properties}", feature.index);
    }
}

fn finish_job(
    job_id: &str,
    output: &Path,
    write_empty: bool,
    extraction: Extraction,
) -> Result<JobReport, ExtractError> {
    let kept = extraction.features.len() as u64;

    let outcome = if kept > 0 {
        write_feature_collection(output, extraction.features)?;
        log::info!("Saved {kept} features to {}", output.display());
        log::info!("{job_id}: {} distinct labels", extraction.labels.len());
        for (label, count) in &extraction.labels {
            log::info!("  {label}: {count}");
        }
        JobOutcome::Written {
            path: output.to_path_buf(),
        }
    } else if write_empty {
        write_feature_collection(output, Vec::new())?;
        log::warn!(
            "{job_id}: no features matched; wrote empty collection to {}",
            output.display()
        );
        JobOutcome::WrittenEmpty {
            path: output.to_path_buf(),
        }
    } else {
        log::warn!(
            "{job_id}: no features matched; {} left unchanged",
            output.display()
        );
        JobOutcome::NoMatches
    };

    Ok(JobReport {
        job_id: job_id.to_string(),
        scanned: extraction.scanned,
        kept,
        clip_failures: extraction.clip_failures,
        outcome,
    })
}

/// Resolves and runs one job definition.
///
/// # Errors
///
/// Returns [`ExtractError`] if the job aborts.
pub fn run_job(
    definition: &JobDefinition,
    config: &ExtractConfig,
    progress: &dyn ProgressCallback,
) -> Result<JobReport, ExtractError> {
    ResolvedJob::resolve(definition, config).run(progress)
}

/// Runs every job in `definitions`, boundary jobs first, then the rest
/// in their given order.
///
/// A failing job is logged with its hints and does not stop the run.
/// Returns each job's id with its result, in execution order.
pub fn run_all<F>(
    definitions: &[JobDefinition],
    config: &ExtractConfig,
    make_progress: F,
) -> Vec<(String, Result<JobReport, ExtractError>)>
where
    F: Fn(&JobDefinition) -> Arc<dyn ProgressCallback>,
{
    let (boundaries, extractions): (Vec<_>, Vec<_>) =
        definitions.iter().partition(|d| d.is_boundary());

    boundaries
        .into_iter()
        .chain(extractions)
        .map(|definition| {
            let progress = make_progress(definition);
            let result = run_job(definition, config, progress.as_ref());
            if let Err(e) = &result {
                progress.abandon();
                log::error!("{} failed: {e}", definition.name());
                for hint in e.hints() {
                    log::error!("  hint: {hint}");
                }
            }
            (definition.id().to_string(), result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NullProgress, null_progress};
    use crate::reader::fixtures::{write_points, write_villages};
    use geo::Coord;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProgress {
        total: Mutex<Option<Option<u64>>>,
        read: Mutex<u64>,
        summary: Mutex<Option<String>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn start(&self, _label: &str, records: Option<u64>) {
            *self.total.lock().unwrap() = Some(records);
        }
        fn record_read(&self) {
            *self.read.lock().unwrap() += 1;
        }
        fn finish(&self, summary: String) {
            *self.summary.lock().unwrap() = Some(summary);
        }
        fn abandon(&self) {}
    }

    fn write_square_boundary(path: &Path) {
        let boundary = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"NAMOBJ": "Rengging"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0], [0.0, 0.0]]]
                }
            }]
        });
        std::fs::write(path, boundary.to_string()).unwrap();
    }

    fn file_backed_job(dir: &Path, points: &[(f64, f64, &str)]) -> ExtractionJob {
        std::fs::create_dir_all(dir).unwrap();
        let source = dir.join("KESEHATAN_PT_25K.shp");
        let boundary = dir.join("village_boundaries.geojson");
        write_points(&source, points);
        write_square_boundary(&boundary);

        ExtractionJob {
            source,
            boundary,
            ..facilities_job(dir.join("out").join("health_facilities.geojson"), false)
        }
    }

    fn file_backed_boundary_job(dir: &Path, villages: &[(&str, &str, f64, f64)]) -> BoundaryJob {
        std::fs::create_dir_all(dir).unwrap();
        let source = dir.join("ADMINISTRASIDESA_AR_25K.shp");
        write_villages(&source, villages);

        BoundaryJob {
            id: "village_boundary".to_string(),
            name: "Village Boundary".to_string(),
            source,
            output: dir.join("out").join("village_boundaries.geojson"),
            selector: selector("rengging"),
            write_empty: false,
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("desa_map_job_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn source_feature(index: u64, value: serde_json::Value) -> Result<SourceFeature, ExtractError> {
        Ok(SourceFeature {
            index,
            feature: serde_json::from_value(value).unwrap(),
        })
    }

    fn facility(index: u64, name: &str, x: f64, y: f64) -> Result<SourceFeature, ExtractError> {
        source_feature(
            index,
            serde_json::json!({
                "type": "Feature",
                "properties": {"NAMOBJ": name},
                "geometry": {"type": "Point", "coordinates": [x, y]}
            }),
        )
    }

    fn village(index: u64, name: &str, district: &str) -> Result<SourceFeature, ExtractError> {
        source_feature(
            index,
            serde_json::json!({
                "type": "Feature",
                "properties": {"NAMOBJ": name, "WADMKC": district},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0], [0.0, 0.0]]]
                }
            }),
        )
    }

    fn square_boundary() -> Boundary {
        Boundary::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 10.0, y: 0.0 },
        ])
        .unwrap()
    }

    fn facilities_job(output: PathBuf, write_empty: bool) -> ExtractionJob {
        ExtractionJob {
            id: "health_facilities".to_string(),
            name: "Health Facilities".to_string(),
            source: PathBuf::from("KESEHATAN_PT_25K.shp"),
            boundary: PathBuf::from("village_boundaries.geojson"),
            output,
            policy: GeometryPolicy::PointContainment,
            label_fields: vec!["NAMOBJ".to_string()],
            write_empty,
        }
    }

    fn selector(village: &str) -> BoundarySelector {
        toml::from_str(&format!("village = \"{village}\"\ndistrict = \"pecangaan\"")).unwrap()
    }

    #[test]
    fn resolve_applies_config_directories() {
        let definition: JobDefinition = toml::from_str(
            r#"
id = "roads"
name = "Roads"
source = "JALAN_LN_25K.shp"
output = "roads.geojson"

[kind]
type = "extract"
policy = "line_intersection"
"#,
        )
        .unwrap();
        let config = ExtractConfig::new("/data/shp", "/www/data");

        let ResolvedJob::Extraction(job) = ResolvedJob::resolve(&definition, &config) else {
            panic!("expected an extraction job");
        };
        assert_eq!(job.source, PathBuf::from("/data/shp/JALAN_LN_25K.shp"));
        assert_eq!(job.output, PathBuf::from("/www/data/roads.geojson"));
        assert_eq!(
            job.boundary,
            PathBuf::from("/www/data/village_boundaries.geojson")
        );
        assert_eq!(job.policy, GeometryPolicy::LineIntersection);
    }

    #[test]
    fn extraction_keeps_inside_features_in_order() {
        let job = facilities_job(PathBuf::from("unused.geojson"), false);
        let features = vec![
            facility(0, "Puskesmas", 5.0, 5.0),
            facility(1, "RSUD", 15.0, 15.0),
            facility(2, "Posyandu", 1.0, 9.0),
        ];

        let extraction = job
            .extract_features(&square_boundary(), features, &NullProgress)
            .unwrap();

        assert_eq!(extraction.scanned, 3);
        let names: Vec<_> = extraction
            .features
            .iter()
            .map(|f| f.property("NAMOBJ").and_then(|v| v.as_str()).unwrap())
            .collect();
        assert_eq!(names, vec!["Puskesmas", "Posyandu"]);
        assert_eq!(
            extraction.labels,
            BTreeMap::from([("Posyandu".to_string(), 1), ("Puskesmas".to_string(), 1)])
        );
    }

    #[test]
    fn labels_count_repeated_names() {
        let job = facilities_job(PathBuf::from("unused.geojson"), false);
        let features = vec![
            facility(0, "Posyandu", 2.0, 2.0),
            facility(1, "Posyandu", 3.0, 3.0),
            source_feature(
                2,
                serde_json::json!({
                    "type": "Feature",
                    "properties": {"NAMOBJ": null},
                    "geometry": {"type": "Point", "coordinates": [4.0, 4.0]}
                }),
            ),
        ];

        let extraction = job
            .extract_features(&square_boundary(), features, &NullProgress)
            .unwrap();

        assert_eq!(extraction.labels.get("Posyandu"), Some(&2));
        assert_eq!(extraction.labels.get(UNKNOWN_LABEL), Some(&1));
    }

    #[test]
    fn run_from_files_without_match_reports_no_matches() {
        let dir = scratch_dir("run_no_match");
        let job = file_backed_job(&dir, &[(15.0, 15.0, "RSUD"), (-3.0, 4.0, "Klinik")]);
        let progress = RecordingProgress::default();

        let report = job.run(&progress).unwrap();

        assert_eq!(report.outcome, JobOutcome::NoMatches);
        assert_eq!(report.scanned, 2);
        assert_eq!(report.kept, 0);
        assert!(!job.output.exists());
        assert_eq!(*progress.total.lock().unwrap(), Some(Some(2)));
        assert_eq!(*progress.read.lock().unwrap(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn run_from_files_writes_features_inside_boundary() {
        let dir = scratch_dir("run_written");
        let job = file_backed_job(
            &dir,
            &[(5.0, 5.0, "Puskesmas"), (15.0, 15.0, "RSUD"), (1.0, 9.0, "Posyandu")],
        );
        let progress = RecordingProgress::default();

        let report = job.run(&progress).unwrap();

        assert_eq!(report.kept, 2);
        assert_eq!(
            report.outcome,
            JobOutcome::Written {
                path: job.output.clone()
            }
        );
        let written: geojson::FeatureCollection =
            serde_json::from_str(&std::fs::read_to_string(&job.output).unwrap()).unwrap();
        let names: Vec<_> = written
            .features
            .iter()
            .map(|f| f.property("NAMOBJ").and_then(|v| v.as_str()).unwrap())
            .collect();
        assert_eq!(names, vec!["Puskesmas", "Posyandu"]);
        assert_eq!(
            progress.summary.lock().unwrap().as_deref(),
            Some("Health Facilities: 2 of 3")
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn boundary_run_from_files_without_match_reports_no_matches() {
        let dir = scratch_dir("boundary_no_match");
        let job = file_backed_boundary_job(
            &dir,
            &[("Gemulung", "Pecangaan", 0.0, 0.0), ("Krasak", "Pecangaan", 2.0, 0.0)],
        );

        let report = job.run(&NullProgress).unwrap();

        assert_eq!(report.outcome, JobOutcome::NoMatches);
        assert_eq!(report.scanned, 2);
        assert!(!job.output.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn boundary_run_from_files_writes_selected_village() {
        let dir = scratch_dir("boundary_written");
        let job = file_backed_boundary_job(
            &dir,
            &[("Gemulung", "Pecangaan", 0.0, 0.0), ("RENGGING", "Pecangaan", 2.0, 0.0)],
        );
        let progress = RecordingProgress::default();

        let report = job.run(&progress).unwrap();

        assert_eq!(report.kept, 1);
        assert_eq!(*progress.total.lock().unwrap(), Some(Some(2)));
        let boundary = load_boundary(&job.output).unwrap();
        assert!(boundary.contains_point(Coord { x: 2.5, y: 0.5 }));
        assert!(!boundary.contains_point(Coord { x: 0.5, y: 0.5 }));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn extraction_stops_on_decode_error() {
        let job = facilities_job(PathBuf::from("unused.geojson"), false);
        let features = vec![
            facility(0, "Puskesmas", 5.0, 5.0),
            Err(ExtractError::Config {
                message: "bad record".to_string(),
            }),
        ];

        assert!(
            job.extract_features(&square_boundary(), features, &NullProgress)
                .is_err()
        );
    }

    #[test]
    fn extraction_counts_clip_failures() {
        let mut job = facilities_job(PathBuf::from("unused.geojson"), false);
        job.policy = GeometryPolicy::PolygonClip;
        let bowtie = source_feature(
            0,
            serde_json::json!({
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[1.0, 1.0], [5.0, 5.0], [5.0, 1.0], [1.0, 5.0], [1.0, 1.0]]]
                }
            }),
        );

        let extraction = job
            .extract_features(&square_boundary(), vec![bowtie], &NullProgress)
            .unwrap();
        assert_eq!(extraction.clip_failures, 1);
        assert!(extraction.features.is_empty());
    }

    #[test]
    fn no_match_completes_without_writing() {
        let dir = scratch_dir("no_match");
        let output = dir.join("health_facilities.geojson");
        let job = facilities_job(output.clone(), false);

        let extraction = job
            .extract_features(
                &square_boundary(),
                vec![facility(0, "RSUD", 15.0, 15.0)],
                &NullProgress,
            )
            .unwrap();
        let report = finish_job(&job.id, &job.output, job.write_empty, extraction).unwrap();

        assert_eq!(report.outcome, JobOutcome::NoMatches);
        assert!(report.is_empty());
        assert_eq!(report.scanned, 1);
        assert!(!output.exists());
    }

    #[test]
    fn no_match_with_write_empty_writes_empty_collection() {
        let dir = scratch_dir("write_empty");
        let output = dir.join("health_facilities.geojson");

        let report = finish_job("health_facilities", &output, true, Extraction::default()).unwrap();

        assert_eq!(
            report.outcome,
            JobOutcome::WrittenEmpty {
                path: output.clone()
            }
        );
        assert!(output.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn matches_are_written() {
        let dir = scratch_dir("written");
        let output = dir.join("health_facilities.geojson");
        let job = facilities_job(output.clone(), false);

        let extraction = job
            .extract_features(
                &square_boundary(),
                vec![facility(0, "Puskesmas", 5.0, 5.0)],
                &NullProgress,
            )
            .unwrap();
        let report = finish_job(&job.id, &job.output, job.write_empty, extraction).unwrap();

        assert_eq!(report.kept, 1);
        assert_eq!(report.outcome, JobOutcome::Written { path: output.clone() });
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("Puskesmas"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn boundary_selects_matching_villages() {
        let job = BoundaryJob {
            id: "village_boundary".to_string(),
            name: "Village Boundary".to_string(),
            source: PathBuf::from("ADMINISTRASIDESA_AR_25K.shp"),
            output: PathBuf::from("village_boundaries.geojson"),
            selector: selector("rengging"),
            write_empty: false,
        };
        let features = vec![
            village(0, "Gemulung", "Pecangaan"),
            village(1, "RENGGING", "Pecangaan"),
            village(2, "Rengging", "Kalinyamatan"),
        ];

        let extraction = job.select_features(features, &NullProgress).unwrap();

        assert_eq!(extraction.scanned, 3);
        // District does not narrow the selection.
        assert_eq!(extraction.features.len(), 2);
    }

    #[test]
    fn village_names_are_sorted_and_distinct() {
        let features = vec![
            village(0, "Rengging", "Pecangaan"),
            village(1, "Gemulung", "Pecangaan"),
            village(2, "Rengging", "Pecangaan"),
            source_feature(
                3,
                serde_json::json!({"type": "Feature", "properties": {}, "geometry": null}),
            ),
        ];

        let names = distinct_village_names(&selector("x"), features).unwrap();
        assert_eq!(names, vec!["Gemulung", "Rengging", "Unknown"]);
    }

    #[test]
    fn run_all_runs_boundary_first_and_continues_after_failure() {
        let dir = scratch_dir("run_all");
        let config = ExtractConfig::new(dir.join("shp"), dir.join("out"));
        let boundary = JobDefinition {
            id: "village_boundary".to_string(),
            name: "Village Boundary".to_string(),
            source: PathBuf::from("ADMINISTRASIDESA_AR_25K.shp"),
            output: PathBuf::from("village_boundaries.geojson"),
            boundary: PathBuf::from("village_boundaries.geojson"),
            label_fields: vec!["NAMOBJ".to_string()],
            write_empty: false,
            kind: JobKind::Boundary(selector("rengging")),
        };
        let roads = JobDefinition {
            id: "roads".to_string(),
            name: "Roads".to_string(),
            source: PathBuf::from("JALAN_LN_25K.shp"),
            output: PathBuf::from("roads.geojson"),
            kind: JobKind::Extract {
                policy: GeometryPolicy::LineIntersection,
            },
            ..boundary.clone()
        };

        let results = run_all(&[roads, boundary], &config, |_| null_progress());

        let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["village_boundary", "roads"]);
        assert!(matches!(
            results[0].1,
            Err(ExtractError::MissingComponent { component: "shp", .. })
        ));
        assert!(matches!(results[1].1, Err(ExtractError::Io { .. })));
    }
}
