#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the desa map extraction jobs.
//!
//! Runs the built-in (or operator-supplied) jobs that turn regional
//! shapefiles into the village `GeoJSON` layers the map front end loads.
//! Without a subcommand, an interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`desa_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod interactive;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use desa_map_cli_utils::{IndicatifProgress, MultiProgress};
use desa_map_extract::registry::{available_jobs, find_job};
use desa_map_extract::{ExtractConfig, ExtractError, ExtractionJob, ResolvedJob, run_all};
use desa_map_extract_models::{
    DEFAULT_BOUNDARY_FILE, GeometryPolicy, JobDefinition, JobKind, JobOutcome, JobReport,
};

#[derive(Parser)]
#[command(name = "desa_map", about = "Village map data extraction tool")]
struct Cli {
    /// Extra `[[jobs]]` TOML file. Its jobs replace built-in jobs with the
    /// same id and are appended otherwise.
    #[arg(long, global = true)]
    jobs_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured jobs
    Jobs,
    /// Run a single job
    Run {
        /// Job identifier (e.g., "roads")
        id: String,
    },
    /// Run every job, the boundary job first
    RunAll,
    /// Extract the village boundary only
    Boundary,
    /// Run an ad-hoc extraction job. Paths are used as given.
    Extract {
        /// Source shapefile (.shp)
        #[arg(long)]
        source: PathBuf,
        /// Boundary `GeoJSON` file (defaults to the configured output
        /// directory's village boundary file)
        #[arg(long)]
        boundary: Option<PathBuf>,
        /// Output `GeoJSON` file
        #[arg(long)]
        output: PathBuf,
        /// One of `point_containment`, `line_intersection`, `polygon_clip`
        #[arg(long)]
        policy: GeometryPolicy,
        /// Comma-separated attribute keys used to label features in logs
        #[arg(long, value_delimiter = ',', default_value = "NAMOBJ,REMARK")]
        label_fields: Vec<String>,
        /// Write an empty collection when nothing matches
        #[arg(long)]
        write_empty: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = desa_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = ExtractConfig::from_env();
    let jobs = available_jobs(cli.jobs_file.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(&jobs, &config, &multi);
    };

    match command {
        Commands::Jobs => list_jobs(&jobs, &config),
        Commands::Run { id } => {
            let definition = find_job(&jobs, &id)?;
            run_jobs(std::slice::from_ref(definition), &config, &multi)?;
        }
        Commands::RunAll => run_jobs(&jobs, &config, &multi)?,
        Commands::Boundary => {
            let boundaries: Vec<JobDefinition> =
                jobs.into_iter().filter(JobDefinition::is_boundary).collect();
            if boundaries.is_empty() {
                return Err("No boundary job configured".into());
            }
            run_jobs(&boundaries, &config, &multi)?;
        }
        Commands::Extract {
            source,
            boundary,
            output,
            policy,
            label_fields,
            write_empty,
        } => {
            let job = ExtractionJob {
                id: "extract".to_string(),
                name: format!("Extract {}", source.display()),
                boundary: boundary
                    .unwrap_or_else(|| config.output_path(Path::new(DEFAULT_BOUNDARY_FILE))),
                source,
                output,
                policy,
                label_fields,
                write_empty,
            };
            let progress = IndicatifProgress::records_bar(&multi, &job.name);
            let report = ResolvedJob::Extraction(job)
                .run(progress.as_ref())
                .inspect_err(log_hints)?;
            print_summary(&[("extract".to_string(), Ok(report))]);
        }
    }

    Ok(())
}

/// Prints the configured jobs with their resolved paths.
fn list_jobs(jobs: &[JobDefinition], config: &ExtractConfig) {
    println!("{:<24} {:<18} NAME", "ID", "POLICY");
    println!("{}", "-".repeat(70));
    for job in jobs {
        let policy = match &job.kind {
            JobKind::Boundary(_) => "boundary".to_string(),
            JobKind::Extract { policy } => policy.to_string(),
        };
        println!("{:<24} {policy:<18} {}", job.id(), job.name());
        println!(
            "{:<24} {} -> {}",
            "",
            config.source_path(&job.source).display(),
            config.output_path(&job.output).display()
        );
    }
}

/// Runs `definitions` (boundary jobs first), prints a summary, and fails
/// if any job failed.
fn run_jobs(
    definitions: &[JobDefinition],
    config: &ExtractConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let jobs_bar = desa_map_cli_utils::jobs_bar(multi, definitions.len() as u64);

    let results = run_all(definitions, config, |definition| {
        jobs_bar.inc(1);
        IndicatifProgress::records_bar(multi, definition.name())
    });
    jobs_bar.finish_and_clear();

    print_summary(&results);

    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    if failed > 0 {
        return Err(format!("{failed} of {} job(s) failed", results.len()).into());
    }
    Ok(())
}

fn log_hints(e: &ExtractError) {
    for hint in e.hints() {
        log::error!("  hint: {hint}");
    }
}

fn print_summary(results: &[(String, Result<JobReport, ExtractError>)]) {
    println!();
    println!("{:<24} {:>8} {:>8}  RESULT", "JOB", "SCANNED", "KEPT");
    println!("{}", "-".repeat(70));
    for (id, result) in results {
        match result {
            Ok(report) => {
                let outcome = match &report.outcome {
                    JobOutcome::Written { path } => format!("wrote {}", path.display()),
                    JobOutcome::WrittenEmpty { path } => {
                        format!("no matches, wrote empty {}", path.display())
                    }
                    JobOutcome::NoMatches => "no matches, nothing written".to_string(),
                };
                let skipped = if report.clip_failures > 0 {
                    format!(" ({} unclippable skipped)", report.clip_failures)
                } else {
                    String::new()
                };
                println!(
                    "{id:<24} {:>8} {:>8}  {outcome}{skipped}",
                    report.scanned, report.kept
                );
            }
            Err(e) => println!("{id:<24} {:>8} {:>8}  FAILED: {e}", "-", "-"),
        }
    }
}
