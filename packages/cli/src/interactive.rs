//! Interactive menu for the extraction jobs.
//!
//! Provides a menu-driven interface using `dialoguer` for running jobs
//! without memorizing CLI flags.

use desa_map_cli_utils::MultiProgress;
use desa_map_extract::ExtractConfig;
use desa_map_extract_models::JobDefinition;
use dialoguer::{MultiSelect, Select};

/// Top-level actions available in the interactive menu.
enum Action {
    RunAll,
    RunSelected,
    Boundary,
    ListJobs,
}

impl Action {
    const ALL: &[Self] = &[Self::RunAll, Self::RunSelected, Self::Boundary, Self::ListJobs];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::RunAll => "Run all jobs",
            Self::RunSelected => "Run selected jobs",
            Self::Boundary => "Extract village boundary",
            Self::ListJobs => "List jobs",
        }
    }
}

/// Prompts for an action and runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or any selected job fails.
pub fn run(
    jobs: &[JobDefinition],
    config: &ExtractConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Desa Map Extraction");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::RunAll => crate::run_jobs(jobs, config, multi)?,
        Action::RunSelected => run_selected(jobs, config, multi)?,
        Action::Boundary => {
            let boundaries: Vec<JobDefinition> =
                jobs.iter().filter(|j| j.is_boundary()).cloned().collect();
            if boundaries.is_empty() {
                println!("No boundary job configured.");
                return Ok(());
            }
            crate::run_jobs(&boundaries, config, multi)?;
        }
        Action::ListJobs => crate::list_jobs(jobs, config),
    }

    Ok(())
}

/// Prompts for jobs via checkboxes, then runs them.
fn run_selected(
    jobs: &[JobDefinition],
    config: &ExtractConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<String> = jobs
        .iter()
        .map(|j| format!("{} ({})", j.id(), j.name()))
        .collect();

    let selected = MultiSelect::new()
        .with_prompt("Select jobs to run (space=toggle, a=all, enter=confirm)")
        .items(&labels)
        .max_length(20)
        .interact()?;

    if selected.is_empty() {
        println!("No jobs selected.");
        return Ok(());
    }

    let chosen: Vec<JobDefinition> = selected.iter().map(|&i| jobs[i].clone()).collect();
    log::info!(
        "Running {} job(s): {}",
        chosen.len(),
        chosen
            .iter()
            .map(JobDefinition::id)
            .collect::<Vec<_>>()
            .join(", ")
    );

    crate::run_jobs(&chosen, config, multi)
}
