#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal rendering for the desa map CLI.
//!
//! [`IndicatifProgress`] draws a job's record scan, [`jobs_bar`] counts
//! finished jobs, and [`init_logger`] routes `log` output through
//! `indicatif-log-bridge` so log lines print above the bars.

use std::sync::Arc;
use std::time::Duration;

use desa_map_extract::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// One job's record scan drawn as an `indicatif` bar.
///
/// Spins with a running count until [`ProgressCallback::start`] supplies
/// the record total from the `.shx` index, then shows a bar with an ETA.
pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, job_name: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(counting_style());
        bar.set_message(job_name.to_string());
        Arc::new(Self { bar })
    }
}

fn counting_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg} ({pos} records)")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn totals_style() -> ProgressStyle {
    ProgressStyle::with_template("  {msg} {wide_bar:.cyan/dim} {pos}/{len} records [{eta}]")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

impl ProgressCallback for IndicatifProgress {
    fn start(&self, label: &str, records: Option<u64>) {
        self.bar.set_message(label.to_string());
        if let Some(total) = records {
            self.bar.set_length(total);
            self.bar.set_position(0);
            self.bar.set_style(totals_style());
        }
    }

    fn record_read(&self) {
        self.bar.inc(1);
    }

    fn finish(&self, summary: String) {
        self.bar.finish_with_message(summary);
    }

    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

/// Bar counting the jobs of a multi-job run.
#[must_use]
pub fn jobs_bar(multi: &MultiProgress, total: u64) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(total));
    bar.set_style(
        ProgressStyle::with_template("Jobs {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}
