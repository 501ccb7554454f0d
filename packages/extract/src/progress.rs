//! Progress of a job's scan over its source records.
//!
//! The library never draws anything itself; the CLI renders these events
//! with `indicatif` and tests pass [`NullProgress`].

use std::sync::Arc;

/// Receives the record-scan events of one running job.
pub trait ProgressCallback: Send + Sync {
    /// The scan begins. `records` is the record count from the shapefile
    /// index, or `None` when it could not be read.
    fn start(&self, label: &str, records: Option<u64>);

    /// One more record has been read.
    fn record_read(&self);

    /// The scan completed; `summary` replaces the label.
    fn finish(&self, summary: String);

    /// The job failed; the indicator is removed.
    fn abandon(&self);
}

/// Discards every event.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn start(&self, _label: &str, _records: Option<u64>) {}
    fn record_read(&self) {}
    fn finish(&self, _summary: String) {}
    fn abandon(&self) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
