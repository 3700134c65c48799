//! Progress reporting for the long per-basin, per-tile, and per-variable
//! loops of the pipeline.
//!
//! Library code reports through [`ProgressCallback`]; the binary decides
//! how to render it (`indicatif` bars in `tc_hazard_cli_utils`, or nothing).

use std::sync::Arc;

/// Receives progress updates from a pipeline stage.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of work units.
    fn set_total(&self, total: u64);

    /// Advance by `delta` units.
    fn inc(&self, delta: u64);

    /// Replace the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark the stage complete.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
