//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::RewriteConfigBuilder::progress_callback`] to observe a
//! run as it moves through its stages. The CLI uses this to drive its
//! spinner; a server could forward the same events to a job record.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf_rewrite::{PipelineProgressCallback, RewriteConfig, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl PipelineProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{} done in {}ms", stage, elapsed_ms);
//!     }
//! }
//!
//! let config = RewriteConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::stage::Stage;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as a run progresses.
///
/// `stage` is always the stage being *entered*: `on_stage_start(Rendered)`
/// fires just before rendering begins. Stages of one run are reported
/// sequentially, but a callback shared between concurrent runs must be
/// `Send + Sync`. All methods default to no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once, after input validation and before page counting.
    fn on_run_start(&self, input: &Path) {
        let _ = input;
    }

    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when `stage` could not be reached; no further stage events follow.
    fn on_stage_failed(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once, after cleanup.
    fn on_run_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RewriteConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
