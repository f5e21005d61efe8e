//! Progress-callback trait for digest run events.
//!
//! Inject an [`Arc<dyn DigestProgressCallback>`] via
//! [`crate::config::DigestConfigBuilder::progress_callback`] to receive
//! events as the pipeline discovers files, analyses each raster unit, and
//! writes the report. The CLI renders these as status lines; a library host
//! can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_digest::{DigestConfig, DigestProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl DigestProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, label: &str, note_len: usize) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("#{n} {label}: {note_len} chars");
//!     }
//! }
//!
//! let config = DigestConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as the run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// With `concurrency > 1`, `on_unit_start`, `on_unit_complete` and
/// `on_unit_error` may be called from several tasks at once.
pub trait DigestProgressCallback: Send + Sync {
    /// The output folder did not exist and was just created.
    fn on_output_dir_created(&self, path: &Path) {
        let _ = path;
    }

    /// Discovery finished with `total_files` eligible files.
    fn on_run_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Extraction of a file is about to start.
    ///
    /// # Arguments
    /// * `file_name` — bare file name
    /// * `index`     — 1-based position in discovery order
    fn on_file_start(&self, file_name: &str, index: usize, total_files: usize) {
        let _ = (file_name, index, total_files);
    }

    /// A file failed extraction and was skipped under `Degrade`.
    fn on_file_error(&self, file_name: &str, error: &str) {
        let _ = (file_name, error);
    }

    /// Emitted just before the model call for a unit blocks.
    ///
    /// `label` is `"{file}"` or `"{file} (Page {n})"`.
    fn on_unit_start(&self, label: &str) {
        let _ = label;
    }

    /// The model answered for a unit.
    fn on_unit_complete(&self, label: &str, note_len: usize) {
        let _ = (label, note_len);
    }

    /// The model call for a unit failed; a placeholder note was recorded.
    fn on_unit_error(&self, label: &str, error: &str) {
        let _ = (label, error);
    }

    /// The aggregation call is about to start.
    fn on_summary_start(&self, note_count: usize) {
        let _ = note_count;
    }

    /// The report has been written.
    fn on_report_written(&self, path: &Path, summary_len: usize) {
        let _ = (path, summary_len);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DigestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DigestConfig`].
pub type ProgressCallback = Arc<dyn DigestProgressCallback>;
