//! # edgequake-digest
//!
//! Summarise a folder of PDFs and images with a Vision Language Model (VLM).
//!
//! Every PDF page and every standalone image is shown to the model with the
//! same instruction; the tagged answers ("notes") are then handed back to the
//! model in one request that produces a combined summary, which is written to
//! a markdown report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! data/
//!  │
//!  ├─ 1. Discover   list *.pdf, *.jpg, *.png (non-recursive, sorted)
//!  ├─ 2. Extract    PDF pages → PNG via pdfium (spawn_blocking); images as-is
//!  ├─ 3. Analyse    one VLM call per page/image  → "--- {label} ---\n{note}"
//!  ├─ 4. Aggregate  one call over all notes      → summary
//!  └─ 5. Report     "# MASTER SUMMARY\n\n{summary}" → Output/final_summary.md
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_digest::{digest, DigestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ./data, writes ./Output/final_summary.md via Ollama llama3.2-vision
//!     let output = digest(&DigestConfig::default()).await?;
//!     eprintln!("{} notes, {} failed → {}",
//!         output.notes.len(),
//!         output.stats.failed_units,
//!         output.report_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Failure handling
//!
//! A failed model call is, by default, recorded as `"Error: {message}"` in
//! place of the note and the run continues; a file that cannot be read or
//! rendered aborts the run. Both are switchable through
//! [`FailurePolicy`] on [`DigestConfig`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `digest` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod digest;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DigestConfig, DigestConfigBuilder, FailurePolicy};
pub use digest::{digest, digest_sync, digest_with, inspect, inspect_with};
pub use error::{DigestError, ModelError, UnitError};
pub use output::{DigestOutput, DigestStats, InspectedFile, Note, UnitLabel};
pub use pipeline::analyze::{ImageAnalyzer, LlmAnalyzer};
pub use pipeline::extract::{PageRenderer, PdfiumRenderer, RasterUnit};
pub use progress::{DigestProgressCallback, NoopProgressCallback, ProgressCallback};
