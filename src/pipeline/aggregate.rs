//! Aggregation: one model call that turns every note into a single summary.
//!
//! The notes are concatenated in order with no length guard; if the run
//! produced more text than the model's context window holds, truncation or
//! failure is the backend's call.

use crate::config::{DigestConfig, FailurePolicy};
use crate::error::DigestError;
use crate::output::{join_notes, Note};
use crate::pipeline::analyze::{call_with_retry, ImageAnalyzer};
use crate::prompts::error_placeholder;
use tracing::{info, warn};

/// Label used for the aggregation call in logs and errors.
pub const SUMMARY_LABEL: &str = "master summary";

/// The aggregation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Model response verbatim, or `"Error: {message}"` when degraded.
    pub text: String,
    pub failed: bool,
}

/// Ask the model for a combined summary of `notes`.
pub async fn summarize_notes(
    analyzer: &dyn ImageAnalyzer,
    notes: &[Note],
    config: &DigestConfig,
) -> Result<Summary, DigestError> {
    let joined = join_notes(notes);
    info!(
        "Writing master summary from {} notes ({} chars)",
        notes.len(),
        joined.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_summary_start(notes.len());
    }

    match call_with_retry(SUMMARY_LABEL, config, || analyzer.summarize(&joined)).await {
        Ok(text) => Ok(Summary {
            text,
            failed: false,
        }),
        Err((err, _retries)) => {
            let message = err.to_string();
            if config.model_failure == FailurePolicy::FailFast {
                return Err(DigestError::ModelFailed {
                    label: SUMMARY_LABEL.to_string(),
                    message,
                });
            }
            warn!("Summary call failed — {}", message);
            Ok(Summary {
                text: error_placeholder(&message),
                failed: true,
            })
        }
    }
}
