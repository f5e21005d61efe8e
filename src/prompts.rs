//! Prompts and fixed strings for the digest pipeline.
//!
//! Every string the model sees, and every fixed marker that ends up in the
//! report, lives here so tests can assert against the same constants.

/// Instruction sent with every raster unit.
///
/// Used when `DigestConfig::analysis_prompt` is `None`.
pub const ANALYZE_IMAGE_PROMPT: &str =
    "Analyze this image. List the key points and data found in it.";

/// Instruction preceding the concatenated notes in the aggregation call.
pub const SUMMARY_PROMPT_PREFIX: &str =
    "Here are notes from several documents. Write a clear, combined summary of everything.\n\nNOTES:\n";

/// First line of every report.
pub const REPORT_HEADING: &str = "# MASTER SUMMARY";

/// Prefix of the placeholder text that replaces a failed model call.
pub const ERROR_PLACEHOLDER_PREFIX: &str = "Error: ";

/// Build the aggregation prompt for the given newline-joined notes.
pub fn summary_prompt(notes: &str) -> String {
    format!("{SUMMARY_PROMPT_PREFIX}{notes}")
}

/// Text recorded in place of a model response (or a file's notes) on failure.
pub fn error_placeholder(message: impl std::fmt::Display) -> String {
    format!("{ERROR_PLACEHOLDER_PREFIX}{message}")
}
