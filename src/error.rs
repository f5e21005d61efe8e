//! Error types for the edgequake-digest library.
//!
//! Three error types cover three distinct failure modes:
//!
//! * [`DigestError`] — **Fatal**: the run cannot proceed (missing input
//!   folder, nothing to read, provider not configured, or a failure under the
//!   `FailFast` policy). Returned as `Err(DigestError)` from the `digest*`
//!   entry points; no report is written.
//!
//! * [`UnitError`] — **Non-fatal**: one raster unit or one file failed under
//!   the `Degrade` policy. Stored on [`crate::output::Note`] so callers can
//!   count failures without matching on `"Error: "` strings.
//!
//! * [`ModelError`] — what an [`crate::pipeline::analyze::ImageAnalyzer`]
//!   returns. Its `Display` text is exactly what lands in a placeholder note.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-digest library.
#[derive(Debug, Error)]
pub enum DigestError {
    // ── Discovery errors ──────────────────────────────────────────────────
    /// The configured input folder does not exist.
    #[error("Input folder missing: '{path}'\nCreate it or pass --input <DIR>.")]
    InputDirMissing { path: PathBuf },

    /// The input folder exists but holds no `.pdf`, `.jpg` or `.png` files.
    #[error("No files found in input folder '{path}' (looked for .pdf, .jpg, .png)")]
    NoInputFiles { path: PathBuf },

    /// Listing the input folder failed.
    #[error("Failed to read input folder '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create the output folder.
    #[error("Failed to create output folder '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// An image file (or a PDF before handing it to pdfium) could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// pdfium could not open the document.
    #[error("PDF '{path}' could not be opened: {detail}")]
    PdfOpenFailed { path: PathBuf, detail: String },

    /// pdfium opened the document but failed on a page.
    #[error("Rasterisation failed for '{path}' page {page}: {detail}")]
    RasterisationFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (unknown name, missing key).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A model call failed while `model_failure` is `FailFast`.
    #[error("Model call failed for '{label}': {message}")]
    ModelFailed { label: String, message: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the report file.
    #[error("Failed to write report '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, or set PDFIUM_LIB_PATH=/path/to/libpdfium\n\
(or pass --pdfium-lib) to point at an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single unit or file, recorded under `Degrade`.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// The file could not be turned into raster units.
    #[error("{file}: extraction failed: {detail}")]
    ExtractionFailed { file: String, detail: String },

    /// The vision model call failed after retries.
    #[error("{label}: model call failed after {retries} retries: {detail}")]
    ModelFailed {
        label: String,
        retries: u32,
        detail: String,
    },
}

/// Error returned by an [`crate::pipeline::analyze::ImageAnalyzer`].
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The backend returned an error (network, model-side, malformed reply).
    #[error("{0}")]
    Backend(String),

    /// The call did not finish within `api_timeout_secs`.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_display_names_path() {
        let e = DigestError::InputDirMissing {
            path: PathBuf::from("/nope/data"),
        };
        let msg = e.to_string();
        assert!(msg.contains("Input folder missing"), "got: {msg}");
        assert!(msg.contains("/nope/data"), "got: {msg}");
    }

    #[test]
    fn no_files_display() {
        let e = DigestError::NoInputFiles {
            path: PathBuf::from("data"),
        };
        assert!(e.to_string().starts_with("No files found"));
    }

    #[test]
    fn backend_error_display_is_bare_message() {
        let e = ModelError::Backend("connection refused".into());
        assert_eq!(e.to_string(), "connection refused");
    }

    #[test]
    fn timeout_display() {
        let e = ModelError::Timeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn unit_error_display() {
        let e = UnitError::ModelFailed {
            label: "b.pdf (Page 2)".into(),
            retries: 3,
            detail: "HTTP 500".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("b.pdf (Page 2)"));
        assert!(msg.contains("HTTP 500"));
    }
}
