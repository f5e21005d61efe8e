//! Result types produced by a digest run.

use crate::error::UnitError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifies where a raster unit (and therefore a note) came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLabel {
    /// Bare file name, e.g. `report.pdf`.
    pub file_name: String,
    /// 1-based page number for PDF pages; `None` for standalone images.
    pub page: Option<usize>,
}

impl UnitLabel {
    pub fn file(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            page: None,
        }
    }

    pub fn page(file_name: impl Into<String>, page: usize) -> Self {
        Self {
            file_name: file_name.into(),
            page: Some(page),
        }
    }

    /// Header line that precedes the note in the concatenated notes:
    /// `--- a.png ---` or `--- b.pdf Page 2 ---`.
    pub fn note_header(&self) -> String {
        match self.page {
            Some(n) => format!("--- {} Page {} ---", self.file_name, n),
            None => format!("--- {} ---", self.file_name),
        }
    }
}

/// `a.png` or `b.pdf (Page 2)`: the form shown in progress output and handed
/// to the analyzer.
impl fmt::Display for UnitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(n) => write!(f, "{} (Page {})", self.file_name, n),
            None => f.write_str(&self.file_name),
        }
    }
}

/// The tagged text produced for one raster unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub label: UnitLabel,
    /// Model response verbatim, or `"Error: {message}"` when degraded.
    pub text: String,
    /// Set when `text` is a placeholder.
    pub error: Option<UnitError>,
}

impl Note {
    /// `"{header}\n{text}"`, the unit of concatenation for the aggregation call.
    pub fn render(&self) -> String {
        format!("{}\n{}", self.label.note_header(), self.text)
    }
}

/// Join rendered notes with newlines, preserving order.
pub fn join_notes(notes: &[Note]) -> String {
    notes
        .iter()
        .map(Note::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestStats {
    /// Eligible files found by discovery.
    pub total_files: usize,
    /// Files that failed extraction and were skipped under `Degrade`.
    pub skipped_files: usize,
    /// Raster units sent to the model.
    pub total_units: usize,
    /// Units whose note is a placeholder.
    pub failed_units: usize,
    /// Whether the aggregation call itself degraded to a placeholder.
    pub summary_failed: bool,
    pub total_duration_ms: u64,
    pub analysis_duration_ms: u64,
    pub summary_duration_ms: u64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestOutput {
    /// Where the report was written.
    pub report_path: PathBuf,
    /// Full report text as written to disk.
    pub report: String,
    /// The aggregation response (report minus heading).
    pub summary: String,
    /// Notes in discovery/page order.
    pub notes: Vec<Note>,
    pub stats: DigestStats,
}

/// One discovered file, as reported by [`crate::digest::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectedFile {
    pub file_name: String,
    pub path: PathBuf,
    /// `"pdf"`, `"png"` or `"jpeg"`.
    pub kind: String,
    /// Raster units the file will produce: page count for PDFs, 1 for images.
    pub units: usize,
}
