//! Report writer: heading + summary, written over any previous report.
//!
//! The file is written to a sibling temp path and renamed into place, so a
//! crash mid-write leaves the previous report (or nothing), never a
//! truncated one.

use crate::error::DigestError;
use crate::prompts::REPORT_HEADING;
use std::path::Path;
use tracing::info;

/// `"# MASTER SUMMARY\n\n{summary}"`.
pub fn render_report(summary: &str) -> String {
    format!("{REPORT_HEADING}\n\n{summary}")
}

/// Write `report` to `path`, replacing any existing file.
pub async fn write_report(path: &Path, report: &str) -> Result<(), DigestError> {
    let write_failed = |e: std::io::Error| DigestError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, report.as_bytes())
        .await
        .map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }

    info!("Report saved to: {}", path.display());
    Ok(())
}
