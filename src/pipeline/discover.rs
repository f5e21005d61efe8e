//! Discovery: validate the input folder and list the files to digest.
//!
//! Only the immediate entries of the folder are considered. A file is
//! eligible when its name ends, case-insensitively, with one of
//! [`SUPPORTED_EXTENSIONS`]. Eligible files are returned sorted by name so a
//! run over the same folder always produces notes in the same order.

use crate::error::DigestError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extensions recognised by discovery, lower-case, without the dot.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "jpg", "png"];

/// How a discovered file is turned into raster units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Rasterised one unit per page.
    Pdf,
    /// Sent as-is; the MIME type is taken from the extension.
    Image { mime_type: &'static str },
}

impl SourceKind {
    /// Classify a file name by its extension. `None` if not eligible.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        let ext = SUPPORTED_EXTENSIONS
            .into_iter()
            .find(|supported| *supported == ext)?;
        Some(match ext {
            "pdf" => SourceKind::Pdf,
            "png" => SourceKind::Image {
                mime_type: "image/png",
            },
            _ => SourceKind::Image {
                mime_type: "image/jpeg",
            },
        })
    }

    /// Short name used in listings: `pdf`, `png` or `jpeg`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Image { mime_type } => mime_type.trim_start_matches("image/"),
        }
    }
}

/// An eligible entry of the input folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: SourceKind,
}

/// Fail with [`DigestError::InputDirMissing`] unless `dir` is an existing folder.
pub async fn ensure_input_dir(dir: &Path) -> Result<(), DigestError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(DigestError::InputDirMissing {
            path: dir.to_path_buf(),
        }),
    }
}

/// Create `dir` (and parents) if missing.
///
/// Returns `true` when the folder was created by this call.
pub async fn ensure_output_dir(dir: &Path) -> Result<bool, DigestError> {
    if let Ok(meta) = tokio::fs::metadata(dir).await {
        if meta.is_dir() {
            return Ok(false);
        }
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DigestError::OutputDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
    info!("Created output folder: {}", dir.display());
    Ok(true)
}

/// List eligible files directly inside `dir`, sorted by file name.
///
/// Returns [`DigestError::NoInputFiles`] when nothing matches.
pub async fn discover_files(dir: &Path) -> Result<Vec<SourceFile>, DigestError> {
    let unreadable = |e: std::io::Error| DigestError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let file_name = entry.file_name().to_string_lossy().into_owned();

        let Some(kind) = SourceKind::from_file_name(&file_name) else {
            continue;
        };
        // Follows symlinks, so a linked file is eligible and a folder named
        // `x.pdf` is not.
        let path = entry.path();
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            debug!("Skipping non-file entry: {}", file_name);
            continue;
        }

        files.push(SourceFile {
            path,
            file_name,
            kind,
        });
    }

    if files.is_empty() {
        return Err(DigestError::NoInputFiles {
            path: dir.to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    info!("Found {} files in {}", files.len(), dir.display());
    Ok(files)
}
