//! Extraction: turn a discovered file into an ordered list of raster units.
//!
//! * PDF — every page is rasterised by a [`PageRenderer`] and PNG-encoded,
//!   one unit per page, labelled `"{file} (Page {n})"`.
//! * Image — the file's bytes are used as-is, one unit labelled `"{file}"`.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-aware. Rendering runs on Tokio's blocking pool so the runtime's
//! worker threads keep driving in-flight model calls.

use crate::config::DigestConfig;
use crate::error::DigestError;
use crate::output::UnitLabel;
use crate::pipeline::discover::{SourceFile, SourceKind};
use crate::pipeline::encode::encode_png;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// MIME type of every page produced by a [`PageRenderer`].
pub const PAGE_MIME_TYPE: &str = "image/png";

/// One encoded image on its way to the vision model.
#[derive(Debug, Clone)]
pub struct RasterUnit {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub label: UnitLabel,
}

/// The PDF rendering collaborator.
///
/// Implementations block; callers run them on a blocking thread.
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, path: &Path) -> Result<usize, DigestError>;

    /// Every page, in document order, as PNG bytes.
    fn render_pages(&self, path: &Path) -> Result<Vec<Vec<u8>>, DigestError>;
}

/// Produce the raster units for `file`, in page order.
pub async fn extract_units(
    file: &SourceFile,
    renderer: &Arc<dyn PageRenderer>,
) -> Result<Vec<RasterUnit>, DigestError> {
    match file.kind {
        SourceKind::Pdf => {
            let renderer = Arc::clone(renderer);
            let path = file.path.clone();
            let pages = tokio::task::spawn_blocking(move || renderer.render_pages(&path))
                .await
                .map_err(|e| DigestError::Internal(format!("Render task panicked: {}", e)))??;

            debug!("{}: {} pages rendered", file.file_name, pages.len());
            Ok(pages
                .into_iter()
                .enumerate()
                .map(|(idx, bytes)| RasterUnit {
                    bytes,
                    mime_type: PAGE_MIME_TYPE,
                    label: UnitLabel::page(&file.file_name, idx + 1),
                })
                .collect())
        }
        SourceKind::Image { mime_type } => {
            let bytes =
                tokio::fs::read(&file.path)
                    .await
                    .map_err(|e| DigestError::FileReadFailed {
                        path: file.path.clone(),
                        source: e,
                    })?;
            Ok(vec![RasterUnit {
                bytes,
                mime_type,
                label: UnitLabel::file(&file.file_name),
            }])
        }
    }
}

/// Count the units `file` will produce without rendering anything.
pub async fn count_units(
    file: &SourceFile,
    renderer: &Arc<dyn PageRenderer>,
) -> Result<usize, DigestError> {
    match file.kind {
        SourceKind::Pdf => {
            let renderer = Arc::clone(renderer);
            let path = file.path.clone();
            tokio::task::spawn_blocking(move || renderer.page_count(&path))
                .await
                .map_err(|e| DigestError::Internal(format!("Page-count task panicked: {}", e)))?
        }
        SourceKind::Image { .. } => Ok(1),
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`PageRenderer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    dpi: u32,
    max_rendered_pixels: u32,
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(dpi: u32, max_rendered_pixels: u32, library_path: Option<PathBuf>) -> Self {
        Self {
            dpi,
            max_rendered_pixels,
            library_path,
        }
    }

    pub fn from_config(config: &DigestConfig) -> Self {
        Self::new(
            config.dpi,
            config.max_rendered_pixels,
            config.pdfium_library_path.clone(),
        )
    }

    /// Bind to the configured library, or the system one.
    fn bind(&self) -> Result<Pdfium, DigestError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| DigestError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }

    fn render_config(&self) -> PdfRenderConfig {
        PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32)
    }
}

fn open_failed(path: &Path, e: PdfiumError) -> DigestError {
    DigestError::PdfOpenFailed {
        path: path.to_path_buf(),
        detail: format!("{:?}", e),
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, path: &Path) -> Result<usize, DigestError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| open_failed(path, e))?;
        let count = document.pages().len() as usize;
        Ok(count)
    }

    fn render_pages(&self, path: &Path) -> Result<Vec<Vec<u8>>, DigestError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| open_failed(path, e))?;

        let pages = document.pages();
        info!("{}: {} pages", path.display(), pages.len());

        let render_config = self.render_config();
        let mut results = Vec::with_capacity(pages.len() as usize);

        for (idx, page) in pages.iter().enumerate() {
            let raster_failed = |detail: String| DigestError::RasterisationFailed {
                path: path.to_path_buf(),
                page: idx + 1,
                detail,
            };

            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| raster_failed(format!("{:?}", e)))?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            let png = encode_png(&image)
                .map_err(|e| raster_failed(format!("PNG encoding failed: {}", e)))?;
            results.push(png);
        }

        Ok(results)
    }
}
