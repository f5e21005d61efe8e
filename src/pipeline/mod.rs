//! Pipeline stages for a digest run.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the external collaborators (pdfium, the model backend) stay behind
//! narrow traits.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ extract ──▶ analyze ──▶ aggregate ──▶ report
//! (folder)     (pdfium)    (VLM/unit)  (VLM/once)    (markdown)
//! ```
//!
//! 1. [`discover`]  — validate the input folder, list `.pdf`/`.jpg`/`.png`
//! 2. [`extract`]   — rasterise PDF pages (`PageRenderer`) or read images
//! 3. [`encode`]    — PNG-encode pages, base64-wrap units for the request
//! 4. [`analyze`]   — one model call per raster unit (`ImageAnalyzer`)
//! 5. [`aggregate`] — one model call over all notes
//! 6. [`report`]    — heading + summary, written over the previous report

pub mod aggregate;
pub mod analyze;
pub mod discover;
pub mod encode;
pub mod extract;
pub mod report;
