//! Image encoding: rendered pages → PNG bytes, raster units → `ImageData`.
//!
//! PDF pages are PNG-encoded because PNG is lossless and text crispness
//! matters more than payload size for a vision model. Standalone images are
//! never re-encoded; their bytes are base64-wrapped as they are on disk.

use crate::pipeline::extract::RasterUnit;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Wrap a raster unit's payload for a multimodal chat request.
pub fn to_image_data(unit: &RasterUnit) -> ImageData {
    let b64 = STANDARD.encode(&unit.bytes);
    debug!("{}: {} bytes base64", unit.label, b64.len());
    ImageData::new(b64, unit.mime_type).with_detail("high")
}
