//! Image encoding: `DynamicImage` → PNG artifact bytes + base64 `ImageData`.
//!
//! PNG over JPEG: lossless compression keeps rendered text crisp, and
//! compression artefacts on glyphs measurably degrade what a vision model
//! reads back. `detail: "high"` asks GPT-4-class models for the full image
//! tile budget; without it fine print and small tables are lost.
//!
//! The same PNG bytes serve two purposes: persisted to `images/page_N.png`
//! as the run's page artifact, and base64-wrapped into the API request.

use crate::extract::RenderedPage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode one rasterised page for both disk and the vision API.
pub fn encode_page(
    number: usize,
    img: &DynamicImage,
) -> Result<RenderedPage, image::ImageError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&png);
    debug!("Encoded page {} → {} bytes base64", number, b64.len());

    Ok(RenderedPage {
        number,
        png,
        image: ImageData::new(b64, "image/png").with_detail("high"),
    })
}
