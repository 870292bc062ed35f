//! PDF rasterisation: materialise every page as a `DynamicImage` via pdfium.
//!
//! The whole document is rendered up front — this is a batch tool, and the
//! page loop needs the full ordered sequence before it starts so that a
//! resumed run visits exactly the same pages in the same order. Rendering
//! is cheap and idempotent next to the paid extraction calls; re-rendering
//! an already-completed page on a resume run costs nothing but CPU.
//!
//! pdfium wraps a C++ library with thread-local state that is not safe to
//! call from async contexts, so the work runs in `spawn_blocking`.

use crate::error::PagecastError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Rasterise all pages of a PDF, in page order.
///
/// `max_pixels` caps the longest edge of each rendered page regardless of
/// physical page size, keeping memory bounded and staying inside the image
/// sweet spot for vision models.
///
/// # Returns
/// A vector of `(page_number_1based, DynamicImage)` tuples covering every
/// page of the document.
pub async fn render_document(
    pdf_path: &Path,
    password: Option<&str>,
    max_pixels: u32,
) -> Result<Vec<(usize, DynamicImage)>, PagecastError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        render_document_blocking(&path, password.as_deref(), max_pixels)
    })
    .await
    .map_err(|e| PagecastError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_document_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    max_pixels: u32,
) -> Result<Vec<(usize, DynamicImage)>, PagecastError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PagecastError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                PagecastError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            PagecastError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    if total_pages == 0 {
        return Err(PagecastError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| PagecastError::RenderFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            PagecastError::RenderFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push((idx + 1, image));
    }

    Ok(results)
}
