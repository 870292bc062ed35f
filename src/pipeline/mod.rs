//! Pipeline stages feeding the checkpointed page processor.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable and a backend can be swapped without touching
//! the others.
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ processor loop
//! (URL/path)  (pdfium)  (PNG+base64)  (extract / checkpoint / aggregate)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`] — rasterise every page up front; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`] — PNG-encode each page and wrap it for the vision API

pub mod encode;
pub mod input;
pub mod render;
