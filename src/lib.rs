//! # pagecast
//!
//! Batch tools that pipe documents and text through vision/LLM services:
//! checkpointed page-level OCR, podcast narration with voice synthesis,
//! and retrieval-backed question answering over a local corpus.
//!
//! ## The core: checkpointed page processing
//!
//! Vision-model OCR is paid per page and network-bound, so the one thing
//! the OCR pipeline must get right is *idempotent resumability*: a crashed
//! or interrupted run restarts at the first incomplete page and never
//! re-pays for work already done.
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Render     rasterise every page via pdfium (spawn_blocking)
//!  ├─ 3. Encode     PNG artifact + base64 for the vision API
//!  ├─ 4. Loop       sequential: skip-if-done / extract / commit per page
//!  │                (progress.json rewritten after every success)
//!  └─ 5. Aggregate  final_output.json / final_output.txt in page order
//! ```
//!
//! Per-page results live under the output directory; `progress.json` maps
//! completed page numbers to their result files. On resume the record is
//! only trusted when the result file itself re-reads cleanly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagecast::{run_ocr, OcrConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = OcrConfig::builder().output_dir("output_texts").build()?;
//!     let output = run_ocr("book.pdf", &config).await?;
//!     println!("aggregate: {}", output.aggregate_path.display());
//!     if !output.incomplete_pages().is_empty() {
//!         eprintln!("rerun to retry pages {:?}", output.incomplete_pages());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagecast` binary (clap + anyhow + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pagecast = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod ask;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod extract;
pub mod observer;
pub mod output;
pub mod pipeline;
pub mod podcast;
pub mod processor;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use ask::{ask, Answer, AskConfig, ContextChunk, ContextRetriever, DirectoryRetriever};
pub use checkpoint::{Checkpoint, Workspace};
pub use config::{OcrConfig, OcrConfigBuilder, OutputFormat, ProviderConfig};
pub use error::{PageError, PagecastError};
pub use extract::{Extraction, ExtractError, PageExtractor, PageText, RenderedPage, VisionExtractor};
pub use observer::{NoopObserver, RunObserver};
pub use output::{OcrOutput, PageDisposition, PageOutcome, RunStats};
pub use podcast::{run_podcast, PodcastConfig, PodcastOutput, SpeechSynthesizer, WavAudio};
pub use processor::{process_pages, run_ocr};
