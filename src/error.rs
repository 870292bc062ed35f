//! Error types for the pagecast library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PagecastError`] — **Fatal**: the run cannot proceed at all (missing
//!   input, not a PDF, provider not configured, unwritable output
//!   directory). Raised before any paid API call is made.
//!
//! * [`PageError`] — **Non-fatal**: a single page or input file failed
//!   (extraction error, empty model response, one narration that could not
//!   be synthesized). Contained at the loop boundary and logged; the rest of
//!   the run continues, and the next invocation of the processor retries
//!   whatever is still incomplete.
//!
//! A third category is deliberately *not* an error: local I/O problems on
//! the progress record or on an already-recorded result file. Those are
//! treated as "not yet done" and silently reprocessed.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagecast library.
///
/// Page- and file-scoped failures use [`PageError`] and are stored in
/// [`crate::output::PageOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PagecastError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium returned an error while rasterising a page.
    ///
    /// Rasterisation happens before any paid API call, so a render failure
    /// is fatal rather than page-scoped: a document that cannot be fully
    /// materialised cannot satisfy the resume contract.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The document contains no pages.
    #[error("Document '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Workspace / output errors ─────────────────────────────────────────
    /// The output directory could not be created or is not writable.
    #[error("Output directory '{path}' is not writable: {source}")]
    OutputDirUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the aggregate or another final output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Podcast errors ────────────────────────────────────────────────────
    /// The input directory holds no processable text files.
    #[error("No .txt files found in '{path}'")]
    NoInputFiles { path: PathBuf },

    /// No audio segments survived synthesis; there is nothing to concatenate.
    #[error("No audio segments were produced under '{path}'")]
    NoAudioSegments { path: PathBuf },

    // ── Ask errors ────────────────────────────────────────────────────────
    /// The corpus directory does not exist.
    #[error("Corpus directory not found: '{path}'")]
    CorpusNotFound { path: PathBuf },

    /// The question was empty or whitespace-only.
    #[error("Question must not be empty")]
    EmptyQuestion,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error scoped to a single page or input file.
///
/// Stored in [`crate::output::PageOutcome`] when a unit of work fails.
/// The run continues; the absent progress-record entry makes the next
/// invocation the retry mechanism.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The extraction service returned an error for this page.
    #[error("Page {page}: extraction failed: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// The extraction service answered but produced no usable text.
    #[error("Page {page}: no text extracted")]
    EmptyExtraction { page: usize },

    /// The page image could not be written to the working directory.
    #[error("Page {page}: failed to persist page image: {detail}")]
    ArtifactWriteFailed { page: usize, detail: String },

    /// The extraction result could not be written; the page stays incomplete.
    #[error("Page {page}: failed to persist result: {detail}")]
    ResultWriteFailed { page: usize, detail: String },

    /// One text file could not be rewritten into a narration.
    #[error("'{file}': narration failed: {detail}")]
    NarrationFailed { file: String, detail: String },

    /// One narration could not be synthesized into audio.
    #[error("'{file}': synthesis failed: {detail}")]
    SynthesisFailed { file: String, detail: String },
}
