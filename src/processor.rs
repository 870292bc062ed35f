//! The checkpointed page processor.
//!
//! Drives a document through page-level extraction with at-most-once
//! paid-call semantics per page across restarts:
//!
//! 1. open the workspace (idempotent directory creation);
//! 2. load the progress record (absent/malformed ⇒ empty);
//! 3. materialise every page up front, in order;
//! 4. for each page: skip it only if the record names it *and* its result
//!    file re-reads cleanly; otherwise persist the artifact, make exactly
//!    one extraction call, and on success commit result-then-record before
//!    touching the next page;
//! 5. write the aggregate, in page order, after the last page is visited.
//!
//! ## Why strictly sequential?
//!
//! One page is fully committed (artifact + result + progress write) before
//! the next begins, so at every instant a crash could occur the record
//! describes a consistent prefix of completed work. Throughput is bounded
//! by the remote service's latency either way; ordering is what makes the
//! resume contract trivially correct.
//!
//! ## Failure semantics
//!
//! A page-scoped failure (extraction error, empty response, a result that
//! would not persist) is logged and the page left out of the record — the
//! next invocation of the processor is the retry mechanism; there is no
//! in-run retry. Given a deterministic extraction function, a resumed run
//! produces a byte-identical aggregate to an uninterrupted one.

use crate::checkpoint::{Checkpoint, Workspace};
use crate::config::{OcrConfig, OutputFormat};
use crate::error::{PageError, PagecastError};
use crate::extract::{Extraction, PageExtractor, PageText, RenderedPage, VisionExtractor};
use crate::observer::RunObserver;
use crate::output::{OcrOutput, PageDisposition, PageOutcome, RunStats};
use crate::pipeline::{encode, input, render};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a document (local path or URL) through the full OCR pipeline.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(OcrOutput)` whenever the run itself completed, even if some pages
/// stayed incomplete (check [`OcrOutput::incomplete_pages`]).
///
/// # Errors
/// Returns `Err(PagecastError)` only for fatal problems: bad input, bad
/// PDF, unwritable output directory, unconfigured provider, or a
/// rasterisation failure. All of these surface before the first paid call.
pub async fn run_ocr(
    input_str: impl AsRef<str>,
    config: &OcrConfig,
) -> Result<OcrOutput, PagecastError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Processing document: {}", input_str);

    // Fatal preconditions first: workspace and provider, before any
    // rendering and long before any network call.
    let workspace = Workspace::open(&config.output_dir)?;
    let provider = config.llm.resolve()?;

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;

    let render_start = Instant::now();
    let rendered = render::render_document(
        resolved.path(),
        config.password.as_deref(),
        config.max_rendered_pixels,
    )
    .await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", rendered.len(), render_duration_ms);

    let mut pages = Vec::with_capacity(rendered.len());
    for (number, img) in &rendered {
        let page = encode::encode_page(*number, img).map_err(|e| PagecastError::RenderFailed {
            page: *number,
            detail: format!("image encoding failed: {}", e),
        })?;
        pages.push(page);
    }

    let extractor: Arc<dyn PageExtractor> = Arc::new(VisionExtractor::from_config(provider, config));

    let extract_start = Instant::now();
    let (outcomes, aggregate_path) = process_pages(
        &pages,
        &extractor,
        &workspace,
        config.format,
        config.observer.as_deref(),
    )
    .await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let stats = RunStats {
        total_pages: outcomes.len(),
        extracted_pages: outcomes
            .iter()
            .filter(|o| matches!(o.disposition, PageDisposition::Extracted))
            .count(),
        resumed_pages: outcomes
            .iter()
            .filter(|o| matches!(o.disposition, PageDisposition::Resumed))
            .count(),
        skipped_pages: outcomes
            .iter()
            .filter(|o| matches!(o.disposition, PageDisposition::Skipped(_)))
            .count(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        extract_duration_ms,
    };

    info!(
        "Run complete: {} extracted, {} resumed, {} skipped → {}",
        stats.extracted_pages,
        stats.resumed_pages,
        stats.skipped_pages,
        aggregate_path.display()
    );

    if let Some(ref observer) = config.observer {
        observer.on_run_complete(&stats);
    }

    Ok(OcrOutput {
        pages: outcomes,
        aggregate_path,
        stats,
    })
}

/// The checkpointed loop itself, over already-materialised pages.
///
/// Separated from [`run_ocr`] so tests can drive it with synthetic pages
/// and a scripted extractor; the resume, isolation, and ordering
/// guarantees all live here.
pub async fn process_pages(
    pages: &[RenderedPage],
    extractor: &Arc<dyn PageExtractor>,
    workspace: &Workspace,
    format: OutputFormat,
    observer: Option<&dyn RunObserver>,
) -> Result<(Vec<PageOutcome>, PathBuf), PagecastError> {
    let checkpoint_path = workspace.checkpoint_path();
    let mut checkpoint = Checkpoint::load(&checkpoint_path);
    if !checkpoint.is_empty() {
        info!("Resuming: {} pages already recorded as done", checkpoint.len());
    }

    let total = pages.len();
    if let Some(obs) = observer {
        obs.on_run_start(total);
    }

    let mut aggregate: Vec<PageText> = Vec::with_capacity(total);
    let mut outcomes: Vec<PageOutcome> = Vec::with_capacity(total);

    for page in pages {
        let number = page.number;

        // Recorded as done? Trust the file over the record: only skip when
        // the result actually re-reads. A recorded-but-missing (or corrupt)
        // result falls through to reprocessing.
        if let Some(recorded) = checkpoint.result_for(number) {
            match read_page_result(recorded) {
                Some(text) => {
                    debug!("Skipping already processed page {}", number);
                    aggregate.push(text);
                    outcomes.push(PageOutcome {
                        page: number,
                        disposition: PageDisposition::Resumed,
                    });
                    if let Some(obs) = observer {
                        obs.on_page_resumed(number, total);
                    }
                    continue;
                }
                None => {
                    warn!(
                        "Page {} is recorded as done but its result is missing or unreadable; reprocessing",
                        number
                    );
                }
            }
        }

        info!("Processing page {}...", number);

        let disposition = process_one_page(page, extractor, workspace, &mut checkpoint, &checkpoint_path)
            .await;

        match disposition {
            Ok(text) => {
                aggregate.push(text);
                outcomes.push(PageOutcome {
                    page: number,
                    disposition: PageDisposition::Extracted,
                });
                if let Some(obs) = observer {
                    obs.on_page_extracted(number, total);
                }
            }
            Err(page_error) => {
                // Contained at the page boundary: warn and move on. The
                // absent record entry makes the next run the retry.
                warn!("{}", page_error);
                if let Some(obs) = observer {
                    obs.on_page_skipped(number, total, &page_error.to_string());
                }
                outcomes.push(PageOutcome {
                    page: number,
                    disposition: PageDisposition::Skipped(page_error),
                });
            }
        }
    }

    let aggregate_path = write_aggregate(workspace, format, &aggregate)?;
    Ok((outcomes, aggregate_path))
}

/// Artifact → extraction call → result file → progress record, for one
/// page. Every failure in here is page-scoped.
async fn process_one_page(
    page: &RenderedPage,
    extractor: &Arc<dyn PageExtractor>,
    workspace: &Workspace,
    checkpoint: &mut Checkpoint,
    checkpoint_path: &Path,
) -> Result<PageText, PageError> {
    let number = page.number;

    let image_path = workspace.page_image_path(number);
    std::fs::write(&image_path, &page.png).map_err(|e| PageError::ArtifactWriteFailed {
        page: number,
        detail: e.to_string(),
    })?;

    let text = match extractor.extract(page).await {
        Ok(Extraction::Text(text)) => text,
        Ok(Extraction::Empty) => return Err(PageError::EmptyExtraction { page: number }),
        Err(e) => {
            return Err(PageError::ExtractionFailed {
                page: number,
                detail: e.to_string(),
            })
        }
    };

    // Result file extension follows the payload, so a plain response from
    // a structured backend still round-trips on resume.
    let result_path = match &text {
        PageText::Structured(_) => workspace.page_result_path(number, OutputFormat::Json),
        PageText::Plain(_) => workspace.page_result_path(number, OutputFormat::Text),
    };
    write_page_result(&result_path, &text).map_err(|e| PageError::ResultWriteFailed {
        page: number,
        detail: e.to_string(),
    })?;

    // Commit point: once the record is on disk, this page is never paid
    // for again. A failed record write costs one re-extraction on the next
    // run, which is why it only warns.
    checkpoint.record(number, &result_path);
    if let Err(e) = checkpoint.save(checkpoint_path) {
        warn!(
            "Failed to persist progress record after page {}: {}",
            number, e
        );
    }

    Ok(text)
}

/// Re-read a recorded per-page result. `None` means "treat as not done".
fn read_page_result(path: &Path) -> Option<PageText> {
    let raw = std::fs::read_to_string(path).ok()?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str::<Value>(&raw)
            .ok()
            .map(PageText::Structured),
        _ => {
            if raw.trim().is_empty() {
                None
            } else {
                Some(PageText::Plain(raw))
            }
        }
    }
}

/// Persist one page's extraction result.
fn write_page_result(path: &Path, text: &PageText) -> std::io::Result<()> {
    let body = match text {
        PageText::Structured(v) => serde_json::to_string_pretty(v)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
        PageText::Plain(s) => s.clone(),
    };
    std::fs::write(path, body)
}

/// Write the aggregate output atomically (temp file + rename).
fn write_aggregate(
    workspace: &Workspace,
    format: OutputFormat,
    texts: &[PageText],
) -> Result<PathBuf, PagecastError> {
    let path = workspace.aggregate_path(format);
    let body = match format {
        OutputFormat::Json => {
            let values: Vec<Value> = texts.iter().map(PageText::to_value).collect();
            serde_json::to_string_pretty(&values)
                .map_err(|e| PagecastError::Internal(e.to_string()))?
        }
        OutputFormat::Text => texts
            .iter()
            .map(|t| t.as_text().into_owned())
            .collect::<Vec<_>>()
            .join("\n\n"),
    };

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &body)
        .and_then(|_| std::fs::rename(&tmp, &path))
        .map_err(|source| PagecastError::OutputWriteFailed {
            path: path.clone(),
            source,
        })?;

    info!("Aggregate output written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_result_reads_as_not_done() {
        assert!(read_page_result(Path::new("/no/such/file.txt")).is_none());
    }

    #[test]
    fn corrupt_json_result_reads_as_not_done() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_1.json");
        std::fs::write(&path, "{truncated").unwrap();
        assert!(read_page_result(&path).is_none());
    }

    #[test]
    fn page_result_round_trip_both_shapes() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("page_1.json");
        let structured = PageText::Structured(serde_json::json!({"text": "alpha"}));
        write_page_result(&json_path, &structured).unwrap();
        assert_eq!(read_page_result(&json_path), Some(structured));

        let txt_path = dir.path().join("page_2.txt");
        let plain = PageText::Plain("beta".into());
        write_page_result(&txt_path, &plain).unwrap();
        assert_eq!(read_page_result(&txt_path), Some(plain));
    }

    #[test]
    fn aggregate_text_mode_joins_with_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path().join("run")).unwrap();
        let texts = vec![
            PageText::Plain("A".into()),
            PageText::Plain("B".into()),
            PageText::Plain("C".into()),
        ];
        let path = write_aggregate(&ws, OutputFormat::Text, &texts).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "A\n\nB\n\nC");
    }

    #[test]
    fn aggregate_json_mode_is_an_array_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path().join("run")).unwrap();
        let texts = vec![
            PageText::Structured(serde_json::json!({"text": "A"})),
            PageText::Plain("B".into()),
        ];
        let path = write_aggregate(&ws, OutputFormat::Json, &texts).unwrap();
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, serde_json::json!([{"text": "A"}, "B"]));
    }
}
