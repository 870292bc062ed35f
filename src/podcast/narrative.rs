//! Narration stage: rewrite source texts into podcast monologues.
//!
//! One LLM call per input file, sequential, with per-file containment: a
//! failed rewrite is logged and skipped, and the remaining files still get
//! their narrations. Files are visited in sorted order so logs and outputs
//! line up run to run.

use crate::error::PageError;
use crate::prompts::PODCAST_STYLIST_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::PodcastConfig;

/// List the `*.txt` files directly under `dir`, sorted by filename.
pub fn list_text_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Rewrite every text file in `input_dir` into a narration in `text_dir`.
///
/// Returns the narrations written plus the per-file failures.
pub async fn narrate_directory(
    provider: &Arc<dyn LLMProvider>,
    input_files: &[PathBuf],
    text_dir: &Path,
    config: &PodcastConfig,
) -> (Vec<PathBuf>, Vec<PageError>) {
    let mut written = Vec::new();
    let mut failures = Vec::new();

    for path in input_files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match narrate_one(provider, path, text_dir, config).await {
            Ok(out_path) => {
                info!("Saved narration to {}", out_path.display());
                written.push(out_path);
            }
            Err(detail) => {
                let failure = PageError::NarrationFailed { file: name, detail };
                warn!("{}", failure);
                failures.push(failure);
            }
        }
    }

    (written, failures)
}

async fn narrate_one(
    provider: &Arc<dyn LLMProvider>,
    path: &Path,
    text_dir: &Path,
    config: &PodcastConfig,
) -> Result<PathBuf, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;

    let prompt = config
        .narrative_prompt
        .as_deref()
        .unwrap_or(PODCAST_STYLIST_PROMPT);
    let messages = vec![ChatMessage::system(prompt), ChatMessage::user(&content)];
    let options = CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    };

    let response = provider
        .chat(&messages, Some(&options))
        .await
        .map_err(|e| e.to_string())?;

    let narration = response.content.trim();
    if narration.is_empty() {
        return Err("model returned an empty narration".to_string());
    }

    let out_path = text_dir.join(path.file_name().expect("listed files have names"));
    std::fs::write(&out_path, narration).map_err(|e| e.to_string())?;
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_is_sorted_and_txt_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("notes.md"), "no").unwrap();
        std::fs::create_dir(dir.path().join("sub.txt")).unwrap(); // dir, not file

        let files = list_text_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
