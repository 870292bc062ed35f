//! Podcast pipeline: narrative rewrite → voice synthesis → one WAV.
//!
//! Three stages over a directory of text files:
//!
//! 1. **Narrate** ([`narrative`]) — one LLM call per file, sequential,
//!    per-file containment.
//! 2. **Synthesize** — narration files are dispatched to a fixed-size
//!    worker pool, one task per file; each task parses voice cues and
//!    drives the [`SpeechSynthesizer`] per segment, writing one WAV per
//!    input. Completion order is unspecified.
//! 3. **Concatenate** ([`audio::concatenate_wav_dir`]) — segments are
//!    joined in sorted filename order, so the final audio is deterministic
//!    regardless of which worker finished first.
//!
//! The synthesis pool is the only parallel stage in the crate; it is safe
//! because the per-file tasks share nothing and the final ordering is
//! re-imposed from filenames, not from completion events.

pub mod audio;
pub mod cue;
pub mod narrative;

pub use audio::{CommandSynthesizer, SpeechSynthesizer, WavAudio};
pub use cue::{parse_cues, CueSegment};

use crate::config::ProviderConfig;
use crate::error::{PageError, PagecastError};
use audio::SpeechError;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for a podcast run.
#[derive(Clone)]
pub struct PodcastConfig {
    /// Directory of source `*.txt` files.
    pub input_dir: PathBuf,

    /// Output root; narrations land in `text/`, per-file WAVs in `audio/`,
    /// the final mix at `podcast.wav`. Default: `podcast`.
    pub output_dir: PathBuf,

    /// Worker-pool size for the synthesis stage. Default: 4.
    pub workers: usize,

    /// Provider selection for the narration stage.
    pub llm: ProviderConfig,

    /// Sampling temperature for narration. Default: 0.7 — narration wants
    /// some flow, unlike transcription.
    pub temperature: f32,

    /// Max tokens per narration. Default: 4096.
    pub max_tokens: usize,

    /// Custom stylist prompt; built-in default if unset.
    pub narrative_prompt: Option<String>,

    /// Skip the narration stage and synthesize the input files directly.
    pub skip_narration: bool,

    /// TTS boundary. Defaults to [`CommandSynthesizer`] running
    /// `tts_program` when unset.
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,

    /// Program for the default synthesizer. Default: `say`.
    pub tts_program: String,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("txt"),
            output_dir: PathBuf::from("podcast"),
            workers: 4,
            llm: ProviderConfig::default(),
            temperature: 0.7,
            max_tokens: 4096,
            narrative_prompt: None,
            skip_narration: false,
            synthesizer: None,
            tts_program: "say".to_string(),
        }
    }
}

impl PodcastConfig {
    fn effective_synthesizer(&self) -> Arc<dyn SpeechSynthesizer> {
        self.synthesizer
            .clone()
            .unwrap_or_else(|| Arc::new(CommandSynthesizer::new(self.tts_program.clone())))
    }
}

/// What a podcast run produced.
#[derive(Debug)]
pub struct PodcastOutput {
    /// Narrations written this run (empty when narration was skipped).
    pub narrated: Vec<PathBuf>,
    /// Per-file WAV segments written.
    pub synthesized: Vec<PathBuf>,
    /// Files that failed narration or synthesis.
    pub failures: Vec<PageError>,
    /// The final concatenated WAV.
    pub podcast_path: PathBuf,
}

/// Run the full podcast pipeline.
pub async fn run_podcast(config: &PodcastConfig) -> Result<PodcastOutput, PagecastError> {
    if config.workers == 0 {
        return Err(PagecastError::InvalidConfig("workers must be ≥ 1".into()));
    }

    let input_files = narrative::list_text_files(&config.input_dir).map_err(|_| {
        PagecastError::FileNotFound {
            path: config.input_dir.clone(),
        }
    })?;
    if input_files.is_empty() {
        return Err(PagecastError::NoInputFiles {
            path: config.input_dir.clone(),
        });
    }

    let text_dir = config.output_dir.join("text");
    let audio_dir = config.output_dir.join("audio");
    for dir in [&text_dir, &audio_dir] {
        std::fs::create_dir_all(dir).map_err(|source| PagecastError::OutputDirUnwritable {
            path: dir.clone(),
            source,
        })?;
    }

    let mut failures = Vec::new();

    // ── Stage 1: narrate ─────────────────────────────────────────────────
    let (narrated, narration_sources) = if config.skip_narration {
        info!("Narration stage skipped; synthesizing input files directly");
        (Vec::new(), input_files)
    } else {
        let provider = config.llm.resolve()?;
        let (written, narration_failures) =
            narrative::narrate_directory(&provider, &input_files, &text_dir, config).await;
        failures.extend(narration_failures);
        (written.clone(), written)
    };

    // ── Stage 2: synthesize (worker pool) ────────────────────────────────
    let synthesizer = config.effective_synthesizer();
    let (synthesized, synth_failures) =
        synthesize_files(&narration_sources, &audio_dir, synthesizer, config.workers).await;
    failures.extend(synth_failures);

    // ── Stage 3: concatenate (sorted order) ──────────────────────────────
    let podcast_path = config.output_dir.join("podcast.wav");
    audio::concatenate_wav_dir(&audio_dir, &podcast_path)?;

    Ok(PodcastOutput {
        narrated,
        synthesized,
        failures,
        podcast_path,
    })
}

/// Synthesize each text file into `<audio_dir>/<stem>.wav` on a pool of
/// `workers` concurrent tasks.
///
/// Per-file containment: a failed file is reported, not fatal. The
/// returned lists say nothing about completion order — ordering is
/// re-imposed later from filenames.
pub async fn synthesize_files(
    files: &[PathBuf],
    audio_dir: &Path,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    workers: usize,
) -> (Vec<PathBuf>, Vec<PageError>) {
    let results: Vec<Result<PathBuf, PageError>> = stream::iter(files.iter().map(|path| {
        let synthesizer = Arc::clone(&synthesizer);
        let wav_path = audio_dir.join(format!(
            "{}.wav",
            path.file_stem().unwrap_or_default().to_string_lossy()
        ));
        let path = path.clone();
        async move {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            synthesize_one(&path, &wav_path, synthesizer.as_ref())
                .await
                .map(|()| wav_path)
                .map_err(|e| PageError::SynthesisFailed {
                    file: name,
                    detail: e.to_string(),
                })
        }
    }))
    .buffer_unordered(workers.max(1))
    .collect()
    .await;

    let mut written = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(path) => written.push(path),
            Err(failure) => {
                warn!("{}", failure);
                failures.push(failure);
            }
        }
    }
    (written, failures)
}

/// Cue-parse one narration and synthesize it segment by segment into a WAV.
async fn synthesize_one(
    text_path: &Path,
    wav_path: &Path,
    synthesizer: &dyn SpeechSynthesizer,
) -> Result<(), SpeechError> {
    let text = std::fs::read_to_string(text_path)?;
    let segments = parse_cues(&text);
    if segments.is_empty() {
        return Err(SpeechError::EmptyText);
    }

    let mut combined: Option<WavAudio> = None;
    for segment in &segments {
        let clip = synthesizer
            .synthesize(&segment.text, segment.voice.as_deref())
            .await?;
        match combined.as_mut() {
            None => combined = Some(clip),
            Some(acc) => acc.append(&clip)?,
        }
    }

    let combined = combined.expect("segments is non-empty");
    audio::write_wav(wav_path, &combined)?;
    info!("Generated audio saved to {}", wav_path.display());
    Ok(())
}
