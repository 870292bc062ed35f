//! Integration tests for the podcast synthesis stage.
//!
//! A deterministic mock synthesizer stands in for the TTS boundary so the
//! worker pool and the sorted-order concatenation can be checked exactly:
//! whatever order the workers finish in, the final WAV must equal the
//! filename-ordered concatenation of each file's segments.

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec};
use pagecast::podcast::audio::{concatenate_wav_dir, read_wav, SpeechError};
use pagecast::podcast::{parse_cues, run_podcast, synthesize_files, PodcastConfig};
use pagecast::{PageError, SpeechSynthesizer, WavAudio};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// One sample per byte of input text; a voice name shifts the samples so
/// cue handling is visible in the output.
fn mock_samples(text: &str, voice: Option<&str>) -> Vec<i16> {
    let shift = voice.map(|v| v.len() as i16).unwrap_or(0);
    text.bytes().map(|b| b as i16 + shift).collect()
}

struct MockSynthesizer;

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<WavAudio, SpeechError> {
        if text.contains("UNSPEAKABLE") {
            return Err(SpeechError::Command("injected tts failure".into()));
        }
        Ok(WavAudio {
            spec: spec(),
            samples: mock_samples(text, voice),
        })
    }
}

/// What the pipeline should produce for one narration file: its cue
/// segments synthesized in order and appended.
fn expected_samples_for(text: &str) -> Vec<i16> {
    parse_cues(text)
        .iter()
        .flat_map(|seg| mock_samples(&seg.text, seg.voice.as_deref()))
        .collect()
}

fn write_inputs(dir: &Path, files: &[(&str, &str)]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        paths.push(path);
    }
    paths.sort();
    paths
}

// ── Parallel stage determinism ───────────────────────────────────────────────

#[tokio::test]
async fn pooled_synthesis_concatenates_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    std::fs::create_dir(&audio_dir).unwrap();

    // Deliberately created in non-sorted order with different lengths, so
    // workers finish out of order.
    let inputs = write_inputs(
        dir.path(),
        &[
            ("z.txt", "last file, quite a bit longer than the others"),
            ("x.txt", "first"),
            ("y.txt", "middle file"),
        ],
    );

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(MockSynthesizer);
    let (written, failures) = synthesize_files(&inputs, &audio_dir, synthesizer, 4).await;
    assert_eq!(written.len(), 3);
    assert!(failures.is_empty());

    let podcast_path = dir.path().join("podcast.wav");
    let joined = concatenate_wav_dir(&audio_dir, &podcast_path).unwrap();
    assert_eq!(joined, 3);

    // Expected: x, then y, then z — fixed by filename, not completion order.
    let mut expected = Vec::new();
    expected.extend(expected_samples_for("first"));
    expected.extend(expected_samples_for("middle file"));
    expected.extend(expected_samples_for(
        "last file, quite a bit longer than the others",
    ));
    assert_eq!(read_wav(&podcast_path).unwrap().samples, expected);
}

#[tokio::test]
async fn voice_cues_shape_the_segment_audio() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    std::fs::create_dir(&audio_dir).unwrap();

    let text = "Intro. [Voice: Ana] Hola a todos. [Voice: Sam] And back to English.";
    let inputs = write_inputs(dir.path(), &[("cued.txt", text)]);

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(MockSynthesizer);
    let (written, failures) = synthesize_files(&inputs, &audio_dir, synthesizer, 2).await;
    assert_eq!(written.len(), 1);
    assert!(failures.is_empty());

    let audio = read_wav(&audio_dir.join("cued.wav")).unwrap();
    assert_eq!(audio.samples, expected_samples_for(text));
}

#[tokio::test]
async fn one_failed_file_does_not_sink_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let audio_dir = dir.path().join("audio");
    std::fs::create_dir(&audio_dir).unwrap();

    let inputs = write_inputs(
        dir.path(),
        &[
            ("a.txt", "fine"),
            ("b.txt", "UNSPEAKABLE content"),
            ("c.txt", "also fine"),
        ],
    );

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(MockSynthesizer);
    let (written, failures) = synthesize_files(&inputs, &audio_dir, synthesizer, 3).await;

    assert_eq!(written.len(), 2);
    assert_eq!(failures.len(), 1);
    assert!(matches!(&failures[0], PageError::SynthesisFailed { file, .. } if file == "b.txt"));

    let podcast_path = dir.path().join("podcast.wav");
    let joined = concatenate_wav_dir(&audio_dir, &podcast_path).unwrap();
    assert_eq!(joined, 2);

    let mut expected = Vec::new();
    expected.extend(expected_samples_for("fine"));
    expected.extend(expected_samples_for("also fine"));
    assert_eq!(read_wav(&podcast_path).unwrap().samples, expected);
}

// ── End-to-end without the LLM stage ─────────────────────────────────────────

#[tokio::test]
async fn run_podcast_with_injected_synthesizer_skipping_narration() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("txt");
    std::fs::create_dir(&input_dir).unwrap();
    write_inputs(
        &input_dir,
        &[("one.txt", "hello"), ("two.txt", "[Voice: Ana] hola")],
    );

    let config = PodcastConfig {
        input_dir,
        output_dir: dir.path().join("podcast"),
        workers: 2,
        skip_narration: true,
        synthesizer: Some(Arc::new(MockSynthesizer)),
        ..PodcastConfig::default()
    };

    let output = run_podcast(&config).await.unwrap();
    assert!(output.narrated.is_empty());
    assert_eq!(output.synthesized.len(), 2);
    assert!(output.failures.is_empty());
    assert!(output.podcast_path.ends_with("podcast/podcast.wav"));

    let mut expected = Vec::new();
    expected.extend(expected_samples_for("hello"));
    expected.extend(expected_samples_for("[Voice: Ana] hola"));
    assert_eq!(read_wav(&output.podcast_path).unwrap().samples, expected);
}

#[tokio::test]
async fn empty_input_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("txt");
    std::fs::create_dir(&input_dir).unwrap();

    let config = PodcastConfig {
        input_dir,
        output_dir: dir.path().join("podcast"),
        skip_narration: true,
        synthesizer: Some(Arc::new(MockSynthesizer)),
        ..PodcastConfig::default()
    };

    let err = run_podcast(&config).await.unwrap_err();
    assert!(matches!(err, pagecast::PagecastError::NoInputFiles { .. }));
}
