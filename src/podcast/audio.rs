//! The speech boundary and WAV plumbing.
//!
//! Audio synthesis itself is an external collaborator. Everything the
//! pipeline needs is behind [`SpeechSynthesizer`]: text (plus an optional
//! voice name) in, PCM samples out. The shipped implementation shells out
//! to a local `say`-style TTS command; tests substitute a deterministic
//! mock.
//!
//! Samples are normalised to 16-bit integer PCM at read time so segments
//! from float-emitting engines concatenate with everything else. Sample
//! *rate* and channel mismatches are not papered over — resampling is out
//! of scope, so mismatched segments are an error the caller turns into a
//! per-file skip.

use crate::error::PagecastError;
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Decoded 16-bit PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub spec: WavSpec,
    pub samples: Vec<i16>,
}

impl WavAudio {
    /// Append another clip's samples, requiring an identical spec.
    pub fn append(&mut self, other: &WavAudio) -> Result<(), SpeechError> {
        if self.spec != other.spec {
            return Err(SpeechError::SpecMismatch {
                expected: format!("{:?}", self.spec),
                got: format!("{:?}", other.spec),
            });
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }
}

/// A failed synthesis or audio-file operation. File-scoped and non-fatal
/// at the pipeline level.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("tts command failed: {0}")]
    Command(String),

    #[error("audio i/o failed: {0}")]
    Io(String),

    #[error("could not decode wav: {0}")]
    Decode(String),

    #[error("audio spec mismatch: expected {expected}, got {got}")]
    SpecMismatch { expected: String, got: String },

    #[error("no speakable text")]
    EmptyText,
}

impl From<std::io::Error> for SpeechError {
    fn from(e: std::io::Error) -> Self {
        SpeechError::Io(e.to_string())
    }
}

impl From<hound::Error> for SpeechError {
    fn from(e: hound::Error) -> Self {
        SpeechError::Decode(e.to_string())
    }
}

/// The text-to-speech boundary.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one segment. `voice` is an engine-specific voice name;
    /// `None` means the engine default.
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<WavAudio, SpeechError>;
}

/// Synthesis via a local `say`-compatible command.
///
/// Invocation shape: `<program> [-v VOICE] -f <textfile> -o <wavfile>`,
/// with both files managed as temporaries. Any engine exposing that
/// interface (macOS `say`, wrappers around espeak or piper) works.
pub struct CommandSynthesizer {
    program: String,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<WavAudio, SpeechError> {
        let mut text_file = tempfile::NamedTempFile::new()?;
        text_file.write_all(text.as_bytes())?;
        text_file.flush()?;

        let wav_file = tempfile::Builder::new().suffix(".wav").tempfile()?;

        let mut command = tokio::process::Command::new(&self.program);
        if let Some(voice) = voice {
            command.arg("-v").arg(voice);
        }
        command
            .arg("-f")
            .arg(text_file.path())
            .arg("-o")
            .arg(wav_file.path());

        debug!("Running TTS: {} ({} bytes of text)", self.program, text.len());
        let output = command
            .output()
            .await
            .map_err(|e| SpeechError::Command(format!("failed to spawn '{}': {}", self.program, e)))?;

        if !output.status.success() {
            return Err(SpeechError::Command(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        read_wav(wav_file.path())
    }
}

/// Read a WAV file, normalising samples to 16-bit integer PCM.
pub fn read_wav(path: &Path) -> Result<WavAudio, SpeechError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Int => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(WavAudio {
        spec: WavSpec {
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
            ..spec
        },
        samples,
    })
}

/// Write 16-bit PCM audio to a WAV file.
pub fn write_wav(path: &Path, audio: &WavAudio) -> Result<(), SpeechError> {
    let mut writer = hound::WavWriter::create(path, audio.spec)?;
    for &sample in &audio.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Concatenate every `*.wav` under `dir`, in filename order, into `out`.
///
/// Completion order among the workers that produced the segments is
/// irrelevant: the sort here is what fixes the output ordering. A segment
/// whose spec disagrees with the first one is skipped with a warning
/// (resampling is out of scope). Returns the number of segments joined.
pub fn concatenate_wav_dir(dir: &Path, out: &Path) -> Result<usize, PagecastError> {
    let mut wav_paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|source| PagecastError::OutputDirUnwritable {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("wav"))
        .collect();
    wav_paths.sort();

    let mut combined: Option<WavAudio> = None;
    let mut joined = 0usize;

    for path in &wav_paths {
        let clip = match read_wav(path) {
            Ok(clip) => clip,
            Err(e) => {
                warn!("Skipping unreadable segment {}: {}", path.display(), e);
                continue;
            }
        };
        match combined.as_mut() {
            None => {
                combined = Some(clip);
                joined += 1;
            }
            Some(acc) => match acc.append(&clip) {
                Ok(()) => joined += 1,
                Err(e) => warn!("Skipping segment {}: {}", path.display(), e),
            },
        }
    }

    let combined = combined.ok_or_else(|| PagecastError::NoAudioSegments {
        path: dir.to_path_buf(),
    })?;

    write_wav(out, &combined).map_err(|e| PagecastError::OutputWriteFailed {
        path: out.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    })?;

    info!(
        "Concatenated {} segments → {} ({} samples)",
        joined,
        out.display(),
        combined.samples.len()
    );
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    fn clip(samples: Vec<i16>) -> WavAudio {
        WavAudio {
            spec: spec(),
            samples,
        }
    }

    #[test]
    fn wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        let audio = clip(vec![1, -2, 3, -4]);
        write_wav(&path, &audio).unwrap();
        assert_eq!(read_wav(&path).unwrap(), audio);
    }

    #[test]
    fn append_requires_matching_spec() {
        let mut a = clip(vec![1, 2]);
        let mut other = clip(vec![3]);
        other.spec.sample_rate = 16000;
        assert!(matches!(
            a.append(&other),
            Err(SpeechError::SpecMismatch { .. })
        ));
        assert_eq!(a.samples, vec![1, 2]);
    }

    #[test]
    fn concatenation_is_filename_ordered() {
        let dir = tempfile::tempdir().unwrap();
        // Written out of order on purpose.
        write_wav(&dir.path().join("c.wav"), &clip(vec![3])).unwrap();
        write_wav(&dir.path().join("a.wav"), &clip(vec![1])).unwrap();
        write_wav(&dir.path().join("b.wav"), &clip(vec![2])).unwrap();

        let out = dir.path().join("combined_out");
        std::fs::create_dir(&out).unwrap();
        let out_path = out.join("podcast.wav");
        let joined = concatenate_wav_dir(dir.path(), &out_path).unwrap();
        assert_eq!(joined, 3);
        assert_eq!(read_wav(&out_path).unwrap().samples, vec![1, 2, 3]);
    }

    #[test]
    fn mismatched_segment_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("a.wav"), &clip(vec![1])).unwrap();
        let mut odd = clip(vec![9]);
        odd.spec.sample_rate = 8000;
        write_wav(&dir.path().join("b.wav"), &odd).unwrap();
        write_wav(&dir.path().join("c.wav"), &clip(vec![3])).unwrap();

        let out_path = dir.path().join("out").join("podcast.wav");
        std::fs::create_dir(out_path.parent().unwrap()).unwrap();
        let joined = concatenate_wav_dir(dir.path(), &out_path).unwrap();
        assert_eq!(joined, 2);
        assert_eq!(read_wav(&out_path).unwrap().samples, vec![1, 3]);
    }

    #[test]
    fn empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = concatenate_wav_dir(dir.path(), &dir.path().join("podcast.wav")).unwrap_err();
        assert!(matches!(err, PagecastError::NoAudioSegments { .. }));
    }
}
