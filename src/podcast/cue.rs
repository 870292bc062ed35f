//! Voice-cue parsing: split narration text on `[Voice: NAME]` directives.
//!
//! Narrations may embed inline directives switching the speaking voice:
//!
//! ```text
//! Welcome back. [Voice: Ana] Hoy hablamos de mapas. [Voice: Sam] Maps!
//! ```
//!
//! The parser turns that into a flat sequence of `{voice, text}` segments
//! and nothing else — the synthesis loop never sees a bracket. Text before
//! the first directive carries no voice (the synthesizer's default);
//! whitespace-only segments are dropped so a directive at the start of a
//! line doesn't produce an empty utterance.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_VOICE_CUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[Voice:\s*([^\]]+)\]").unwrap());

/// One contiguous run of text spoken in a single voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueSegment {
    /// `None` until the first directive appears.
    pub voice: Option<String>,
    pub text: String,
}

/// Parse narration text into voice segments, in reading order.
pub fn parse_cues(input: &str) -> Vec<CueSegment> {
    let mut segments = Vec::new();
    let mut current_voice: Option<String> = None;
    let mut cursor = 0;

    for caps in RE_VOICE_CUE.captures_iter(input) {
        let directive = caps.get(0).expect("capture 0 always present");
        push_segment(&mut segments, current_voice.clone(), &input[cursor..directive.start()]);
        current_voice = Some(caps[1].trim().to_string());
        cursor = directive.end();
    }
    push_segment(&mut segments, current_voice, &input[cursor..]);

    segments
}

fn push_segment(out: &mut Vec<CueSegment>, voice: Option<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        out.push(CueSegment {
            voice,
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_directives_yields_one_default_segment() {
        let segments = parse_cues("Just a plain narration.");
        assert_eq!(
            segments,
            vec![CueSegment {
                voice: None,
                text: "Just a plain narration.".into()
            }]
        );
    }

    #[test]
    fn leading_text_has_no_voice() {
        let segments = parse_cues("Intro. [Voice: Ana] Hola.");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].voice, None);
        assert_eq!(segments[0].text, "Intro.");
        assert_eq!(segments[1].voice.as_deref(), Some("Ana"));
        assert_eq!(segments[1].text, "Hola.");
    }

    #[test]
    fn voice_persists_until_next_directive() {
        let segments = parse_cues("[Voice: Ana] Uno. Dos. [Voice: Sam] Three.");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].voice.as_deref(), Some("Ana"));
        assert_eq!(segments[0].text, "Uno. Dos.");
        assert_eq!(segments[1].voice.as_deref(), Some("Sam"));
    }

    #[test]
    fn whitespace_only_segments_are_dropped() {
        let segments = parse_cues("[Voice: Ana]   \n[Voice: Sam] Hi.");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].voice.as_deref(), Some("Sam"));
    }

    #[test]
    fn voice_name_is_trimmed() {
        let segments = parse_cues("[Voice:   Deep Ana  ] text");
        assert_eq!(segments[0].voice.as_deref(), Some("Deep Ana"));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_cues("").is_empty());
        assert!(parse_cues("   \n ").is_empty());
    }
}
