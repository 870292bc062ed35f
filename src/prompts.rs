//! Prompt constants for every pipeline.
//!
//! Centralising prompts keeps behaviour changes in one place and lets unit
//! tests inspect them without a live model. Callers can override the OCR
//! prompt via [`crate::config::OcrConfig::extraction_prompt`] and the
//! podcast prompt via [`crate::podcast::PodcastConfig`]; the constants here
//! apply when no override is given.

/// Extraction prompt used in JSON output mode.
///
/// The recognised response shape is a single JSON object with a `text`
/// field; anything else is treated as a malformed response.
pub const JSON_EXTRACTION_PROMPT: &str = r#"You are a meticulous OCR engine. Extract all readable text from the page image.

Rules:
- Preserve the reading order a human would use.
- Keep paragraph breaks; do not invent text that is not on the page.
- If the page contains no readable text, respond with an empty JSON object: {}
- Respond ONLY with a JSON object using this schema, no commentary, no code fences:
{
    "text": "the full page text"
}"#;

/// Extraction prompt used in plain-text output mode.
pub const PLAIN_EXTRACTION_PROMPT: &str = r#"You are a meticulous OCR engine. Extract all readable text from the page image.

Rules:
- Preserve the reading order a human would use.
- Keep paragraph breaks; do not invent text that is not on the page.
- Output ONLY the extracted text, with no commentary and no code fences.
- If the page contains no readable text, output nothing at all."#;

/// System prompt turning a source text into a podcast monologue.
pub const PODCAST_STYLIST_PROMPT: &str = "Using the provided text, create a podcast-style \
monologue presented by a single narrator. Since the listener cannot see the text, describe \
non-readable elements like diagrams and tables clearly and concisely. Keep the explanation \
thoughtful, engaging, and easy to follow, in a conversational style. Do not add non-verbal \
cues or stage directions (e.g. '[Intro music fades out]', '[Pause]') — the text-to-speech \
stage would read them aloud. Your response must cover every entity and topic from the \
original text.";

/// System prompt for corpus question answering.
pub const QA_SYSTEM_PROMPT: &str = "You are a careful assistant answering questions from the \
provided context excerpts only. If the context does not contain the answer, say so plainly \
instead of guessing. Keep answers concise and mention which source file each claim comes from.";

/// Build the user message for a QA call: numbered context excerpts
/// followed by the question.
pub fn qa_user_message(question: &str, contexts: &[(String, String)]) -> String {
    let mut msg = String::from("Context excerpts:\n\n");
    for (i, (source, text)) in contexts.iter().enumerate() {
        msg.push_str(&format!("[{}] (from {source})\n{text}\n\n", i + 1));
    }
    msg.push_str(&format!("Question: {}", question.trim()));
    msg
}
