//! The extraction boundary: one rendered page in, text (or a reason there
//! is none) out.
//!
//! Everything past this trait is an external service with its own contract.
//! The processor only needs three things to be distinguishable:
//!
//! * `Ok(Extraction::Text(_))` — the page produced usable text;
//! * `Ok(Extraction::Empty)` — the service answered, but found nothing;
//! * `Err(ExtractError)` — the call itself failed (network, malformed
//!   response).
//!
//! The last two are handled identically by the loop (warn, leave the page
//! incomplete, move on) but are logged differently — a blank page and a
//! flaky endpoint are very different operational signals. Failure is a
//! typed value, never a field quietly missing from a dynamic response.

use crate::config::{OcrConfig, OutputFormat};
use crate::prompts::{JSON_EXTRACTION_PROMPT, PLAIN_EXTRACTION_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// One rendered page, ready for extraction: the PNG bytes that get
/// persisted as the page artifact, plus the encoded form the API consumes.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number.
    pub number: usize,
    /// PNG-encoded artifact bytes.
    pub png: Vec<u8>,
    /// Base64 wrapping of the same bytes for the vision API.
    pub image: ImageData,
}

/// Text extracted from one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageText {
    /// A JSON object from a backend asked for structured output; the
    /// recognised shape is `{"text": "…"}`.
    Structured(Value),
    /// Raw text from a plain backend.
    Plain(String),
}

impl PageText {
    /// The page's text content, for text-mode aggregation and display.
    ///
    /// Structured payloads yield their `text` field when present, falling
    /// back to the compact JSON serialisation so nothing is silently lost.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            PageText::Plain(s) => Cow::Borrowed(s),
            PageText::Structured(v) => match v.get("text").and_then(Value::as_str) {
                Some(s) => Cow::Borrowed(s),
                None => Cow::Owned(v.to_string()),
            },
        }
    }

    /// The page's payload as a JSON value, for JSON-mode aggregation.
    pub fn to_value(&self) -> Value {
        match self {
            PageText::Structured(v) => v.clone(),
            PageText::Plain(s) => Value::String(s.clone()),
        }
    }
}

/// Outcome of a successful extraction call.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Usable text was produced.
    Text(PageText),
    /// The service answered but found no text on the page.
    Empty,
}

/// A failed extraction call. Page-scoped and non-fatal: the processor
/// warns, leaves the page out of the progress record, and continues.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The remote call failed (network error, HTTP error, provider error).
    #[error("extraction call failed: {0}")]
    Api(String),

    /// The service responded but not in the shape it was asked for.
    #[error("malformed extraction response: {0}")]
    MalformedResponse(String),
}

/// The Extraction Function boundary.
///
/// Implementations must be cheap to share (`Send + Sync`); the shipped one
/// is [`VisionExtractor`], tests substitute scripted mocks.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, page: &RenderedPage) -> Result<Extraction, ExtractError>;
}

/// Extraction through a vision-capable chat model.
///
/// One chat call per page: a system prompt describing the extraction task
/// and a user turn carrying the page PNG. Exactly one attempt — a failed
/// page is retried by the *next run* of the processor, never within this
/// one, so an interrupted run's cost is bounded by its page count.
pub struct VisionExtractor {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    structured: bool,
    temperature: f32,
    max_tokens: usize,
}

impl VisionExtractor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        prompt: impl Into<String>,
        structured: bool,
    ) -> Self {
        Self {
            provider,
            prompt: prompt.into(),
            structured,
            temperature: 0.2,
            max_tokens: 8192,
        }
    }

    /// Build an extractor matching an [`OcrConfig`]'s format, prompt
    /// override, and sampling options.
    pub fn from_config(provider: Arc<dyn LLMProvider>, config: &OcrConfig) -> Self {
        let structured = config.format == OutputFormat::Json;
        let prompt = config.extraction_prompt.clone().unwrap_or_else(|| {
            match config.format {
                OutputFormat::Json => JSON_EXTRACTION_PROMPT,
                OutputFormat::Text => PLAIN_EXTRACTION_PROMPT,
            }
            .to_string()
        });
        Self {
            provider,
            prompt,
            structured,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

}

/// Interpret a raw model response as an [`Extraction`].
///
/// In structured mode the recognised shape is a JSON object; an empty
/// object means "nothing found", anything unparseable is a malformed
/// response (a remote-failure signal, not silent data).
fn parse_model_response(content: &str, structured: bool) -> Result<Extraction, ExtractError> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(Extraction::Empty);
    }

    if !structured {
        return Ok(Extraction::Text(PageText::Plain(content.to_string())));
    }

    // Models occasionally wrap JSON in code fences despite the prompt.
    let stripped = content
        .strip_prefix("```json")
        .or_else(|| content.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(content);

    match serde_json::from_str::<Value>(stripped) {
        Ok(Value::Object(map)) if map.is_empty() => Ok(Extraction::Empty),
        Ok(value @ Value::Object(_)) => Ok(Extraction::Text(PageText::Structured(value))),
        Ok(other) => Err(ExtractError::MalformedResponse(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(ExtractError::MalformedResponse(e.to_string())),
    }
}

#[async_trait]
impl PageExtractor for VisionExtractor {
    async fn extract(&self, page: &RenderedPage) -> Result<Extraction, ExtractError> {
        let messages = vec![
            ChatMessage::system(&self.prompt),
            // VLM APIs need at least one user turn to respond to; the image
            // carries all the actual content.
            ChatMessage::user_with_images("", vec![page.image.clone()]),
        ];

        let options = self.options();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ExtractError::Api(e.to_string()))?;

        debug!(
            "Page {}: {} input tokens, {} output tokens",
            page.number, response.prompt_tokens, response.completion_tokens
        );

        parse_model_response(&response.content, self.structured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_response_passes_through() {
        let got = parse_model_response("  Page text.\n", false).unwrap();
        assert_eq!(got, Extraction::Text(PageText::Plain("Page text.".into())));
    }

    #[test]
    fn blank_response_is_empty_not_error() {
        assert_eq!(parse_model_response("   \n", true).unwrap(), Extraction::Empty);
        assert_eq!(parse_model_response("", false).unwrap(), Extraction::Empty);
    }

    #[test]
    fn structured_response_parses_object() {
        let got = parse_model_response(r#"{"text": "hola"}"#, true).unwrap();
        match got {
            Extraction::Text(PageText::Structured(v)) => {
                assert_eq!(v["text"], "hola");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let raw = "```json\n{\"text\": \"x\"}\n```";
        assert!(matches!(
            parse_model_response(raw, true).unwrap(),
            Extraction::Text(PageText::Structured(_))
        ));
    }

    #[test]
    fn empty_object_means_nothing_found() {
        assert_eq!(parse_model_response("{}", true).unwrap(), Extraction::Empty);
    }

    #[test]
    fn non_object_json_is_malformed() {
        let err = parse_model_response("[1, 2]", true).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse(_)));
    }

    #[test]
    fn garbage_is_malformed_in_structured_mode() {
        let err = parse_model_response("not json", true).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse(_)));
    }

    #[test]
    fn structured_payload_text_field() {
        let text = PageText::Structured(serde_json::json!({"text": "hello"}));
        assert_eq!(text.as_text(), "hello");
    }

    #[test]
    fn structured_payload_without_text_field_serialises() {
        let text = PageText::Structured(serde_json::json!({"body": "x"}));
        assert_eq!(text.as_text(), r#"{"body":"x"}"#);
    }

    #[test]
    fn plain_payload_to_value_is_string() {
        let text = PageText::Plain("line one".into());
        assert_eq!(text.to_value(), serde_json::json!("line one"));
    }
}
