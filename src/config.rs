//! Configuration types for the pagecast pipelines.
//!
//! All OCR behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]. Keeping every knob in one struct means a test, a
//! CLI invocation, and a library caller all drive the processor the same
//! way — and there is no process-wide client state: the LLM provider is an
//! explicit field, so two documents can be processed with two independent
//! (or mocked) clients in the same process.

use crate::error::PagecastError;
use crate::observer::RunObserver;
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// How the LLM provider for a run is chosen.
///
/// Shared by the OCR, podcast, and ask pipelines. Resolution order, from
/// most- to least-specific:
///
/// 1. **Pre-built provider** (`provider`) — the caller constructed and
///    configured the client entirely; used as-is. This is the seam tests
///    and embedding applications use.
/// 2. **Named provider + model** (`provider_name`) — resolved through
///    [`ProviderFactory::create_llm_provider`], which reads the matching
///    API key (`OPENAI_API_KEY`, …) from the environment.
/// 3. **Environment pair** — `PAGECAST_PROVIDER` + `PAGECAST_MODEL`, for
///    Makefiles and CI where the choice lives outside the invocation.
/// 4. **Full auto-detection** — [`ProviderFactory::from_env`] scans all
///    known API key variables and picks the first available provider.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Provider name (e.g. "openai", "gemini", "ollama").
    pub provider_name: Option<String>,

    /// Model identifier, e.g. "gpt-4.1-nano", "gemma3:12b".
    pub model: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve to a concrete provider, or fail with a configuration error.
    ///
    /// Configuration failures are fatal and surface before any page is
    /// rendered or any paid call is made.
    pub fn resolve(&self) -> Result<Arc<dyn LLMProvider>, PagecastError> {
        if let Some(ref provider) = self.provider {
            return Ok(Arc::clone(provider));
        }

        if let Some(ref name) = self.provider_name {
            let model = self.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider(name, model);
        }

        if let (Ok(prov), Ok(model)) = (
            std::env::var("PAGECAST_PROVIDER"),
            std::env::var("PAGECAST_MODEL"),
        ) {
            if !prov.is_empty() && !model.is_empty() {
                return create_provider(&prov, &model);
            }
        }

        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| PagecastError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                     Set OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, or name a provider.\n\
                     Error: {}",
                    e
                ),
            })?;

        Ok(llm_provider)
    }
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PagecastError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        PagecastError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Shape of the per-page result files and the aggregate output.
///
/// Mirrors the two extraction backends the tool grew out of: one asked the
/// model for a JSON object and aggregated a JSON array, the other took raw
/// text and joined pages with blank lines. Here the shape is a config
/// choice rather than an artefact of which script was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Per-page `page_N.json` holding a JSON object with a `text` field;
    /// aggregate is `final_output.json`, a JSON array in page order. (default)
    #[default]
    Json,
    /// Per-page `page_N.txt` holding raw text; aggregate is
    /// `final_output.txt`, pages joined by blank lines.
    Text,
}

/// Configuration for a checkpointed OCR run.
///
/// Built via [`OcrConfig::builder()`] or [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use pagecast::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .output_dir("output_texts")
///     .model("gpt-4.1-nano")
///     .max_rendered_pixels(1600)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Directory receiving page images, per-page results, the progress
    /// record, and the aggregate output. Created if absent. Default:
    /// `output_texts`.
    ///
    /// Everything the run touches lives under this directory; it is also
    /// the resume key — pointing two concurrent runs at the same directory
    /// is undefined (single-writer progress record).
    pub output_dir: PathBuf,

    /// Provider selection. See [`ProviderConfig`].
    pub llm: ProviderConfig,

    /// Sampling temperature for extraction calls. Default: 0.2.
    ///
    /// Low temperature keeps the model faithful to what is on the page,
    /// which is all that matters for transcription.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 8192.
    ///
    /// Dense pages can exceed 2 000 output tokens; setting this too low
    /// silently truncates the transcription mid-sentence.
    pub max_tokens: usize,

    /// Maximum rendered image dimension (width or height) in pixels.
    /// Default: 2000.
    ///
    /// A safety cap independent of page size: an A0 poster rendered
    /// naively could produce a 13 000 px image and exhaust memory. Either
    /// dimension is capped, the other scales proportionally.
    pub max_rendered_pixels: u32,

    /// Result and aggregate shape. Default: [`OutputFormat::Json`].
    pub format: OutputFormat,

    /// Custom extraction prompt. If `None`, a built-in prompt matching
    /// `format` is used.
    pub extraction_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-page run observer (progress bar, UI forwarding). No-op if unset.
    pub observer: Option<Arc<dyn RunObserver>>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output_texts"),
            llm: ProviderConfig::default(),
            temperature: 0.2,
            max_tokens: 8192,
            max_rendered_pixels: 2000,
            format: OutputFormat::default(),
            extraction_prompt: None,
            password: None,
            download_timeout_secs: 120,
            observer: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("output_dir", &self.output_dir)
            .field("llm", &self.llm)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("format", &self.format)
            .field("extraction_prompt", &self.extraction_prompt.as_ref().map(|_| "<custom>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn RunObserver>"))
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.llm.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.llm.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, PagecastError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(PagecastError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(PagecastError::InvalidConfig(
                "output_dir must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = OcrConfig::builder().build().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("output_texts"));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.max_tokens, 8192);
    }

    #[test]
    fn temperature_is_clamped() {
        let config = OcrConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn max_pixels_floor() {
        let config = OcrConfig::builder().max_rendered_pixels(10).build().unwrap();
        assert_eq!(config.max_rendered_pixels, 100);
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let err = OcrConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn empty_output_dir_rejected() {
        assert!(OcrConfig::builder().output_dir("").build().is_err());
    }
}
