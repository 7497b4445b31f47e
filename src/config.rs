//! Configuration types for document extraction.
//!
//! Every non-secret knob lives in [`ExtractionConfig`], built via
//! [`ExtractionConfigBuilder`]. The API key is deliberately *not* here:
//! [`ProviderCredentials`] is handed to each call and dropped when the call
//! returns, so the library never holds a key in ambient state.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Groq endpoint root (OpenAI-compatible).
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default Gemini endpoint root.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── Provider ─────────────────────────────────────────────────────────────

/// Vision-model backends. Closed set: the two differ only in request shape
/// and in where the response text lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI-compatible chat-completions endpoint.
    Groq,
    /// `generateContent` endpoint.
    #[default]
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::Gemini => "gemini",
        }
    }

    /// Model used when the config does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Groq => "meta-llama/llama-4-scout-17b-16e-instruct",
            Provider::Gemini => "gemini-2.0-flash",
        }
    }

    /// Environment variable the CLI reads the key from.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "gemini" => Ok(Provider::Gemini),
            other => Err(ExtractError::InvalidConfig(format!(
                "unknown provider '{other}' (expected 'gemini' or 'groq')"
            ))),
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────────

/// An API key and the provider it belongs to. Supplied per call.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub provider: Provider,
    pub api_key: String,
}

impl ProviderCredentials {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
        }
    }

    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new(Provider::Groq, api_key)
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new(Provider::Gemini, api_key)
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// ── Mode ─────────────────────────────────────────────────────────────────

/// Which record shape the model is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Metadata, one table, summary and remarks.
    #[default]
    Tabular,
    /// Letters, memos and notes: scalar fields plus a text body.
    Notes,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Tabular => "tabular",
            ExtractionMode::Notes => "notes",
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Config ───────────────────────────────────────────────────────────────

/// Configuration for an extraction run.
///
/// # Example
/// ```rust
/// use scan2data::{ExtractionConfig, ExtractionMode};
///
/// let config = ExtractionConfig::builder()
///     .mode(ExtractionMode::Notes)
///     .api_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 8192);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Record shape to request. Default: [`ExtractionMode::Tabular`].
    pub mode: ExtractionMode,

    /// Model identifier. If None, uses [`Provider::default_model`].
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Kept low so the model transcribes instead of paraphrasing.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 8192.
    ///
    /// Pages whose JSON exceeds this are truncated by the provider and
    /// usually fail to parse.
    pub max_tokens: u32,

    /// Per-call HTTP timeout in seconds. Default: 120. No retries.
    pub api_timeout_secs: u64,

    /// Root URL for the Groq endpoint.
    pub groq_base_url: String,

    /// Root URL for the Gemini endpoint.
    pub gemini_base_url: String,

    /// Target pixel width when rasterising PDF pages. Default: 1600.
    pub render_width: u32,

    /// Custom prompt. If None, uses the built-in prompt for `mode`.
    pub prompt: Option<String>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            model: None,
            temperature: 0.1,
            max_tokens: 8192,
            api_timeout_secs: 120,
            groq_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            render_width: 1600,
            prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("mode", &self.mode)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("groq_base_url", &self.groq_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("render_width", &self.render_width)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model to request from `provider`.
    pub fn model_for(&self, provider: Provider) -> &str {
        self.model.as_deref().unwrap_or(provider.default_model())
    }

    /// Endpoint root for `provider`, without a trailing slash.
    pub fn base_url_for(&self, provider: Provider) -> &str {
        let url = match provider {
            Provider::Groq => &self.groq_base_url,
            Provider::Gemini => &self.gemini_base_url,
        };
        url.trim_end_matches('/')
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn groq_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.groq_base_url = url.into();
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.gemini_base_url = url.into();
        self
    }

    pub fn render_width(mut self, px: u32) -> Self {
        self.config.render_width = px;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if !(100..=10_000).contains(&c.render_width) {
            return Err(ExtractError::InvalidConfig(format!(
                "render_width must be 100–10000, got {}",
                c.render_width
            )));
        }
        for url in [&c.groq_base_url, &c.gemini_base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ExtractError::InvalidConfig(format!(
                    "endpoint '{url}' must be an http(s) URL"
                )));
            }
        }
        Ok(self.config)
    }
}
