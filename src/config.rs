//! Configuration types for tariff analysis runs.
//!
//! All behaviour is controlled through [`TrackerConfig`], built via its
//! [`TrackerConfigBuilder`]. Credentials are checked in
//! [`TrackerConfigBuilder::build`], so a missing key stops the program before
//! any document is fetched or any request is sent.

use crate::error::TrackerError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable holding the transcript service key.
pub const FMP_API_KEY_VAR: &str = "FMP_API_KEY";
/// Environment variable holding the extraction service key.
pub const DEEPSEEK_API_KEY_VAR: &str = "DEEPSEEK_API_KEY";
/// Environment variable pointing at an existing libpdfium.
pub const PDFIUM_LIB_PATH_VAR: &str = "PDFIUM_LIB_PATH";

/// Configuration for a tariff analysis session.
///
/// Built via [`TrackerConfig::builder()`].
///
/// # Example
/// ```rust
/// use tariff_tracker::TrackerConfig;
///
/// let config = TrackerConfig::builder()
///     .fmp_api_key("fmp-key")
///     .deepseek_api_key("sk-key")
///     .max_input_chars(20_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_input_chars, 20_000);
/// ```
#[derive(Clone)]
pub struct TrackerConfig {
    /// Transcript service key. Required.
    pub fmp_api_key: Option<SecretString>,

    /// Extraction service key. Required unless an alternate provider is set.
    pub deepseek_api_key: Option<SecretString>,

    /// Base URL of the transcript service. Default: `https://financialmodelingprep.com`.
    pub transcript_base_url: String,

    /// Base URL of the chat-completions endpoint. Default: `https://api.deepseek.com`.
    pub extraction_base_url: String,

    /// Model identifier sent to the extraction service. Default: `deepseek-chat`.
    pub model: String,

    /// Alternate `edgequake-llm` provider name (e.g. "openai", "anthropic").
    /// When set, extraction goes through that provider instead of DeepSeek.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction must be repeatable: the same transcript should yield the
    /// same figures.
    pub temperature: f32,

    /// Characters of document text sent for extraction. Default: 40 000.
    ///
    /// Longer documents are cut at this point.
    pub max_input_chars: usize,

    /// Per-call timeout on the extraction service in seconds. Default: 120.
    pub extraction_timeout_secs: u64,

    /// Per-call timeout on the transcript service in seconds. Default: 60.
    pub transcript_timeout_secs: u64,

    /// Lifetime of cached transcripts and analyses in seconds. Default: 3600.
    pub cache_ttl_secs: u64,

    /// Path to the pdfium shared library. If None, the system library is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// PNG logo placed in the HTML report header.
    pub logo_path: Option<PathBuf>,

    /// Optional per-company progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            fmp_api_key: None,
            deepseek_api_key: None,
            transcript_base_url: "https://financialmodelingprep.com".to_string(),
            extraction_base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_input_chars: 40_000,
            extraction_timeout_secs: 120,
            transcript_timeout_secs: 60,
            cache_ttl_secs: 3600,
            pdfium_lib_path: None,
            logo_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |k: &Option<SecretString>| k.as_ref().map(|_| "<redacted>");
        f.debug_struct("TrackerConfig")
            .field("fmp_api_key", &redacted(&self.fmp_api_key))
            .field("deepseek_api_key", &redacted(&self.deepseek_api_key))
            .field("transcript_base_url", &self.transcript_base_url)
            .field("extraction_base_url", &self.extraction_base_url)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_input_chars", &self.max_input_chars)
            .field("extraction_timeout_secs", &self.extraction_timeout_secs)
            .field("transcript_timeout_secs", &self.transcript_timeout_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("logo_path", &self.logo_path)
            .finish()
    }
}

impl TrackerConfig {
    /// Create a new builder for `TrackerConfig`.
    pub fn builder() -> TrackerConfigBuilder {
        TrackerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Builder pre-filled from `FMP_API_KEY`, `DEEPSEEK_API_KEY` and
    /// `PDFIUM_LIB_PATH`. Empty variables count as unset.
    pub fn builder_from_env() -> TrackerConfigBuilder {
        let mut builder = Self::builder();
        if let Some(key) = non_empty_env(FMP_API_KEY_VAR) {
            builder = builder.fmp_api_key(key);
        }
        if let Some(key) = non_empty_env(DEEPSEEK_API_KEY_VAR) {
            builder = builder.deepseek_api_key(key);
        }
        if let Some(path) = non_empty_env(PDFIUM_LIB_PATH_VAR) {
            builder = builder.pdfium_lib_path(path);
        }
        builder
    }

    /// `true` when extraction goes through an `edgequake-llm` provider.
    pub fn uses_alternate_provider(&self) -> bool {
        self.provider.is_some() || self.provider_name.is_some()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`TrackerConfig`].
pub struct TrackerConfigBuilder {
    config: TrackerConfig,
}

impl fmt::Debug for TrackerConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.config.fmt(f)
    }
}

impl TrackerConfigBuilder {
    pub fn fmp_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.fmp_api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn deepseek_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.deepseek_api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn transcript_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.transcript_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn extraction_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.extraction_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn extraction_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extraction_timeout_secs = secs;
        self
    }

    pub fn transcript_timeout_secs(mut self, secs: u64) -> Self {
        self.config.transcript_timeout_secs = secs;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn logo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.logo_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Missing credentials are reported as
    /// [`TrackerError::MissingCredential`]; the DeepSeek key is only needed
    /// when no alternate provider is configured.
    pub fn build(self) -> Result<TrackerConfig, TrackerError> {
        let c = &self.config;
        if c.fmp_api_key.is_none() {
            return Err(TrackerError::MissingCredential {
                name: FMP_API_KEY_VAR,
            });
        }
        if c.deepseek_api_key.is_none() && !c.uses_alternate_provider() {
            return Err(TrackerError::MissingCredential {
                name: DEEPSEEK_API_KEY_VAR,
            });
        }
        if c.max_input_chars == 0 {
            return Err(TrackerError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.extraction_timeout_secs == 0 || c.transcript_timeout_secs == 0 {
            return Err(TrackerError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(TrackerError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}
