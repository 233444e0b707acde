//! Extraction service interaction: send document text, get an analysis.
//!
//! This module turns a [`RawText`] into a [`TariffAnalysis`]. It is
//! intentionally thin: the instruction text lives in [`crate::prompts`] and
//! all shape-fixing lives in [`crate::pipeline::normalize`].
//!
//! ## Backends
//!
//! [`ExtractionBackend`] is the seam between the client and the wire:
//!
//! * [`DeepSeekBackend`]: the default. POSTs an OpenAI-style
//!   chat-completions body with `response_format: json_object` and a
//!   near-zero temperature, then unwraps `choices[0].message.content`.
//! * [`ProviderBackend`]: any provider `edgequake-llm` can build
//!   (OpenAI, Anthropic, Gemini, Ollama, …).
//!
//! There is exactly one attempt per call. A failure is terminal for that
//! company in that run.

use crate::analysis::TariffAnalysis;
use crate::cache::{text_digest, TtlCache};
use crate::config::TrackerConfig;
use crate::error::{ItemError, TrackerError};
use crate::pipeline::input::{truncate_chars, RawText};
use crate::pipeline::normalize::parse_analysis;
use crate::prompts::extraction_prompt;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Sends one prompt and returns the model's raw content string.
pub trait ExtractionBackend: Send + Sync {
    /// Short name for logs, e.g. `"deepseek"`.
    fn name(&self) -> &str;

    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ItemError>>;
}

// ── DeepSeek (default) ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 1],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions client for the DeepSeek API.
pub struct DeepSeekBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl DeepSeekBackend {
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        model: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TrackerError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
            temperature,
            timeout_secs,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [RequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }

    async fn post(&self, prompt: &str) -> Result<String, ItemError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ItemError::ExtractionTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    ItemError::ExtractionTransport {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ItemError::ExtractionTransport {
                detail: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(ItemError::ExtractionStatus {
                status: status.as_u16(),
                body: truncate_chars(body.trim(), 300).0.to_string(),
            });
        }

        parse_envelope(&body)
    }
}

impl ExtractionBackend for DeepSeekBackend {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ItemError>> {
        Box::pin(self.post(prompt))
    }
}

/// Unwrap `choices[0].message.content` from a chat-completions body.
pub fn parse_envelope(body: &str) -> Result<String, ItemError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ItemError::MalformedResponse {
            detail: format!("response envelope is not valid: {}", e),
        })?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ItemError::MalformedResponse {
            detail: "response has no choices[0].message.content".into(),
        })
}

// ── edgequake-llm providers ─────────────────────────────────────────────────

/// Adapter running extraction through an `edgequake-llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            ..Default::default()
        }
    }
}

impl ExtractionBackend for ProviderBackend {
    fn name(&self) -> &str {
        "provider"
    }

    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ItemError>> {
        Box::pin(async move {
            let messages = vec![ChatMessage::user(prompt)];
            let options = self.options();
            let response = self
                .provider
                .chat(&messages, Some(&options))
                .await
                .map_err(|e| ItemError::ExtractionTransport {
                    detail: format!("{}", e),
                })?;
            debug!(
                "Provider reply: {} input tokens, {} output tokens",
                response.prompt_tokens, response.completion_tokens
            );
            Ok(response.content)
        })
    }
}

/// Pick the backend the config asks for.
///
/// Order: pre-built provider, then named `edgequake-llm` provider, then the
/// DeepSeek HTTP backend.
pub fn resolve_backend(config: &TrackerConfig) -> Result<Arc<dyn ExtractionBackend>, TrackerError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderBackend::new(
            Arc::clone(provider),
            config.temperature,
        )));
    }

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            TrackerError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderBackend::new(provider, config.temperature)));
    }

    let key = config
        .deepseek_api_key
        .clone()
        .ok_or(TrackerError::MissingCredential {
            name: crate::config::DEEPSEEK_API_KEY_VAR,
        })?;
    Ok(Arc::new(DeepSeekBackend::new(
        &config.extraction_base_url,
        key,
        config.model.clone(),
        config.temperature,
        config.extraction_timeout_secs,
    )?))
}

// ── Client ──────────────────────────────────────────────────────────────────

/// Extraction client: truncation, caching, backend call, normalization.
pub struct ExtractionClient {
    backend: Arc<dyn ExtractionBackend>,
    cache: TtlCache<String, TariffAnalysis>,
    max_input_chars: usize,
}

impl ExtractionClient {
    pub fn new(backend: Arc<dyn ExtractionBackend>, max_input_chars: usize, ttl: Duration) -> Self {
        Self {
            backend,
            cache: TtlCache::new(ttl),
            max_input_chars,
        }
    }

    /// Analyse one company's text.
    ///
    /// Blank input fails with [`ItemError::EmptyText`] without a request.
    /// Text beyond `max_input_chars` is cut; the cut is logged and noted in
    /// `raw.warnings` by the caller via [`Self::truncation_notice`].
    pub async fn extract(&self, raw: &RawText) -> Result<TariffAnalysis, ItemError> {
        if raw.is_blank() {
            warn!("{}: input text is empty, skipping extraction", raw.company_key);
            return Err(ItemError::EmptyText);
        }

        let (document, truncated) = truncate_chars(&raw.text, self.max_input_chars);
        if truncated {
            info!(
                "{}: document truncated to the first {} characters",
                raw.company_key, self.max_input_chars
            );
        }

        let prompt = extraction_prompt(document);
        let key = text_digest(&prompt);
        if let Some(hit) = self.cache.get(&key) {
            debug!("{}: analysis cache hit", raw.company_key);
            return Ok(hit);
        }

        let start = Instant::now();
        info!(
            "{}: sending {} chars to {}",
            raw.company_key,
            document.chars().count(),
            self.backend.name()
        );
        let content = self.backend.complete(&prompt).await?;
        debug!(
            "{}: extraction reply in {:?}",
            raw.company_key,
            start.elapsed()
        );

        let analysis = parse_analysis(&content)?;
        self.cache.insert(key, analysis.clone());
        Ok(analysis)
    }

    /// Notice to show when `raw` exceeds the input budget.
    pub fn truncation_notice(&self, raw: &RawText) -> Option<String> {
        let total = raw.text.chars().count();
        (total > self.max_input_chars).then(|| {
            format!(
                "Only the first {} of {} characters were analysed.",
                self.max_input_chars, total
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedBackend {
        reply: Result<String, ItemError>,
        calls: AtomicUsize,
        last_prompt: Mutex<String>,
    }

    impl ScriptedBackend {
        fn new(reply: Result<&str, ItemError>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }
    }

    impl ExtractionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ItemError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            let reply = self.reply.clone();
            Box::pin(async move { reply })
        }
    }

    fn client(backend: Arc<ScriptedBackend>, max: usize) -> ExtractionClient {
        ExtractionClient::new(backend, max, Duration::from_secs(3600))
    }

    #[test]
    fn envelope_unwrapped() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"summary\":\"ok\"}"}}]}"#;
        assert_eq!(parse_envelope(body).unwrap(), r#"{"summary":"ok"}"#);
    }

    #[test]
    fn envelope_without_choices_is_malformed() {
        assert!(matches!(
            parse_envelope(r#"{"choices":[]}"#),
            Err(ItemError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_envelope("not json"),
            Err(ItemError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_envelope(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(ItemError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn request_body_is_json_mode_low_temperature() {
        let backend = DeepSeekBackend::new(
            "https://api.deepseek.com/",
            SecretString::from("sk".to_string()),
            "deepseek-chat",
            0.1,
            120,
        )
        .unwrap();
        assert_eq!(backend.endpoint, "https://api.deepseek.com/chat/completions");
        let body = serde_json::to_value(backend.request_body("hello")).unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body["temperature"].as_f64().unwrap() < 0.2);
    }

    #[tokio::test]
    async fn empty_text_never_reaches_backend() {
        let backend = ScriptedBackend::new(Ok("{}"));
        let c = client(Arc::clone(&backend), 100);
        let err = c.extract(&RawText::new("A", "   ")).await.unwrap_err();
        assert_eq!(err, ItemError::EmptyText);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn long_text_is_truncated_before_sending() {
        let backend = ScriptedBackend::new(Ok("{}"));
        let c = client(Arc::clone(&backend), 5);
        let raw = RawText::new("A", "abcdefghij");
        c.extract(&raw).await.unwrap();
        let prompt = backend.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("---\nabcde\n---"));
        assert!(!prompt.contains("abcdef"));
        assert!(c.truncation_notice(&raw).unwrap().contains("first 5 of 10"));
        assert!(c.truncation_notice(&RawText::new("A", "abc")).is_none());
    }

    #[tokio::test]
    async fn identical_text_is_served_from_cache() {
        let backend = ScriptedBackend::new(Ok(r#"{"company_name":"Acme"}"#));
        let c = client(Arc::clone(&backend), 100);
        let raw = RawText::new("ACME", "Tariffs added $5M to costs.");
        let first = c.extract(&raw).await.unwrap();
        let second = c.extract(&RawText::new("OTHER", raw.text.clone())).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_failure_surfaces_and_is_not_cached() {
        let backend = ScriptedBackend::new(Err(ItemError::ExtractionStatus {
            status: 503,
            body: "overloaded".into(),
        }));
        let c = client(Arc::clone(&backend), 100);
        let raw = RawText::new("A", "text");
        assert!(matches!(
            c.extract(&raw).await,
            Err(ItemError::ExtractionStatus { status: 503, .. })
        ));
        assert!(c.extract(&raw).await.is_err());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unparsable_content_is_malformed() {
        let backend = ScriptedBackend::new(Ok("Sure! Here is the analysis"));
        let c = client(backend, 100);
        assert!(matches!(
            c.extract(&RawText::new("A", "text")).await,
            Err(ItemError::MalformedResponse { .. })
        ));
    }
}
