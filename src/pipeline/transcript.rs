//! Remote transcript acquisition.
//!
//! One GET per (ticker, year, quarter). The service answers with a JSON
//! array whose first element carries the transcript in `content`; an empty
//! array means the company has no call on record for that period, which is
//! reported differently from a network failure.

use crate::cache::TtlCache;
use crate::error::{ItemError, TrackerError};
use crate::pipeline::input::TranscriptQuery;
use futures::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Anything that can produce a transcript for a query.
///
/// The HTTP implementation is [`FmpTranscriptClient`]; tests plug in
/// in-memory sources.
pub trait TranscriptSource: Send + Sync {
    fn fetch<'a>(&'a self, query: &'a TranscriptQuery) -> BoxFuture<'a, Result<String, ItemError>>;
}

/// Transcript client for the Financial Modeling Prep API.
pub struct FmpTranscriptClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    timeout_secs: u64,
}

impl FmpTranscriptClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TrackerError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            timeout_secs,
        })
    }

    /// Endpoint for `query`. The ticker is one percent-encoded path
    /// segment, so it can never add query parameters of its own.
    fn url(&self, query: &TranscriptQuery) -> Result<reqwest::Url, ItemError> {
        let invalid = |detail: String| ItemError::TranscriptRequestFailed {
            ticker: query.ticker.clone(),
            detail,
        };
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| invalid(format!("invalid transcript base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid("transcript base URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(["api", "v3", "earning_call_transcript", query.ticker.as_str()]);
        Ok(url)
    }

    async fn fetch_once(&self, query: &TranscriptQuery) -> Result<String, ItemError> {
        info!(
            "Fetching transcript: {} Q{} {}",
            query.ticker, query.quarter, query.year
        );

        let response = self
            .client
            .get(self.url(query)?)
            .query(&[
                ("quarter", query.quarter.to_string()),
                ("year", query.year.to_string()),
                ("apikey", self.api_key.expose_secret().to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ItemError::TranscriptTimeout {
                        ticker: query.ticker.clone(),
                        secs: self.timeout_secs,
                    }
                } else {
                    ItemError::TranscriptRequestFailed {
                        ticker: query.ticker.clone(),
                        // Strip the URL: it carries the API key.
                        detail: e.without_url().to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ItemError::TranscriptStatus {
                ticker: query.ticker.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ItemError::TranscriptRequestFailed {
                ticker: query.ticker.clone(),
                detail: e.without_url().to_string(),
            })?;

        let transcript = parse_transcript_body(query, &body)?;
        debug!(
            "Transcript for {}: {} chars",
            query.ticker,
            transcript.chars().count()
        );
        Ok(transcript)
    }
}

impl TranscriptSource for FmpTranscriptClient {
    fn fetch<'a>(&'a self, query: &'a TranscriptQuery) -> BoxFuture<'a, Result<String, ItemError>> {
        Box::pin(self.fetch_once(query))
    }
}

/// Pull the transcript text out of a response body.
///
/// Accepts the documented array shape and a bare object with `content`.
/// Empty bodies, empty arrays and blank `content` mean "no transcript";
/// anything that is not JSON, or lacks `content`, is malformed.
pub fn parse_transcript_body(query: &TranscriptQuery, body: &[u8]) -> Result<String, ItemError> {
    let no_transcript = || ItemError::NoTranscript {
        ticker: query.ticker.clone(),
        year: query.year,
        quarter: query.quarter,
    };
    let malformed = |detail: String| ItemError::MalformedTranscript {
        ticker: query.ticker.clone(),
        detail,
    };

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(no_transcript());
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;

    let record = match &value {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Err(no_transcript()),
        },
        Value::Object(_) => &value,
        Value::Null => return Err(no_transcript()),
        other => return Err(malformed(format!("unexpected JSON type: {}", json_type(other)))),
    };

    match record.get("content") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | Some(Value::Null) => Err(no_transcript()),
        Some(other) => Err(malformed(format!(
            "'content' is a {}, expected a string",
            json_type(other)
        ))),
        None => Err(malformed("response has no 'content' field".into())),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Wraps a [`TranscriptSource`] with a TTL cache keyed by the query.
///
/// Only successful fetches are cached; a failure is retried on the next
/// batch.
pub struct CachedTranscripts {
    inner: Box<dyn TranscriptSource>,
    cache: TtlCache<TranscriptQuery, String>,
}

impl CachedTranscripts {
    pub fn new(inner: Box<dyn TranscriptSource>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
        }
    }

    pub async fn fetch(&self, query: &TranscriptQuery) -> Result<String, ItemError> {
        if let Some(hit) = self.cache.get(query) {
            debug!("Transcript cache hit: {} Q{} {}", query.ticker, query.quarter, query.year);
            return Ok(hit);
        }
        let text = self.inner.fetch(query).await?;
        self.cache.insert(query.clone(), text.clone());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn q() -> TranscriptQuery {
        TranscriptQuery::new("AAPL", 2025, 2)
    }

    fn client(base_url: &str) -> FmpTranscriptClient {
        FmpTranscriptClient::new(base_url, SecretString::from("k".to_string()), 5).unwrap()
    }

    #[test]
    fn ticker_is_a_single_encoded_path_segment() {
        let c = client("https://financialmodelingprep.com");
        let url = c.url(&q()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://financialmodelingprep.com/api/v3/earning_call_transcript/AAPL"
        );

        let url = c
            .url(&TranscriptQuery::new("AAPL?year=1999&x=", 2025, 2))
            .unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(
            url.path(),
            "/api/v3/earning_call_transcript/AAPL%3Fyear=1999&x="
        );

        let url = c.url(&TranscriptQuery::new("../BRK", 2025, 2)).unwrap();
        assert_eq!(url.path(), "/api/v3/earning_call_transcript/..%2FBRK");
    }

    #[test]
    fn base_url_with_path_prefix_is_kept() {
        let url = client("http://127.0.0.1:9000/proxy/").url(&q()).unwrap();
        assert_eq!(url.path(), "/proxy/api/v3/earning_call_transcript/AAPL");
    }

    #[test]
    fn unparsable_base_url_is_a_request_failure() {
        assert!(matches!(
            client("not a url").url(&q()),
            Err(ItemError::TranscriptRequestFailed { .. })
        ));
    }

    #[test]
    fn parses_array_shape() {
        let body = br#"[{"symbol":"AAPL","quarter":2,"year":2025,"content":"Operator: Welcome."}]"#;
        assert_eq!(parse_transcript_body(&q(), body).unwrap(), "Operator: Welcome.");
    }

    #[test]
    fn parses_object_shape() {
        let body = br#"{"content":"Good afternoon."}"#;
        assert_eq!(parse_transcript_body(&q(), body).unwrap(), "Good afternoon.");
    }

    #[test]
    fn empty_array_means_no_transcript() {
        let err = parse_transcript_body(&q(), b"[]").unwrap_err();
        assert_eq!(
            err,
            ItemError::NoTranscript {
                ticker: "AAPL".into(),
                year: 2025,
                quarter: 2
            }
        );
        assert!(matches!(
            parse_transcript_body(&q(), b"  ").unwrap_err(),
            ItemError::NoTranscript { .. }
        ));
        assert!(matches!(
            parse_transcript_body(&q(), br#"[{"content":""}]"#).unwrap_err(),
            ItemError::NoTranscript { .. }
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_transcript_body(&q(), b"<html>502</html>").unwrap_err(),
            ItemError::MalformedTranscript { .. }
        ));
        assert!(matches!(
            parse_transcript_body(&q(), br#"[{"symbol":"AAPL"}]"#).unwrap_err(),
            ItemError::MalformedTranscript { .. }
        ));
        assert!(matches!(
            parse_transcript_body(&q(), br#"[{"content":42}]"#).unwrap_err(),
            ItemError::MalformedTranscript { .. }
        ));
    }

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    impl TranscriptSource for CountingSource {
        fn fetch<'a>(
            &'a self,
            query: &'a TranscriptQuery,
        ) -> BoxFuture<'a, Result<String, ItemError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ticker = query.ticker.clone();
            Box::pin(async move {
                if ticker == "NONE" {
                    Err(ItemError::NoTranscript {
                        ticker,
                        year: 2025,
                        quarter: 2,
                    })
                } else {
                    Ok(format!("{ticker} transcript"))
                }
            })
        }
    }

    #[tokio::test]
    async fn cache_avoids_repeat_requests() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedTranscripts::new(
            Box::new(CountingSource {
                calls: Arc::clone(&calls),
            }),
            Duration::from_secs(3600),
        );

        assert_eq!(cached.fetch(&q()).await.unwrap(), "AAPL transcript");
        assert_eq!(cached.fetch(&q()).await.unwrap(), "AAPL transcript");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A different quarter is a different key.
        cached.fetch(&TranscriptQuery::new("AAPL", 2025, 3)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedTranscripts::new(
            Box::new(CountingSource {
                calls: Arc::clone(&calls),
            }),
            Duration::from_secs(3600),
        );
        let none = TranscriptQuery::new("NONE", 2025, 2);
        assert!(cached.fetch(&none).await.is_err());
        assert!(cached.fetch(&none).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
