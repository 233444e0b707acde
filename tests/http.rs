//! Wire-level tests for the transcript and extraction HTTP clients.
//!
//! Each test binds a listener on `127.0.0.1:0` that plays one canned HTTP
//! response (or never answers), points the real client at it and checks
//! which error the exchange maps to.
//!
//! Run with:
//!   cargo test --test http

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use std::time::Duration;
use tariff_tracker::pipeline::llm::{DeepSeekBackend, ExtractionBackend};
use tariff_tracker::pipeline::transcript::{FmpTranscriptClient, TranscriptSource};
use tariff_tracker::{ItemError, TranscriptQuery};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ── Canned server ────────────────────────────────────────────────────────────

fn response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    )
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Read one request (head and body) and return the head, lowercased.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            if buf.len() >= end + 4 + content_length(&head) {
                return head.to_ascii_lowercase();
            }
        }
    }
    String::from_utf8_lossy(&buf).to_ascii_lowercase()
}

/// Serve `reply` to the first connection. The handle yields the request head.
async fn serve_once(reply: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let head = read_request(&mut socket).await;
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        head
    });
    (base, handle)
}

/// Accept connections and never answer.
async fn serve_silence() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });
    base
}

fn key(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

fn transcripts(base: &str, timeout_secs: u64) -> FmpTranscriptClient {
    FmpTranscriptClient::new(base, key("fmp-test"), timeout_secs).unwrap()
}

fn deepseek(base: &str, timeout_secs: u64) -> DeepSeekBackend {
    DeepSeekBackend::new(base, key("sk-test"), "deepseek-chat", 0.1, timeout_secs).unwrap()
}

fn aapl() -> TranscriptQuery {
    TranscriptQuery::new("AAPL", 2025, 2)
}

// ── Transcripts ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn transcript_success_returns_content_and_sends_period() {
    let (base, server) = serve_once(response(
        "200 OK",
        r#"[{"symbol":"AAPL","content":"Operator: Welcome."}]"#,
    ))
    .await;

    let text = transcripts(&base, 5).fetch(&aapl()).await.unwrap();
    assert_eq!(text, "Operator: Welcome.");

    let head = server.await.unwrap();
    assert!(
        head.starts_with("get /api/v3/earning_call_transcript/aapl?quarter=2&year=2025&apikey="),
        "{}",
        head
    );
}

#[tokio::test]
async fn transcript_ticker_cannot_override_period() {
    let (base, server) = serve_once(response("200 OK", "[]")).await;
    let query = TranscriptQuery::new("AAPL?year=1999&x=", 2025, 2);

    let _ = transcripts(&base, 5).fetch(&query).await;

    let head = server.await.unwrap();
    let request_line = head.lines().next().unwrap_or_default();
    assert!(
        request_line.starts_with(
            "get /api/v3/earning_call_transcript/aapl%3fyear=1999&x=?quarter=2&year=2025&"
        ),
        "{}",
        request_line
    );
}

#[tokio::test]
async fn transcript_error_status_is_reported_as_status() {
    let (base, _server) = serve_once(response("503 Service Unavailable", "{}")).await;
    let err = transcripts(&base, 5).fetch(&aapl()).await.unwrap_err();
    assert_eq!(
        err,
        ItemError::TranscriptStatus {
            ticker: "AAPL".into(),
            status: 503
        }
    );
}

#[tokio::test]
async fn transcript_empty_array_is_no_transcript() {
    let (base, _server) = serve_once(response("200 OK", "[]")).await;
    let err = transcripts(&base, 5).fetch(&aapl()).await.unwrap_err();
    assert_eq!(
        err,
        ItemError::NoTranscript {
            ticker: "AAPL".into(),
            year: 2025,
            quarter: 2
        }
    );
}

#[tokio::test]
async fn transcript_non_json_is_malformed() {
    let (base, _server) = serve_once(response("200 OK", "<html>gateway</html>")).await;
    let err = transcripts(&base, 5).fetch(&aapl()).await.unwrap_err();
    assert!(matches!(err, ItemError::MalformedTranscript { .. }), "{:?}", err);
}

#[tokio::test]
async fn transcript_silence_is_a_timeout() {
    let base = serve_silence().await;
    let err = transcripts(&base, 1).fetch(&aapl()).await.unwrap_err();
    assert_eq!(
        err,
        ItemError::TranscriptTimeout {
            ticker: "AAPL".into(),
            secs: 1
        }
    );
}

#[tokio::test]
async fn transcript_refused_connection_is_a_request_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = transcripts(&base, 5).fetch(&aapl()).await.unwrap_err();
    match err {
        ItemError::TranscriptRequestFailed { ticker, detail } => {
            assert_eq!(ticker, "AAPL");
            assert!(!detail.contains("fmp-test"), "{}", detail);
        }
        other => panic!("expected TranscriptRequestFailed, got {:?}", other),
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extraction_success_unwraps_content() {
    let (base, server) = serve_once(response(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"{\"summary\":\"ok\"}"}}]}"#,
    ))
    .await;

    let content = deepseek(&base, 5).complete("prompt").await.unwrap();
    assert_eq!(content, r#"{"summary":"ok"}"#);

    let head = server.await.unwrap();
    assert!(head.starts_with("post /chat/completions "), "{}", head);
    assert!(head.contains("authorization: bearer sk-test"), "{}", head);
    assert!(head.contains("content-type: application/json"), "{}", head);
}

#[tokio::test]
async fn extraction_error_status_keeps_status_and_body() {
    let (base, _server) = serve_once(response("503 Service Unavailable", "overloaded")).await;
    let err = deepseek(&base, 5).complete("prompt").await.unwrap_err();
    assert_eq!(
        err,
        ItemError::ExtractionStatus {
            status: 503,
            body: "overloaded".into()
        }
    );
}

#[tokio::test]
async fn extraction_without_choices_is_malformed() {
    let (base, _server) = serve_once(response("200 OK", r#"{"choices":[]}"#)).await;
    let err = deepseek(&base, 5).complete("prompt").await.unwrap_err();
    assert!(matches!(err, ItemError::MalformedResponse { .. }), "{:?}", err);
}

#[tokio::test]
async fn extraction_silence_is_a_timeout() {
    let base = serve_silence().await;
    let err = deepseek(&base, 1).complete("prompt").await.unwrap_err();
    assert_eq!(err, ItemError::ExtractionTimeout { secs: 1 });
}
