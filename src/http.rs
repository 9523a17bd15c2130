//! Shared HTTP plumbing for the embedding and generation clients.

use std::time::Duration;

use docchat_core::{RagError, Result};
use reqwest::StatusCode;
use serde_json::Value;

/// Build a client with a whole-request timeout.
pub fn client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Read an API key from the environment, treating blank values as unset.
pub fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Human-readable description of a failed response.
pub fn describe_status(service: &str, status: StatusCode, body: &str) -> String {
    let body = truncate(body.trim(), 300);
    match status.as_u16() {
        401 | 403 => format!("{service} rejected the credentials ({status}): {body}"),
        429 => format!("{service} rate limit or quota exceeded ({status}): {body}"),
        s if s >= 500 => format!("{service} server error ({status}): {body}"),
        _ => format!("{service} returned {status}: {body}"),
    }
}

/// Describe a transport-level failure (connect, timeout, body read).
pub fn describe_transport(service: &str, url: &str, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("{service} request to {url} timed out")
    } else if err.is_connect() {
        format!("could not connect to {service} at {url}: {err}")
    } else {
        format!("{service} request to {url} failed: {err}")
    }
}

/// POST `body` as JSON and parse a JSON reply.
///
/// Every failure, from transport to a non-2xx status to an unparseable
/// body, is turned into a `RagError` by `to_error`.
pub async fn post_json(
    client: &reqwest::Client,
    service: &str,
    endpoint: &str,
    body: &Value,
    bearer: Option<&str>,
    to_error: fn(String) -> RagError,
) -> Result<Value> {
    let mut request = client.post(endpoint).json(body);
    if let Some(key) = bearer {
        request = request.bearer_auth(key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| to_error(describe_transport(service, endpoint, &e)))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| to_error(describe_transport(service, endpoint, &e)))?;

    if !status.is_success() {
        return Err(to_error(describe_status(service, status, &text)));
    }

    serde_json::from_str(&text).map_err(|e| to_error(format!("{service} returned invalid JSON: {e}")))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_descriptions_name_the_failure() {
        let auth = describe_status("OpenAI", StatusCode::UNAUTHORIZED, "bad key");
        assert!(auth.contains("credentials"));
        let quota = describe_status("OpenAI", StatusCode::TOO_MANY_REQUESTS, "");
        assert!(quota.contains("quota"));
        let server = describe_status("Ollama", StatusCode::BAD_GATEWAY, "upstream");
        assert!(server.starts_with("Ollama server error"));
        let other = describe_status("OpenAI", StatusCode::BAD_REQUEST, "nope");
        assert!(other.contains("400"));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let msg = describe_status("OpenAI", StatusCode::BAD_REQUEST, &body);
        assert!(msg.chars().count() < 400);
        assert!(msg.ends_with('…'));
    }

    #[tokio::test]
    async fn unreachable_endpoint_uses_the_callers_error() {
        let client = client(5).unwrap();
        let err = post_json(
            &client,
            "Ollama",
            "http://127.0.0.1:1/api/embed",
            &serde_json::json!({}),
            None,
            RagError::EmbeddingService,
        )
        .await
        .unwrap_err();
        match err {
            RagError::EmbeddingService(message) => assert!(message.contains("Ollama"), "got: {message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        std::env::set_var("DOCCHAT_TEST_BLANK_KEY", "   ");
        assert_eq!(api_key_from_env("DOCCHAT_TEST_BLANK_KEY"), None);
        assert_eq!(api_key_from_env("DOCCHAT_TEST_UNSET_KEY_4711"), None);
    }
}
