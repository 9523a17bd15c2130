//! Text-generation providers.
//!
//! Implements [`docchat_core::generation::GenerationProvider`] for:
//! - **[`OpenAIChat`]**: OpenAI-compatible `POST {url}/chat/completions`.
//! - **[`OllamaChat`]**: Ollama `POST {url}/api/chat` with `stream: false`.
//! - **[`DisabledGenerator`]**: fails every call.
//!
//! The prompt is sent as a single user message. Nothing is retried.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use docchat_core::generation::GenerationProvider;
use docchat_core::{RagError, Result};
use serde_json::{json, Value};

use crate::config::GenerationConfig;
use crate::http;

const OPENAI_URL: &str = "https://api.openai.com/v1";
const OLLAMA_URL: &str = "http://localhost:11434";

pub struct DisabledGenerator;

#[async_trait]
impl GenerationProvider for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        Err(RagError::GenerationService(
            "generation provider is disabled".to_string(),
        ))
    }
}

/// OpenAI chat completions client.
pub struct OpenAIChat {
    model: String,
    url: String,
    api_key: String,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAIChat {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = http::api_key_from_env(&config.api_key_env)
            .ok_or_else(|| anyhow!("{} environment variable not set", config.api_key_env))?;
        Ok(Self {
            model: config.model.clone(),
            url: base_url(config, OPENAI_URL),
            api_key,
            max_tokens: config.max_tokens,
            client: http::client(config.timeout_secs)?,
        })
    }

    fn request_body(&self, prompt: &str, temperature: f32) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature,
            "stream": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl GenerationProvider for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.url);
        let body = self.request_body(prompt, temperature);
        let json = http::post_json(
            &self.client,
            "OpenAI",
            &endpoint,
            &body,
            Some(&self.api_key),
            RagError::GenerationService,
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Ollama chat client (non-streaming).
pub struct OllamaChat {
    model: String,
    url: String,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            url: base_url(config, OLLAMA_URL),
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        let endpoint = format!("{}/api/chat", self.url);
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
            "options": {"temperature": temperature},
        });
        let json = http::post_json(
            &self.client,
            "Ollama",
            &endpoint,
            &body,
            None,
            RagError::GenerationService,
        )
        .await?;
        parse_ollama_response(&json)
    }
}

fn base_url(config: &GenerationConfig, default: &str) -> String {
    config
        .url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// `choices[0].message.content`
fn parse_openai_response(json: &Value) -> Result<String> {
    let choice = json
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| malformed("no choices in response"))?;
    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| malformed("choice has no text content"))
}

/// `message.content`
fn parse_ollama_response(json: &Value) -> Result<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| malformed("missing message content"))
}

fn malformed(what: &str) -> RagError {
    RagError::GenerationService(format!("invalid completion response: {what}"))
}

/// Create the generator named by `generation.provider`.
pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
