//! Model clients for plan generation.
//!
//! [`HttpLlmClient`] speaks to Gemini, Ollama, Claude and OpenAI style
//! endpoints. Requests run on a private current-thread tokio runtime so
//! callers stay synchronous.

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are a project planning assistant. Respond with a single JSON object and nothing else.";
const MAX_OUTPUT_TOKENS: u32 = 2048;

/// Text completion interface used by the plan generator.
pub trait LlmClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Create the HTTP-backed client for the configured provider.
pub fn create_llm_client(llm: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    Ok(Box::new(HttpLlmClient::new(llm)?))
}

pub struct HttpLlmClient {
    model: String,
    provider: LlmProvider,
    endpoint: String,
    api_key: Option<String>,
    runtime: tokio::runtime::Runtime,
    http: reqwest::Client,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| config.provider.default_endpoint().to_string());
        let api_key = config.api_key.clone().or_else(|| {
            config
                .provider
                .api_key_env()
                .and_then(|var| std::env::var(var).ok())
        });

        if config.provider.api_key_env().is_some() && api_key.is_none() {
            return Err(Error::Config(
                "llm.api_key (or provider env var) is required".to_string(),
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Llm(format!("failed to build tokio runtime: {e}")))?;
        let timeout_secs = config.timeout_secs.max(1);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            model: config.model.clone(),
            provider: config.provider,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            runtime,
            http,
        })
    }

    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    async fn post_json(
        &self,
        name: &str,
        url: String,
        headers: HeaderMap,
        body: Value,
    ) -> Result<Value> {
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("{name} request failed: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Llm(format!("{name} read body failed: {e}")))?;
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "{} returned {}: {}",
                name,
                status.as_u16(),
                text
            )));
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("{name} returned invalid JSON: {e}")))
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint,
            urlencoding::encode(&self.model)
        );
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(self.api_key())
                .map_err(|e| Error::Llm(format!("invalid gemini api key header: {e}")))?,
        );

        let json = self
            .post_json(
                "gemini",
                url,
                headers,
                json!({
                    "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                    "generationConfig": { "maxOutputTokens": MAX_OUTPUT_TOKENS },
                }),
            )
            .await?;
        json.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                Error::Llm("gemini response missing candidates[0].content.parts[0].text".to_string())
            })
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let json = self
            .post_json(
                "ollama",
                url,
                HeaderMap::new(),
                json!({
                    "model": self.model,
                    "system": SYSTEM_PROMPT,
                    "prompt": prompt,
                    "stream": false,
                }),
            )
            .await?;
        json.get("response")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| Error::Llm("ollama response missing string field `response`".to_string()))
    }

    async fn complete_claude(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.endpoint);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(self.api_key())
                .map_err(|e| Error::Llm(format!("invalid claude api key header: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));

        let json = self
            .post_json(
                "claude",
                url,
                headers,
                json!({
                    "model": self.model,
                    "max_tokens": MAX_OUTPUT_TOKENS,
                    "system": SYSTEM_PROMPT,
                    "messages": [{ "role": "user", "content": prompt }],
                }),
            )
            .await?;
        json.pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| Error::Llm("claude response missing content[0].text".to_string()))
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key()))
                .map_err(|e| Error::Llm(format!("invalid auth header: {e}")))?,
        );

        let json = self
            .post_json(
                "openai",
                url,
                headers,
                json!({
                    "model": self.model,
                    "messages": [
                        { "role": "system", "content": SYSTEM_PROMPT },
                        { "role": "user", "content": prompt }
                    ]
                }),
            )
            .await?;
        json.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                Error::Llm("openai response missing choices[0].message.content".to_string())
            })
    }
}

impl LlmClient for HttpLlmClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!(
            provider = ?self.provider,
            model = %self.model,
            prompt_chars = prompt.len(),
            "Requesting plan from model"
        );
        self.runtime.block_on(async {
            match self.provider {
                LlmProvider::Gemini => self.complete_gemini(prompt).await,
                LlmProvider::Ollama => self.complete_ollama(prompt).await,
                LlmProvider::Claude => self.complete_claude(prompt).await,
                LlmProvider::OpenAI => self.complete_openai(prompt).await,
            }
        })
    }
}
