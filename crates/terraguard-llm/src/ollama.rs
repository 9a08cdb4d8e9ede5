//! HTTP client for a local Ollama server (`/api/tags`, `/api/generate`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{LlmError, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gpt-oss:20b";
pub const DEFAULT_NUM_CTX: u32 = 2048;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const GENERATE_TIMEOUT: Duration = Duration::from_secs(600);

/// Ollama client issuing non-streaming generate calls.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    num_ctx: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_ctx: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    /// Create a client for the given Ollama base URL.
    ///
    /// `base_url` should be like `http://localhost:11434` (no trailing slash).
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            num_ctx: DEFAULT_NUM_CTX,
        }
    }

    pub fn with_num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = num_ctx;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn probe(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        debug!(url = %url, "probing generation backend");
        let resp = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_ctx: self.num_ctx,
            },
        };

        info!(model = %self.model, temperature, "requesting generation");
        let resp = self
            .client
            .post(&url)
            .timeout(GENERATE_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;

        let raw = resp.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&raw)?;
        debug!(chars = parsed.response.len(), "generation complete");
        Ok(parsed.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
