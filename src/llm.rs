use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::LlmConfig;
use crate::gateway::{EmbeddingGateway, GenerationGateway, Message};

/// OpenAI-compatible client serving both chat completions and embeddings.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    embedding_model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    max_retries: usize,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries.max(1),
        })
    }

    /// Resolve an API route (`chat/completions`, `embeddings`) from the base URL.
    fn endpoint(&self, route: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with(route) {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/{}", base, route)
        } else {
            format!("{}/v1/{}", base, route)
        }
    }

    /// POST a JSON body, retrying on 429/5xx and transient transport errors.
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let mut attempt = 0usize;
        loop {
            let mut req = self.client.post(url).json(body);
            if let Some(key) = &self.api_key {
                req = req.header("Authorization", format!("Bearer {}", key));
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.context("Failed to read LLM response")?;
                    if status.is_success() {
                        return serde_json::from_str(&text).context("Failed to parse LLM JSON");
                    }
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(%status, attempt, "LLM request rejected, retrying");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    error!(%status, url, "LLM request failed");
                    anyhow::bail!("LLM request failed ({}): {}", status, text);
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!(error = %err, attempt, "LLM request error, retrying");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    error!(error = %err, url, "LLM request failed");
                    return Err(err).context("LLM request failed");
                }
            }
        }
    }
}

#[async_trait]
impl GenerationGateway for LlmClient {
    async fn complete(&self, messages: &[Message], json_object: bool) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if json_object {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let json = self.post_json(&self.endpoint("chat/completions"), &body).await?;

        // choices[0].message.content may be null
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .unwrap_or("")
            .to_string();
        debug!(len = content.len(), json_object, "completion received");
        Ok(content)
    }
}

#[async_trait]
impl EmbeddingGateway for LlmClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": [text.replace('\n', " ")],
        });
        let json = self.post_json(&self.endpoint("embeddings"), &body).await?;
        let parsed: EmbeddingResponse =
            serde_json::from_value(json).context("Failed to parse embedding response")?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("embedding response contained no vectors"))
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}
