use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::{GenerationError, TextCompleter};

/// Completion client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiCompleter {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiCompleter {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        temperature: f32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Gemini API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing generation model name");

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Gemini API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Gemini HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        })
    }
}

fn extract_answer(payload: &Value) -> Result<String, GenerationError> {
    let parts = payload
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            GenerationError::Malformed("response missing candidates[0].content.parts".to_string())
        })?;

    let answer: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");

    if answer.trim().is_empty() {
        return Err(GenerationError::Malformed(
            "response contained no text parts".to_string(),
        ));
    }

    Ok(answer)
}

#[async_trait]
impl TextCompleter for GeminiCompleter {
    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        extract_answer(&payload)
    }
}
