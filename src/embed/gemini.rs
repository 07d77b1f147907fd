use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::{EmbedError, Embedder};

const MAX_RETRIES: usize = 3;

/// Embedding client for the Gemini `embedContent` endpoint.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Gemini API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");

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
        })
    }

    async fn embed_with_task(&self, text: &str, task_type: &str) -> Result<Vec<f32>, EmbedError> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let body = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type,
        });

        let mut attempt = 0usize;
        loop {
            let response = self.client.post(&url).json(&body).send().await;
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let payload: Value = resp
                            .json()
                            .await
                            .map_err(|e| EmbedError::Backend(format!("bad response: {}", e)))?;
                        return extract_values(&payload);
                    }

                    let text = resp.text().await.unwrap_or_default();
                    if should_retry(status) && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Backend(format!(
                        "embedContent failed ({}): {}",
                        status, text
                    )));
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Backend(err.to_string()));
                }
            }
        }
    }
}

fn extract_values(payload: &Value) -> Result<Vec<f32>, EmbedError> {
    let values = payload
        .get("embedding")
        .and_then(|e| e.get("values"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| EmbedError::Backend("response missing embedding.values".to_string()))?;

    Ok(values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect())
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn id(&self) -> &str {
        &self.model
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_with_task(text, "RETRIEVAL_DOCUMENT").await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_with_task(text, "RETRIEVAL_QUERY").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_values_reads_embedding_array() {
        let payload = json!({ "embedding": { "values": [0.25, -1.0, 0.5] } });
        let values = extract_values(&payload).unwrap();
        assert_eq!(values, vec![0.25, -1.0, 0.5]);
    }

    #[test]
    fn extract_values_rejects_malformed_payload() {
        let payload = json!({ "candidates": [] });
        assert!(extract_values(&payload).is_err());
    }

    #[test]
    fn new_rejects_empty_key() {
        assert!(GeminiEmbedder::new("", "https://api", "text-embedding-004", Duration::from_secs(5)).is_err());
    }
}
