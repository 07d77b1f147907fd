use std::env;
use std::time::Duration;

use serde::Deserialize;

/// Typed snapshot of the merged configuration tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub scrape: ScrapeSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub embedding: EmbeddingSettings,
    pub gemini: GeminiSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeSettings {
    pub target_urls: Vec<String>,
    pub concurrency: usize,
    pub max_retries: usize,
    pub request_timeout_secs: u64,
    pub min_request_interval_ms: u64,
}

impl ScrapeSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub min_score: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    pub model: String,
    pub max_prompt_chars: usize,
    pub timeout_secs: u64,
    pub max_inflight: usize,
    pub temperature: f32,
}

impl GenerationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    pub backend: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl GeminiSettings {
    /// API key with the `GEMINI_API_KEY` environment variable taking
    /// precedence over the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
            })
    }
}
