//! Embedding capability injected into the indexer and retriever.
//!
//! Backends: `GeminiEmbedder` (remote API), `HashingEmbedder` (offline,
//! deterministic) and `UnconfiguredEmbedder` (present so callers can degrade
//! without special-casing a missing backend).

mod gemini;
mod hashing;

pub use gemini::GeminiEmbedder;
pub use hashing::HashingEmbedder;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// No backend is configured. Expected in keyless deployments; callers
    /// degrade silently.
    #[error("no embedding backend configured")]
    Unconfigured,
    /// A configured backend failed. Callers still degrade, but loudly.
    #[error("embedding backend error: {0}")]
    Backend(String),
}

impl EmbedError {
    /// True when the failure is the expected keyless state rather than a
    /// runtime fault.
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, EmbedError::Unconfigured)
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier recorded alongside stored vectors.
    fn id(&self) -> &str;

    /// Embed text that will be stored in the index.
    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Stand-in used when no embedding backend is configured.
pub struct UnconfiguredEmbedder;

#[async_trait]
impl Embedder for UnconfiguredEmbedder {
    fn id(&self) -> &str {
        "unconfigured"
    }

    async fn embed_document(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Unconfigured)
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Unconfigured)
    }
}
