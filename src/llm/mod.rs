//! Text-completion capability consumed by the answer composer.
//!
//! The composer depends only on [`TextCompleter`]; the production wiring
//! injects [`GeminiCompleter`] and tests inject scripted stubs.

mod gemini;

pub use gemini::GeminiCompleter;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation timed out")]
    Timeout,
    #[error("generation rate limited")]
    RateLimited,
    #[error("generation API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("generation network error: {0}")]
    Network(String),
    #[error("malformed generation response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Identifier reported as the answer source, e.g. "gemini-2.0-flash".
    fn id(&self) -> &str;

    /// One prompt in, one completion out. No retries here: the caller
    /// decides what a failed generation falls back to.
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}
