use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize record store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize vector index: {0}")]
    Index(#[source] anyhow::Error),

    #[error("Failed to initialize embedding backend: {0}")]
    Embedder(#[source] anyhow::Error),

    #[error("Failed to initialize generation backend: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("Failed to build page fetcher: {0}")]
    Fetcher(#[source] anyhow::Error),
}
