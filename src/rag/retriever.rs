//! Query-time retrieval over the passage index.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::embed::{EmbedError, Embedder};
use crate::index::{IndexError, PassageKind, VectorIndex};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbedError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl RetrievalError {
    /// True when retrieval failed only because no embedding backend is
    /// configured, which callers treat as "degrade", not "fail".
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, Self::Embedding(err) if err.is_unconfigured())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub entity_id: i64,
    pub kind: PassageKind,
    pub fund_id: i64,
    pub fund_name: String,
    pub source_url: String,
    pub text: String,
    pub score: f32,
}

#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    /// Top-k passages scoring at or above `min_score`, best first; ties
    /// order by ascending entity id. A blank query or empty index is an
    /// empty result, not an error.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let query = query.trim();
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_query(query).await?;
        let candidates = self.index.nearest(&embedding, k).await?;

        let results: Vec<RetrievalResult> = candidates
            .into_iter()
            .filter(|scored| scored.score >= min_score)
            .map(|scored| RetrievalResult {
                entity_id: scored.passage.entity_id,
                kind: scored.passage.kind,
                fund_id: scored.passage.fund_id,
                fund_name: scored.passage.fund_name,
                source_url: scored.passage.source_url,
                text: scored.passage.content,
                score: scored.score,
            })
            .collect();

        debug!(query, k, min_score, hits = results.len(), "retrieval finished");
        Ok(results)
    }
}
