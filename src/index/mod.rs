//! Embedding index over fund facts and FAQs.
//!
//! Entries are keyed by `(entity_id, kind)` because fact and FAQ ids come
//! from different tables and can collide. Search is brute-force cosine over
//! all stored vectors, which is plenty for a single-site catalogue.

pub mod sqlite;

pub use sqlite::SqliteVectorIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index write failed: {0}")]
    Write(#[source] sqlx::Error),
    #[error("index read failed: {0}")]
    Read(#[source] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassageKind {
    Fact,
    Faq,
}

impl PassageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Faq => "faq",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fact" => Some(Self::Fact),
            "faq" => Some(Self::Faq),
            _ => None,
        }
    }
}

/// One indexed text passage and the attribution needed to cite it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageRecord {
    pub entity_id: i64,
    pub kind: PassageKind,
    pub fund_id: i64,
    pub fund_name: String,
    pub source_url: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: PassageRecord,
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts or overwrites the entry for `(passage.entity_id, passage.kind)`.
    async fn upsert(&self, passage: &PassageRecord, embedding: &[f32]) -> Result<(), IndexError>;

    /// Removes the entry for `(entity_id, kind)`, if present.
    async fn remove_entity(&self, entity_id: i64, kind: PassageKind) -> Result<(), IndexError>;

    /// Drops every passage belonging to a fund. Used before re-indexing so a
    /// shrunken re-scrape leaves no stale passages behind.
    async fn remove_fund(&self, fund_id: i64) -> Result<(), IndexError>;

    /// Best matches by cosine similarity, descending; equal scores order by
    /// ascending entity id so results are deterministic.
    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredPassage>, IndexError>;

    async fn count(&self) -> Result<i64, IndexError>;

    async fn clear(&self) -> Result<(), IndexError>;

    /// Which embedder produced the stored vectors. Vectors from different
    /// models are not comparable, so a mismatch forces a full rebuild.
    async fn embedder_id(&self) -> Result<Option<String>, IndexError>;

    async fn set_embedder_id(&self, id: &str) -> Result<(), IndexError>;
}
