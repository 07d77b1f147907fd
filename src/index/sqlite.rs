//! SQLite-backed vector index. Embeddings live in a BLOB column as
//! little-endian f32s; similarity is computed in process.

use std::cmp::Ordering;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{IndexError, PassageKind, PassageRecord, ScoredPassage, VectorIndex};

const EMBEDDER_ID_KEY: &str = "embedder_id";

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn new(db_path: PathBuf) -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(IndexError::Write)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), IndexError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS passages (
                entity_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('fact', 'faq')),
                fund_id INTEGER NOT NULL,
                fund_name TEXT NOT NULL,
                source_url TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (entity_id, kind)
            )",
            "CREATE INDEX IF NOT EXISTS idx_passages_fund ON passages(fund_id)",
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        ];

        for ddl in statements {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(IndexError::Write)?;
        }

        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, passage: &PassageRecord, embedding: &[f32]) -> Result<(), IndexError> {
        sqlx::query(
            "INSERT OR REPLACE INTO passages
                 (entity_id, kind, fund_id, fund_name, source_url, content, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(passage.entity_id)
        .bind(passage.kind.as_str())
        .bind(passage.fund_id)
        .bind(&passage.fund_name)
        .bind(&passage.source_url)
        .bind(&passage.content)
        .bind(serialize_embedding(embedding))
        .execute(&self.pool)
        .await
        .map_err(IndexError::Write)?;

        Ok(())
    }

    async fn remove_entity(&self, entity_id: i64, kind: PassageKind) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM passages WHERE entity_id = ?1 AND kind = ?2")
            .bind(entity_id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await
            .map_err(IndexError::Write)?;
        Ok(())
    }

    async fn remove_fund(&self, fund_id: i64) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM passages WHERE fund_id = ?1")
            .bind(fund_id)
            .execute(&self.pool)
            .await
            .map_err(IndexError::Write)?;
        Ok(())
    }

    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredPassage>, IndexError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT entity_id, kind, fund_id, fund_name, source_url, content, embedding
             FROM passages",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(IndexError::Read)?;

        let mut scored: Vec<ScoredPassage> = rows
            .iter()
            .filter_map(|row| {
                let kind = PassageKind::parse(&row.get::<String, _>("kind"))?;
                let embedding = deserialize_embedding(&row.get::<Vec<u8>, _>("embedding"));
                Some(ScoredPassage {
                    passage: PassageRecord {
                        entity_id: row.get("entity_id"),
                        kind,
                        fund_id: row.get("fund_id"),
                        fund_name: row.get("fund_name"),
                        source_url: row.get("source_url"),
                        content: row.get("content"),
                    },
                    score: cosine_similarity(query, &embedding),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.passage.entity_id.cmp(&b.passage.entity_id))
                .then(a.passage.kind.as_str().cmp(b.passage.kind.as_str()))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<i64, IndexError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM passages")
            .fetch_one(&self.pool)
            .await
            .map_err(IndexError::Read)
    }

    async fn clear(&self) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM passages")
            .execute(&self.pool)
            .await
            .map_err(IndexError::Write)?;
        Ok(())
    }

    async fn embedder_id(&self) -> Result<Option<String>, IndexError> {
        sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?1")
            .bind(EMBEDDER_ID_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(IndexError::Read)
    }

    async fn set_embedder_id(&self, id: &str) -> Result<(), IndexError> {
        sqlx::query("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)")
            .bind(EMBEDDER_ID_KEY)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(IndexError::Write)?;
        Ok(())
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_index() -> SqliteVectorIndex {
        let tmp =
            std::env::temp_dir().join(format!("fundfaq-index-test-{}.db", uuid::Uuid::new_v4()));
        SqliteVectorIndex::new(tmp).await.unwrap()
    }

    fn passage(entity_id: i64, kind: PassageKind, fund_id: i64, content: &str) -> PassageRecord {
        PassageRecord {
            entity_id,
            kind,
            fund_id,
            fund_name: format!("Fund {}", fund_id),
            source_url: format!("https://x/{}", fund_id),
            content: content.to_string(),
        }
    }

    #[test]
    fn embedding_bytes_round_trip() {
        let original = vec![0.25f32, -1.5, 3.75, 0.0];
        let bytes = serialize_embedding(&original);
        assert_eq!(bytes.len(), 16);
        assert_eq!(deserialize_embedding(&bytes), original);
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn nearest_orders_by_similarity() {
        let index = test_index().await;
        index
            .upsert(&passage(1, PassageKind::Fact, 1, "expense ratio 0.5%"), &[1.0, 0.0, 0.0])
            .await
            .unwrap();
        index
            .upsert(&passage(2, PassageKind::Fact, 1, "exit load 1%"), &[0.6, 0.8, 0.0])
            .await
            .unwrap();
        index
            .upsert(&passage(3, PassageKind::Faq, 2, "minimum sip"), &[0.0, 0.0, 1.0])
            .await
            .unwrap();

        let results = index.nearest(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].passage.entity_id, 1);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[1].passage.entity_id, 2);
    }

    #[tokio::test]
    async fn equal_scores_tie_break_on_entity_id() {
        let index = test_index().await;
        index
            .upsert(&passage(7, PassageKind::Fact, 1, "a"), &[1.0, 0.0])
            .await
            .unwrap();
        index
            .upsert(&passage(3, PassageKind::Fact, 2, "b"), &[1.0, 0.0])
            .await
            .unwrap();

        let results = index.nearest(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].passage.entity_id, 3);
        assert_eq!(results[1].passage.entity_id, 7);
    }

    #[tokio::test]
    async fn upsert_same_key_replaces() {
        let index = test_index().await;
        index
            .upsert(&passage(1, PassageKind::Fact, 1, "old"), &[1.0, 0.0])
            .await
            .unwrap();
        index
            .upsert(&passage(1, PassageKind::Fact, 1, "new"), &[0.0, 1.0])
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let results = index.nearest(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].passage.content, "new");
    }

    #[tokio::test]
    async fn same_entity_id_different_kind_coexist() {
        let index = test_index().await;
        index
            .upsert(&passage(5, PassageKind::Fact, 1, "fact"), &[1.0, 0.0])
            .await
            .unwrap();
        index
            .upsert(&passage(5, PassageKind::Faq, 1, "faq"), &[0.0, 1.0])
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 2);
        index.remove_entity(5, PassageKind::Fact).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        let remaining = index.nearest(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(remaining[0].passage.kind, PassageKind::Faq);
    }

    #[tokio::test]
    async fn remove_fund_drops_only_that_fund() {
        let index = test_index().await;
        index
            .upsert(&passage(1, PassageKind::Fact, 1, "a"), &[1.0])
            .await
            .unwrap();
        index
            .upsert(&passage(2, PassageKind::Faq, 1, "b"), &[1.0])
            .await
            .unwrap();
        index
            .upsert(&passage(3, PassageKind::Fact, 2, "c"), &[1.0])
            .await
            .unwrap();

        index.remove_fund(1).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn embedder_id_survives_clear() {
        let index = test_index().await;
        assert!(index.embedder_id().await.unwrap().is_none());

        index.set_embedder_id("hashing").await.unwrap();
        index
            .upsert(&passage(1, PassageKind::Fact, 1, "a"), &[1.0])
            .await
            .unwrap();
        index.clear().await.unwrap();

        assert_eq!(index.count().await.unwrap(), 0);
        assert_eq!(index.embedder_id().await.unwrap().as_deref(), Some("hashing"));
    }
}
