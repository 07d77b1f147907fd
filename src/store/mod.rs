//! Relational store for scraped fund records.
//!
//! One fund per source page: a `funds` row plus child rows for facts,
//! holdings, peer comparison and FAQs. Upserts replace the whole fund inside
//! a single transaction, so readers only ever see the record before or after
//! a re-scrape, never in between.

mod snapshot;

pub use snapshot::SnapshotReport;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("store write failed: {0}")]
    Write(#[source] sqlx::Error),
    #[error("store read failed: {0}")]
    Read(#[source] sqlx::Error),
    #[error("snapshot failed: {0}")]
    Snapshot(#[source] std::io::Error),
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// One extracted fact with its attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundFact {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub value: String,
    pub source_url: String,
    pub extracted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    #[serde(default)]
    pub id: i64,
    pub position: i64,
    pub name: String,
    pub allocation_pct: Option<f64>,
    pub source_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerFund {
    #[serde(default)]
    pub id: i64,
    pub position: i64,
    pub name: String,
    pub return_1y: Option<f64>,
    pub source_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub fund_id: i64,
    pub question: String,
    pub answer: String,
    pub source_url: String,
}

/// A scraped fund page in structured form. `id` and child row ids are
/// assigned by the store; extractor output carries them as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRecord {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub source_url: String,
    pub scraped_at: String,
    pub facts: Vec<FundFact>,
    pub holdings: Vec<Holding>,
    pub peers: Vec<PeerFund>,
    pub faqs: Vec<FaqEntry>,
}

impl FundRecord {
    pub fn fact(&self, name: &str) -> Option<&FundFact> {
        self.facts.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub funds: i64,
    pub facts: i64,
    pub faqs: i64,
}

/// A FAQ matched by keyword overlap, used when vector search is unavailable.
#[derive(Debug, Clone)]
pub struct FaqHit {
    pub faq: FaqEntry,
    pub fund_name: String,
    pub score: f64,
}

/// Uniqueness key for FAQ questions: case-folded, whitespace-collapsed,
/// trailing punctuation stripped.
pub fn normalize_question(question: &str) -> String {
    question
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_string()
}

#[derive(Clone)]
pub struct FundStore {
    pool: SqlitePool,
}

impl FundStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, StoreError> {
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
            .map_err(StoreError::Write)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS funds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                source_url TEXT NOT NULL CHECK (source_url <> ''),
                scraped_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS facts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fund_id INTEGER NOT NULL REFERENCES funds(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                source_url TEXT NOT NULL CHECK (source_url <> ''),
                extracted_at TEXT NOT NULL,
                UNIQUE (fund_id, name)
            )",
            "CREATE TABLE IF NOT EXISTS holdings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fund_id INTEGER NOT NULL REFERENCES funds(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                allocation_pct REAL,
                source_url TEXT NOT NULL CHECK (source_url <> '')
            )",
            "CREATE TABLE IF NOT EXISTS peers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fund_id INTEGER NOT NULL REFERENCES funds(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                return_1y REAL,
                source_url TEXT NOT NULL CHECK (source_url <> '')
            )",
            "CREATE TABLE IF NOT EXISTS faqs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fund_id INTEGER NOT NULL REFERENCES funds(id) ON DELETE CASCADE,
                question TEXT NOT NULL,
                normalized_question TEXT NOT NULL,
                answer TEXT NOT NULL,
                source_url TEXT NOT NULL CHECK (source_url <> ''),
                UNIQUE (fund_id, normalized_question)
            )",
            "CREATE INDEX IF NOT EXISTS idx_facts_fund ON facts(fund_id)",
            "CREATE INDEX IF NOT EXISTS idx_holdings_fund ON holdings(fund_id)",
            "CREATE INDEX IF NOT EXISTS idx_peers_fund ON peers(fund_id)",
            "CREATE INDEX IF NOT EXISTS idx_faqs_fund ON faqs(fund_id)",
        ];

        for ddl in statements {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(StoreError::Write)?;
        }

        Ok(())
    }

    /// Replaces the stored record for `record.name` atomically and returns
    /// the assigned fund id. Transient write failures are retried with
    /// exponential backoff before surfacing.
    pub async fn upsert(&self, record: &FundRecord) -> Result<i64, StoreError> {
        validate_record(record)?;

        let mut attempt = 0usize;
        loop {
            match self.try_upsert(record).await {
                Ok(fund_id) => return Ok(fund_id),
                Err(err) => {
                    if is_transient(&err) && attempt + 1 < MAX_WRITE_ATTEMPTS {
                        attempt += 1;
                        tokio::time::sleep(write_backoff(attempt)).await;
                        continue;
                    }
                    return Err(StoreError::Write(err));
                }
            }
        }
    }

    async fn try_upsert(&self, record: &FundRecord) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let fund_id: i64 = sqlx::query_scalar(
            "INSERT INTO funds (name, source_url, scraped_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                 source_url = excluded.source_url,
                 scraped_at = excluded.scraped_at
             RETURNING id",
        )
        .bind(&record.name)
        .bind(&record.source_url)
        .bind(&record.scraped_at)
        .fetch_one(&mut *tx)
        .await?;

        for table in ["facts", "holdings", "peers", "faqs"] {
            sqlx::query(&format!("DELETE FROM {} WHERE fund_id = ?1", table))
                .bind(fund_id)
                .execute(&mut *tx)
                .await?;
        }

        for fact in &record.facts {
            sqlx::query(
                "INSERT INTO facts (fund_id, name, value, source_url, extracted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(fund_id)
            .bind(&fact.name)
            .bind(&fact.value)
            .bind(&fact.source_url)
            .bind(&fact.extracted_at)
            .execute(&mut *tx)
            .await?;
        }

        for holding in &record.holdings {
            sqlx::query(
                "INSERT INTO holdings (fund_id, position, name, allocation_pct, source_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(fund_id)
            .bind(holding.position)
            .bind(&holding.name)
            .bind(holding.allocation_pct)
            .bind(&holding.source_url)
            .execute(&mut *tx)
            .await?;
        }

        for peer in &record.peers {
            sqlx::query(
                "INSERT INTO peers (fund_id, position, name, return_1y, source_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(fund_id)
            .bind(peer.position)
            .bind(&peer.name)
            .bind(peer.return_1y)
            .bind(&peer.source_url)
            .execute(&mut *tx)
            .await?;
        }

        for faq in &record.faqs {
            sqlx::query(
                "INSERT OR IGNORE INTO faqs (fund_id, question, normalized_question, answer, source_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(fund_id)
            .bind(&faq.question)
            .bind(normalize_question(&faq.question))
            .bind(&faq.answer)
            .bind(&faq.source_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(fund_id)
    }

    pub async fn get(&self, fund_id: i64) -> Result<Option<FundRecord>, StoreError> {
        let row = sqlx::query("SELECT id, name, source_url, scraped_at FROM funds WHERE id = ?1")
            .bind(fund_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Read)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<FundRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, source_url, scraped_at FROM funds WHERE name = ?1 COLLATE NOCASE",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Funds in ascending id order, so pagination is stable across calls.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<FundRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, source_url, scraped_at FROM funds
             ORDER BY id ASC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit.max(0))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(self.hydrate(row).await?);
        }
        Ok(records)
    }

    pub async fn fund_ids(&self) -> Result<Vec<i64>, StoreError> {
        sqlx::query_scalar("SELECT id FROM funds ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Read)
    }

    pub async fn delete(&self, fund_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM funds WHERE id = ?1")
            .bind(fund_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Write)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let funds: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM funds")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Read)?;
        let facts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facts")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Read)?;
        let faqs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM faqs")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Read)?;

        Ok(StoreStats { funds, facts, faqs })
    }

    /// Term-overlap search over stored FAQs. This is the retrieval of last
    /// resort when no embedding backend is usable; scores are the fraction
    /// of query terms present in the question or answer.
    pub async fn search_faqs(&self, query: &str, limit: usize) -> Result<Vec<FaqHit>, StoreError> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT f.id, f.fund_id, f.question, f.answer, f.source_url, fu.name AS fund_name
             FROM faqs f JOIN funds fu ON fu.id = f.fund_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        let mut hits: Vec<FaqHit> = rows
            .iter()
            .filter_map(|row| {
                let question: String = row.get("question");
                let answer: String = row.get("answer");
                let haystack = format!("{} {}", question, answer).to_lowercase();
                let matched = terms.iter().filter(|t| haystack.contains(*t)).count();
                if matched == 0 {
                    return None;
                }

                Some(FaqHit {
                    faq: FaqEntry {
                        id: row.get("id"),
                        fund_id: row.get("fund_id"),
                        question,
                        answer,
                        source_url: row.get("source_url"),
                    },
                    fund_name: row.get("fund_name"),
                    score: matched as f64 / terms.len() as f64,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.faq.id.cmp(&b.faq.id))
        });
        hits.truncate(limit.max(1));
        Ok(hits)
    }

    async fn hydrate(&self, fund_row: &sqlx::sqlite::SqliteRow) -> Result<FundRecord, StoreError> {
        let fund_id: i64 = fund_row.get("id");

        let fact_rows = sqlx::query(
            "SELECT id, name, value, source_url, extracted_at FROM facts
             WHERE fund_id = ?1 ORDER BY name ASC",
        )
        .bind(fund_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        let holding_rows = sqlx::query(
            "SELECT id, position, name, allocation_pct, source_url FROM holdings
             WHERE fund_id = ?1 ORDER BY position ASC",
        )
        .bind(fund_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        let peer_rows = sqlx::query(
            "SELECT id, position, name, return_1y, source_url FROM peers
             WHERE fund_id = ?1 ORDER BY position ASC",
        )
        .bind(fund_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        let faq_rows = sqlx::query(
            "SELECT id, question, answer, source_url FROM faqs
             WHERE fund_id = ?1 ORDER BY id ASC",
        )
        .bind(fund_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        Ok(FundRecord {
            id: fund_id,
            name: fund_row.get("name"),
            source_url: fund_row.get("source_url"),
            scraped_at: fund_row.get("scraped_at"),
            facts: fact_rows
                .iter()
                .map(|row| FundFact {
                    id: row.get("id"),
                    name: row.get("name"),
                    value: row.get("value"),
                    source_url: row.get("source_url"),
                    extracted_at: row.get("extracted_at"),
                })
                .collect(),
            holdings: holding_rows
                .iter()
                .map(|row| Holding {
                    id: row.get("id"),
                    position: row.get("position"),
                    name: row.get("name"),
                    allocation_pct: row.get("allocation_pct"),
                    source_url: row.get("source_url"),
                })
                .collect(),
            peers: peer_rows
                .iter()
                .map(|row| PeerFund {
                    id: row.get("id"),
                    position: row.get("position"),
                    name: row.get("name"),
                    return_1y: row.get("return_1y"),
                    source_url: row.get("source_url"),
                })
                .collect(),
            faqs: faq_rows
                .iter()
                .map(|row| FaqEntry {
                    id: row.get("id"),
                    fund_id,
                    question: row.get("question"),
                    answer: row.get("answer"),
                    source_url: row.get("source_url"),
                })
                .collect(),
        })
    }
}

fn validate_record(record: &FundRecord) -> Result<(), StoreError> {
    if record.name.trim().is_empty() {
        return Err(StoreError::Invalid("fund name is empty".to_string()));
    }
    if record.source_url.trim().is_empty() {
        return Err(StoreError::Invalid("fund source_url is empty".to_string()));
    }
    for fact in &record.facts {
        if fact.source_url.trim().is_empty() {
            return Err(StoreError::Invalid(format!(
                "fact '{}' has no source_url",
                fact.name
            )));
        }
    }
    for faq in &record.faqs {
        if faq.source_url.trim().is_empty() {
            return Err(StoreError::Invalid(format!(
                "FAQ '{}' has no source_url",
                faq.question
            )));
        }
    }
    Ok(())
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => {
            let message = db.message().to_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}

fn write_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(4) as u32;
    Duration::from_millis(100 * (1 << capped))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> FundStore {
        let tmp = std::env::temp_dir().join(format!("fundfaq-store-test-{}.db", uuid::Uuid::new_v4()));
        FundStore::new(tmp).await.unwrap()
    }

    fn sample_record(name: &str, url: &str) -> FundRecord {
        let now = chrono::Utc::now().to_rfc3339();
        FundRecord {
            id: 0,
            name: name.to_string(),
            source_url: url.to_string(),
            scraped_at: now.clone(),
            facts: vec![
                FundFact {
                    id: 0,
                    name: "expense_ratio".to_string(),
                    value: "0.52%".to_string(),
                    source_url: url.to_string(),
                    extracted_at: now.clone(),
                },
                FundFact {
                    id: 0,
                    name: "min_sip_amount".to_string(),
                    value: "₹500".to_string(),
                    source_url: url.to_string(),
                    extracted_at: now.clone(),
                },
            ],
            holdings: vec![Holding {
                id: 0,
                position: 1,
                name: "HDFC Bank".to_string(),
                allocation_pct: Some(9.8),
                source_url: url.to_string(),
            }],
            peers: vec![PeerFund {
                id: 0,
                position: 1,
                name: "Other Flexi Cap".to_string(),
                return_1y: Some(14.2),
                source_url: url.to_string(),
            }],
            faqs: vec![FaqEntry {
                id: 0,
                fund_id: 0,
                question: "What is the minimum SIP?".to_string(),
                answer: "₹500".to_string(),
                source_url: url.to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = test_store().await;
        let record = sample_record("Parag Parikh Flexi Cap", "https://x/1");

        let fund_id = store.upsert(&record).await.unwrap();
        let stored = store.get(fund_id).await.unwrap().unwrap();

        assert_eq!(stored.name, record.name);
        assert_eq!(stored.source_url, record.source_url);
        assert_eq!(stored.facts.len(), 2);
        assert_eq!(stored.fact("expense_ratio").unwrap().value, "0.52%");
        assert_eq!(stored.fact("min_sip_amount").unwrap().value, "₹500");
        assert_eq!(stored.holdings.len(), 1);
        assert_eq!(stored.peers.len(), 1);
        assert_eq!(stored.faqs.len(), 1);
        assert_eq!(stored.faqs[0].answer, "₹500");
        assert!(stored.faqs[0].id > 0);
    }

    #[tokio::test]
    async fn reupsert_replaces_instead_of_merging() {
        let store = test_store().await;
        let first = sample_record("Quant Small Cap", "https://x/1");
        let fund_id = store.upsert(&first).await.unwrap();

        let mut second = sample_record("Quant Small Cap", "https://x/1-v2");
        second.facts.retain(|f| f.name == "expense_ratio");
        second.faqs.clear();
        let second_id = store.upsert(&second).await.unwrap();

        assert_eq!(fund_id, second_id);
        let stored = store.get(fund_id).await.unwrap().unwrap();
        assert_eq!(stored.source_url, "https://x/1-v2");
        assert_eq!(stored.facts.len(), 1);
        assert!(stored.fact("min_sip_amount").is_none());
        assert!(stored.faqs.is_empty());
    }

    #[tokio::test]
    async fn list_orders_by_id_for_stable_pagination() {
        let store = test_store().await;
        for i in 0..5 {
            store
                .upsert(&sample_record(&format!("Fund {}", i), "https://x/list"))
                .await
                .unwrap();
        }

        let first_page = store.list(2, 0).await.unwrap();
        let second_page = store.list(2, 2).await.unwrap();

        assert_eq!(first_page.len(), 2);
        assert_eq!(second_page.len(), 2);
        assert!(first_page[0].id < first_page[1].id);
        assert!(first_page[1].id < second_page[0].id);
    }

    #[tokio::test]
    async fn duplicate_questions_keep_first_entry() {
        let store = test_store().await;
        let mut record = sample_record("HDFC Mid Cap", "https://x/1");
        record.faqs.push(FaqEntry {
            id: 0,
            fund_id: 0,
            question: "what is the minimum sip ?".to_string(),
            answer: "different answer".to_string(),
            source_url: "https://x/1".to_string(),
        });

        let fund_id = store.upsert(&record).await.unwrap();
        let stored = store.get(fund_id).await.unwrap().unwrap();

        assert_eq!(stored.faqs.len(), 1);
        assert_eq!(stored.faqs[0].answer, "₹500");
    }

    #[tokio::test]
    async fn delete_cascades_children() {
        let store = test_store().await;
        let fund_id = store
            .upsert(&sample_record("Axis Bluechip", "https://x/1"))
            .await
            .unwrap();

        assert!(store.delete(fund_id).await.unwrap());
        assert!(store.get(fund_id).await.unwrap().is_none());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.funds, 0);
        assert_eq!(stats.facts, 0);
        assert_eq!(stats.faqs, 0);
    }

    #[tokio::test]
    async fn rejects_record_without_attribution() {
        let store = test_store().await;
        let mut record = sample_record("SBI Contra", "https://x/1");
        record.facts[0].source_url = String::new();

        assert!(matches!(
            store.upsert(&record).await,
            Err(StoreError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn keyword_faq_search_ranks_by_term_overlap() {
        let store = test_store().await;
        store
            .upsert(&sample_record("Parag Parikh Flexi Cap", "https://x/1"))
            .await
            .unwrap();

        let hits = store
            .search_faqs("What is the minimum SIP amount?", 5)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].faq.answer, "₹500");
        assert_eq!(hits[0].fund_name, "Parag Parikh Flexi Cap");
        assert!(hits[0].score > 0.5);

        let none = store.search_faqs("zebra astronomy", 5).await.unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn normalize_question_collapses_case_and_whitespace() {
        assert_eq!(
            normalize_question("  What is   the Minimum SIP? "),
            "what is the minimum sip"
        );
        assert_eq!(normalize_question("Lock-in period."), "lock-in period");
    }

    #[tokio::test]
    async fn get_by_name_is_case_insensitive() {
        let store = test_store().await;
        store
            .upsert(&sample_record("Mirae Asset Large Cap", "https://x/1"))
            .await
            .unwrap();

        let found = store.get_by_name("mirae asset large cap").await.unwrap();
        assert!(found.is_some());
        assert!(store.get_by_name("No Such Fund").await.unwrap().is_none());
    }
}
