//! Builds index passages from stored fund records.
//!
//! Facts become one-line passages carrying the fund name so a match is
//! self-describing; FAQs are indexed as question/answer pairs. Passage keys
//! are the underlying row ids, which makes re-indexing idempotent.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embed::Embedder;
use crate::index::{IndexError, PassageKind, PassageRecord, VectorIndex};
use crate::store::{FundFact, FundRecord, FundStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct IndexSummary {
    pub indexed: usize,
    pub skipped: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ReindexReport {
    pub funds: usize,
    pub passages: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct Indexer {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Indexer {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    /// Re-indexes one fund. Existing passages for the fund are dropped
    /// first so a shrunken re-scrape cannot leave stale entries.
    ///
    /// Embedding failures skip the affected passage; an unconfigured
    /// embedder skips the whole fund without complaint. Only index storage
    /// failures abort.
    pub async fn index_fund(&self, record: &FundRecord) -> Result<IndexSummary, IndexerError> {
        let passages = build_passages(record);
        if passages.is_empty() {
            return Ok(IndexSummary::default());
        }

        self.index.remove_fund(record.id).await?;

        let mut summary = IndexSummary::default();
        for (position, passage) in passages.iter().enumerate() {
            match self.embedder.embed_document(&passage.content).await {
                Ok(embedding) => {
                    self.index.upsert(passage, &embedding).await?;
                    summary.indexed += 1;
                }
                Err(err) if err.is_unconfigured() => {
                    debug!(fund = %record.name, "no embedder configured, skipping indexing");
                    summary.skipped += passages.len() - position;
                    break;
                }
                Err(err) => {
                    warn!(
                        fund = %record.name,
                        entity_id = passage.entity_id,
                        kind = passage.kind.as_str(),
                        error = %err,
                        "embedding failed, passage skipped"
                    );
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    pub async fn remove_fund(&self, fund_id: i64) -> Result<(), IndexerError> {
        self.index.remove_fund(fund_id).await?;
        Ok(())
    }

    /// Rebuilds passages for every stored fund. If the configured embedder
    /// differs from the one that produced the stored vectors, the index is
    /// cleared first; mixed-model vectors would make scores meaningless.
    pub async fn reindex_all(&self, store: &FundStore) -> Result<ReindexReport, IndexerError> {
        let current = self.embedder.id().to_string();
        match self.index.embedder_id().await? {
            Some(previous) if previous != current => {
                info!(%previous, %current, "embedder changed, clearing index");
                self.index.clear().await?;
            }
            None => {}
            Some(_) => {}
        }
        self.index.set_embedder_id(&current).await?;

        let mut report = ReindexReport::default();
        for fund_id in store.fund_ids().await? {
            let Some(record) = store.get(fund_id).await? else {
                continue;
            };
            let summary = self.index_fund(&record).await?;
            report.funds += 1;
            report.passages += summary.indexed;
            report.skipped += summary.skipped;
        }

        info!(
            funds = report.funds,
            passages = report.passages,
            skipped = report.skipped,
            "reindex finished"
        );
        Ok(report)
    }
}

fn build_passages(record: &FundRecord) -> Vec<PassageRecord> {
    let mut passages = Vec::with_capacity(record.facts.len() + record.faqs.len());

    for fact in &record.facts {
        passages.push(PassageRecord {
            entity_id: fact.id,
            kind: PassageKind::Fact,
            fund_id: record.id,
            fund_name: record.name.clone(),
            source_url: fact.source_url.clone(),
            content: fact_passage(&record.name, fact),
        });
    }

    for faq in &record.faqs {
        passages.push(PassageRecord {
            entity_id: faq.id,
            kind: PassageKind::Faq,
            fund_id: record.id,
            fund_name: record.name.clone(),
            source_url: faq.source_url.clone(),
            content: format!("Q: {}\nA: {}", faq.question, faq.answer),
        });
    }

    passages
}

fn fact_passage(fund_name: &str, fact: &FundFact) -> String {
    format!("{} - {}: {}", fund_name, fact_label(&fact.name), fact.value)
}

/// Display label for a fact key, e.g. `min_sip_amount` to "Minimum SIP
/// amount".
pub fn fact_label(name: &str) -> String {
    match name {
        "expense_ratio" => "Expense ratio".to_string(),
        "exit_load" => "Exit load".to_string(),
        "min_sip_amount" => "Minimum SIP amount".to_string(),
        "min_lumpsum" => "Minimum lumpsum".to_string(),
        "return_1y" => "1Y returns".to_string(),
        "return_3y" => "3Y returns".to_string(),
        "return_5y" => "5Y returns".to_string(),
        "fund_manager" => "Fund manager".to_string(),
        "benchmark" => "Benchmark".to_string(),
        "riskometer" => "Riskometer".to_string(),
        "lock_in" => "Lock-in period".to_string(),
        "nav" => "NAV".to_string(),
        "aum" => "AUM".to_string(),
        other => {
            let spaced = other.replace('_', " ");
            let mut chars = spaced.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => spaced,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{HashingEmbedder, UnconfiguredEmbedder};
    use crate::index::SqliteVectorIndex;
    use crate::store::{FaqEntry, FundRecord};

    fn record_with(fund_id: i64, name: &str) -> FundRecord {
        let now = chrono::Utc::now().to_rfc3339();
        FundRecord {
            id: fund_id,
            name: name.to_string(),
            source_url: "https://x/1".to_string(),
            scraped_at: now.clone(),
            facts: vec![
                FundFact {
                    id: 10,
                    name: "expense_ratio".to_string(),
                    value: "0.52%".to_string(),
                    source_url: "https://x/1".to_string(),
                    extracted_at: now.clone(),
                },
                FundFact {
                    id: 11,
                    name: "exit_load".to_string(),
                    value: "1% within 365 days".to_string(),
                    source_url: "https://x/1".to_string(),
                    extracted_at: now,
                },
            ],
            holdings: vec![],
            peers: vec![],
            faqs: vec![FaqEntry {
                id: 20,
                fund_id,
                question: "What is the minimum SIP?".to_string(),
                answer: "₹500".to_string(),
                source_url: "https://x/1".to_string(),
            }],
        }
    }

    async fn temp_index() -> Arc<SqliteVectorIndex> {
        let tmp =
            std::env::temp_dir().join(format!("fundfaq-indexer-test-{}.db", uuid::Uuid::new_v4()));
        Arc::new(SqliteVectorIndex::new(tmp).await.unwrap())
    }

    #[test]
    fn passages_carry_fund_name_and_row_ids() {
        let record = record_with(3, "Axis Bluechip");
        let passages = build_passages(&record);

        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0].entity_id, 10);
        assert_eq!(passages[0].kind, PassageKind::Fact);
        assert_eq!(passages[0].content, "Axis Bluechip - Expense ratio: 0.52%");
        assert_eq!(passages[2].entity_id, 20);
        assert_eq!(passages[2].kind, PassageKind::Faq);
        assert!(passages[2].content.starts_with("Q: What is the minimum SIP?"));
        assert!(passages.iter().all(|p| p.fund_id == 3));
    }

    #[tokio::test]
    async fn index_fund_is_idempotent() {
        let index = temp_index().await;
        let indexer = Indexer::new(index.clone(), Arc::new(HashingEmbedder::new(64)));
        let record = record_with(1, "Axis Bluechip");

        let first = indexer.index_fund(&record).await.unwrap();
        let second = indexer.index_fund(&record).await.unwrap();

        assert_eq!(first.indexed, 3);
        assert_eq!(second.indexed, 3);
        assert_eq!(index.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn reindexing_drops_passages_for_removed_facts() {
        let index = temp_index().await;
        let indexer = Indexer::new(index.clone(), Arc::new(HashingEmbedder::new(64)));

        let mut record = record_with(1, "Axis Bluechip");
        indexer.index_fund(&record).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 3);

        record.facts.truncate(1);
        record.faqs.clear();
        indexer.index_fund(&record).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unconfigured_embedder_skips_without_error() {
        let index = temp_index().await;
        let indexer = Indexer::new(index.clone(), Arc::new(UnconfiguredEmbedder));
        let record = record_with(1, "Axis Bluechip");

        let summary = indexer.index_fund(&record).await.unwrap();
        assert_eq!(summary.indexed, 0);
        assert_eq!(summary.skipped, 3);
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn embedder_change_forces_rebuild() {
        let tmp = std::env::temp_dir().join(format!(
            "fundfaq-indexer-model-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let db_path = tmp.join("funds.db");
        std::fs::create_dir_all(&tmp).unwrap();
        let store = FundStore::new(db_path).await.unwrap();
        store.upsert(&record_with(0, "Axis Bluechip")).await.unwrap();

        let index = temp_index().await;
        index.set_embedder_id("some-older-model").await.unwrap();

        let indexer = Indexer::new(index.clone(), Arc::new(HashingEmbedder::new(64)));
        let report = indexer.reindex_all(&store).await.unwrap();

        assert_eq!(report.funds, 1);
        assert_eq!(report.passages, 3);
        assert_eq!(
            index.embedder_id().await.unwrap().as_deref(),
            Some("hashing")
        );
    }

    #[test]
    fn unknown_fact_names_get_a_readable_label() {
        assert_eq!(fact_label("expense_ratio"), "Expense ratio");
        assert_eq!(fact_label("tracking_error"), "Tracking error");
    }
}
