//! End-to-end ingest: fetch, extract, store, index.
//!
//! Each URL runs as its own task, bounded by a semaphore; one task owns its
//! page from fetch through indexing, so writes for a given fund never race.
//! Failures are collected per page and never abort the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::rag::Indexer;
use crate::scrape::{extract_fund, Fetcher};
use crate::store::FundStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStage {
    Fetch,
    Extract,
    Store,
    Index,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub url: String,
    pub stage: IngestStage,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub funds_stored: usize,
    pub passages_indexed: usize,
    pub failures: Vec<IngestFailure>,
}

enum PageOutcome {
    Ingested {
        url: String,
        fund: String,
        passages: usize,
        misses: Vec<&'static str>,
    },
    Failed(IngestFailure),
}

#[derive(Clone)]
pub struct IngestPipeline {
    fetcher: Arc<dyn Fetcher>,
    store: FundStore,
    indexer: Indexer,
    concurrency: usize,
}

impl IngestPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: FundStore,
        indexer: Indexer,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            store,
            indexer,
            concurrency: concurrency.max(1),
        }
    }

    /// Ingests the given pages, duplicates removed, and returns a report of
    /// what landed and what failed.
    pub async fn run(&self, urls: &[String]) -> IngestReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let clock = Instant::now();

        let mut seen = HashSet::new();
        let unique: Vec<String> = urls
            .iter()
            .filter(|url| seen.insert(url.as_str()))
            .cloned()
            .collect();

        info!(run_id, pages = unique.len(), "ingest run starting");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(unique.len());
        for url in unique {
            let pipeline = self.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return PageOutcome::Failed(IngestFailure {
                            url,
                            stage: IngestStage::Fetch,
                            message: "ingest semaphore closed".to_string(),
                        })
                    }
                };
                pipeline.ingest_page(url).await
            }));
        }

        let mut report = IngestReport {
            run_id: run_id.clone(),
            started_at,
            duration_ms: 0,
            pages_fetched: 0,
            pages_failed: 0,
            funds_stored: 0,
            passages_indexed: 0,
            failures: Vec::new(),
        };

        for joined in join_all(handles).await {
            match joined {
                Ok(PageOutcome::Ingested {
                    url,
                    fund,
                    passages,
                    misses,
                }) => {
                    report.pages_fetched += 1;
                    report.funds_stored += 1;
                    report.passages_indexed += passages;
                    if !misses.is_empty() {
                        info!(url, fund = %fund, missing = ?misses, "page ingested with missing fields");
                    }
                }
                Ok(PageOutcome::Failed(failure)) => {
                    warn!(
                        url = %failure.url,
                        stage = ?failure.stage,
                        error = %failure.message,
                        "page ingest failed"
                    );
                    report.pages_failed += 1;
                    report.failures.push(failure);
                }
                Err(join_err) => {
                    warn!(error = %join_err, "ingest task panicked");
                    report.pages_failed += 1;
                    report.failures.push(IngestFailure {
                        url: String::new(),
                        stage: IngestStage::Store,
                        message: join_err.to_string(),
                    });
                }
            }
        }

        report.duration_ms = clock.elapsed().as_millis() as u64;
        info!(
            run_id,
            fetched = report.pages_fetched,
            failed = report.pages_failed,
            passages = report.passages_indexed,
            duration_ms = report.duration_ms,
            "ingest run finished"
        );
        report
    }

    async fn ingest_page(&self, url: String) -> PageOutcome {
        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(err) => {
                return PageOutcome::Failed(IngestFailure {
                    url,
                    stage: IngestStage::Fetch,
                    message: err.to_string(),
                })
            }
        };

        let outcome = match extract_fund(&page.url, &page.html) {
            Ok(outcome) => outcome,
            Err(err) => {
                return PageOutcome::Failed(IngestFailure {
                    url,
                    stage: IngestStage::Extract,
                    message: err.to_string(),
                })
            }
        };

        let fund_id = match self.store.upsert(&outcome.record).await {
            Ok(fund_id) => fund_id,
            Err(err) => {
                return PageOutcome::Failed(IngestFailure {
                    url,
                    stage: IngestStage::Store,
                    message: err.to_string(),
                })
            }
        };

        let stored = match self.store.get(fund_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return PageOutcome::Failed(IngestFailure {
                    url,
                    stage: IngestStage::Store,
                    message: format!("fund {} vanished after upsert", fund_id),
                })
            }
            Err(err) => {
                return PageOutcome::Failed(IngestFailure {
                    url,
                    stage: IngestStage::Store,
                    message: err.to_string(),
                })
            }
        };

        match self.indexer.index_fund(&stored).await {
            Ok(summary) => PageOutcome::Ingested {
                url,
                fund: stored.name,
                passages: summary.indexed,
                misses: outcome.misses,
            },
            Err(err) => PageOutcome::Failed(IngestFailure {
                url,
                stage: IngestStage::Index,
                message: err.to_string(),
            }),
        }
    }
}
