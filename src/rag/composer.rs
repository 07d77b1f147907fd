//! Answer composition over retrieved passages.
//!
//! Every answer is grounded in retrieval. The generative model is an
//! optional refinement layered on top: it gets exactly one completion call
//! per question, bounded by a prompt budget, a timeout and an in-flight
//! cap, and any failure degrades to the retrieval-only answer instead of
//! surfacing to the caller.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::index::PassageKind;
use crate::llm::TextCompleter;
use crate::store::FundStore;

use super::retriever::{RetrievalResult, Retriever};

/// Source label for answers assembled without the generative model.
pub const RETRIEVAL_SOURCE: &str = "retrieval";

const NO_RESULTS_ANSWER: &str =
    "I couldn't find anything relevant in the indexed fund pages for that question.";

/// Passages shown verbatim in a retrieval-only answer.
const FALLBACK_PASSAGES: usize = 3;

/// Minimum room left in the prompt budget for a truncated context block to
/// still be worth sending.
const MIN_BLOCK_CHARS: usize = 24;

#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub top_k: usize,
    pub min_score: f32,
    pub max_prompt_chars: usize,
    pub generation_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FundSource {
    pub fund_name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub fund_sources: Vec<FundSource>,
    pub source: String,
}

pub struct AnswerComposer {
    retriever: Retriever,
    store: FundStore,
    completer: Option<Arc<dyn TextCompleter>>,
    gate: Arc<Semaphore>,
    config: ComposerConfig,
}

impl AnswerComposer {
    pub fn new(
        retriever: Retriever,
        store: FundStore,
        completer: Option<Arc<dyn TextCompleter>>,
        max_inflight: usize,
        config: ComposerConfig,
    ) -> Self {
        Self {
            retriever,
            store,
            completer,
            gate: Arc::new(Semaphore::new(max_inflight.max(1))),
            config,
        }
    }

    /// Answers a question from indexed fund content.
    ///
    /// With `use_context` false, or with no model configured, the answer is
    /// the retrieved passages themselves under the "retrieval" source
    /// label; the generative backend is never contacted.
    pub async fn answer(&self, query: &str, use_context: bool) -> AnswerResponse {
        let query = query.trim();
        if query.is_empty() {
            return no_results();
        }

        let passages = self.retrieve(query).await;
        if passages.is_empty() {
            return no_results();
        }

        if !use_context {
            return retrieval_answer(&passages);
        }
        let Some(completer) = &self.completer else {
            return retrieval_answer(&passages);
        };

        let (prompt, included) = self.build_prompt(query, &passages);
        if included.is_empty() {
            return retrieval_answer(&passages);
        }
        let sources = fund_sources(&included);

        let permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(_) => return retrieval_answer(&passages),
        };
        let outcome = timeout(self.config.generation_timeout, completer.complete(&prompt)).await;
        drop(permit);

        match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => AnswerResponse {
                answer: text.trim().to_string(),
                fund_sources: sources,
                source: completer.id().to_string(),
            },
            Ok(Ok(_)) => {
                warn!(query, "model returned an empty completion, using retrieval answer");
                retrieval_answer(&passages)
            }
            Ok(Err(err)) => {
                warn!(query, error = %err, "generation failed, using retrieval answer");
                retrieval_answer(&passages)
            }
            Err(_) => {
                warn!(
                    query,
                    timeout_ms = self.config.generation_timeout.as_millis() as u64,
                    "generation timed out, using retrieval answer"
                );
                retrieval_answer(&passages)
            }
        }
    }

    /// Vector retrieval, degrading to keyword search over stored FAQs when
    /// no embedding backend is usable. An empty vector result is final: the
    /// score gate decided, so there is nothing to degrade to.
    async fn retrieve(&self, query: &str) -> Vec<RetrievalResult> {
        match self
            .retriever
            .search(query, self.config.top_k, self.config.min_score)
            .await
        {
            Ok(results) => results,
            Err(err) => {
                if err.is_unconfigured() {
                    debug!(query, "no embedder configured, using keyword FAQ search");
                } else {
                    warn!(query, error = %err, "retrieval failed, using keyword FAQ search");
                }
                self.keyword_fallback(query).await
            }
        }
    }

    async fn keyword_fallback(&self, query: &str) -> Vec<RetrievalResult> {
        match self.store.search_faqs(query, self.config.top_k).await {
            Ok(hits) => hits
                .into_iter()
                .map(|hit| RetrievalResult {
                    entity_id: hit.faq.id,
                    kind: PassageKind::Faq,
                    fund_id: hit.faq.fund_id,
                    fund_name: hit.fund_name,
                    source_url: hit.faq.source_url.clone(),
                    text: format!("Q: {}\nA: {}", hit.faq.question, hit.faq.answer),
                    score: hit.score as f32,
                })
                .collect(),
            Err(err) => {
                warn!(query, error = %err, "keyword FAQ search failed");
                Vec::new()
            }
        }
    }

    /// Builds the completion prompt. The question is always included whole;
    /// context passages fill the remaining budget in rank order, and the
    /// last one is cut mid-text rather than pushing the prompt over.
    fn build_prompt(
        &self,
        query: &str,
        passages: &[RetrievalResult],
    ) -> (String, Vec<RetrievalResult>) {
        let preamble = "You answer questions about Indian mutual funds using only the \
                        context below.\nIf the context does not contain the answer, say so \
                        plainly.\n\nContext:\n";
        let tail = format!("\nQuestion: {}\nAnswer:", query);
        let budget = self
            .config
            .max_prompt_chars
            .saturating_sub(chars(preamble) + chars(&tail));

        let mut blocks = String::new();
        let mut included = Vec::new();
        let mut used = 0usize;
        for (i, passage) in passages.iter().enumerate() {
            let block = format!("[{}] {}\n", i + 1, passage.text);
            let block_chars = chars(&block);
            if used + block_chars <= budget {
                blocks.push_str(&block);
                used += block_chars;
                included.push(passage.clone());
                continue;
            }

            let remaining = budget.saturating_sub(used);
            if remaining >= MIN_BLOCK_CHARS {
                let truncated: String = block.chars().take(remaining - 1).collect();
                blocks.push_str(&truncated);
                blocks.push('\n');
                included.push(passage.clone());
            }
            break;
        }

        (format!("{}{}{}", preamble, blocks, tail), included)
    }
}

/// One source entry per fund, in the order funds first appear.
fn fund_sources(passages: &[RetrievalResult]) -> Vec<FundSource> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for passage in passages {
        if seen.insert(passage.fund_id) {
            sources.push(FundSource {
                fund_name: passage.fund_name.clone(),
                url: passage.source_url.clone(),
            });
        }
    }
    sources
}

fn retrieval_answer(passages: &[RetrievalResult]) -> AnswerResponse {
    let shown: Vec<RetrievalResult> = passages.iter().take(FALLBACK_PASSAGES).cloned().collect();
    let answer = shown
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    AnswerResponse {
        answer,
        fund_sources: fund_sources(&shown),
        source: RETRIEVAL_SOURCE.to_string(),
    }
}

fn no_results() -> AnswerResponse {
    AnswerResponse {
        answer: NO_RESULTS_ANSWER.to_string(),
        fund_sources: Vec::new(),
        source: RETRIEVAL_SOURCE.to_string(),
    }
}

fn chars(s: &str) -> usize {
    s.chars().count()
}
