use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

const MAX_RESULTS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub k: Option<usize>,
    pub min_score: Option<f32>,
}

/// Semantic search over indexed fund passages.
///
/// A query that matches nothing returns an empty result list, not an
/// error. Retrieval failures are logged and degrade to the same empty
/// list so the endpoint stays usable while the index is cold.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let k = query
        .k
        .unwrap_or(state.settings.retrieval.top_k)
        .clamp(1, MAX_RESULTS);
    let min_score = query.min_score.unwrap_or(state.settings.retrieval.min_score);

    let results = match state.retriever.search(&query.q, k, min_score).await {
        Ok(results) => results,
        Err(err) if err.is_unconfigured() => {
            tracing::debug!("Search with no embedder configured: {}", err);
            Vec::new()
        }
        Err(err) => {
            tracing::warn!("Search failed for query '{}': {}", query.q, err);
            Vec::new()
        }
    };

    Ok(Json(json!({
        "query": query.q,
        "count": results.len(),
        "results": results,
    })))
}
