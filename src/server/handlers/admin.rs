use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::config::ConfigService;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Scrapes the given fund pages (or the configured targets when the body
/// is omitted) and indexes whatever was stored.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    body: Option<Json<IngestRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let urls = body
        .map(|Json(request)| request.urls)
        .filter(|urls| !urls.is_empty())
        .unwrap_or_else(|| state.settings.scrape.target_urls.clone());

    if urls.is_empty() {
        return Err(ApiError::BadRequest(
            "No URLs to ingest; pass urls in the body or configure scrape.target_urls".to_string(),
        ));
    }

    let report = state.pipeline.run(&urls).await;
    Ok(Json(report))
}

/// Rebuilds every passage embedding from the stored fund records.
pub async fn reindex(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .indexer
        .reindex_all(&state.store)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(report))
}

/// Exports the stored fund records as JSON files under the snapshot directory.
pub async fn snapshot(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .store
        .export_snapshot(&state.paths.snapshot_dir)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(report))
}

/// Returns the merged configuration with secret values masked.
pub async fn config(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let redacted = ConfigService::new(state.paths.clone()).redacted_config()?;
    Ok(Json(redacted))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let store_stats = state.store.stats().await.map_err(ApiError::internal)?;
    let indexed_passages = state.index.count().await.map_err(ApiError::internal)?;
    let embedder = state.index.embedder_id().await.map_err(ApiError::internal)?;

    Ok(Json(json!({
        "funds": store_stats.funds,
        "facts": store_stats.facts,
        "faqs": store_stats.faqs,
        "indexed_passages": indexed_passages,
        "embedder": embedder,
    })))
}
