use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default = "default_use_context")]
    pub use_context: bool,
}

fn default_use_context() -> bool {
    true
}

/// Answers a question about the scraped funds.
///
/// The composer degrades internally (generation failures fall back to a
/// retrieval-only answer), so this handler never returns an error body.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> impl IntoResponse {
    let response = state
        .composer
        .answer(&request.question, request.use_context)
        .await;
    Json(response)
}
