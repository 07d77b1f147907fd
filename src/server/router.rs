use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{admin, ask, funds, health, search};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware
/// - Health check endpoint
/// - Fund endpoints (list, get, lookup by name, compare)
/// - Retrieval endpoints (search, ask)
/// - Admin endpoints (ingest, reindex, snapshot, stats, config)
///
/// # Arguments
///
/// * `state` - Shared application state
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/funds", get(funds::list_funds))
        .route("/api/funds/compare", post(funds::compare_funds))
        .route("/api/funds/by-name/:name", get(funds::get_fund_by_name))
        .route("/api/funds/:fund_id", get(funds::get_fund))
        .route("/api/search", get(search::search))
        .route("/api/ask", post(ask::ask))
        .route("/api/ingest", post(admin::ingest))
        .route("/api/reindex", post(admin::reindex))
        .route("/api/snapshot", post(admin::snapshot))
        .route("/api/stats", get(admin::stats))
        .route("/api/config", get(admin::config))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(&state.settings.server.cors_allowed_origins)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    let allow_origin = if allowed_origins.is_empty() {
        AllowOrigin::list(
            default_local_origins()
                .into_iter()
                .filter_map(|origin| HeaderValue::from_str(&origin).ok())
                .collect::<Vec<_>>(),
        )
    } else {
        AllowOrigin::list(allowed_origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}
