use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use fundfaq_backend::core;
use fundfaq_backend::core::config::AppPaths;
use fundfaq_backend::server;
use fundfaq_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    core::logging::init(&paths);

    let state = AppState::initialize().await?;

    let mode = env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    match mode.as_str() {
        "serve" => serve(state).await,
        "ingest" => ingest(state).await,
        other => anyhow::bail!("Unknown mode '{}'; expected 'serve' or 'ingest'", other),
    }
}

async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8000);
    let bind_addr = format!("0.0.0.0:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn ingest(state: Arc<AppState>) -> anyhow::Result<()> {
    let urls = state.settings.scrape.target_urls.clone();
    if urls.is_empty() {
        anyhow::bail!("No target URLs configured; set scrape.target_urls in config.yml");
    }

    let report = state.pipeline.run(&urls).await;
    tracing::info!(
        "Ingest run {} finished: {} fetched, {} failed, {} funds stored, {} passages indexed",
        report.run_id,
        report.pages_fetched,
        report.pages_failed,
        report.funds_stored,
        report.passages_indexed
    );
    for failure in &report.failures {
        tracing::warn!("{} failed at {:?}: {}", failure.url, failure.stage, failure.message);
    }

    Ok(())
}
