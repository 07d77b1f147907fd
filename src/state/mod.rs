use std::sync::Arc;

use tracing::{info, warn};

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::embed::{Embedder, GeminiEmbedder, HashingEmbedder, UnconfiguredEmbedder};
use crate::index::{SqliteVectorIndex, VectorIndex};
use crate::ingest::IngestPipeline;
use crate::llm::{GeminiCompleter, TextCompleter};
use crate::rag::{AnswerComposer, ComposerConfig, Indexer, Retriever};
use crate::scrape::PageFetcher;
use crate::store::FundStore;

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes and background tasks.
///
/// Contains:
/// - Paths and the resolved configuration snapshot
/// - The fund record store and the vector index
/// - Retrieval, indexing and answer composition services
/// - The ingest pipeline
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub store: FundStore,
    pub index: Arc<dyn VectorIndex>,
    pub retriever: Retriever,
    pub indexer: Indexer,
    pub composer: Arc<AnswerComposer>,
    pub pipeline: IngestPipeline,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Setting up paths and loading configuration
    /// 2. Opening the record store and the vector index
    /// 3. Selecting embedding and generation backends from the config
    /// 4. Wiring the retrieval, composition and ingest services
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config
            .settings()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let store = FundStore::new(paths.db_path.clone())
            .await
            .map_err(|e| InitializationError::Store(e.into()))?;

        let index: Arc<dyn VectorIndex> = Arc::new(
            SqliteVectorIndex::new(paths.vectors_path.clone())
                .await
                .map_err(|e| InitializationError::Index(e.into()))?,
        );

        let embedder = build_embedder(&settings).map_err(InitializationError::Embedder)?;
        let completer = build_completer(&settings).map_err(InitializationError::Generation)?;

        let retriever = Retriever::new(index.clone(), embedder.clone());
        let indexer = Indexer::new(index.clone(), embedder.clone());
        let composer = Arc::new(AnswerComposer::new(
            retriever.clone(),
            store.clone(),
            completer.clone(),
            settings.generation.max_inflight,
            ComposerConfig {
                top_k: settings.retrieval.top_k,
                min_score: settings.retrieval.min_score,
                max_prompt_chars: settings.generation.max_prompt_chars,
                generation_timeout: settings.generation.timeout(),
            },
        ));

        let fetcher = Arc::new(
            PageFetcher::new(&settings.scrape).map_err(InitializationError::Fetcher)?,
        );
        let pipeline = IngestPipeline::new(
            fetcher,
            store.clone(),
            indexer.clone(),
            settings.scrape.concurrency,
        );

        info!(
            embedder = embedder.id(),
            generation = completer.as_ref().map(|c| c.id()).unwrap_or("disabled"),
            data_dir = %paths.user_data_dir.display(),
            "application state initialized"
        );

        Ok(Arc::new(AppState {
            paths,
            settings,
            store,
            index,
            retriever,
            indexer,
            composer,
            pipeline,
        }))
    }
}

fn build_embedder(settings: &Settings) -> anyhow::Result<Arc<dyn Embedder>> {
    match settings.embedding.backend.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(settings.embedding.dimension))),
        "gemini" => match settings.gemini.resolved_api_key() {
            Some(key) => Ok(Arc::new(GeminiEmbedder::new(
                &key,
                &settings.gemini.base_url,
                &settings.embedding.model,
                settings.embedding.timeout(),
            )?)),
            None => {
                warn!("no Gemini API key configured, semantic search is disabled");
                Ok(Arc::new(UnconfiguredEmbedder))
            }
        },
        other => anyhow::bail!("unknown embedding backend '{}'", other),
    }
}

fn build_completer(settings: &Settings) -> anyhow::Result<Option<Arc<dyn TextCompleter>>> {
    match settings.gemini.resolved_api_key() {
        Some(key) => Ok(Some(Arc::new(GeminiCompleter::new(
            &key,
            &settings.gemini.base_url,
            &settings.generation.model,
            settings.generation.temperature,
            settings.generation.timeout(),
        )?))),
        None => {
            info!("no Gemini API key configured, answers will be retrieval-only");
            Ok(None)
        }
    }
}
