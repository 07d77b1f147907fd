//! Retrieval-augmented answering: passage indexing, vector retrieval and
//! answer composition.

pub mod composer;
pub mod indexer;
pub mod retriever;

pub use composer::{AnswerComposer, AnswerResponse, ComposerConfig, FundSource, RETRIEVAL_SOURCE};
pub use indexer::{IndexSummary, Indexer, IndexerError, ReindexReport};
pub use retriever::{RetrievalError, RetrievalResult, Retriever};
