pub mod core;
pub mod embed;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod scrape;
pub mod server;
pub mod state;
pub mod store;
