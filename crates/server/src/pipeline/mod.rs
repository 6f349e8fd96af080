//! Orchestration pipelines: collection lifecycle, ingestion, and query.
//!
//! Pipelines are written against the [`VectorStore`](crate::store::VectorStore)
//! and [`Embedder`](crate::embedding::Embedder) traits and hold no state of
//! their own; handlers supply a per-request store session.

/// Collection create/delete.
pub mod lifecycle;
/// Embedding and batched insertion of a collection's assets.
pub mod ingest;
/// Text and image similarity queries.
pub mod query;

pub use ingest::{ingest_collection, IngestReport};
pub use lifecycle::{create_collection, delete_collection, CollectionSpec};
pub use query::{search_by_image, search_by_text, SearchQuery};
