//! picsearch-server: HTTP service for multimodal image search.
//!
//! Orchestrates an external embedding service and a Milvus vector store.
//! Index strategies, schema and vector codecs live in `picsearch-core`.

/// REST API layer: Axum router, HTTP handlers, models, metrics.
pub mod api;
/// Per-collection upload directories.
pub mod assets;
/// Client for the external embedding service.
pub mod embedding;
/// Collection lifecycle, ingestion and query pipelines.
pub mod pipeline;
/// Vector store abstraction and the Milvus REST client.
pub mod store;
