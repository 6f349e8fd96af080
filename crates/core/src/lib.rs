//! # picsearch-core
//!
//! Store-agnostic building blocks for multimodal image search: the index
//! strategy that maps an index family to build and search parameters, the
//! codec for the embedding service's textual vectors, the fixed collection
//! schema, and the shared error taxonomy.
//!
//! This crate performs no I/O and has no async dependencies.

/// Global configuration constants: field names, limits, index tuning, and server defaults.
pub mod config;
/// Error taxonomy and `Result` alias.
pub mod error;
/// Index families, metrics, and their build/search parameters.
pub mod index;
/// Records, raw store hits, and ranked search results.
pub mod record;
/// The fixed three-field collection schema and name validation.
pub mod schema;
/// Codec for the embedding service's bracketed float-list format.
pub mod vector;

pub use error::{Result, SearchError};
pub use index::{IndexBuildSpec, IndexFamily, IndexSearchSpec, MetricType};
pub use record::{Record, SearchHit, SearchResult};
