//! Vector store client interface.
//!
//! Handlers open one [`VectorStore`] session per request through a
//! [`StoreConnector`]; the session is released when it is dropped, on every
//! exit path. Sessions are never shared between requests.

/// Milvus RESTful v2 implementation.
pub mod milvus;

use async_trait::async_trait;
use picsearch_core::index::{IndexBuildSpec, IndexSearchSpec, MetricType};
use picsearch_core::schema::CollectionSchema;
use picsearch_core::{Record, Result, SearchHit};

pub use milvus::{MilvusConnector, MilvusStore};

/// Address and credentials of a vector store, as supplied by the caller.
#[derive(Debug, Clone)]
pub struct StoreParams {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl StoreParams {
    /// `host:port` form used in logs.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

/// Index that was actually built on a collection's vector field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescription {
    pub index_type: String,
    pub metric_type: String,
}

/// Store-side view of an existing collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDescription {
    pub name: String,
    pub dimension: usize,
    pub index: Option<IndexDescription>,
}

/// One similarity search against a single query vector.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub collection: &'a str,
    pub vector: &'a [f32],
    pub metric: MetricType,
    pub top_k: usize,
    pub params: IndexSearchSpec,
    pub output_fields: &'a [&'a str],
}

/// Operations the pipelines need from a vector database session.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Whether a collection with this name exists.
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Creates a collection with the given schema.
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()>;

    /// Reads back the collection's dimensionality and built index.
    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription>;

    /// Drops a collection and all its records.
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Builds an index on `field`.
    async fn create_index(&self, collection: &str, field: &str, spec: &IndexBuildSpec)
        -> Result<()>;

    /// Loads the collection into memory so it can be searched.
    async fn load_collection(&self, name: &str) -> Result<()>;

    /// Inserts all rows in one batch and returns the inserted count.
    async fn insert(&self, collection: &str, rows: &[Record]) -> Result<usize>;

    /// Runs one similarity search. Hits come back in the store's ranking order.
    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<SearchHit>>;
}

/// Opens per-request [`VectorStore`] sessions.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Connects to the store described by `params`, failing fast if it is unreachable.
    async fn connect(&self, params: &StoreParams) -> Result<Box<dyn VectorStore>>;
}
