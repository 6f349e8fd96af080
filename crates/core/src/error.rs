//! Error taxonomy shared by every picsearch component.
//!
//! All failures are represented by [`SearchError`]. Collaborator failures keep
//! the underlying message verbatim so the HTTP layer can report it unchanged.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The main error type for picsearch operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Malformed or missing request parameters.
    #[error("invalid request: {0}")]
    Config(String),

    /// A collaborator (embedding service or vector store) could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Index family identifier is not one of the supported families.
    #[error("unsupported index family '{0}'")]
    UnsupportedIndexFamily(String),

    /// Metric identifier is not one of the supported metrics.
    #[error("unsupported metric type '{0}'")]
    UnsupportedMetric(String),

    /// Collection schema constraint violated.
    #[error("schema error: {0}")]
    Schema(String),

    /// The embedding service answered with an error status.
    #[error("embedding service error: {0}")]
    Embedding(String),

    /// The embedding service response could not be decoded into a vector.
    #[error("failed to decode embedding: {0}")]
    EmbeddingDecode(String),

    /// A vector does not match the collection's dimensionality.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The asset directory or file does not exist.
    #[error("asset path not found: {}", .0.display())]
    AssetPathNotFound(PathBuf),

    /// The vector store rejected or failed an operation.
    #[error("store operation failed: {0}")]
    StoreOperation(String),

    /// Requested result count is out of range.
    #[error("top_k must be 1-{max}, got {0}", max = crate::config::MAX_TOP_K)]
    InvalidTopK(i64),

    /// The requested index family or metric differs from the built index.
    #[error("collection index is {built}, but the query requested {requested}")]
    IndexMismatch { built: String, requested: String },

    /// Local file system failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for picsearch operations.
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Short machine-readable label for the error class, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Config(_) => "config",
            SearchError::Connection(_) => "connection",
            SearchError::UnsupportedIndexFamily(_) => "unsupported_index_family",
            SearchError::UnsupportedMetric(_) => "unsupported_metric",
            SearchError::Schema(_) => "schema",
            SearchError::Embedding(_) => "embedding",
            SearchError::EmbeddingDecode(_) => "embedding_decode",
            SearchError::DimensionMismatch { .. } => "dimension_mismatch",
            SearchError::AssetPathNotFound(_) => "asset_path_not_found",
            SearchError::StoreOperation(_) => "store_operation",
            SearchError::InvalidTopK(_) => "invalid_top_k",
            SearchError::IndexMismatch { .. } => "index_mismatch",
            SearchError::Io(_) => "io",
        }
    }

    /// Whether the failure originated in an external collaborator.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            SearchError::Connection(_)
                | SearchError::Embedding(_)
                | SearchError::EmbeddingDecode(_)
                | SearchError::StoreOperation(_)
        )
    }
}
