//! Global configuration constants for picsearch.
//!
//! Index tuning parameters, schema limits, and server defaults are defined here.
//! These are compile-time constants; runtime configuration is handled via CLI
//! arguments in the server's `main.rs`.

/// Name of the auto-id primary key field.
pub const ID_FIELD: &str = "id";

/// Name of the float vector field that carries the embedding.
pub const VECTOR_FIELD: &str = "vec";

/// Name of the VarChar field holding the asset URL.
pub const URL_FIELD: &str = "url";

/// Maximum length of the `url` field in characters.
pub const URL_MAX_LEN: usize = 500;

/// Description attached to every collection created by the service.
pub const COLLECTION_DESCRIPTION: &str = "milvus_image_search";

/// Maximum vector dimensionality accepted by the store.
pub const MAX_DIMENSION: i64 = 32_768;

/// Maximum length of a collection name in characters.
pub const MAX_COLLECTION_NAME_LEN: usize = 255;

/// Maximum number of results (`top_k`) per search request.
pub const MAX_TOP_K: i64 = 16_384;

/// HNSW: maximum number of outgoing links per node.
pub const HNSW_M: u32 = 12;

/// HNSW: size of the candidate list during graph construction.
pub const HNSW_EF_CONSTRUCTION: u32 = 50;

/// HNSW: size of the candidate list during search.
pub const HNSW_EF_SEARCH: u32 = 10;

/// IVF_FLAT / IVF_SQ8 / SCANN: number of cluster units built.
pub const IVF_NLIST: u32 = 12;

/// IVF_FLAT / IVF_SQ8 / SCANN: number of clusters probed at search time.
pub const IVF_NPROBE: u32 = 10;

/// SCANN: keep raw vectors next to the quantized codes for refinement.
pub const SCANN_WITH_RAW_DATA: bool = true;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8081;

/// Default root directory for uploaded collection assets.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default build directory of the browser client.
pub const DEFAULT_STATIC_DIR: &str = "dist";

/// URL prefix under which the upload directory is served.
pub const UPLOAD_ROUTE: &str = "/uploads";

/// Connect timeout for vector store sessions, in seconds.
pub const STORE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default per-call timeout for vector store requests, in seconds.
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

/// Default per-call timeout for embedding requests, in seconds.
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 60;

/// Default number of embedding calls kept in flight during ingestion.
pub const DEFAULT_INGEST_CONCURRENCY: usize = 4;

/// Per-request timeout in seconds. Sized for ingestion of a whole directory.
pub const REQUEST_TIMEOUT_SECS: u64 = 600;

/// Maximum HTTP request body size in bytes (64 MB, for image uploads).
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Maximum number of concurrent in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
