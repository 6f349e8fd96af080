//! Request and response data transfer objects for the REST API.
//!
//! Requests arrive as flat JSON objects. Each request type is parsed with a
//! [`FieldReader`] that checks every required key up front and reports all
//! missing or wrong-typed keys in one [`SearchError::Config`].

use picsearch_core::index::MetricType;
use picsearch_core::{SearchError, SearchResult};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::embedding::EmbeddingTarget;
use crate::store::StoreParams;

/// Collects typed values from a JSON object, accumulating problems.
pub struct FieldReader<'a> {
    map: &'a Map<String, Value>,
    problems: Vec<String>,
}

impl<'a> FieldReader<'a> {
    /// Starts reading `body`, which must be a JSON object.
    pub fn new(body: &'a Value) -> Result<Self, SearchError> {
        let map = body
            .as_object()
            .ok_or_else(|| SearchError::Config("request body must be a JSON object".into()))?;
        Ok(Self {
            map,
            problems: Vec::new(),
        })
    }

    /// A required string.
    pub fn string(&mut self, key: &str) -> String {
        match self.map.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                self.problems.push(format!("{key} (expected string)"));
                String::new()
            }
            None => {
                self.problems.push(format!("{key} (missing)"));
                String::new()
            }
        }
    }

    /// A required integer, given either as a JSON integer or a decimal string.
    pub fn integer(&mut self, key: &str) -> i64 {
        let parsed = match self.map.get(key) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
            None => {
                self.problems.push(format!("{key} (missing)"));
                return 0;
            }
        };
        parsed.unwrap_or_else(|| {
            self.problems.push(format!("{key} (expected integer)"));
            0
        })
    }

    /// A required metric identifier.
    pub fn metric(&mut self, key: &str) -> MetricType {
        let raw = self.string(key);
        if !matches!(self.map.get(key), Some(Value::String(_))) {
            return MetricType::L2;
        }
        raw.parse().unwrap_or_else(|_| {
            self.problems
                .push(format!("{key} (unsupported metric '{raw}', expected L2, IP or COSINE)"));
            MetricType::L2
        })
    }

    /// Vector store address and credentials.
    pub fn store_params(&mut self) -> StoreParams {
        let server = self.string("milvus_server");
        let port = self.integer("milvus_port");
        let port = match u16::try_from(port) {
            Ok(p) if p > 0 => p,
            _ => {
                if self.map.contains_key("milvus_port") && !self.has_problem("milvus_port") {
                    self.problems.push("milvus_port (must be 1-65535)".into());
                }
                0
            }
        };
        StoreParams {
            server,
            port,
            username: self.string("milvus_username"),
            password: self.string("milvus_pass"),
        }
    }

    /// Embedding service endpoint and API key.
    pub fn embedding_target(&mut self) -> EmbeddingTarget {
        EmbeddingTarget {
            endpoint: self.string("embed_server_url"),
            api_key: self.string("embed_server_apikey"),
        }
    }

    fn has_problem(&self, key: &str) -> bool {
        self.problems.iter().any(|p| p.starts_with(key))
    }

    /// Finishes reading: `Ok(value)` if every key was valid, otherwise one
    /// error listing all problems.
    pub fn finish<T>(self, value: T) -> Result<T, SearchError> {
        if self.problems.is_empty() {
            Ok(value)
        } else {
            Err(SearchError::Config(format!(
                "missing or invalid fields: {}",
                self.problems.join(", ")
            )))
        }
    }
}

/// Request body for `POST /api/instanceCreate`.
#[derive(Debug, Clone)]
pub struct CreateInstanceRequest {
    pub store: StoreParams,
    pub collection_name: String,
    pub index_name: String,
    pub metric_type: MetricType,
    pub collection_dim: i64,
}

impl CreateInstanceRequest {
    pub fn parse(body: &Value) -> Result<Self, SearchError> {
        let mut r = FieldReader::new(body)?;
        let req = Self {
            store: r.store_params(),
            collection_name: r.string("collection_name"),
            index_name: r.string("index_name"),
            metric_type: r.metric("metric_type"),
            collection_dim: r.integer("collection_dim"),
        };
        r.finish(req)
    }
}

/// Request body for `POST /api/onPicImport`.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub store: StoreParams,
    pub collection_name: String,
    pub target: EmbeddingTarget,
}

impl ImportRequest {
    pub fn parse(body: &Value) -> Result<Self, SearchError> {
        let mut r = FieldReader::new(body)?;
        let req = Self {
            store: r.store_params(),
            collection_name: r.string("collection_name"),
            target: r.embedding_target(),
        };
        r.finish(req)
    }
}

/// What a search request searches with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Text,
    Image,
}

impl QueryKind {
    fn key(self) -> &'static str {
        match self {
            QueryKind::Text => "search_text",
            QueryKind::Image => "search_img",
        }
    }
}

/// Request body for `POST /api/picSearchByText` and `POST /api/picSearchByImg`.
#[derive(Debug, Clone)]
pub struct SearchApiRequest {
    pub store: StoreParams,
    pub collection_name: String,
    pub index_name: String,
    pub metric_type: MetricType,
    pub target: EmbeddingTarget,
    /// Text for text search, image path relative to the collection for image search.
    pub query: String,
    pub top_k: i64,
}

impl SearchApiRequest {
    pub fn parse(body: &Value, kind: QueryKind) -> Result<Self, SearchError> {
        let mut r = FieldReader::new(body)?;
        let req = Self {
            store: r.store_params(),
            collection_name: r.string("collection_name"),
            index_name: r.string("index_name"),
            metric_type: r.metric("metric_type"),
            target: r.embedding_target(),
            query: r.string(kind.key()),
            top_k: r.integer("search_topk"),
        };
        r.finish(req)
    }
}

/// Request body for `POST /api/instanceDelete`.
#[derive(Debug, Clone)]
pub struct DeleteInstanceRequest {
    pub store: StoreParams,
    pub collection_name: String,
}

impl DeleteInstanceRequest {
    pub fn parse(body: &Value) -> Result<Self, SearchError> {
        let mut r = FieldReader::new(body)?;
        let req = Self {
            store: r.store_params(),
            collection_name: r.string("collection_name"),
        };
        r.finish(req)
    }
}

/// Generic success message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response body for `POST /api/instanceDelete`.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub dropped: bool,
}

/// Response body for `POST /api/onPicImport`.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub inserted: usize,
}

/// Response body for `POST /api/uploadImageFiles`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    /// Path of the last file written.
    pub url: String,
    pub files: Vec<String>,
}

/// Response body for both search endpoints.
///
/// `data` holds the results as a JSON-encoded array string, which is what the
/// browser client parses.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub message: String,
    pub data: String,
}

impl SearchResponse {
    pub fn new(results: &[SearchResult]) -> Result<Self, SearchError> {
        let data = serde_json::to_string(results)
            .map_err(|e| SearchError::Config(format!("encoding results: {e}")))?;
        Ok(Self {
            message: "search successfully".into(),
            data,
        })
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
