//! Milvus RESTful v2 client.
//!
//! Each [`MilvusStore`] is one request-scoped session: a dedicated reqwest
//! client with bounded connect and call timeouts, verified reachable by
//! [`MilvusConnector::connect`] before it is handed out.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use picsearch_core::config;
use picsearch_core::index::IndexBuildSpec;
use picsearch_core::schema::{CollectionSchema, FieldType};
use picsearch_core::{Record, Result, SearchError, SearchHit};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    CollectionDescription, IndexDescription, SearchRequest, StoreConnector, StoreParams,
    VectorStore,
};
use crate::api::metrics;

/// Response envelope shared by every Milvus REST endpoint.
#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct HasData {
    has: bool,
}

#[derive(Deserialize)]
struct InsertData {
    #[serde(rename = "insertCount")]
    insert_count: usize,
}

#[derive(Deserialize)]
struct DescribeField {
    name: String,
    #[serde(default)]
    params: Vec<FieldParam>,
}

#[derive(Deserialize)]
struct FieldParam {
    key: String,
    value: Value,
}

#[derive(Deserialize)]
struct DescribeIndexRef {
    #[serde(rename = "fieldName")]
    field_name: String,
    #[serde(rename = "indexName")]
    index_name: String,
}

#[derive(Deserialize)]
struct DescribeData {
    #[serde(rename = "collectionName")]
    collection_name: String,
    #[serde(default)]
    fields: Vec<DescribeField>,
    #[serde(default)]
    indexes: Vec<DescribeIndexRef>,
}

#[derive(Deserialize)]
struct IndexData {
    #[serde(rename = "indexType")]
    index_type: String,
    #[serde(rename = "metricType")]
    metric_type: String,
}

/// Opens [`MilvusStore`] sessions with fixed timeouts.
#[derive(Debug, Clone)]
pub struct MilvusConnector {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl MilvusConnector {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
        }
    }
}

impl Default for MilvusConnector {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(config::STORE_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(config::DEFAULT_STORE_TIMEOUT_SECS),
        )
    }
}

#[async_trait]
impl StoreConnector for MilvusConnector {
    async fn connect(&self, params: &StoreParams) -> Result<Box<dyn VectorStore>> {
        let store = MilvusStore::connect(params, self.connect_timeout, self.request_timeout).await?;
        Ok(Box::new(store))
    }
}

/// A request-scoped Milvus session.
pub struct MilvusStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    address: String,
}

impl MilvusStore {
    /// Builds a session and probes the server with a collection listing.
    pub async fn connect(
        params: &StoreParams,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let address = params.address();
        tracing::info!(store = %address, "Connecting to vector store");
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| SearchError::Connection(format!("{address}: {e}")))?;

        let base_url = if params.server.starts_with("http://") || params.server.starts_with("https://") {
            format!("{}:{}", params.server.trim_end_matches('/'), params.port)
        } else {
            format!("http://{}", address)
        };
        let token = if params.username.is_empty() && params.password.is_empty() {
            None
        } else {
            Some(format!("{}:{}", params.username, params.password))
        };

        let store = Self {
            client,
            base_url,
            token,
            address,
        };
        store
            .call::<IgnoredAny>("collections/list", json!({}))
            .await
            .map_err(|e| match e {
                SearchError::StoreOperation(msg) => SearchError::Connection(msg),
                other => other,
            })?;
        Ok(store)
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<Option<T>> {
        let url = format!("{}/v2/vectordb/{}", self.base_url, path);
        let mut req = self.client.post(&url).json(&body);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let start = Instant::now();
        let result: Result<Option<T>> = async {
            let resp = req
                .send()
                .await
                .map_err(|e| SearchError::Connection(format!("{}: {e}", self.address)))?;
            let status = resp.status();
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| SearchError::Connection(format!("{}: {e}", self.address)))?;
            if !status.is_success() {
                return Err(SearchError::StoreOperation(format!(
                    "{path}: HTTP {status}: {}",
                    String::from_utf8_lossy(&bytes)
                )));
            }
            let envelope: Envelope<T> = serde_json::from_slice(&bytes).map_err(|e| {
                SearchError::StoreOperation(format!("{path}: malformed response: {e}"))
            })?;
            if envelope.code != 0 {
                return Err(SearchError::StoreOperation(envelope.message));
            }
            Ok(envelope.data)
        }
        .await;

        metrics::record_store_operation(path, result.is_ok(), start.elapsed());
        result
    }

    async fn describe_index(&self, collection: &str, index_name: &str) -> Result<IndexDescription> {
        let data: Vec<IndexData> = self
            .call(
                "indexes/describe",
                json!({ "collectionName": collection, "indexName": index_name }),
            )
            .await?
            .unwrap_or_default();
        data.into_iter()
            .next()
            .map(|d| IndexDescription {
                index_type: d.index_type,
                metric_type: d.metric_type,
            })
            .ok_or_else(|| {
                SearchError::StoreOperation(format!(
                    "index '{index_name}' on '{collection}' not found"
                ))
            })
    }
}

impl Drop for MilvusStore {
    fn drop(&mut self) {
        tracing::debug!(store = %self.address, "Closing vector store session");
    }
}

fn schema_body(schema: &CollectionSchema) -> Value {
    let fields: Vec<Value> = schema
        .fields
        .iter()
        .map(|f| match f.field_type {
            FieldType::Int64 => json!({
                "fieldName": f.name,
                "dataType": "Int64",
                "isPrimary": f.is_primary,
            }),
            FieldType::FloatVector { dim } => json!({
                "fieldName": f.name,
                "dataType": "FloatVector",
                "elementTypeParams": { "dim": dim.to_string() },
            }),
            FieldType::VarChar { max_length } => json!({
                "fieldName": f.name,
                "dataType": "VarChar",
                "elementTypeParams": { "max_length": max_length.to_string() },
            }),
        })
        .collect();

    json!({
        "collectionName": schema.name,
        "description": schema.description,
        "schema": {
            "autoId": schema.fields.iter().any(|f| f.auto_id),
            "enableDynamicField": false,
            "fields": fields,
        },
    })
}

fn parse_dimension(fields: &[DescribeField]) -> Option<usize> {
    let field = fields.iter().find(|f| f.name == config::VECTOR_FIELD)?;
    let value = &field.params.iter().find(|p| p.key == "dim")?.value;
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(|d| d as usize),
        _ => None,
    }
}

fn hit_from_row(row: &Value) -> Result<SearchHit> {
    let url = row
        .get(config::URL_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| SearchError::StoreOperation("search hit without url field".into()))?;
    let score = row
        .get("distance")
        .and_then(Value::as_f64)
        .ok_or_else(|| SearchError::StoreOperation("search hit without distance".into()))?;
    Ok(SearchHit {
        url: url.to_string(),
        score: score as f32,
    })
}

#[async_trait]
impl VectorStore for MilvusStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        let data: Option<HasData> = self
            .call("collections/has", json!({ "collectionName": name }))
            .await?;
        Ok(data.map(|d| d.has).unwrap_or(false))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        self.call::<IgnoredAny>("collections/create", schema_body(schema))
            .await?;
        Ok(())
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription> {
        let data: DescribeData = self
            .call("collections/describe", json!({ "collectionName": name }))
            .await?
            .ok_or_else(|| SearchError::StoreOperation(format!("collection '{name}' not found")))?;

        let dimension = parse_dimension(&data.fields).ok_or_else(|| {
            SearchError::StoreOperation(format!(
                "collection '{name}' has no '{}' vector field",
                config::VECTOR_FIELD
            ))
        })?;

        let index = match data
            .indexes
            .iter()
            .find(|i| i.field_name == config::VECTOR_FIELD)
        {
            Some(index_ref) => Some(self.describe_index(name, &index_ref.index_name).await?),
            None => None,
        };

        Ok(CollectionDescription {
            name: data.collection_name,
            dimension,
            index,
        })
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.call::<IgnoredAny>("collections/drop", json!({ "collectionName": name }))
            .await?;
        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        field: &str,
        spec: &IndexBuildSpec,
    ) -> Result<()> {
        let mut params = serde_json::to_value(spec.params)
            .map_err(|e| SearchError::StoreOperation(e.to_string()))?;
        if let Value::Object(ref mut map) = params {
            map.insert("index_type".into(), json!(spec.family.as_str()));
        }
        let body = json!({
            "collectionName": collection,
            "indexParams": [{
                "fieldName": field,
                "indexName": field,
                "indexType": spec.family.as_str(),
                "metricType": spec.metric.as_str(),
                "params": params,
            }],
        });
        self.call::<IgnoredAny>("indexes/create", body).await?;
        Ok(())
    }

    async fn load_collection(&self, name: &str) -> Result<()> {
        self.call::<IgnoredAny>("collections/load", json!({ "collectionName": name }))
            .await?;
        Ok(())
    }

    async fn insert(&self, collection: &str, rows: &[Record]) -> Result<usize> {
        let data: Option<InsertData> = self
            .call(
                "entities/insert",
                json!({ "collectionName": collection, "data": rows }),
            )
            .await?;
        Ok(data.map(|d| d.insert_count).unwrap_or(rows.len()))
    }

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<SearchHit>> {
        let params = serde_json::to_value(request.params.params)
            .map_err(|e| SearchError::StoreOperation(e.to_string()))?;
        let body = json!({
            "collectionName": request.collection,
            "data": [request.vector],
            "annsField": config::VECTOR_FIELD,
            "limit": request.top_k,
            "outputFields": request.output_fields,
            "searchParams": {
                "metricType": request.metric.as_str(),
                "params": params,
            },
        });
        let rows: Vec<Value> = self.call("entities/search", body).await?.unwrap_or_default();
        rows.iter().map(hit_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_body_matches_rest_shape() {
        let schema = CollectionSchema::image_search("photos", 512).unwrap();
        let body = schema_body(&schema);
        assert_eq!(body["collectionName"], "photos");
        assert_eq!(body["schema"]["autoId"], true);
        let fields = body["schema"]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0]["isPrimary"], true);
        assert_eq!(fields[1]["elementTypeParams"]["dim"], "512");
        assert_eq!(fields[2]["elementTypeParams"]["max_length"], "500");
    }

    #[test]
    fn test_parse_dimension_accepts_string_or_number() {
        let fields: Vec<DescribeField> = serde_json::from_value(json!([
            {"name": "id", "params": []},
            {"name": "vec", "params": [{"key": "dim", "value": "768"}]}
        ]))
        .unwrap();
        assert_eq!(parse_dimension(&fields), Some(768));

        let fields: Vec<DescribeField> = serde_json::from_value(json!([
            {"name": "vec", "params": [{"key": "dim", "value": 64}]}
        ]))
        .unwrap();
        assert_eq!(parse_dimension(&fields), Some(64));
    }

    #[test]
    fn test_hit_from_row() {
        let hit = hit_from_row(&json!({"id": 1, "distance": 0.5, "url": "uploads/a/x.jpg"})).unwrap();
        assert_eq!(hit.url, "uploads/a/x.jpg");
        assert_eq!(hit.score, 0.5);
        assert!(hit_from_row(&json!({"id": 1, "distance": 0.5})).is_err());
    }
}
