//! HTTP request handlers and shared application state.
//!
//! Every handler that talks to the vector store opens its own session from
//! `state.connector` and lets it drop when the handler returns.

use axum::extract::{Multipart, State};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use picsearch_core::SearchError;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::api::errors::ApiError;
use crate::api::metrics;
use crate::api::models::*;
use crate::assets::{path_to_url, AssetStore};
use crate::embedding::Embedder;
use crate::pipeline::{self, CollectionSpec, SearchQuery};
use crate::store::StoreConnector;

/// Shared application state passed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Opens one vector store session per request.
    pub connector: Arc<dyn StoreConnector>,
    pub embedder: Arc<dyn Embedder>,
    pub assets: AssetStore,
    /// Build directory of the browser client, served for non-API paths.
    pub static_dir: PathBuf,
    /// Maximum embedding calls in flight during one ingestion.
    pub ingest_concurrency: usize,
    pub prometheus_handle: PrometheusHandle,
    pub start_time: Instant,
}

/// Logs a failed operation, counts it, and converts it for the response.
fn fail(operation: &'static str, err: SearchError) -> ApiError {
    metrics::record_failure(operation, err.kind());
    tracing::error!(operation, kind = err.kind(), "{}", err);
    ApiError::from(err)
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// `GET /metrics`
pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}

/// `POST /api/instanceCreate`
pub async fn instance_create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<MessageResponse>, ApiError> {
    const OP: &str = "instance_create";
    let req = CreateInstanceRequest::parse(&body).map_err(|e| fail(OP, e))?;
    let spec = CollectionSpec {
        name: req.collection_name,
        dimension: req.collection_dim,
        family: req.index_name,
        metric: req.metric_type,
    };

    let store = state.connector.connect(&req.store).await.map_err(|e| fail(OP, e))?;
    pipeline::create_collection(store.as_ref(), &spec)
        .await
        .map_err(|e| fail(OP, e))?;

    tracing::info!(collection = %spec.name, "Collection created and loaded");
    Ok(Json(MessageResponse {
        message: "success".into(),
    }))
}

/// `POST /api/uploadImageFiles`
///
/// Multipart form with a `collectionName` text part and one or more `files`
/// parts. Files are buffered until the whole form is read, so part order does
/// not matter.
pub async fn upload_image_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut collection: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("collectionName") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                collection = Some(text);
            }
            Some("files") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("File part without a file name".into()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                files.push((file_name, bytes));
            }
            _ => {}
        }
    }

    let collection = collection
        .ok_or_else(|| fail("upload", SearchError::Config("collectionName (missing)".into())))?;
    if files.is_empty() {
        return Err(fail("upload", SearchError::Config("files (missing)".into())));
    }

    let mut saved = Vec::with_capacity(files.len());
    for (file_name, bytes) in &files {
        let path = state
            .assets
            .save_upload(&collection, file_name, bytes)
            .await
            .map_err(|e| fail("upload", e))?;
        saved.push(path_to_url(&path));
    }

    tracing::info!(collection = %collection, files = saved.len(), "Files uploaded");
    Ok(Json(UploadResponse {
        message: "Files uploaded successfully".into(),
        url: saved.last().cloned().unwrap_or_default(),
        files: saved,
    }))
}

/// `POST /api/onPicImport`
pub async fn on_pic_import(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ImportResponse>, ApiError> {
    const OP: &str = "import";
    let req = ImportRequest::parse(&body).map_err(|e| fail(OP, e))?;

    let store = state.connector.connect(&req.store).await.map_err(|e| fail(OP, e))?;
    let report = pipeline::ingest_collection(
        store.as_ref(),
        state.embedder.as_ref(),
        &state.assets,
        &req.collection_name,
        &req.target,
        state.ingest_concurrency,
    )
    .await
    .map_err(|e| fail(OP, e))?;

    metrics::record_ingested(&req.collection_name, report.inserted);
    Ok(Json(ImportResponse {
        message: "insert successfully".into(),
        inserted: report.inserted,
    }))
}

fn search_query(req: &SearchApiRequest) -> SearchQuery {
    SearchQuery {
        collection: req.collection_name.clone(),
        family: req.index_name.clone(),
        metric: req.metric_type,
        top_k: req.top_k,
        target: req.target.clone(),
    }
}

/// `POST /api/picSearchByText`
pub async fn pic_search_by_text(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<SearchResponse>, ApiError> {
    const OP: &str = "search_text";
    let req = SearchApiRequest::parse(&body, QueryKind::Text).map_err(|e| fail(OP, e))?;
    let query = search_query(&req);
    // Fail on an invalid top_k or family before opening a store session.
    pipeline::query::validate(&query).map_err(|e| fail(OP, e))?;

    let store = state.connector.connect(&req.store).await.map_err(|e| fail(OP, e))?;
    let results = pipeline::search_by_text(
        store.as_ref(),
        state.embedder.as_ref(),
        &query,
        &req.query,
    )
    .await
    .map_err(|e| fail(OP, e))?;

    Ok(Json(SearchResponse::new(&results).map_err(|e| fail(OP, e))?))
}

/// `POST /api/picSearchByImg`
pub async fn pic_search_by_img(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<SearchResponse>, ApiError> {
    const OP: &str = "search_image";
    let req = SearchApiRequest::parse(&body, QueryKind::Image).map_err(|e| fail(OP, e))?;
    let query = search_query(&req);
    pipeline::query::validate(&query).map_err(|e| fail(OP, e))?;

    let store = state.connector.connect(&req.store).await.map_err(|e| fail(OP, e))?;
    let results = pipeline::search_by_image(
        store.as_ref(),
        state.embedder.as_ref(),
        &state.assets,
        &query,
        &req.query,
    )
    .await
    .map_err(|e| fail(OP, e))?;

    Ok(Json(SearchResponse::new(&results).map_err(|e| fail(OP, e))?))
}

/// `POST /api/instanceDelete`
pub async fn instance_delete(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<DeleteResponse>, ApiError> {
    const OP: &str = "instance_delete";
    let req = DeleteInstanceRequest::parse(&body).map_err(|e| fail(OP, e))?;

    let store = state.connector.connect(&req.store).await.map_err(|e| fail(OP, e))?;
    let dropped = pipeline::delete_collection(store.as_ref(), &state.assets, &req.collection_name)
        .await
        .map_err(|e| fail(OP, e))?;

    Ok(Json(DeleteResponse {
        message: "success".into(),
        dropped,
    }))
}
