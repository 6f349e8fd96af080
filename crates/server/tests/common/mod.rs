//! Shared fixtures for the API tests: an in-memory vector store, a stub
//! embedding service, and a helper that spawns the router on a random port.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use picsearch_core::index::{IndexBuildSpec, MetricType};
use picsearch_core::schema::CollectionSchema;
use picsearch_core::{vector, Record, Result, SearchError, SearchHit};
use picsearch_server::api::create_router;
use picsearch_server::api::handlers::AppState;
use picsearch_server::assets::AssetStore;
use picsearch_server::embedding::HttpEmbedder;
use picsearch_server::store::{
    CollectionDescription, IndexDescription, SearchRequest, StoreConnector, StoreParams,
    VectorStore,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ========== In-memory vector store ==========

#[derive(Debug, Clone)]
pub struct StoredCollection {
    pub dimension: usize,
    pub index: Option<IndexDescription>,
    pub rows: Vec<Record>,
}

#[derive(Debug, Default)]
pub struct StoreState {
    pub collections: HashMap<String, StoredCollection>,
    /// When set, every search returns exactly these hits, in this order.
    pub fixed_hits: Option<Vec<SearchHit>>,
    pub unreachable: bool,
    pub connects: usize,
    pub inserts: usize,
    pub searches: usize,
    pub open_sessions: usize,
}

/// Opens [`MemoryStore`] sessions over one shared state.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    pub state: Arc<Mutex<StoreState>>,
}

impl MemoryConnector {
    pub fn with<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, params: &StoreParams) -> Result<Box<dyn VectorStore>> {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        if state.unreachable {
            return Err(SearchError::Connection(format!(
                "{} refused connection",
                params.address()
            )));
        }
        state.open_sessions += 1;
        Ok(Box::new(MemoryStore {
            state: self.state.clone(),
        }))
    }
}

pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.state.lock().unwrap().open_sessions -= 1;
    }
}

fn missing(name: &str) -> SearchError {
    SearchError::StoreOperation(format!("collection not found[collection={name}]"))
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().collections.contains_key(name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.collections.contains_key(&schema.name) {
            return Err(SearchError::StoreOperation(format!(
                "collection {} already exists",
                schema.name
            )));
        }
        state.collections.insert(
            schema.name.clone(),
            StoredCollection {
                dimension: schema.dimension(),
                index: None,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn describe_collection(&self, name: &str) -> Result<CollectionDescription> {
        let state = self.state.lock().unwrap();
        let c = state.collections.get(name).ok_or_else(|| missing(name))?;
        Ok(CollectionDescription {
            name: name.to_string(),
            dimension: c.dimension,
            index: c.index.clone(),
        })
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.collections.remove(name).ok_or_else(|| missing(name))?;
        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        _field: &str,
        spec: &IndexBuildSpec,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let c = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        c.index = Some(IndexDescription {
            index_type: spec.family.as_str().to_string(),
            metric_type: spec.metric.as_str().to_string(),
        });
        Ok(())
    }

    async fn load_collection(&self, name: &str) -> Result<()> {
        let state = self.state.lock().unwrap();
        state.collections.get(name).map(|_| ()).ok_or_else(|| missing(name))
    }

    async fn insert(&self, collection: &str, rows: &[Record]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.inserts += 1;
        let c = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        c.rows.extend_from_slice(rows);
        Ok(rows.len())
    }

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<SearchHit>> {
        let mut state = self.state.lock().unwrap();
        state.searches += 1;
        if let Some(hits) = &state.fixed_hits {
            return Ok(hits.clone());
        }
        let c = state
            .collections
            .get(request.collection)
            .ok_or_else(|| missing(request.collection))?;
        let mut hits: Vec<SearchHit> = c
            .rows
            .iter()
            .map(|row| SearchHit {
                url: row.url.clone(),
                score: score(request.metric, &row.vector, request.vector),
            })
            .collect();
        match request.metric {
            MetricType::L2 => hits.sort_by(|a, b| a.score.total_cmp(&b.score)),
            _ => hits.sort_by(|a, b| b.score.total_cmp(&a.score)),
        }
        hits.truncate(request.top_k);
        Ok(hits)
    }
}

fn score(metric: MetricType, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        MetricType::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        _ => a.iter().zip(b).map(|(x, y)| x * y).sum(),
    }
}

// ========== Stub embedding service ==========

pub struct EmbedState {
    pub dimension: usize,
    /// Image requests whose url ends with this suffix answer 500.
    pub fail_suffix: Mutex<Option<String>>,
    /// Image requests whose url ends with this suffix stall before answering.
    pub hang_suffix: Mutex<Option<String>>,
    /// When set, image requests answer 200 with this raw body.
    pub raw_body: Mutex<Option<String>>,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    /// Stalled requests that ran to completion.
    pub hangs_finished: AtomicUsize,
}

impl EmbedState {
    pub fn calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst) + self.image_calls.load(Ordering::SeqCst)
    }

    pub fn fail_on(&self, suffix: &str) {
        *self.fail_suffix.lock().unwrap() = Some(suffix.to_string());
    }

    pub fn hang_on(&self, suffix: &str) {
        *self.hang_suffix.lock().unwrap() = Some(suffix.to_string());
    }

    pub fn answer_with(&self, body: &str) {
        *self.raw_body.lock().unwrap() = Some(body.to_string());
    }
}

/// How long a stalled image request sleeps; longer than the client timeout.
pub const HANG: Duration = Duration::from_secs(30);

/// One-hot vector whose hot slot is derived from `key`.
pub fn one_hot(key: &str, dimension: usize) -> Vec<f32> {
    let slot = key.bytes().map(usize::from).sum::<usize>() % dimension;
    let mut v = vec![0.0; dimension];
    v[slot] = 1.0;
    v
}

async fn get_txt_vec(
    State(state): State<Arc<EmbedState>>,
    Json(_body): Json<Value>,
) -> Json<Value> {
    state.text_calls.fetch_add(1, Ordering::SeqCst);
    let v = vec![1.0; state.dimension];
    Json(json!({ "embedding": vector::encode(&v) }))
}

async fn get_img_vec(
    State(state): State<Arc<EmbedState>>,
    Json(body): Json<Value>,
) -> Response {
    state.image_calls.fetch_add(1, Ordering::SeqCst);
    let url = body["url"].as_str().unwrap_or_default().to_string();
    let ends_with = |slot: &Mutex<Option<String>>| {
        slot.lock()
            .unwrap()
            .as_deref()
            .is_some_and(|s| url.ends_with(s))
    };
    if ends_with(&state.hang_suffix) {
        tokio::time::sleep(HANG).await;
        state.hangs_finished.fetch_add(1, Ordering::SeqCst);
    }
    if ends_with(&state.fail_suffix) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("cannot read {url}") })),
        )
            .into_response();
    }
    if let Some(raw) = state.raw_body.lock().unwrap().clone() {
        return (StatusCode::OK, raw).into_response();
    }
    let name = url.rsplit('/').next().unwrap_or_default();
    let v = one_hot(name, state.dimension);
    (StatusCode::OK, Json(json!({ "embedding": vector::encode(&v) }))).into_response()
}

/// Spawns the stub embedding service and returns its base URL.
pub async fn spawn_embedder(dimension: usize) -> (String, Arc<EmbedState>) {
    let state = Arc::new(EmbedState {
        dimension,
        fail_suffix: Mutex::new(None),
        hang_suffix: Mutex::new(None),
        raw_body: Mutex::new(None),
        text_calls: AtomicUsize::new(0),
        image_calls: AtomicUsize::new(0),
        hangs_finished: AtomicUsize::new(0),
    });
    let app = Router::new()
        .route("/get_txt_vec", post(get_txt_vec))
        .route("/get_img_vec", post(get_img_vec))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

// ========== App under test ==========

pub struct TestApp {
    pub base_url: String,
    pub embed_url: String,
    pub store: MemoryConnector,
    pub embed: Arc<EmbedState>,
    pub upload_root: TempDir,
    pub static_root: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Store and embedding keys every data endpoint needs.
    pub fn body(&self, extra: Value) -> Value {
        let mut body = json!({
            "milvus_server": "127.0.0.1",
            "milvus_port": "19530",
            "milvus_username": "root",
            "milvus_pass": "Milvus",
            "embed_server_url": self.embed_url,
            "embed_server_apikey": "test-key",
        });
        let obj = body.as_object_mut().unwrap();
        for (k, v) in extra.as_object().unwrap() {
            obj.insert(k.clone(), v.clone());
        }
        body
    }

    pub async fn post(&self, path: &str, extra: Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(path))
            .json(&self.body(extra))
            .send()
            .await
            .expect("request failed")
    }

    pub async fn upload(&self, collection: &str, files: &[(&str, &str)]) -> reqwest::Response {
        let mut form =
            reqwest::multipart::Form::new().text("collectionName", collection.to_string());
        for (name, content) in files {
            let part = reqwest::multipart::Part::bytes(content.as_bytes().to_vec())
                .file_name(name.to_string());
            form = form.part("files", part);
        }
        reqwest::Client::new()
            .post(self.url("/api/uploadImageFiles"))
            .multipart(form)
            .send()
            .await
            .expect("upload failed")
    }
}

pub async fn spawn_app(dimension: usize) -> TestApp {
    let upload_root = TempDir::new().expect("Failed to create temp dir");
    let static_root = TempDir::new().expect("Failed to create temp dir");
    std::fs::create_dir_all(static_root.path().join("assets")).unwrap();
    std::fs::write(
        static_root.path().join("index.html"),
        "<!doctype html><div id=\"app\"></div>",
    )
    .unwrap();
    std::fs::write(static_root.path().join("assets/app.js"), "mount('#app')").unwrap();
    let (embed_url, embed) = spawn_embedder(dimension).await;
    let store = MemoryConnector::default();

    let prometheus_handle =
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(_) => metrics_exporter_prometheus::PrometheusBuilder::new()
                .build_recorder()
                .handle(),
        };

    let state = AppState {
        connector: Arc::new(store.clone()),
        embedder: Arc::new(HttpEmbedder::new(Duration::from_secs(10)).unwrap()),
        assets: AssetStore::new(upload_root.path()),
        static_dir: static_root.path().to_path_buf(),
        ingest_concurrency: 2,
        prometheus_handle,
        start_time: Instant::now(),
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        embed_url,
        store,
        embed,
        upload_root,
        static_root,
    }
}
