//! Client for the external embedding service.
//!
//! The service exposes two endpoints, `POST {endpoint}/get_txt_vec` with
//! `{data, api_key}` and `POST {endpoint}/get_img_vec` with `{url, api_key}`.
//! Both answer `{"embedding": "[f f f ...]"}`, decoded by
//! [`picsearch_core::vector::decode`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use picsearch_core::vector;
use picsearch_core::{Result, SearchError};
use serde::{Deserialize, Serialize};

use crate::api::metrics;

/// Where to send embedding requests and which key to forward.
#[derive(Debug, Clone)]
pub struct EmbeddingTarget {
    pub endpoint: String,
    pub api_key: String,
}

/// Turns text or an image reference into a vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a text query.
    async fn embed_text(&self, target: &EmbeddingTarget, text: &str) -> Result<Vec<f32>>;

    /// Embeds the image at `url` (a path the embedding service can read, or an http URL).
    async fn embed_image(&self, target: &EmbeddingTarget, url: &str) -> Result<Vec<f32>>;
}

#[derive(Serialize)]
struct TextRequest<'a> {
    data: &'a str,
    api_key: &'a str,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    url: &'a str,
    api_key: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// reqwest-backed [`Embedder`] with a bounded per-call timeout.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
}

impl HttpEmbedder {
    /// Creates a client whose calls time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Config(format!("embedding client: {e}")))?;
        Ok(Self { client })
    }

    async fn post<B: Serialize + Sync>(
        &self,
        target: &EmbeddingTarget,
        path: &str,
        body: &B,
    ) -> Result<Vec<f32>> {
        let url = format!("{}/{}", target.endpoint.trim_end_matches('/'), path);
        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SearchError::Connection(format!("embedding service {url}: {e}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SearchError::Connection(format!("embedding service {url}: {e}")))?;
        metrics::record_embedding_call(path, status.as_u16(), start.elapsed());

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&bytes)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(SearchError::Embedding(format!("{status}: {message}")));
        }

        let parsed: EmbeddingResponse = serde_json::from_slice(&bytes)
            .map_err(|e| SearchError::EmbeddingDecode(format!("response body: {e}")))?;
        vector::decode(&parsed.embedding)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_text(&self, target: &EmbeddingTarget, text: &str) -> Result<Vec<f32>> {
        let body = TextRequest {
            data: text,
            api_key: &target.api_key,
        };
        self.post(target, "get_txt_vec", &body).await
    }

    async fn embed_image(&self, target: &EmbeddingTarget, url: &str) -> Result<Vec<f32>> {
        let body = ImageRequest {
            url,
            api_key: &target.api_key,
        };
        self.post(target, "get_img_vec", &body).await
    }
}
