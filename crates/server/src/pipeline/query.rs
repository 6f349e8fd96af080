//! Similarity queries by text or by an uploaded image.
//!
//! The index actually built on the collection is read back before searching;
//! a query naming another index family or metric is rejected.

use std::time::Instant;

use picsearch_core::index::{IndexFamily, MetricType};
use picsearch_core::vector::check_dimension;
use picsearch_core::{config, Result, SearchError, SearchResult};

use crate::assets::{path_to_url, AssetStore};
use crate::embedding::{Embedder, EmbeddingTarget};
use crate::store::{CollectionDescription, SearchRequest, VectorStore};

/// What to search and how. `family` and `metric` must match the index the
/// collection was built with.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub collection: String,
    /// Raw index family identifier, e.g. `HNSW`.
    pub family: String,
    pub metric: MetricType,
    pub top_k: i64,
    pub target: EmbeddingTarget,
}

/// Validated, network-free part of a query.
struct Plan {
    family: IndexFamily,
    top_k: usize,
}

fn plan(query: &SearchQuery) -> Result<Plan> {
    if query.top_k <= 0 || query.top_k > config::MAX_TOP_K {
        return Err(SearchError::InvalidTopK(query.top_k));
    }
    let family = query.family.parse::<IndexFamily>()?;
    Ok(Plan {
        family,
        top_k: query.top_k as usize,
    })
}

/// Checks `top_k` and the index family without touching the network.
pub fn validate(query: &SearchQuery) -> Result<()> {
    plan(query).map(|_| ())
}

/// Rejects a query whose family or metric differs from the built index.
fn check_index(desc: &CollectionDescription, family: IndexFamily, metric: MetricType) -> Result<()> {
    let index = desc.index.as_ref().ok_or_else(|| {
        SearchError::StoreOperation(format!(
            "collection '{}' has no index on '{}'",
            desc.name,
            config::VECTOR_FIELD
        ))
    })?;
    let family_ok = index.index_type.eq_ignore_ascii_case(family.as_str());
    let metric_ok = index.metric_type.eq_ignore_ascii_case(metric.as_str());
    if !family_ok || !metric_ok {
        return Err(SearchError::IndexMismatch {
            built: format!("{}/{}", index.index_type, index.metric_type),
            requested: format!("{}/{}", family, metric),
        });
    }
    Ok(())
}

/// Searches by a text query.
pub async fn search_by_text(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    query: &SearchQuery,
    text: &str,
) -> Result<Vec<SearchResult>> {
    let plan = plan(query)?;
    tracing::info!(collection = %query.collection, text = %text, "Search by text");
    let vector = embedder.embed_text(&query.target, text).await?;
    run(store, query, &plan, &vector, "text").await
}

/// Searches by an image already stored in the collection's asset directory.
pub async fn search_by_image(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    assets: &AssetStore,
    query: &SearchQuery,
    image_ref: &str,
) -> Result<Vec<SearchResult>> {
    let plan = plan(query)?;
    let path = assets.resolve_image(&query.collection, image_ref).await?;
    let url = path_to_url(&path);
    tracing::info!(collection = %query.collection, image = %url, "Search by image");
    let vector = embedder.embed_image(&query.target, &url).await?;
    run(store, query, &plan, &vector, "image").await
}

async fn run(
    store: &dyn VectorStore,
    query: &SearchQuery,
    plan: &Plan,
    vector: &[f32],
    mode: &'static str,
) -> Result<Vec<SearchResult>> {
    let desc = store.describe_collection(&query.collection).await?;
    check_index(&desc, plan.family, query.metric)?;
    check_dimension(vector, desc.dimension)?;

    let request = SearchRequest {
        collection: &query.collection,
        vector,
        metric: query.metric,
        top_k: plan.top_k,
        params: plan.family.search_spec(plan.top_k),
        output_fields: &[config::URL_FIELD],
    };

    let start = Instant::now();
    let hits = store.search(&request).await?;
    let results: Vec<SearchResult> = hits
        .into_iter()
        .take(plan.top_k)
        .map(SearchResult::from)
        .collect();

    crate::api::metrics::record_search_operation(&query.collection, mode);
    tracing::info!(
        collection = %query.collection,
        mode,
        top_k = plan.top_k,
        results = results.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Search completed"
    );
    Ok(results)
}
