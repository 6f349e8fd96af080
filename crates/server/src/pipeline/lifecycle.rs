//! Collection lifecycle: create with index and load, delete with asset purge.

use picsearch_core::config;
use picsearch_core::index::{IndexBuildSpec, MetricType};
use picsearch_core::schema::CollectionSchema;
use picsearch_core::Result;

use crate::assets::AssetStore;
use crate::store::VectorStore;

/// Parameters for creating a collection.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: i64,
    /// Raw index family identifier, e.g. `HNSW`.
    pub family: String,
    pub metric: MetricType,
}

/// Creates the collection, builds its vector index, and loads it.
///
/// The schema and the index build spec are both resolved before any store call,
/// so an invalid dimension or unsupported family never leaves a half-created
/// collection behind. A failure after creation aborts the remaining steps and is
/// returned as-is; nothing is rolled back.
pub async fn create_collection(
    store: &dyn VectorStore,
    spec: &CollectionSpec,
) -> Result<IndexBuildSpec> {
    let schema = CollectionSchema::image_search(&spec.name, spec.dimension)?;
    let build = picsearch_core::index::build_params(&spec.family, spec.metric)?;

    tracing::info!(collection = %spec.name, dimension = spec.dimension, "Creating collection");
    store.create_collection(&schema).await?;

    tracing::info!(
        collection = %spec.name,
        index = %build.family,
        metric = %build.metric,
        "Building index"
    );
    store
        .create_index(&spec.name, config::VECTOR_FIELD, &build)
        .await?;

    tracing::info!(collection = %spec.name, "Loading collection");
    store.load_collection(&spec.name).await?;

    Ok(build)
}

/// Drops the collection and purges its asset directory.
///
/// Returns `false` without touching anything when the collection does not
/// exist. Purging the directory is best-effort: failures are logged and do not
/// fail the deletion.
pub async fn delete_collection(
    store: &dyn VectorStore,
    assets: &AssetStore,
    name: &str,
) -> Result<bool> {
    let asset_dir = assets.collection_dir(name)?;
    if !store.has_collection(name).await? {
        tracing::info!(collection = %name, "Collection absent, nothing to delete");
        return Ok(false);
    }

    store.drop_collection(name).await?;
    if let Err(e) = assets.purge(name).await {
        tracing::warn!(
            collection = %name,
            path = %asset_dir.display(),
            "Failed to purge asset directory: {}",
            e
        );
    }
    tracing::info!(collection = %name, "Collection deleted");
    Ok(true)
}
