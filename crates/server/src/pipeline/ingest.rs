//! Batch ingestion of a collection's uploaded assets.

use futures::stream::{self, StreamExt, TryStreamExt};
use picsearch_core::vector::check_dimension;
use picsearch_core::{config, Record, Result, SearchError};

use crate::assets::{path_to_url, AssetStore};
use crate::embedding::{Embedder, EmbeddingTarget};
use crate::store::VectorStore;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
}

/// Embeds every file in the collection's asset directory and inserts all rows
/// in a single batch.
///
/// Up to `concurrency` embedding calls are in flight at once; rows keep the
/// directory's lexical order. The batch is all-or-nothing: the first failing
/// file aborts the ingestion as soon as it fails, the remaining in-flight calls
/// are dropped, and no insert is issued.
pub async fn ingest_collection(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    assets: &AssetStore,
    collection: &str,
    target: &EmbeddingTarget,
    concurrency: usize,
) -> Result<IngestReport> {
    let files = assets.list_files(collection).await?;
    if files.is_empty() {
        tracing::info!(collection = %collection, "No assets to ingest");
        return Ok(IngestReport { inserted: 0 });
    }

    let urls: Vec<String> = files.iter().map(|p| path_to_url(p)).collect();
    if let Some(long) = urls.iter().find(|u| u.chars().count() > config::URL_MAX_LEN) {
        return Err(SearchError::Schema(format!(
            "asset path exceeds {} characters: {}",
            config::URL_MAX_LEN,
            long
        )));
    }

    let dimension = store.describe_collection(collection).await?.dimension;
    tracing::info!(
        collection = %collection,
        files = urls.len(),
        dimension,
        concurrency,
        "Embedding assets"
    );

    let mut rows: Vec<(usize, Record)> = stream::iter(urls.into_iter().enumerate())
        .map(|(position, url)| async move {
            let vector = embedder.embed_image(target, &url).await.map_err(|e| {
                tracing::error!(collection = %collection, url = %url, "Embedding failed: {}", e);
                e
            })?;
            check_dimension(&vector, dimension).map_err(|e| {
                tracing::error!(collection = %collection, url = %url, "{}", e);
                e
            })?;
            Ok::<_, SearchError>((position, Record { vector, url }))
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;
    rows.sort_unstable_by_key(|(position, _)| *position);
    let rows: Vec<Record> = rows.into_iter().map(|(_, row)| row).collect();

    let inserted = store.insert(collection, &rows).await?;
    tracing::info!(collection = %collection, inserted, "Insert succeeded");
    Ok(IngestReport { inserted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CollectionDescription, SearchRequest};
    use async_trait::async_trait;
    use picsearch_core::index::IndexBuildSpec;
    use picsearch_core::schema::CollectionSchema;
    use picsearch_core::SearchHit;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct CountingStore {
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl VectorStore for CountingStore {
        async fn has_collection(&self, _: &str) -> Result<bool> {
            unreachable!()
        }
        async fn create_collection(&self, _: &CollectionSchema) -> Result<()> {
            unreachable!()
        }
        async fn describe_collection(&self, name: &str) -> Result<CollectionDescription> {
            Ok(CollectionDescription {
                name: name.to_string(),
                dimension: 2,
                index: None,
            })
        }
        async fn drop_collection(&self, _: &str) -> Result<()> {
            unreachable!()
        }
        async fn create_index(&self, _: &str, _: &str, _: &IndexBuildSpec) -> Result<()> {
            unreachable!()
        }
        async fn load_collection(&self, _: &str) -> Result<()> {
            unreachable!()
        }
        async fn insert(&self, _: &str, rows: &[Record]) -> Result<usize> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Ok(rows.len())
        }
        async fn search(&self, _: &SearchRequest<'_>) -> Result<Vec<SearchHit>> {
            unreachable!()
        }
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// `a.jpg` hangs, `b.jpg` fails at once, everything else succeeds.
    struct HangingEmbedder {
        dropped: Arc<AtomicBool>,
        completed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Embedder for HangingEmbedder {
        async fn embed_text(&self, _: &EmbeddingTarget, _: &str) -> Result<Vec<f32>> {
            unreachable!()
        }

        async fn embed_image(&self, _: &EmbeddingTarget, url: &str) -> Result<Vec<f32>> {
            if url.ends_with("a.jpg") {
                let _guard = SetOnDrop(self.dropped.clone());
                tokio::time::sleep(Duration::from_secs(60)).await;
                self.completed.store(true, Ordering::SeqCst);
            } else if url.ends_with("b.jpg") {
                return Err(SearchError::Embedding("500: cannot read".into()));
            }
            Ok(vec![0.5, 0.5])
        }
    }

    fn assets_with(files: &[&str]) -> (TempDir, AssetStore) {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("photos")).unwrap();
        for f in files {
            std::fs::write(tmp.path().join("photos").join(f), b"img").unwrap();
        }
        let assets = AssetStore::new(tmp.path());
        (tmp, assets)
    }

    fn target() -> EmbeddingTarget {
        EmbeddingTarget {
            endpoint: "http://unused".into(),
            api_key: String::new(),
        }
    }

    #[tokio::test]
    async fn test_first_failure_cancels_in_flight_siblings() {
        let (_tmp, assets) = assets_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let store = CountingStore {
            inserts: AtomicUsize::new(0),
        };
        let embedder = HangingEmbedder {
            dropped: Arc::new(AtomicBool::new(false)),
            completed: Arc::new(AtomicBool::new(false)),
        };

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            ingest_collection(&store, &embedder, &assets, "photos", &target(), 2),
        )
        .await
        .expect("ingestion should stop at the first failure");

        assert!(matches!(result, Err(SearchError::Embedding(_))));
        assert!(embedder.dropped.load(Ordering::SeqCst));
        assert!(!embedder.completed.load(Ordering::SeqCst));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rows_keep_lexical_order() {
        let (_tmp, assets) = assets_with(&["d.jpg", "c.jpg", "e.jpg"]);
        let store = CountingStore {
            inserts: AtomicUsize::new(0),
        };
        let embedder = HangingEmbedder {
            dropped: Arc::new(AtomicBool::new(false)),
            completed: Arc::new(AtomicBool::new(false)),
        };
        let report = ingest_collection(&store, &embedder, &assets, "photos", &target(), 3)
            .await
            .unwrap();
        assert_eq!(report, IngestReport { inserted: 3 });
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }
}
