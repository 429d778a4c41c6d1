//! Key-value cache seam and the get-or-compute embedding cache.
//!
//! The cache is a performance layer, never a correctness dependency: a
//! store that cannot be reached degrades ingestion to uncached embedding
//! computation with a warning instead of failing the call.

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::embeddings::EmbeddingProvider;
use crate::keys;
use crate::types::Result;

pub use memory::MemoryCacheStore;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCacheStore;

/// Key-value store capability the pipeline relies on: reads, expiring
/// writes, batched deletes, and a cursor-based prefix scan.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` with an expiry.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete the given keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Collect every key starting with `prefix`.
    ///
    /// Implementations must iterate the keyspace incrementally (cursor
    /// batches), never with a blocking full-keyspace command.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Content-addressed get-or-compute cache in front of an
/// [`EmbeddingProvider`].
///
/// Every miss computes the vector and writes exactly one entry. Parallel
/// misses for identical text may duplicate the computation; the write is
/// idempotent (same key, same value), so that race costs time, not
/// correctness.
pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    store: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
}

impl EmbeddingCache {
    /// Wrap `provider`, optionally caching through `store` with `ttl`
    /// expiry. `None` disables caching entirely (every call computes).
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Option<Arc<dyn CacheStore>>,
        ttl: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            ttl,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Resolve the vector for `text`: cached copy on a hit, computed and
    /// stored with expiry on a miss.
    #[instrument(skip_all, err)]
    pub async fn resolve(&self, text: &str) -> Result<Vec<f32>> {
        let key = keys::embedding_key(text);

        if let Some(store) = &self.store {
            match store.get(&key).await {
                Ok(Some(serialized)) => match serde_json::from_str::<Vec<f32>>(&serialized) {
                    Ok(vector) => {
                        debug!(%key, "embedding cache hit");
                        return Ok(vector);
                    }
                    Err(e) => {
                        warn!(%key, error = %e, "discarding undecodable embedding cache entry");
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "embedding cache unreachable, computing uncached");
                }
            }
        }

        let vector = self.provider.embed(text).await?;

        if let Some(store) = &self.store {
            match serde_json::to_string(&vector) {
                Ok(serialized) => {
                    if let Err(e) = store.set_ex(&key, &serialized, self.ttl).await {
                        warn!(%key, error = %e, "failed to write embedding cache entry");
                    }
                }
                Err(e) => warn!(%key, error = %e, "failed to serialize embedding"),
            }
        }

        Ok(vector)
    }
}

impl fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("model", &self.provider.model_id())
            .field("cached", &self.store.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;

    fn cache_with_store() -> (EmbeddingCache, Arc<MockEmbeddingProvider>) {
        let provider = Arc::new(MockEmbeddingProvider::new());
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let cache = EmbeddingCache::new(
            provider.clone(),
            Some(store),
            Duration::from_secs(86_400),
        );
        (cache, provider)
    }

    #[tokio::test]
    async fn second_resolve_hits_the_cache() {
        let (cache, provider) = cache_with_store();
        let first = cache.resolve("repeated text").await.unwrap();
        let second = cache.resolve("repeated text").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.embed_calls(), 1);
    }

    #[tokio::test]
    async fn distinct_text_misses_independently() {
        let (cache, provider) = cache_with_store();
        cache.resolve("alpha").await.unwrap();
        cache.resolve("beta").await.unwrap();
        assert_eq!(provider.embed_calls(), 2);
    }

    #[tokio::test]
    async fn no_store_means_every_call_computes() {
        let provider = Arc::new(MockEmbeddingProvider::new());
        let cache = EmbeddingCache::new(provider.clone(), None, Duration::from_secs(60));
        cache.resolve("text").await.unwrap();
        cache.resolve("text").await.unwrap();
        assert_eq!(provider.embed_calls(), 2);
    }

    #[tokio::test]
    async fn undecodable_entry_is_recomputed() {
        let provider = Arc::new(MockEmbeddingProvider::new());
        let store = Arc::new(MemoryCacheStore::new());
        store
            .set_ex(
                &keys::embedding_key("poisoned"),
                "not json",
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        let cache = EmbeddingCache::new(
            provider.clone(),
            Some(store.clone() as Arc<dyn CacheStore>),
            Duration::from_secs(60),
        );
        let vector = cache.resolve("poisoned").await.unwrap();
        assert_eq!(vector.len(), provider.dimensions());
        assert_eq!(provider.embed_calls(), 1);
    }
}
