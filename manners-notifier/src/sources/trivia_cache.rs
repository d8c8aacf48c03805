use crate::traits::TriviaSource;
use crate::types::{Result, TriviaItem};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Fetches the catalog once per session and hands out the cached copy afterwards.
/// A failed fetch is not cached, so the next call tries again.
pub struct CachedCatalog<S> {
    inner: S,
    cache: Arc<RwLock<Option<Vec<TriviaItem>>>>,
}

impl<S: TriviaSource> CachedCatalog<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
        debug!("Trivia catalog cache cleared");
    }

    pub async fn is_loaded(&self) -> bool {
        self.cache.read().await.is_some()
    }
}

#[async_trait]
impl<S: TriviaSource> TriviaSource for CachedCatalog<S> {
    async fn catalog(&self) -> Result<Vec<TriviaItem>> {
        {
            let cache = self.cache.read().await;
            if let Some(items) = cache.as_ref() {
                return Ok(items.clone());
            }
        }

        let mut cache = self.cache.write().await;
        // Another caller may have filled it while we waited for the write lock
        if let Some(items) = cache.as_ref() {
            return Ok(items.clone());
        }
        let items = self.inner.catalog().await?;
        info!("Cached trivia catalog with {} items", items.len());
        *cache = Some(items.clone());
        Ok(items)
    }
}
