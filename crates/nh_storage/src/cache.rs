use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use nh_core::{Article, Cluster, Result, TableSource};

/// One consistent snapshot of both record tables.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub clusters: Vec<Cluster>,
    pub articles: Vec<Article>,
}

/// Time-based cache over a table source. Within the freshness window
/// repeated loads reuse the previous snapshot; there is no dependency
/// tracking and no eviction on write, since the source is append-only from
/// this side.
pub struct CachedTables {
    source: Arc<dyn TableSource>,
    ttl: Duration,
    slot: RwLock<Option<(Instant, Tables)>>,
}

impl CachedTables {
    pub fn new(source: Arc<dyn TableSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Result<Tables> {
        {
            let slot = self.slot.read().await;
            if let Some((loaded_at, tables)) = slot.as_ref() {
                if loaded_at.elapsed() < self.ttl {
                    return Ok(tables.clone());
                }
            }
        }

        let mut slot = self.slot.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some((loaded_at, tables)) = slot.as_ref() {
            if loaded_at.elapsed() < self.ttl {
                return Ok(tables.clone());
            }
        }

        let tables = Tables {
            clusters: self.source.load_clusters().await?,
            articles: self.source.load_articles().await?,
        };
        debug!(
            clusters = tables.clusters.len(),
            articles = tables.articles.len(),
            "reloaded tables"
        );
        *slot = Some((Instant::now(), tables.clone()));
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl TableSource for CountingSource {
        async fn load_clusters(&self) -> Result<Vec<Cluster>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn load_articles(&self) -> Result<Vec<Article>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn reuses_snapshot_within_ttl() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let cache = CachedTables::new(source.clone(), Duration::from_secs(600));

        cache.get().await.unwrap();
        cache.get().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reloads_after_ttl_expiry() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let cache = CachedTables::new(source.clone(), Duration::ZERO);

        cache.get().await.unwrap();
        cache.get().await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }
}
