use std::sync::Arc;

use nh_core::{AppConfig, Error, NewsSearch, Result};

pub mod backends;
pub mod cache;
pub mod sheets;

pub use backends::*;
pub use cache::{CachedTables, Tables};
pub use sheets::SheetSource;

/// Build a search backend by name. The memory backend is seeded from the
/// given tables (no stored vectors, so hybrid plans degrade to keyword
/// scoring); the weaviate backend talks to the hosted collection.
#[cfg_attr(not(feature = "weaviate"), allow(unused_variables))]
pub async fn create_search(
    backend: &str,
    config: &AppConfig,
    seed: Option<Tables>,
) -> Result<Arc<dyn NewsSearch>> {
    match backend {
        "memory" => {
            let store = MemoryStore::new();
            if let Some(tables) = seed {
                store.seed_tables(tables).await;
            }
            Ok(Arc::new(store))
        }
        #[cfg(feature = "weaviate")]
        "weaviate" => {
            let url = config
                .weaviate_url
                .clone()
                .ok_or_else(|| Error::Config("WEAVIATE_URL is not set".to_string()))?;
            Ok(Arc::new(WeaviateStore::new(
                url,
                config.weaviate_api_key.clone(),
            )))
        }
        other => Err(Error::Config(format!("unknown storage backend: {}", other))),
    }
}
