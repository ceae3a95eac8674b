use std::sync::Arc;

use tracing::info;

use nh_core::{AppConfig, Embedder, Result};

pub mod dummy;
pub mod openai;

pub use dummy::DummyEmbedder;
pub use openai::OpenAiEmbedder;

/// Pick an embedding provider from configuration: the hosted provider when
/// an API key is present, the deterministic local one otherwise.
pub fn create_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match &config.openai_api_key {
        Some(api_key) => Arc::new(OpenAiEmbedder::new(
            api_key.clone(),
            config.openai_base_url.clone(),
        )),
        None => Arc::new(DummyEmbedder::new()),
    };
    info!("embedding provider initialized (using {})", embedder.name());
    Ok(embedder)
}
