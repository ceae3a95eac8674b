use std::env;

use crate::{Error, Result};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Environment-backed application configuration. Required values missing at
/// startup are a configuration error: fail fast, never retried.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sheet_url: String,
    pub weaviate_url: Option<String>,
    pub weaviate_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let sheet_url = env::var("SHEET_URL")
            .map_err(|_| Error::Config("SHEET_URL is not set".to_string()))?;

        Ok(Self {
            sheet_url,
            weaviate_url: env::var("WEAVIATE_URL").ok().filter(|v| !v.is_empty()),
            weaviate_api_key: env::var("WEAVIATE_API_KEY").ok().filter(|v| !v.is_empty()),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        })
    }
}
