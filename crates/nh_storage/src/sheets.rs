use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use nh_core::{Article, Cluster, Error, Result, TableSource};

const CLUSTERS_WORKSHEET: &str = "clusters_db";
const ARTICLES_WORKSHEET: &str = "articles_db";

/// Table source reading the spreadsheet-published worksheets as JSON row
/// arrays over HTTP. Rows are loosely typed; unknown columns (including any
/// exported `embedding` column) are ignored and malformed rows are skipped.
pub struct SheetSource {
    client: reqwest::Client,
    base_url: String,
}

impl SheetSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn load_rows(&self, worksheet: &str) -> Result<Vec<Value>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), worksheet);
        let rows: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        match rows {
            Value::Array(rows) => Ok(rows),
            other => Err(Error::Storage(format!(
                "worksheet {} did not return a row array: {}",
                worksheet,
                value_kind(&other)
            ))),
        }
    }
}

#[async_trait]
impl TableSource for SheetSource {
    async fn load_clusters(&self) -> Result<Vec<Cluster>> {
        let rows = self.load_rows(CLUSTERS_WORKSHEET).await?;
        let total = rows.len();
        let clusters: Vec<Cluster> = rows.iter().filter_map(Cluster::from_row).collect();
        if clusters.len() < total {
            warn!(
                skipped = total - clusters.len(),
                "skipped cluster rows without a cluster_id"
            );
        }
        Ok(clusters)
    }

    async fn load_articles(&self) -> Result<Vec<Article>> {
        let rows = self.load_rows(ARTICLES_WORKSHEET).await?;
        let total = rows.len();
        let articles: Vec<Article> = rows.iter().filter_map(Article::from_row).collect();
        if articles.len() < total {
            warn!(
                skipped = total - articles.len(),
                "skipped article rows without a url"
            );
        }
        Ok(articles)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
