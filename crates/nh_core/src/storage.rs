use async_trait::async_trait;

use crate::filter::QueryPlan;
use crate::models::{Article, Cluster, ScoredArticle, ScoredCluster};
use crate::Result;

/// Bulk read of the two record tables, keyed by named columns upstream.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn load_clusters(&self) -> Result<Vec<Cluster>>;

    async fn load_articles(&self) -> Result<Vec<Article>>;
}

/// Filtered, optionally relevance-ranked queries over the two collections.
///
/// Hybrid plans return results ordered by the collection's own relevance
/// score; fetch plans keep natural storage order. Article results carry the
/// referenced cluster's denormalized metadata when the reference resolves.
#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search_clusters(&self, plan: &QueryPlan) -> Result<Vec<ScoredCluster>>;

    async fn search_articles(&self, plan: &QueryPlan) -> Result<Vec<ScoredArticle>>;
}

/// Text to fixed-length vector. Callers never inspect the contents.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
