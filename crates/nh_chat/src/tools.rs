use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use nh_core::filter::{ArticleQuery, ClusterQuery};
use nh_core::{Embedder, NewsSearch, Result, ScoredArticle, ScoredCluster};

/// Stable tool output shape: a count plus the ordered records.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput<T> {
    pub count: usize,
    pub results: Vec<T>,
}

/// The two retrieval tools exposed to the agent. The search handle and the
/// embedding provider are injected explicitly; the tools hold no ambient
/// state.
pub struct NewsTools {
    search: Arc<dyn NewsSearch>,
    embedder: Arc<dyn Embedder>,
}

impl NewsTools {
    pub fn new(search: Arc<dyn NewsSearch>, embedder: Arc<dyn Embedder>) -> Self {
        Self { search, embedder }
    }

    pub async fn search_clusters(&self, query: ClusterQuery) -> Result<ToolOutput<ScoredCluster>> {
        let vector = self.query_vector(&query.query).await?;
        let plan = query.plan(vector)?;
        let results = self.search.search_clusters(&plan).await?;
        debug!(count = results.len(), "search_clusters");
        Ok(ToolOutput {
            count: results.len(),
            results,
        })
    }

    pub async fn search_articles(&self, query: ArticleQuery) -> Result<ToolOutput<ScoredArticle>> {
        let vector = self.query_vector(&query.query).await?;
        let plan = query.plan(vector)?;
        let results = self.search.search_articles(&plan).await?;
        debug!(count = results.len(), "search_articles");
        Ok(ToolOutput {
            count: results.len(),
            results,
        })
    }

    async fn query_vector(&self, query: &str) -> Result<Option<Vec<f32>>> {
        let q = query.trim();
        if q.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.embedder.embed(q).await?))
    }
}

/// Function-tool declarations sent with every chat completion request.
pub fn tool_definitions() -> Vec<Value> {
    let category = json!({
        "type": "string",
        "enum": ["Finance", "Music", "Lifestyle", "Sports"],
        "description": "Exact category name"
    });
    vec![
        json!({
            "type": "function",
            "function": {
                "name": "search_clusters",
                "description": "Search news story clusters (topics, highlights, stories). Clusters carry no dates.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Free-text query; empty relies on filters only" },
                        "category": category.clone(),
                        "limit": { "type": "integer" }
                    }
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": "search_articles",
                "description": "Search articles; supports date range, category and cluster filters.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Free-text query; empty relies on filters only" },
                        "category": category,
                        "start_date": { "type": "string", "description": "YYYY-MM-DD inclusive lower bound" },
                        "end_date": { "type": "string", "description": "YYYY-MM-DD inclusive upper bound" },
                        "cluster_id": { "type": "string", "description": "Restrict to one cluster" },
                        "limit": { "type": "integer" }
                    }
                }
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use nh_core::models::parse_timestamp;
    use nh_core::{Article, Category, Cluster};
    use nh_inference::DummyEmbedder;
    use nh_storage::MemoryStore;

    async fn seeded_tools() -> NewsTools {
        let store = MemoryStore::new();
        store
            .insert_cluster(
                Cluster {
                    cluster_id: "c1".to_string(),
                    title: "central bank rates".to_string(),
                    summary: "rates everywhere".to_string(),
                    category: Some(Category::Finance),
                    num_articles: 2,
                    keywords: vec!["rates".to_string()],
                },
                None,
            )
            .await;
        for i in 0..3 {
            store
                .insert_article(
                    Article {
                        url: format!("http://example.com/{}", i),
                        title: format!("rates story {}", i),
                        author: Some("Jane Doe".to_string()),
                        published: parse_timestamp("2026-01-20T08:00:00Z"),
                        summary: String::new(),
                        category: Some(Category::Finance),
                        source: Some("wire".to_string()),
                        cluster_id: Some("c1".to_string()),
                    },
                    None,
                )
                .await;
        }
        NewsTools::new(Arc::new(store), Arc::new(DummyEmbedder::new()))
    }

    #[tokio::test]
    async fn cluster_tool_counts_its_results() {
        let tools = seeded_tools().await;
        let out = tools
            .search_clusters(ClusterQuery {
                query: "rates".to_string(),
                category: Some(Category::Finance),
                limit: 5,
            })
            .await
            .unwrap();
        assert_eq!(out.count, out.results.len());
        assert_eq!(out.results[0].cluster.cluster_id, "c1");
        // Hybrid mode: the collection's relevance score is present.
        assert!(out.results[0].score.is_some());
    }

    #[tokio::test]
    async fn empty_query_skips_embedding_and_scores() {
        let tools = seeded_tools().await;
        let out = tools
            .search_articles(ArticleQuery::default())
            .await
            .unwrap();
        assert_eq!(out.count, 3);
        assert!(out.results.iter().all(|r| r.score.is_none()));
    }

    #[tokio::test]
    async fn article_results_carry_joined_cluster() {
        let tools = seeded_tools().await;
        let out = tools
            .search_articles(ArticleQuery {
                cluster_id: Some("c1".to_string()),
                ..ArticleQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(out.count, 3);
        assert!(out
            .results
            .iter()
            .all(|r| r.cluster.as_ref().map(|c| c.cluster_id.as_str()) == Some("c1")));
    }

    #[test]
    fn definitions_cover_both_tools() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0]["function"]["name"], "search_clusters");
        assert_eq!(defs[1]["function"]["name"], "search_articles");
        // Only the article tool takes dates.
        assert!(defs[0]["function"]["parameters"]["properties"]
            .get("start_date")
            .is_none());
        assert!(defs[1]["function"]["parameters"]["properties"]
            .get("start_date")
            .is_some());
    }
}
