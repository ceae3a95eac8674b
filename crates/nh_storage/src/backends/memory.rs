use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use nh_core::filter::{Collection, QueryMode, QueryPlan};
use nh_core::{Article, Cluster, Error, NewsSearch, Result, ScoredArticle, ScoredCluster, TableSource};

use crate::cache::Tables;

/// In-process backend implementing both the bulk-read and search contracts.
/// Fetch plans apply the filter in insertion order; hybrid plans blend
/// vector similarity with keyword overlap by the plan's alpha.
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    clusters: Vec<(Cluster, Option<Vec<f32>>)>,
    articles: Vec<(Article, Option<Vec<f32>>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Insert or replace by cluster_id.
    pub async fn insert_cluster(&self, cluster: Cluster, embedding: Option<Vec<f32>>) {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner
            .clusters
            .iter_mut()
            .find(|(c, _)| c.cluster_id == cluster.cluster_id)
        {
            *slot = (cluster, embedding);
        } else {
            inner.clusters.push((cluster, embedding));
        }
    }

    /// Insert or replace by url.
    pub async fn insert_article(&self, article: Article, embedding: Option<Vec<f32>>) {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.articles.iter_mut().find(|(a, _)| a.url == article.url) {
            *slot = (article, embedding);
        } else {
            inner.articles.push((article, embedding));
        }
    }

    pub async fn seed_tables(&self, tables: Tables) {
        let mut inner = self.inner.write().await;
        inner.clusters = tables.clusters.into_iter().map(|c| (c, None)).collect();
        inner.articles = tables.articles.into_iter().map(|a| (a, None)).collect();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableSource for MemoryStore {
    async fn load_clusters(&self) -> Result<Vec<Cluster>> {
        let inner = self.inner.read().await;
        Ok(inner.clusters.iter().map(|(c, _)| c.clone()).collect())
    }

    async fn load_articles(&self) -> Result<Vec<Article>> {
        let inner = self.inner.read().await;
        Ok(inner.articles.iter().map(|(a, _)| a.clone()).collect())
    }
}

#[async_trait]
impl NewsSearch for MemoryStore {
    async fn search_clusters(&self, plan: &QueryPlan) -> Result<Vec<ScoredCluster>> {
        if plan.collection != Collection::Clusters {
            return Err(Error::Config(
                "article plan executed against the cluster collection".to_string(),
            ));
        }
        plan.filter.validate_for(plan.collection)?;

        let inner = self.inner.read().await;
        let candidates = inner
            .clusters
            .iter()
            .filter(|(c, _)| plan.filter.matches_cluster(c));

        match &plan.mode {
            QueryMode::Fetch => Ok(candidates
                .take(plan.limit)
                .map(|(c, _)| ScoredCluster {
                    cluster: c.clone(),
                    score: None,
                })
                .collect()),
            QueryMode::Hybrid { query, vector, alpha } => {
                let mut scored: Vec<ScoredCluster> = candidates
                    .map(|(c, embedding)| {
                        let text =
                            format!("{} {} {}", c.title, c.summary, c.keywords.join(" "));
                        let score = blend(query, &text, vector, embedding.as_deref(), *alpha);
                        ScoredCluster {
                            cluster: c.clone(),
                            score: Some(score),
                        }
                    })
                    .collect();
                sort_by_score(&mut scored, |s| s.score);
                scored.truncate(plan.limit);
                Ok(scored)
            }
        }
    }

    async fn search_articles(&self, plan: &QueryPlan) -> Result<Vec<ScoredArticle>> {
        if plan.collection != Collection::Articles {
            return Err(Error::Config(
                "cluster plan executed against the article collection".to_string(),
            ));
        }
        plan.filter.validate_for(plan.collection)?;

        let inner = self.inner.read().await;
        let resolve = |article: &Article| -> Option<Cluster> {
            let id = article.cluster_id.as_deref()?;
            inner
                .clusters
                .iter()
                .find(|(c, _)| c.cluster_id == id)
                .map(|(c, _)| c.clone())
        };
        let candidates = inner
            .articles
            .iter()
            .filter(|(a, _)| plan.filter.matches_article(a));

        match &plan.mode {
            QueryMode::Fetch => Ok(candidates
                .take(plan.limit)
                .map(|(a, _)| ScoredArticle {
                    cluster: resolve(a),
                    article: a.clone(),
                    score: None,
                })
                .collect()),
            QueryMode::Hybrid { query, vector, alpha } => {
                let mut scored: Vec<ScoredArticle> = candidates
                    .map(|(a, embedding)| {
                        let text = format!(
                            "{} {} {} {}",
                            a.title,
                            a.summary,
                            a.author.as_deref().unwrap_or(""),
                            a.source.as_deref().unwrap_or("")
                        );
                        let score = blend(query, &text, vector, embedding.as_deref(), *alpha);
                        ScoredArticle {
                            cluster: resolve(a),
                            article: a.clone(),
                            score: Some(score),
                        }
                    })
                    .collect();
                sort_by_score(&mut scored, |s| s.score);
                scored.truncate(plan.limit);
                Ok(scored)
            }
        }
    }
}

fn blend(
    query: &str,
    text: &str,
    query_vector: &[f32],
    embedding: Option<&[f32]>,
    alpha: f32,
) -> f64 {
    let semantic = embedding.map_or(0.0, |e| cosine(query_vector, e));
    let keyword = keyword_overlap(query, text);
    (alpha as f64) * semantic + (1.0 - alpha as f64) * keyword
}

/// Fraction of query tokens appearing in the text.
fn keyword_overlap(query: &str, text: &str) -> f64 {
    let text = text.to_lowercase();
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let hits = tokens
        .iter()
        .filter(|t| text.contains(&t.to_lowercase()))
        .count();
    hits as f64 / tokens.len() as f64
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

fn sort_by_score<T>(items: &mut [T], score: impl Fn(&T) -> Option<f64>) {
    items.sort_by(|a, b| {
        score(b)
            .unwrap_or(0.0)
            .partial_cmp(&score(a).unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
