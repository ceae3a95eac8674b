//! Filter construction and query planning for the cluster and article
//! collections. A plan is either a plain filtered fetch or a hybrid
//! keyword+vector search, chosen by whether the trimmed query text is empty.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use crate::models::{parse_timestamp, Article, Category, Cluster};
use crate::{Error, Result};

/// Floor applied to every caller-supplied limit, so downstream aggregation
/// always has enough raw material. A floor, not a cap: `limit=5` still
/// returns up to 50 records.
pub const RESULT_FLOOR: usize = 50;

/// Hybrid blend weight for cluster search.
pub const CLUSTER_ALPHA: f32 = 0.7;

/// Hybrid blend weight for article search. Keyword matching weighs more here
/// than for clusters, since exact author and title matches matter.
pub const ARTICLE_ALPHA: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Clusters,
    Articles,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    CategoryEq(Category),
    PublishedSince(DateTime<Utc>),
    PublishedUntil(DateTime<Utc>),
    ClusterRef(String),
}

impl Condition {
    /// Clusters carry no temporal attribute and no cluster reference; only
    /// category equality may target them.
    fn allowed_on(&self, collection: Collection) -> bool {
        match self {
            Condition::CategoryEq(_) => true,
            Condition::PublishedSince(_)
            | Condition::PublishedUntil(_)
            | Condition::ClusterRef(_) => collection == Collection::Articles,
        }
    }
}

/// Conjunction of atomic predicates. Absent filters are omitted entirely,
/// never represented as match-all placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Reject conditions that may not target the given collection. Date
    /// predicates on the cluster collection are a programming-contract
    /// violation, not a runtime condition.
    pub fn validate_for(&self, collection: Collection) -> Result<()> {
        for condition in &self.conditions {
            if !condition.allowed_on(collection) {
                return Err(Error::Config(format!(
                    "condition {:?} is not valid for {:?}",
                    condition, collection
                )));
            }
        }
        Ok(())
    }

    pub fn matches_article(&self, article: &Article) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::CategoryEq(category) => article.category == Some(*category),
            // Articles without a parseable date neither match nor break the
            // range test.
            Condition::PublishedSince(bound) => {
                article.published.map_or(false, |p| p >= *bound)
            }
            Condition::PublishedUntil(bound) => {
                article.published.map_or(false, |p| p <= *bound)
            }
            Condition::ClusterRef(id) => article.cluster_id.as_deref() == Some(id.as_str()),
        })
    }

    pub fn matches_cluster(&self, cluster: &Cluster) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::CategoryEq(category) => cluster.category == Some(*category),
            _ => false,
        })
    }
}

/// Normalize a date-only lower bound to the start of that day (UTC). Inputs
/// already carrying a time component pass through unchanged.
pub fn start_bound(input: &str) -> Result<DateTime<Utc>> {
    let s = input.trim();
    if s.contains('T') {
        return parse_timestamp(s).ok_or_else(|| Error::InvalidDate(s.to_string()));
    }
    let date = parse_date(s)?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Normalize a date-only upper bound to the end of that day (UTC), inclusive.
pub fn end_bound(input: &str) -> Result<DateTime<Utc>> {
    let s = input.trim();
    if s.contains('T') {
        return parse_timestamp(s).ok_or_else(|| Error::InvalidDate(s.to_string()));
    }
    let date = parse_date(s)?;
    Utc.with_ymd_and_hms(date.year(), date.month(), date.day(), 23, 59, 59)
        .single()
        .ok_or_else(|| Error::InvalidDate(s.to_string()))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::InvalidDate(format!("{}: {}", s, e)))
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryMode {
    /// Plain filtered fetch, natural storage order.
    Fetch,
    /// Keyword relevance blended with vector similarity, ranked by the
    /// collection's own relevance score.
    Hybrid {
        query: String,
        vector: Vec<f32>,
        alpha: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub collection: Collection,
    pub mode: QueryMode,
    pub filter: Filter,
    pub limit: usize,
}

fn default_cluster_limit() -> usize {
    5
}

fn default_article_limit() -> usize {
    10
}

/// User-facing cluster search inputs. Also the tool-call argument shape.
/// There is deliberately no date field here.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default = "default_cluster_limit")]
    pub limit: usize,
}

impl Default for ClusterQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: None,
            limit: default_cluster_limit(),
        }
    }
}

/// User-facing article search inputs. Also the tool-call argument shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default = "default_article_limit")]
    pub limit: usize,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: None,
            start_date: None,
            end_date: None,
            cluster_id: None,
            limit: default_article_limit(),
        }
    }
}

impl ClusterQuery {
    /// Compile into an executable plan. `vector` must be present when the
    /// trimmed query text is non-empty.
    pub fn plan(&self, vector: Option<Vec<f32>>) -> Result<QueryPlan> {
        let mut filter = Filter::new();
        if let Some(category) = self.category {
            filter = filter.and(Condition::CategoryEq(category));
        }
        let plan = QueryPlan {
            collection: Collection::Clusters,
            mode: plan_mode(&self.query, vector, CLUSTER_ALPHA)?,
            filter,
            limit: self.limit.max(RESULT_FLOOR),
        };
        plan.filter.validate_for(plan.collection)?;
        Ok(plan)
    }
}

impl ArticleQuery {
    pub fn plan(&self, vector: Option<Vec<f32>>) -> Result<QueryPlan> {
        let mut filter = Filter::new();
        if let Some(category) = self.category {
            filter = filter.and(Condition::CategoryEq(category));
        }
        if let Some(start) = non_blank(self.start_date.as_deref()) {
            filter = filter.and(Condition::PublishedSince(start_bound(start)?));
        }
        if let Some(end) = non_blank(self.end_date.as_deref()) {
            filter = filter.and(Condition::PublishedUntil(end_bound(end)?));
        }
        if let Some(cluster_id) = non_blank(self.cluster_id.as_deref()) {
            filter = filter.and(Condition::ClusterRef(cluster_id.to_string()));
        }
        let plan = QueryPlan {
            collection: Collection::Articles,
            mode: plan_mode(&self.query, vector, ARTICLE_ALPHA)?,
            filter,
            limit: self.limit.max(RESULT_FLOOR),
        };
        plan.filter.validate_for(plan.collection)?;
        Ok(plan)
    }
}

fn plan_mode(query: &str, vector: Option<Vec<f32>>, alpha: f32) -> Result<QueryMode> {
    let q = query.trim();
    if q.is_empty() {
        return Ok(QueryMode::Fetch);
    }
    let vector = vector
        .ok_or_else(|| Error::Config("hybrid search requires a query embedding".to_string()))?;
    Ok(QueryMode::Hybrid {
        query: q.to_string(),
        vector,
        alpha,
    })
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_bounds_normalize_to_day_edges() {
        assert_eq!(
            start_bound("2026-01-18").unwrap().to_rfc3339(),
            "2026-01-18T00:00:00+00:00"
        );
        assert_eq!(
            end_bound("2026-01-25").unwrap().to_rfc3339(),
            "2026-01-25T23:59:59+00:00"
        );
    }

    #[test]
    fn bounds_with_time_component_pass_through() {
        assert_eq!(
            start_bound("2026-01-18T07:15:00Z").unwrap().to_rfc3339(),
            "2026-01-18T07:15:00+00:00"
        );
        assert_eq!(
            end_bound("2026-01-25T07:15:00Z").unwrap().to_rfc3339(),
            "2026-01-25T07:15:00+00:00"
        );
    }

    #[test]
    fn garbage_bound_is_an_error() {
        assert!(start_bound("January the 18th").is_err());
        assert!(end_bound("2026-13-99").is_err());
    }

    #[test]
    fn cluster_plans_never_carry_date_predicates() {
        let plan = ClusterQuery {
            query: String::new(),
            category: Some(Category::Sports),
            limit: 5,
        }
        .plan(None)
        .unwrap();

        assert!(plan
            .filter
            .conditions()
            .iter()
            .all(|c| matches!(c, Condition::CategoryEq(_))));
    }

    #[test]
    fn date_conditions_rejected_for_cluster_collection() {
        let filter = Filter::new().and(Condition::PublishedSince(
            start_bound("2026-01-18").unwrap(),
        ));
        assert!(filter.validate_for(Collection::Clusters).is_err());
        assert!(filter.validate_for(Collection::Articles).is_ok());
    }

    #[test]
    fn empty_or_blank_query_fetches() {
        let plan = ArticleQuery::default().plan(None).unwrap();
        assert_eq!(plan.mode, QueryMode::Fetch);

        let plan = ArticleQuery {
            query: "   ".to_string(),
            ..ArticleQuery::default()
        }
        .plan(None)
        .unwrap();
        assert_eq!(plan.mode, QueryMode::Fetch);
    }

    #[test]
    fn non_empty_query_goes_hybrid_with_collection_alpha() {
        let plan = ClusterQuery {
            query: "interest rates".to_string(),
            category: None,
            limit: 5,
        }
        .plan(Some(vec![0.1, 0.2]))
        .unwrap();
        match plan.mode {
            QueryMode::Hybrid { alpha, .. } => assert_eq!(alpha, CLUSTER_ALPHA),
            other => panic!("expected hybrid, got {:?}", other),
        }

        let plan = ArticleQuery {
            query: "Jane Doe".to_string(),
            ..ArticleQuery::default()
        }
        .plan(Some(vec![0.1, 0.2]))
        .unwrap();
        match plan.mode {
            QueryMode::Hybrid { alpha, .. } => assert_eq!(alpha, ARTICLE_ALPHA),
            other => panic!("expected hybrid, got {:?}", other),
        }
    }

    #[test]
    fn hybrid_without_vector_is_a_config_error() {
        let result = ClusterQuery {
            query: "rates".to_string(),
            category: None,
            limit: 5,
        }
        .plan(None);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn limit_is_a_floor_not_a_cap() {
        let plan = ArticleQuery {
            limit: 5,
            ..ArticleQuery::default()
        }
        .plan(None)
        .unwrap();
        assert_eq!(plan.limit, RESULT_FLOOR);

        let plan = ArticleQuery {
            limit: 120,
            ..ArticleQuery::default()
        }
        .plan(None)
        .unwrap();
        assert_eq!(plan.limit, 120);
    }

    #[test]
    fn blank_filter_inputs_are_omitted() {
        let plan = ArticleQuery {
            start_date: Some(String::new()),
            end_date: Some("  ".to_string()),
            cluster_id: Some(String::new()),
            ..ArticleQuery::default()
        }
        .plan(None)
        .unwrap();
        assert!(plan.filter.is_empty());
    }

    #[test]
    fn article_filter_matches_composed_conditions() {
        use crate::models::Article;

        let filter = Filter::new()
            .and(Condition::CategoryEq(Category::Finance))
            .and(Condition::PublishedSince(start_bound("2026-01-18").unwrap()))
            .and(Condition::PublishedUntil(end_bound("2026-01-25").unwrap()));

        let mut article = Article {
            url: "http://example.com/a".to_string(),
            title: "A".to_string(),
            author: None,
            published: parse_timestamp("2026-01-20T12:00:00Z"),
            summary: String::new(),
            category: Some(Category::Finance),
            source: None,
            cluster_id: None,
        };
        assert!(filter.matches_article(&article));

        article.published = None;
        assert!(!filter.matches_article(&article));

        article.published = parse_timestamp("2026-02-01T12:00:00Z");
        assert!(!filter.matches_article(&article));
    }
}
