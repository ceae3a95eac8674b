use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;

use nh_core::filter::{Collection, Condition, Filter, QueryMode, QueryPlan};
use nh_core::{Article, Cluster, Error, NewsSearch, Result, ScoredArticle, ScoredCluster};

const CLUSTER_FIELDS: &str = "cluster_id title summary category num_articles keywords";
const ARTICLE_FIELDS: &str = "url title author published summary category source";

/// Backend for the hosted vector database, speaking its GraphQL API.
/// Filter conditions translate to `where` operands; hybrid plans carry the
/// query text, blend weight and query vector; fetch plans are a plain
/// filtered `Get`.
pub struct WeaviateStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeaviateStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn graphql(&self, query: String) -> Result<Value> {
        let mut request = self
            .client
            .post(format!("{}/v1/graphql", self.base_url.trim_end_matches('/')))
            .json(&serde_json::json!({ "query": query }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let body: Value = request.send().await?.error_for_status()?.json().await?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect();
                return Err(Error::Storage(messages.join("; ")));
            }
        }
        Ok(body)
    }

    fn objects<'a>(body: &'a Value, class: &str) -> &'a [Value] {
        body.get("data")
            .and_then(|d| d.get("Get"))
            .and_then(|g| g.get(class))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[async_trait]
impl NewsSearch for WeaviateStore {
    async fn search_clusters(&self, plan: &QueryPlan) -> Result<Vec<ScoredCluster>> {
        if plan.collection != Collection::Clusters {
            return Err(Error::Config(
                "article plan executed against the cluster collection".to_string(),
            ));
        }
        plan.filter.validate_for(plan.collection)?;

        let query = format!(
            "{{ Get {{ Cluster({}) {{ {} _additional {{ score }} }} }} }}",
            render_args(plan),
            CLUSTER_FIELDS
        );
        let body = self.graphql(query).await?;

        Ok(Self::objects(&body, "Cluster")
            .iter()
            .filter_map(|obj| {
                Some(ScoredCluster {
                    cluster: Cluster::from_row(obj)?,
                    score: parse_score(obj),
                })
            })
            .collect())
    }

    async fn search_articles(&self, plan: &QueryPlan) -> Result<Vec<ScoredArticle>> {
        if plan.collection != Collection::Articles {
            return Err(Error::Config(
                "cluster plan executed against the article collection".to_string(),
            ));
        }
        plan.filter.validate_for(plan.collection)?;

        let query = format!(
            "{{ Get {{ Article({}) {{ {} cluster {{ ... on Cluster {{ {} }} }} _additional {{ score }} }} }} }}",
            render_args(plan),
            ARTICLE_FIELDS,
            CLUSTER_FIELDS
        );
        let body = self.graphql(query).await?;

        Ok(Self::objects(&body, "Article")
            .iter()
            .filter_map(|obj| {
                let mut article = Article::from_row(obj)?;
                // The article class carries the reference, not a scalar id;
                // resolve both from the joined object when present.
                let cluster = obj
                    .get("cluster")
                    .and_then(Value::as_array)
                    .and_then(|refs| refs.first())
                    .and_then(Cluster::from_row);
                if article.cluster_id.is_none() {
                    article.cluster_id = cluster.as_ref().map(|c| c.cluster_id.clone());
                }
                Some(ScoredArticle {
                    article,
                    cluster,
                    score: parse_score(obj),
                })
            })
            .collect())
    }
}

fn render_args(plan: &QueryPlan) -> String {
    let mut args = vec![format!("limit: {}", plan.limit)];
    if let Some(where_clause) = render_where(&plan.filter) {
        args.push(format!("where: {}", where_clause));
    }
    if let QueryMode::Hybrid { query, vector, alpha } = &plan.mode {
        let vector: Vec<String> = vector.iter().map(f32::to_string).collect();
        args.push(format!(
            "hybrid: {{query: {}, alpha: {}, vector: [{}]}}",
            gql_string(query),
            alpha,
            vector.join(", ")
        ));
    }
    args.join(", ")
}

fn render_where(filter: &Filter) -> Option<String> {
    let operands: Vec<String> = filter.conditions().iter().map(render_condition).collect();
    match operands.len() {
        0 => None,
        1 => Some(operands.into_iter().next().unwrap_or_default()),
        _ => Some(format!(
            "{{operator: And, operands: [{}]}}",
            operands.join(", ")
        )),
    }
}

fn render_condition(condition: &Condition) -> String {
    match condition {
        Condition::CategoryEq(category) => format!(
            "{{path: [\"category\"], operator: Equal, valueText: {}}}",
            gql_string(category.as_str())
        ),
        Condition::PublishedSince(bound) => format!(
            "{{path: [\"published\"], operator: GreaterThanEqual, valueDate: {}}}",
            gql_string(&bound.to_rfc3339_opts(SecondsFormat::Secs, true))
        ),
        Condition::PublishedUntil(bound) => format!(
            "{{path: [\"published\"], operator: LessThanEqual, valueDate: {}}}",
            gql_string(&bound.to_rfc3339_opts(SecondsFormat::Secs, true))
        ),
        Condition::ClusterRef(cluster_id) => format!(
            "{{path: [\"cluster\", \"Cluster\", \"cluster_id\"], operator: Equal, valueText: {}}}",
            gql_string(cluster_id)
        ),
    }
}

/// GraphQL string literals share JSON's escaping rules.
fn gql_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// The relevance score comes back as a string in `_additional`.
fn parse_score(obj: &Value) -> Option<f64> {
    let score = obj.get("_additional")?.get("score")?;
    match score {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
