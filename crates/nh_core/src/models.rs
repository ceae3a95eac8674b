use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Finance,
    Music,
    Lifestyle,
    Sports,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Finance,
        Category::Music,
        Category::Lifestyle,
        Category::Sports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Finance => "Finance",
            Category::Music => "Music",
            Category::Lifestyle => "Lifestyle",
            Category::Sports => "Sports",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Finance" => Ok(Category::Finance),
            "Music" => Ok(Category::Music),
            "Lifestyle" => Ok(Category::Lifestyle),
            "Sports" => Ok(Category::Sports),
            other => Err(crate::Error::Config(format!("unknown category: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Unparseable timestamps become `None` and stay out of all date math.
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub cluster_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub category: Option<Category>,
    /// Externally computed count, informational only. Highlight ranking
    /// always recomputes its own frequency from the filtered article set.
    #[serde(default)]
    pub num_articles: u64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    Frequency,
    Recency,
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Frequency
    }
}

impl FromStr for SortMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "frequency" => Ok(SortMode::Frequency),
            "recency" => Ok(SortMode::Recency),
            other => Err(crate::Error::Config(format!("unknown sort mode: {}", other))),
        }
    }
}

/// One ranked highlight: per-cluster stats recomputed from the filtered
/// article set, with cluster metadata left-joined in. Metadata fields stay
/// `None` when the cluster table has no matching row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightRow {
    pub cluster_id: Option<String>,
    pub frequency: usize,
    pub unique_sources: usize,
    pub last_published: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub category: Option<Category>,
    pub num_articles: Option<u64>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCluster {
    #[serde(flatten)]
    pub cluster: Cluster,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: Article,
    /// Denormalized metadata of the referenced cluster, when the reference
    /// resolves.
    pub cluster: Option<Cluster>,
    pub score: Option<f64>,
}

impl Article {
    /// Build an article from a loosely-typed row. Unknown fields are
    /// ignored; a row without a url is skipped entirely.
    pub fn from_row(row: &Value) -> Option<Self> {
        let url = field_string(row.get("url"))?;
        Some(Self {
            url,
            title: field_string(row.get("title")).unwrap_or_default(),
            author: field_string(row.get("author")),
            published: row
                .get("published")
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
            summary: field_string(row.get("summary")).unwrap_or_default(),
            category: field_string(row.get("category")).and_then(|s| s.parse().ok()),
            source: field_string(row.get("source")),
            cluster_id: field_string(row.get("cluster_id")),
        })
    }
}

impl Cluster {
    /// Build a cluster from a loosely-typed row. A row without a cluster_id
    /// is skipped entirely.
    pub fn from_row(row: &Value) -> Option<Self> {
        let cluster_id = field_string(row.get("cluster_id"))?;
        Some(Self {
            cluster_id,
            title: field_string(row.get("title")).unwrap_or_default(),
            summary: field_string(row.get("summary")).unwrap_or_default(),
            category: field_string(row.get("category")).and_then(|s| s.parse().ok()),
            num_articles: row
                .get("num_articles")
                .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
                .unwrap_or(0),
            keywords: parse_keywords(row.get("keywords")),
        })
    }
}

/// Tolerant timestamp parsing: RFC 3339 first, then the common
/// space/`T`-separated forms, then bare dates at midnight. Anything else is
/// `None` rather than an error.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
    }
    None
}

/// Keywords arrive either as a JSON array of strings or as a stringified
/// list like `"['rates', 'bonds']"` from the spreadsheet export.
pub fn parse_keywords(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| field_string(Some(v)))
            .collect(),
        Some(Value::String(s)) => s
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|k| k.trim().trim_matches(|c| c == '\'' || c == '"').trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn field_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn article_row_with_bad_date_keeps_record() {
        let row = json!({
            "url": "http://example.com/a",
            "title": "A",
            "published": "not a date",
            "category": "Finance",
            "cluster_id": "c1"
        });
        let article = Article::from_row(&row).unwrap();
        assert!(article.published.is_none());
        assert_eq!(article.category, Some(Category::Finance));
        assert_eq!(article.cluster_id.as_deref(), Some("c1"));
    }

    #[test]
    fn article_row_without_url_is_skipped() {
        assert!(Article::from_row(&json!({ "title": "no url" })).is_none());
    }

    #[test]
    fn unknown_category_becomes_none() {
        let row = json!({ "url": "http://example.com/a", "category": "Politics" });
        let article = Article::from_row(&row).unwrap();
        assert!(article.category.is_none());
    }

    #[test]
    fn cluster_row_parses_stringified_keywords() {
        let row = json!({
            "cluster_id": "c1",
            "title": "Rates",
            "num_articles": "7",
            "keywords": "['rates', \"bonds\", 'fed']"
        });
        let cluster = Cluster::from_row(&row).unwrap();
        assert_eq!(cluster.num_articles, 7);
        assert_eq!(cluster.keywords, vec!["rates", "bonds", "fed"]);
    }

    #[test]
    fn cluster_row_parses_array_keywords() {
        let row = json!({ "cluster_id": "c1", "title": "T", "keywords": ["a", "b"] });
        assert_eq!(Cluster::from_row(&row).unwrap().keywords, vec!["a", "b"]);
    }

    #[test]
    fn timestamp_forms() {
        assert_eq!(
            parse_timestamp("2026-01-18T09:30:00Z").unwrap().to_rfc3339(),
            "2026-01-18T09:30:00+00:00"
        );
        assert!(parse_timestamp("2026-01-18 09:30:00").is_some());
        assert!(parse_timestamp("2026-01-18").is_some());
        assert!(parse_timestamp("soon").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
