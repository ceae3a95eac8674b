//! Highlight aggregation: group filtered articles by cluster, recompute
//! per-cluster stats, join cluster metadata, rank and truncate.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{Article, Category, Cluster, HighlightRow, SortMode};

pub const DEFAULT_TOP_N: usize = 20;

/// Aggregate the article set into ranked highlight rows.
///
/// The returned rows are truncated to `top_n` using frequency-then-recency
/// order regardless of the eventually displayed sort mode; display re-sorts
/// via [`sort_rows`] reorder the same set but never change its membership.
pub fn compute_highlights(
    clusters: &[Cluster],
    articles: &[Article],
    category: Option<Category>,
    start: NaiveDate,
    end: NaiveDate,
    top_n: usize,
) -> Vec<HighlightRow> {
    let matching: Vec<&Article> = articles
        .iter()
        .filter(|a| category.map_or(true, |c| a.category == Some(c)))
        .filter(|a| in_range(a.published, start, end))
        .collect();

    // Nothing matched, or nothing references a cluster: no highlights for
    // these filters. Not an error.
    if matching.is_empty() || matching.iter().all(|a| a.cluster_id.is_none()) {
        return Vec::new();
    }

    // Group by cluster_id; articles without one form their own bucket.
    let mut groups: HashMap<Option<String>, Vec<&Article>> = HashMap::new();
    for article in matching {
        groups.entry(article.cluster_id.clone()).or_default().push(article);
    }

    let metadata: HashMap<&str, &Cluster> = clusters
        .iter()
        .map(|c| (c.cluster_id.as_str(), c))
        .collect();

    let mut rows: Vec<HighlightRow> = groups
        .into_iter()
        .map(|(cluster_id, members)| {
            let frequency = members.len();
            let unique_sources = members
                .iter()
                .filter_map(|a| a.source.as_deref())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<HashSet<_>>()
                .len();
            let last_published = members.iter().filter_map(|a| a.published).max();
            // Left join: groups without a cluster-table match keep None
            // metadata rather than being dropped.
            let meta = cluster_id
                .as_deref()
                .and_then(|id| metadata.get(id).copied());
            HighlightRow {
                cluster_id,
                frequency,
                unique_sources,
                last_published,
                title: meta.map(|c| c.title.clone()),
                summary: meta.map(|c| c.summary.clone()),
                category: meta.and_then(|c| c.category),
                num_articles: meta.map(|c| c.num_articles),
                keywords: meta.map(|c| c.keywords.clone()).unwrap_or_default(),
            }
        })
        .collect();

    sort_rows(&mut rows, SortMode::Frequency);
    rows.truncate(top_n);
    rows
}

/// Display ordering for an already-truncated highlight set.
pub fn sort_rows(rows: &mut [HighlightRow], mode: SortMode) {
    match mode {
        SortMode::Frequency => rows.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| cmp_dates_desc(a.last_published, b.last_published))
        }),
        SortMode::Recency => rows.sort_by(|a, b| {
            cmp_dates_desc(a.last_published, b.last_published)
                .then_with(|| b.frequency.cmp(&a.frequency))
        }),
    }
}

/// Member articles of one cluster, re-filtered by the active date range but
/// not by category (category filtering already happened upstream when the
/// eligible cluster set was produced), sorted by published desc.
pub fn cluster_members(
    articles: &[Article],
    cluster_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Article> {
    let mut members: Vec<Article> = articles
        .iter()
        .filter(|a| a.cluster_id.as_deref() == Some(cluster_id))
        .filter(|a| in_range(a.published, start, end))
        .cloned()
        .collect();
    members.sort_by(|a, b| cmp_dates_desc(a.published, b.published));
    members
}

/// Union of member articles across the given clusters, same date rule as
/// [`cluster_members`]. The fallback view when no single cluster is
/// selected.
pub fn members_of(
    articles: &[Article],
    cluster_ids: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Article> {
    let wanted: HashSet<&str> = cluster_ids.iter().map(String::as_str).collect();
    let mut members: Vec<Article> = articles
        .iter()
        .filter(|a| a.cluster_id.as_deref().map_or(false, |id| wanted.contains(id)))
        .filter(|a| in_range(a.published, start, end))
        .cloned()
        .collect();
    members.sort_by(|a, b| cmp_dates_desc(a.published, b.published));
    members
}

/// A selection that no longer appears in the current highlight set is
/// cleared; callers then fall back to the all-highlighted-clusters view.
pub fn validate_selection(selected: Option<String>, rows: &[HighlightRow]) -> Option<String> {
    let selected = selected?;
    if rows
        .iter()
        .any(|r| r.cluster_id.as_deref() == Some(selected.as_str()))
    {
        Some(selected)
    } else {
        None
    }
}

fn in_range(published: Option<DateTime<Utc>>, start: NaiveDate, end: NaiveDate) -> bool {
    published.map_or(false, |p| {
        let d = p.date_naive();
        d >= start && d <= end
    })
}

fn cmp_dates_desc(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        // Dated rows sort ahead of undated ones.
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
