use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use nh_core::highlights::{
    cluster_members, compute_highlights, members_of, sort_rows, validate_selection, DEFAULT_TOP_N,
};
use nh_core::{Article, Category, Error, HighlightRow, SortMode};

use crate::AppState;

/// Highlights look back this many days when no range is given.
const DEFAULT_LOOKBACK_DAYS: i64 = 14;

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let status = match &error {
            Error::InvalidDate(_) => StatusCode::BAD_REQUEST,
            Error::Http(_) | Error::Storage(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HighlightParams {
    category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    sort: Option<String>,
    top_n: Option<usize>,
    cluster_id: Option<String>,
}

struct HighlightFilters {
    category: Option<Category>,
    start: NaiveDate,
    end: NaiveDate,
    sort: SortMode,
    top_n: usize,
}

impl HighlightParams {
    fn resolve(&self) -> Result<HighlightFilters, ApiError> {
        let category = match self.category.as_deref() {
            None | Some("All") | Some("") => None,
            Some(s) => Some(
                s.parse::<Category>()
                    .map_err(|e| ApiError::bad_request(e.to_string()))?,
            ),
        };
        let today = Utc::now().date_naive();
        let end = match self.end_date.as_deref() {
            Some(s) => parse_param_date(s)?,
            None => today,
        };
        let start = match self.start_date.as_deref() {
            Some(s) => parse_param_date(s)?,
            None => today - Duration::days(DEFAULT_LOOKBACK_DAYS),
        };
        let sort = match self.sort.as_deref() {
            None => SortMode::default(),
            Some(s) => s
                .parse::<SortMode>()
                .map_err(|e| ApiError::bad_request(e.to_string()))?,
        };
        Ok(HighlightFilters {
            category,
            start,
            end,
            sort,
            top_n: self.top_n.unwrap_or(DEFAULT_TOP_N),
        })
    }
}

fn parse_param_date(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| ApiError::bad_request(format!("invalid date {}: {}", s, e)))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_highlights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HighlightParams>,
) -> Result<Json<Vec<HighlightRow>>, ApiError> {
    let filters = params.resolve()?;
    let tables = state.tables.get().await?;
    let mut rows = compute_highlights(
        &tables.clusters,
        &tables.articles,
        filters.category,
        filters.start,
        filters.end,
        filters.top_n,
    );
    // Display order only; membership was fixed at truncation.
    sort_rows(&mut rows, filters.sort);
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    /// The honored selection, cleared when the requested cluster is no
    /// longer among the current highlights.
    pub selected_cluster_id: Option<String>,
    pub articles: Vec<Article>,
}

pub async fn get_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HighlightParams>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let filters = params.resolve()?;
    let tables = state.tables.get().await?;
    let rows = compute_highlights(
        &tables.clusters,
        &tables.articles,
        filters.category,
        filters.start,
        filters.end,
        filters.top_n,
    );

    let selected = validate_selection(params.cluster_id.clone(), &rows);
    let articles = match &selected {
        Some(cluster_id) => {
            cluster_members(&tables.articles, cluster_id, filters.start, filters.end)
        }
        None => {
            let ids: Vec<String> = rows.iter().filter_map(|r| r.cluster_id.clone()).collect();
            members_of(&tables.articles, &ids, filters.start, filters.end)
        }
    };

    Ok(Json(ArticlesResponse {
        selected_cluster_id: selected,
        articles,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub session_id: String,
    pub answer: String,
}

pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    Json(params): Json<ChatParams>,
) -> Result<Json<ChatReply>, ApiError> {
    let chat = state.chat.as_ref().ok_or(ApiError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "chat is not configured".to_string(),
    })?;

    let session_id = match params.session_id {
        Some(id) => id,
        None => chat.create_session().await,
    };
    let answer = chat.query(&session_id, &params.message).await?;
    Ok(Json(ChatReply { session_id, answer }))
}
