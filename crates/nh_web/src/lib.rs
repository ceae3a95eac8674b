use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/highlights", get(handlers::get_highlights))
        .route("/api/articles", get(handlers::get_articles))
        .route("/api/chat", post(handlers::post_chat))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(addr: &str, state: AppState) -> nh_core::Result<()> {
    let app = create_app(state).await;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use nh_core::models::parse_timestamp;
    use nh_core::{Article, Category, Cluster};
    use nh_storage::{CachedTables, MemoryStore};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn seeded_app() -> Router {
        let store = MemoryStore::new();
        store
            .insert_cluster(
                Cluster {
                    cluster_id: "c1".to_string(),
                    title: "rate cuts".to_string(),
                    summary: "central banks".to_string(),
                    category: Some(Category::Finance),
                    num_articles: 2,
                    keywords: vec!["rates".to_string()],
                },
                None,
            )
            .await;
        for (url, cluster_id, published) in [
            ("http://example.com/1", "c1", "2026-08-01T08:00:00Z"),
            ("http://example.com/2", "c1", "2026-08-02T08:00:00Z"),
            ("http://example.com/3", "c2", "2026-08-03T08:00:00Z"),
        ] {
            store
                .insert_article(
                    Article {
                        url: url.to_string(),
                        title: url.to_string(),
                        author: None,
                        published: parse_timestamp(published),
                        summary: String::new(),
                        category: Some(Category::Finance),
                        source: Some("wire".to_string()),
                        cluster_id: Some(cluster_id.to_string()),
                    },
                    None,
                )
                .await;
        }

        let state = AppState {
            tables: CachedTables::new(std::sync::Arc::new(store), Duration::from_secs(600)),
            chat: None,
        };
        create_app(state).await
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn highlights_endpoint_aggregates_and_ranks() {
        let app = seeded_app().await;
        let (status, body) = get_json(
            app,
            "/api/highlights?category=Finance&start_date=2026-08-01&end_date=2026-08-07",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["cluster_id"], "c1");
        assert_eq!(rows[0]["frequency"], 2);
        assert_eq!(rows[0]["title"], "rate cuts");
        // c2 has no cluster-table match: metadata stays null.
        assert_eq!(rows[1]["cluster_id"], "c2");
        assert!(rows[1]["title"].is_null());
    }

    #[tokio::test]
    async fn bad_category_is_rejected() {
        let app = seeded_app().await;
        let (status, _) = get_json(app, "/api/highlights?category=Politics").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stale_selection_falls_back_to_union_view() {
        let app = seeded_app().await;
        let (status, body) = get_json(
            app,
            "/api/articles?start_date=2026-08-01&end_date=2026-08-07&cluster_id=gone",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["selected_cluster_id"].is_null());
        // All highlighted clusters' articles, published desc.
        let articles = body["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0]["url"], "http://example.com/3");
    }

    #[tokio::test]
    async fn valid_selection_narrows_to_one_cluster() {
        let app = seeded_app().await;
        let (status, body) = get_json(
            app,
            "/api/articles?start_date=2026-08-01&end_date=2026-08-07&cluster_id=c1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selected_cluster_id"], "c1");
        assert_eq!(body["articles"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn chat_unconfigured_returns_service_unavailable() {
        let app = seeded_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"message\": \"hi\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
