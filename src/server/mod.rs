//! HTTP API in front of the orchestrator.
//!
//! - `POST /scrape` with `keyword` and `asin` in the query string or a JSON body
//! - `GET /health` for liveness checks

mod handlers;
mod routes;

pub use handlers::{ScrapeParams, ScrapeResponse};
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::pipeline::Orchestrator;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Start the web server on `addr` (`host:port`).
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = addr.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{HoundError, Result};
    use crate::pipeline::{PipelineConfig, SiteConfig};
    use crate::scraper::fake::{FakeDocument, FakePage};
    use crate::scraper::{Driver, DriverFactory};
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const EXCLUDED: &str = "B000000001";

    struct TestFactory {
        fail: bool,
        acquired: AtomicUsize,
    }

    #[async_trait]
    impl DriverFactory for TestFactory {
        async fn acquire(&self) -> Result<Driver> {
            let n = self.acquired.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HoundError::Browser("no chrome here".into()));
            }
            let page = FakePage::new()
                .route("/s?k=", FakeDocument::search(&["B0000000C1", EXCLUDED]))
                .route("/dp/B0000000C1", FakeDocument::product("Competitor", &["Loud"]));
            Ok(Driver::new(n, Box::new(page)))
        }
    }

    fn setup_test_app(fail: bool) -> (axum::Router, Arc<TestFactory>) {
        let factory = Arc::new(TestFactory {
            fail,
            acquired: AtomicUsize::new(0),
        });
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let orchestrator = Orchestrator::new(
            store,
            factory.clone(),
            SiteConfig::default(),
            PipelineConfig::immediate(),
        );
        (create_router(AppState::new(Arc::new(orchestrator))), factory)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = setup_test_app(false);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_scrape_with_json_body() {
        let (app, _) = setup_test_app(false);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/scrape")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({ "keyword": "speaker", "asin": EXCLUDED }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["source"], "scraping");
        assert_eq!(json["keyword"], "speaker");
        assert_eq!(json["excludedAsin"], EXCLUDED);
        assert_eq!(json["competitorAsins"], serde_json::json!(["B0000000C1"]));
        assert_eq!(json["descriptions"]["B0000000C1"]["title"], "Competitor");
        assert_eq!(json["descriptions"]["B0000000C1"]["description"][0], "Loud");
        assert!(json["reviews"][EXCLUDED]["critical"].as_array().unwrap().is_empty());
        assert!(json["reviews"][EXCLUDED]["positive"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scrape_with_query_and_cache() {
        let (app, factory) = setup_test_app(false);
        let uri = format!("/scrape?keyword=speaker&asin={}", EXCLUDED);

        let first = app
            .clone()
            .oneshot(Request::builder().method("POST").uri(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let acquired = factory.acquired.load(Ordering::SeqCst);

        let second = app
            .oneshot(Request::builder().method("POST").uri(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(body_json(second).await["source"], "database");
        assert_eq!(factory.acquired.load(Ordering::SeqCst), acquired);
    }

    #[tokio::test]
    async fn test_query_wins_over_body() {
        let (app, _) = setup_test_app(false);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/scrape?keyword=speaker")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({ "keyword": "ignored", "asin": EXCLUDED }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["keyword"], "speaker");
    }

    #[tokio::test]
    async fn test_missing_input_is_bad_request() {
        let (app, factory) = setup_test_app(false);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/scrape?keyword=speaker")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Both keyword and asin are required"
        );
        assert_eq!(factory.acquired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_driver_failure_is_server_error() {
        let (app, _) = setup_test_app(true);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/scrape?keyword=speaker&asin={}", EXCLUDED))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Scraping failed");
        assert!(json["message"].as_str().unwrap().contains("no chrome here"));
    }
}
