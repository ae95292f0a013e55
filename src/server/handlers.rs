//! HTTP handlers for the scrape API.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use super::AppState;
use crate::app::HoundError;
use crate::domain::Corpus;

/// Inputs accepted from the query string or a JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeParams {
    pub keyword: Option<String>,
    pub asin: Option<String>,
}

impl ScrapeParams {
    /// Query values win; blank values count as missing
    fn merge(self, body: ScrapeParams) -> (String, String) {
        let pick = |first: Option<String>, second: Option<String>| {
            first
                .filter(|v| !v.trim().is_empty())
                .or(second)
                .unwrap_or_default()
        };
        (pick(self.keyword, body.keyword), pick(self.asin, body.asin))
    }
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub corpus: Corpus,
}

/// Maps pipeline errors onto status codes.
pub struct ApiError(HoundError);

impl From<HoundError> for ApiError {
    fn from(e: HoundError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            HoundError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Scraping failed",
                    "message": other.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

/// POST /scrape
pub async fn scrape(
    State(state): State<AppState>,
    Query(query): Query<ScrapeParams>,
    body: Bytes,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let from_body = if body.is_empty() {
        ScrapeParams::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!("Ignoring unreadable request body: {}", e);
            ScrapeParams::default()
        })
    };
    let (keyword, asin) = query.merge(from_body);

    match state.orchestrator.scrape(&keyword, &asin).await {
        Ok(corpus) => {
            info!(
                "POST /scrape {:?} / {} -> 200 ({:?})",
                keyword, asin, corpus.source
            );
            Ok(Json(ScrapeResponse {
                success: true,
                corpus,
            }))
        }
        Err(e) => {
            error!("POST /scrape {:?} / {} failed: {}", keyword, asin, e);
            Err(e.into())
        }
    }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
