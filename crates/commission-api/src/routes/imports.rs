//! # Import API
//!
//! - **POST `/v1/imports`**: body `{ "month": 3, "year": 2025 }`. Fetches the
//!   period from the upstream sales source and replaces its cached copy.
//!
//! Returns 503 when no upstream is configured, 502 when the fetch fails and
//! 404 when the upstream has no rows for the period. In every failure case
//! the previously cached copy is kept.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use commission_core::Period;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::{self, extract_json};
use crate::import::import_period;
use crate::state::AppState;

/// Request to import one period.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub month: u32,
    pub year: i32,
}

/// Outcome of a successful import.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    pub period: Period,
    pub rows: usize,
    pub sellers: usize,
}

/// Build the import router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/imports", post(import))
}

/// POST /v1/imports
async fn import(
    State(state): State<AppState>,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResponse>, AppError> {
    let req = extract_json(body)?;
    let period = extractors::period(req.year, req.month)?;

    let upstream = state.upstream.as_ref().ok_or_else(|| {
        AppError::service_unavailable(
            "upstream sales source not configured (set UPSTREAM_SALES_URL and UPSTREAM_API_TOKEN)",
        )
    })?;

    let summary = import_period(
        &state.ledger,
        state.db_pool.as_ref(),
        upstream,
        period,
        &state.seller_writes,
    )
    .await?;

    Ok(Json(ImportResponse {
        success: true,
        message: format!("Data imported successfully: {} rows", summary.rows),
        period: summary.period,
        rows: summary.rows,
        sellers: summary.sellers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn post_import(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/imports")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn without_upstream_is_503() {
        let app = super::router().with_state(AppState::new());
        let resp = app
            .oneshot(post_import(r#"{"month": 3, "year": 2025}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn period_is_validated_before_upstream_check() {
        let app = super::router().with_state(AppState::new());
        let resp = app
            .oneshot(post_import(r#"{"month": 0, "year": 2025}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_fields_are_400() {
        let app = super::router().with_state(AppState::new());
        let resp = app.oneshot(post_import(r#"{"month": 3}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
