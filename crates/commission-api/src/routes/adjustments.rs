//! # Adjustment API
//!
//! - **GET | PUT | DELETE `/v1/adjustments/financial/{seller_id}/{year}/{month}`**
//! - **GET | PUT | DELETE `/v1/adjustments/revenue/{seller_id}/{year}/{month}`**
//!
//! GET never returns 404: a missing adjustment is reported as all-zero with
//! `exists: false`, which is what a form editing it starts from. PUT replaces
//! whatever is stored under the key. Amount fields accept numbers or numeric
//! strings; anything else is a 422 naming the field.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use commission_core::{serialize_amount, Period, Rate, SellerId};
use commission_engine::{FinancialAdjustment, LedgerError, RevenueAdjustment};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::{self, extract_json, NumericInput};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Body of `PUT /v1/adjustments/financial/...`. Omitted amounts are zero.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FinancialAdjustmentRequest {
    pub return_value: NumericInput,
    pub open_invoice_value: NumericInput,
    pub prior_surcharge_value: NumericInput,
}

/// Body of `PUT /v1/adjustments/revenue/...`. Omitted amount and rate are zero.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RevenueAdjustmentRequest {
    pub amount: NumericInput,
    pub rate: NumericInput,
    pub reason: Option<String>,
}

/// A financial adjustment, or the zero default when none is stored.
#[derive(Debug, Serialize)]
pub struct FinancialAdjustmentResponse {
    pub seller_id: SellerId,
    pub period: Period,
    #[serde(serialize_with = "serialize_amount")]
    pub return_value: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub open_invoice_value: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub prior_surcharge_value: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
    pub exists: bool,
}

impl FinancialAdjustmentResponse {
    fn absent(seller_id: SellerId, period: Period) -> Self {
        Self {
            seller_id,
            period,
            return_value: Decimal::ZERO,
            open_invoice_value: Decimal::ZERO,
            prior_surcharge_value: Decimal::ZERO,
            updated_at: None,
            exists: false,
        }
    }
}

impl From<FinancialAdjustment> for FinancialAdjustmentResponse {
    fn from(adj: FinancialAdjustment) -> Self {
        Self {
            seller_id: adj.seller_id,
            period: adj.period,
            return_value: adj.return_value,
            open_invoice_value: adj.open_invoice_value,
            prior_surcharge_value: adj.prior_surcharge_value,
            updated_at: Some(adj.updated_at),
            exists: true,
        }
    }
}

/// A revenue adjustment, or the zero default when none is stored.
#[derive(Debug, Serialize)]
pub struct RevenueAdjustmentResponse {
    pub seller_id: SellerId,
    pub period: Period,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: Decimal,
    pub rate: Rate,
    #[serde(serialize_with = "serialize_amount")]
    pub commission: Decimal,
    pub reason: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub exists: bool,
}

impl RevenueAdjustmentResponse {
    fn absent(seller_id: SellerId, period: Period) -> Self {
        Self {
            seller_id,
            period,
            amount: Decimal::ZERO,
            rate: Rate::ZERO,
            commission: Decimal::ZERO,
            reason: None,
            updated_at: None,
            exists: false,
        }
    }
}

impl From<RevenueAdjustment> for RevenueAdjustmentResponse {
    fn from(adj: RevenueAdjustment) -> Self {
        Self {
            seller_id: adj.seller_id,
            period: adj.period,
            amount: adj.amount,
            rate: adj.rate,
            commission: adj.rate.apply(adj.amount),
            reason: adj.reason,
            updated_at: Some(adj.updated_at),
            exists: true,
        }
    }
}

/// Build the adjustment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/adjustments/financial/{seller_id}/{year}/{month}",
            get(get_financial).put(put_financial).delete(delete_financial),
        )
        .route(
            "/v1/adjustments/revenue/{seller_id}/{year}/{month}",
            get(get_revenue).put(put_revenue).delete(delete_revenue),
        )
}

fn key(seller_id: i64, year: i32, month: u32) -> Result<(SellerId, Period), AppError> {
    Ok((extractors::seller_id(seller_id)?, extractors::period(year, month)?))
}

// ---------------------------------------------------------------------------
// Handlers: financial
// ---------------------------------------------------------------------------

/// GET /v1/adjustments/financial/{seller_id}/{year}/{month}
async fn get_financial(
    State(state): State<AppState>,
    Path((seller_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<Json<FinancialAdjustmentResponse>, AppError> {
    let (seller_id, period) = key(seller_id, year, month)?;
    let resp = state
        .ledger
        .financial_adjustment(seller_id, period)
        .map_or_else(
            || FinancialAdjustmentResponse::absent(seller_id, period),
            FinancialAdjustmentResponse::from,
        );
    Ok(Json(resp))
}

/// PUT /v1/adjustments/financial/{seller_id}/{year}/{month}
async fn put_financial(
    State(state): State<AppState>,
    Path((seller_id, year, month)): Path<(i64, i32, u32)>,
    body: Result<Json<FinancialAdjustmentRequest>, JsonRejection>,
) -> Result<Json<FinancialAdjustmentResponse>, AppError> {
    let (seller_id, period) = key(seller_id, year, month)?;
    let req = extract_json(body)?;
    let adj = FinancialAdjustment::new(
        seller_id,
        period,
        req.return_value.amount("return_value")?,
        req.open_invoice_value.amount("open_invoice_value")?,
        req.prior_surcharge_value.amount("prior_surcharge_value")?,
    );

    if let Some(pool) = &state.db_pool {
        crate::db::adjustments::upsert_financial(pool, &adj)
            .await
            .map_err(|e| AppError::persistence("failed to persist financial adjustment", e))?;
    }

    tracing::info!(%seller_id, %period, "financial adjustment saved");
    Ok(Json(state.ledger.upsert_financial_adjustment(adj).into()))
}

/// DELETE /v1/adjustments/financial/{seller_id}/{year}/{month}
async fn delete_financial(
    State(state): State<AppState>,
    Path((seller_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<StatusCode, AppError> {
    let (seller_id, period) = key(seller_id, year, month)?;
    if state.ledger.financial_adjustment(seller_id, period).is_none() {
        return Err(LedgerError::AdjustmentNotFound {
            kind: "financial",
            seller_id,
            period,
        }
        .into());
    }

    if let Some(pool) = &state.db_pool {
        crate::db::adjustments::delete_financial(pool, seller_id, period)
            .await
            .map_err(|e| AppError::persistence("failed to delete financial adjustment", e))?;
    }

    state.ledger.remove_financial_adjustment(seller_id, period)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Handlers: revenue
// ---------------------------------------------------------------------------

/// GET /v1/adjustments/revenue/{seller_id}/{year}/{month}
async fn get_revenue(
    State(state): State<AppState>,
    Path((seller_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<Json<RevenueAdjustmentResponse>, AppError> {
    let (seller_id, period) = key(seller_id, year, month)?;
    let resp = state
        .ledger
        .revenue_adjustment(seller_id, period)
        .map_or_else(
            || RevenueAdjustmentResponse::absent(seller_id, period),
            RevenueAdjustmentResponse::from,
        );
    Ok(Json(resp))
}

/// PUT /v1/adjustments/revenue/{seller_id}/{year}/{month}
async fn put_revenue(
    State(state): State<AppState>,
    Path((seller_id, year, month)): Path<(i64, i32, u32)>,
    body: Result<Json<RevenueAdjustmentRequest>, JsonRejection>,
) -> Result<Json<RevenueAdjustmentResponse>, AppError> {
    let (seller_id, period) = key(seller_id, year, month)?;
    let req = extract_json(body)?;
    let adj = RevenueAdjustment::new(
        seller_id,
        period,
        req.amount.amount("amount")?,
        req.rate.rate()?,
        req.reason,
    )?;

    if let Some(pool) = &state.db_pool {
        crate::db::adjustments::upsert_revenue(pool, &adj)
            .await
            .map_err(|e| AppError::persistence("failed to persist revenue adjustment", e))?;
    }

    tracing::info!(%seller_id, %period, "revenue adjustment saved");
    Ok(Json(state.ledger.upsert_revenue_adjustment(adj).into()))
}

/// DELETE /v1/adjustments/revenue/{seller_id}/{year}/{month}
async fn delete_revenue(
    State(state): State<AppState>,
    Path((seller_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<StatusCode, AppError> {
    let (seller_id, period) = key(seller_id, year, month)?;
    if state.ledger.revenue_adjustment(seller_id, period).is_none() {
        return Err(LedgerError::AdjustmentNotFound {
            kind: "revenue",
            seller_id,
            period,
        }
        .into());
    }

    if let Some(pool) = &state.db_pool {
        crate::db::adjustments::delete_revenue(pool, seller_id, period)
            .await
            .map_err(|e| AppError::persistence("failed to delete revenue adjustment", e))?;
    }

    state.ledger.remove_revenue_adjustment(seller_id, period)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let req = match body {
            Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn test_app() -> (AppState, Router) {
        let state = AppState::new();
        let app = super::router().with_state(state.clone());
        (state, app)
    }

    #[tokio::test]
    async fn missing_financial_adjustment_is_zero_default() {
        let (_, app) = test_app();
        let (status, body) = send(&app, "GET", "/v1/adjustments/financial/83/2025/3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exists"], false);
        assert_eq!(body["return_value"], "0.00");
        assert!(body["updated_at"].is_null());
    }

    #[tokio::test]
    async fn financial_upsert_replaces() {
        let (state, app) = test_app();
        let uri = "/v1/adjustments/financial/83/2025/3";

        send(&app, "PUT", uri, Some(serde_json::json!({"return_value": 10}))).await;
        let (status, body) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"return_value": "100", "open_invoice_value": 50, "prior_surcharge_value": "30"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exists"], true);
        assert_eq!(body["return_value"], "100.00");
        assert_eq!(state.ledger.export().financial_adjustments.len(), 1);
    }

    #[tokio::test]
    async fn non_numeric_amount_is_422() {
        let (_, app) = test_app();
        let (status, body) = send(
            &app,
            "PUT",
            "/v1/adjustments/financial/83/2025/3",
            Some(serde_json::json!({"return_value": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]["message"].as_str().unwrap().contains("return_value"));
    }

    #[tokio::test]
    async fn invalid_key_is_422() {
        let (_, app) = test_app();
        let (status, _) = send(&app, "GET", "/v1/adjustments/revenue/0/2025/3", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = send(&app, "GET", "/v1/adjustments/revenue/83/2101/3", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn revenue_adjustment_round_trip() {
        let (_, app) = test_app();
        let uri = "/v1/adjustments/revenue/83/2025/3";

        let (status, body) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"amount": 5000, "rate": "0.015", "reason": "  late invoice  "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["commission"], "75.00");
        assert_eq!(body["reason"], "late invoice");

        let (status, _) = send(&app, "DELETE", uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = send(&app, "GET", uri, None).await;
        assert_eq!(body["exists"], false);
        let (status, _) = send(&app, "DELETE", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overlong_reason_is_422() {
        let (_, app) = test_app();
        let (status, _) = send(
            &app,
            "PUT",
            "/v1/adjustments/revenue/83/2025/3",
            Some(serde_json::json!({"amount": 1, "rate": 0.01, "reason": "x".repeat(501)})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn rejected_update_keeps_stored_adjustment() {
        let (state, app) = test_app();
        let uri = "/v1/adjustments/revenue/83/2025/3";
        send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"amount": "5000", "rate": "0.015", "reason": "late invoice"})),
        )
        .await;
        let stored = state
            .ledger
            .revenue_adjustment(SellerId::new(83).unwrap(), Period::new(3, 2025).unwrap())
            .unwrap();

        let (status, _) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"amount": "9000", "rate": "1.5", "reason": "typo"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"amount": "79228162514264337593543950335", "rate": "0.01"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, body) = send(&app, "GET", uri, None).await;
        assert_eq!(body["amount"], "5000.00");
        assert_eq!(body["rate"], "0.015");
        assert_eq!(body["reason"], "late invoice");
        assert_eq!(
            state
                .ledger
                .revenue_adjustment(SellerId::new(83).unwrap(), Period::new(3, 2025).unwrap()),
            Some(stored)
        );
    }
}
