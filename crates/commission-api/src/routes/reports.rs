//! # Report API
//!
//! - **GET `/v1/reports`**: report for `?month=&year=`; either missing
//!   defaults to the current month or year.
//! - **GET `/v1/reports/{year}/{month}`**: report for one period.
//! - **GET `/v1/periods`**: periods with cached sales, oldest first.
//!
//! Reports are computed from the cached copy only. A period that was never
//! imported yields an empty report whose `message` asks for an import.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use commission_core::Period;
use commission_engine::CommissionReport;
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors;
use crate::state::AppState;

/// Query parameters for `GET /v1/reports`.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl ReportQuery {
    fn period(&self) -> Result<Period, AppError> {
        let now = Period::current();
        extractors::period(
            self.year.unwrap_or(now.year()),
            self.month.unwrap_or(now.month()),
        )
    }
}

/// Build the report router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/reports", get(report_for_query))
        .route("/v1/reports/{year}/{month}", get(report_for_period))
        .route("/v1/periods", get(list_periods))
}

/// GET /v1/reports?month=&year=
async fn report_for_query(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<CommissionReport>, AppError> {
    let period = query.period()?;
    Ok(Json(generate(&state, period)))
}

/// GET /v1/reports/{year}/{month}
async fn report_for_period(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<CommissionReport>, AppError> {
    let period = extractors::period(year, month)?;
    Ok(Json(generate(&state, period)))
}

/// GET /v1/periods
async fn list_periods(State(state): State<AppState>) -> Json<Vec<Period>> {
    Json(state.ledger.available_periods())
}

fn generate(state: &AppState, period: Period) -> CommissionReport {
    let report = state.ledger.generate_report(period);
    tracing::info!(%period, sellers = report.sellers.len(), "report generated");
    report
}
