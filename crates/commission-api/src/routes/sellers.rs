//! # Seller API
//!
//! - **GET `/v1/sellers`**: every seller, ordered by name.
//! - **PUT `/v1/sellers/{id}`**: update `category`, `is_cooperative` and
//!   `exclude_from_report`. Omitted fields are left unchanged.
//!
//! Sellers themselves are created and removed only by imports. Flag updates
//! take the seller write lock, so they never interleave with an import.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use commission_engine::{LedgerError, Seller, SellerFlags};

use crate::error::AppError;
use crate::extractors::{self, extract_json};
use crate::state::AppState;

/// Build the seller router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sellers", get(list_sellers))
        .route("/v1/sellers/{id}", put(update_seller))
}

/// GET /v1/sellers
async fn list_sellers(State(state): State<AppState>) -> Json<Vec<Seller>> {
    Json(state.ledger.sellers())
}

/// PUT /v1/sellers/{id}
async fn update_seller(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<SellerFlags>, JsonRejection>,
) -> Result<Json<Seller>, AppError> {
    let id = extractors::seller_id(id)?;
    let flags = extract_json(body)?;

    let _guard = state.seller_writes.lock().await;
    let mut updated = state
        .ledger
        .seller(id)
        .ok_or(LedgerError::SellerNotFound(id))?;
    updated.apply_flags(&flags);

    if let Some(pool) = &state.db_pool {
        let found = crate::db::sellers::update_flags(pool, &updated)
            .await
            .map_err(|e| AppError::persistence("failed to persist seller flags", e))?;
        if !found {
            return Err(LedgerError::SellerNotFound(id).into());
        }
    }

    Ok(Json(state.ledger.update_seller(id, &flags)?))
}
