//! # Rule Store API
//!
//! ## Default rates
//! - **GET `/v1/rules/default-rates`**
//! - **GET | PUT | DELETE `/v1/rules/default-rates/{seller_id}`**
//!
//! ## Product rules
//! - **GET | POST `/v1/rules/product-rules`**: `seller_id: null` creates a
//!   rule for every seller. A second rule for the same (seller, product) is
//!   a 409.
//! - **PUT | DELETE `/v1/rules/product-rules/{id}`**: PUT changes the rate;
//!   scope and product of a rule are fixed once created.
//!
//! ## Special products
//! - **GET `/v1/rules/special-products`**
//! - **PUT | DELETE `/v1/rules/special-products/{code}`**
//!
//! ## Resolution
//! - **GET `/v1/rules/resolve?seller_id=&product_code=`**: the rate a sale
//!   would be paid at right now, and which tier supplied it.
//!
//! Writes go to the database first (when configured), then to the ledger.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use commission_core::{ProductCode, Rate, SellerId};
use commission_engine::{
    DefaultRate, LedgerError, ProductRule, RateSource, RuleScope, SpecialProduct,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::{self, extract_json, extract_validated_json, NumericInput, Validate};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// A default rate with the seller's display name.
#[derive(Debug, Serialize)]
pub struct DefaultRateResponse {
    pub seller_id: SellerId,
    pub seller_name: Option<String>,
    pub rate: Rate,
}

/// Body of `PUT /v1/rules/default-rates/{seller_id}`.
#[derive(Debug, Deserialize)]
pub struct SetRateRequest {
    pub rate: NumericInput,
}

/// A product rule in flat form. `seller_id` is `null` for global rules.
#[derive(Debug, Serialize)]
pub struct ProductRuleResponse {
    pub id: i64,
    pub seller_id: Option<SellerId>,
    pub seller_name: Option<String>,
    pub product_code: ProductCode,
    pub rate: Rate,
}

/// Body of `POST /v1/rules/product-rules`.
#[derive(Debug, Deserialize)]
pub struct CreateProductRuleRequest {
    #[serde(default)]
    pub seller_id: Option<i64>,
    pub product_code: String,
    pub rate: NumericInput,
}

/// Body of `PUT /v1/rules/special-products/{code}`.
#[derive(Debug, Deserialize)]
pub struct SpecialProductRequest {
    pub product_name: String,
    pub rate: NumericInput,
}

impl Validate for SpecialProductRequest {
    fn validate(&self) -> Result<(), String> {
        if self.product_name.trim().is_empty() {
            return Err("product_name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Query of `GET /v1/rules/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub seller_id: i64,
    pub product_code: String,
}

/// Result of a rate resolution.
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub seller_id: SellerId,
    pub product_code: ProductCode,
    pub rate: Rate,
    pub source: RateSource,
}

/// Build the rule store router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/rules/default-rates", get(list_default_rates))
        .route(
            "/v1/rules/default-rates/{seller_id}",
            get(get_default_rate)
                .put(set_default_rate)
                .delete(delete_default_rate),
        )
        .route(
            "/v1/rules/product-rules",
            get(list_product_rules).post(create_product_rule),
        )
        .route(
            "/v1/rules/product-rules/{id}",
            axum::routing::put(update_product_rule).delete(delete_product_rule),
        )
        .route("/v1/rules/special-products", get(list_special_products))
        .route(
            "/v1/rules/special-products/{code}",
            axum::routing::put(upsert_special_product).delete(delete_special_product),
        )
        .route("/v1/rules/resolve", get(resolve_rate))
}

// ---------------------------------------------------------------------------
// Handlers: default rates
// ---------------------------------------------------------------------------

/// GET /v1/rules/default-rates
async fn list_default_rates(State(state): State<AppState>) -> Json<Vec<DefaultRateResponse>> {
    let rates = state
        .ledger
        .default_rates()
        .into_iter()
        .map(|dr| DefaultRateResponse {
            seller_id: dr.seller_id,
            seller_name: state.ledger.seller(dr.seller_id).map(|s| s.name),
            rate: dr.rate,
        })
        .collect();
    Json(rates)
}

/// GET /v1/rules/default-rates/{seller_id}
async fn get_default_rate(
    State(state): State<AppState>,
    Path(seller_id): Path<i64>,
) -> Result<Json<DefaultRate>, AppError> {
    let seller_id = extractors::seller_id(seller_id)?;
    Ok(Json(state.ledger.default_rate(seller_id)?))
}

/// PUT /v1/rules/default-rates/{seller_id}
async fn set_default_rate(
    State(state): State<AppState>,
    Path(seller_id): Path<i64>,
    body: Result<Json<SetRateRequest>, JsonRejection>,
) -> Result<Json<DefaultRate>, AppError> {
    let seller_id = extractors::seller_id(seller_id)?;
    let rate = extract_json(body)?.rate.rate()?;
    let record = DefaultRate { seller_id, rate };

    if let Some(pool) = &state.db_pool {
        crate::db::rules::upsert_default_rate(pool, &record)
            .await
            .map_err(|e| AppError::persistence("failed to persist default rate", e))?;
    }

    Ok(Json(state.ledger.set_default_rate(seller_id, rate)))
}

/// DELETE /v1/rules/default-rates/{seller_id}
async fn delete_default_rate(
    State(state): State<AppState>,
    Path(seller_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let seller_id = extractors::seller_id(seller_id)?;
    state.ledger.default_rate(seller_id)?;

    if let Some(pool) = &state.db_pool {
        crate::db::rules::delete_default_rate(pool, seller_id)
            .await
            .map_err(|e| AppError::persistence("failed to delete default rate", e))?;
    }

    state.ledger.remove_default_rate(seller_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Handlers: product rules
// ---------------------------------------------------------------------------

/// GET /v1/rules/product-rules
async fn list_product_rules(State(state): State<AppState>) -> Json<Vec<ProductRuleResponse>> {
    let rules = state
        .ledger
        .product_rules()
        .into_iter()
        .map(|rule| to_response(&state, rule))
        .collect();
    Json(rules)
}

/// POST /v1/rules/product-rules
async fn create_product_rule(
    State(state): State<AppState>,
    body: Result<Json<CreateProductRuleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductRuleResponse>), AppError> {
    let req = extract_json(body)?;
    let scope = RuleScope::from_seller(req.seller_id.map(SellerId::new).transpose()?);
    let product_code = ProductCode::new(req.product_code)?;
    let rate = req.rate.rate()?;

    state.ledger.ensure_product_rule_free(scope, &product_code)?;

    let rule = match &state.db_pool {
        Some(pool) => {
            let rule = crate::db::rules::insert_product_rule(pool, scope, &product_code, rate)
                .await
                .map_err(|e| {
                    if crate::db::is_unique_violation(&e) {
                        AppError::from(LedgerError::DuplicateProductRule {
                            scope,
                            product_code: product_code.clone(),
                        })
                    } else {
                        AppError::persistence("failed to persist product rule", e)
                    }
                })?;
            state.ledger.insert_product_rule(rule.clone())?;
            rule
        }
        None => state.ledger.add_product_rule(scope, product_code, rate)?,
    };

    tracing::info!(rule_id = rule.id, scope = %rule.scope, product_code = %rule.product_code, "product rule created");
    Ok((StatusCode::CREATED, Json(to_response(&state, rule))))
}

/// PUT /v1/rules/product-rules/{id}
async fn update_product_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<SetRateRequest>, JsonRejection>,
) -> Result<Json<ProductRuleResponse>, AppError> {
    let rate = extract_json(body)?.rate.rate()?;
    state.ledger.product_rule(id)?;

    if let Some(pool) = &state.db_pool {
        crate::db::rules::update_product_rule_rate(pool, id, rate)
            .await
            .map_err(|e| AppError::persistence("failed to update product rule", e))?;
    }

    let rule = state.ledger.set_product_rule_rate(id, rate)?;
    Ok(Json(to_response(&state, rule)))
}

/// DELETE /v1/rules/product-rules/{id}
async fn delete_product_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.ledger.product_rule(id)?;

    if let Some(pool) = &state.db_pool {
        crate::db::rules::delete_product_rule(pool, id)
            .await
            .map_err(|e| AppError::persistence("failed to delete product rule", e))?;
    }

    state.ledger.remove_product_rule(id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn to_response(state: &AppState, rule: ProductRule) -> ProductRuleResponse {
    let seller_id = rule.scope.seller_id();
    ProductRuleResponse {
        id: rule.id,
        seller_id,
        seller_name: seller_id.and_then(|id| state.ledger.seller(id)).map(|s| s.name),
        product_code: rule.product_code,
        rate: rule.rate,
    }
}

// ---------------------------------------------------------------------------
// Handlers: special products
// ---------------------------------------------------------------------------

/// GET /v1/rules/special-products
async fn list_special_products(State(state): State<AppState>) -> Json<Vec<SpecialProduct>> {
    Json(state.ledger.special_products())
}

/// PUT /v1/rules/special-products/{code}
async fn upsert_special_product(
    State(state): State<AppState>,
    Path(code): Path<String>,
    body: Result<Json<SpecialProductRequest>, JsonRejection>,
) -> Result<Json<SpecialProduct>, AppError> {
    let req = extract_validated_json(body)?;
    let product = SpecialProduct::new(ProductCode::new(code)?, req.product_name, req.rate.rate()?)?;

    if let Some(pool) = &state.db_pool {
        crate::db::rules::upsert_special_product(pool, &product)
            .await
            .map_err(|e| AppError::persistence("failed to persist special product", e))?;
    }

    Ok(Json(state.ledger.upsert_special_product(product)))
}

/// DELETE /v1/rules/special-products/{code}
async fn delete_special_product(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    let code = ProductCode::new(code)?;
    if !state.ledger.special_products().iter().any(|p| p.product_code == code) {
        return Err(LedgerError::SpecialProductNotFound(code).into());
    }

    if let Some(pool) = &state.db_pool {
        crate::db::rules::delete_special_product(pool, &code)
            .await
            .map_err(|e| AppError::persistence("failed to delete special product", e))?;
    }

    state.ledger.remove_special_product(&code)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Handlers: resolution
// ---------------------------------------------------------------------------

/// GET /v1/rules/resolve?seller_id=&product_code=
async fn resolve_rate(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, AppError> {
    let seller_id = extractors::seller_id(query.seller_id)?;
    let product_code = ProductCode::new(query.product_code)?;
    let resolved = state.ledger.resolve(seller_id, &product_code);

    Ok(Json(ResolveResponse {
        seller_id,
        product_code,
        rate: resolved.rate,
        source: resolved.source,
    }))
}
