use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, no_content_response, success_response};
use crate::services::coupons::{CreateCouponInput, UpdateCouponInput};
use crate::AppState;

pub fn coupons_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_coupon).get(list_coupons))
        .route("/:id", put(update_coupon))
        .route("/:id", delete(delete_coupon))
        .route("/validate", post(validate_coupon))
}

async fn create_coupon(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<CreateCouponInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let coupon = state.services.coupons.create_coupon(payload).await?;
    Ok(created_response(coupon))
}

async fn list_coupons(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<impl IntoResponse, ServiceError> {
    let coupons = state.services.coupons.list_coupons().await?;
    Ok(success_response(coupons))
}

async fn update_coupon(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let coupon = state.services.coupons.update_coupon(id, payload).await?;
    Ok(success_response(coupon))
}

async fn delete_coupon(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.coupons.delete_coupon(id).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize)]
struct ValidateCouponRequest {
    code: String,
    subtotal: Decimal,
}

/// Pre-checkout coupon check. Unlike order creation, a failing coupon here
/// surfaces as an HTTP error so the storefront can tell the user why.
async fn validate_coupon(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let coupon = state
        .services
        .coupons
        .validate_coupon(&payload.code, payload.subtotal)
        .await?;
    Ok(success_response(coupon))
}
