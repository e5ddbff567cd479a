use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::checkout::{CreateOrderInput, VerifyPaymentInput};
use crate::AppState;

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/:id", get(get_order))
}

/// Open a gateway transaction for the user's cart and persist the pending
/// order.
async fn create_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state
        .services
        .checkout
        .create_order(&user, payload)
        .await?;
    Ok(success_response(response))
}

/// Confirm a payment: verify the gateway signature, mark the order paid,
/// clear the cart and redeem the coupon.
async fn verify_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<VerifyPaymentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state
        .services
        .checkout
        .verify_payment(&user, payload)
        .await?;
    Ok(success_response(response))
}

async fn get_order(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.checkout.get_order(id).await?;
    Ok(success_response(order))
}
