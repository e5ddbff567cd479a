use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::carts::{AddCartItemInput, UpdateCartItemInput};
use crate::AppState;

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_item))
        .route("/items/:item_id", put(update_item))
        .route("/items/:item_id", delete(remove_item))
}

async fn get_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.carts.view(user.id).await?;
    Ok(success_response(cart))
}

async fn add_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<AddCartItemInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.carts.add_item(user.id, payload).await?;
    Ok(success_response(cart))
}

async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .carts
        .update_item(user.id, item_id, payload)
        .await?;
    Ok(success_response(cart))
}

async fn remove_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.carts.remove_item(user.id, item_id).await?;
    Ok(success_response(cart))
}
