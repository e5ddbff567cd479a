use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::auth::{AuthenticatedUser, GoogleLoginInput};
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/google", post(login_with_google))
        .route("/admin/google", post(login_admin_with_google))
        .route("/me", get(me))
}

/// Storefront login: upsert the account and mint a token.
async fn login_with_google(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLoginInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let token = state
        .services
        .auth
        .login_with_google(payload, false)
        .await?;
    Ok(success_response(token))
}

/// Admin console login: like storefront login, but grants the admin flag.
async fn login_admin_with_google(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLoginInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let token = state.services.auth.login_with_google(payload, true).await?;
    Ok(success_response(token))
}

async fn me(user: AuthenticatedUser) -> impl IntoResponse {
    success_response(user)
}
