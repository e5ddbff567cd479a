use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::auth::AdminUser;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::services::content::UpdateHeroInput;
use crate::AppState;

pub fn content_routes() -> Router<AppState> {
    Router::new().route("/hero", get(get_hero).post(update_hero))
}

async fn get_hero(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let hero = state.services.content.hero().await?;
    Ok(success_response(hero))
}

async fn update_hero(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<UpdateHeroInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let hero = state.services.content.update_hero(payload).await?;
    Ok(success_response(hero))
}
