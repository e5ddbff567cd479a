pub mod auth;
pub mod carts;
pub mod common;
pub mod content;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod uploads;

use axum::Router;

use crate::AppState;

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::auth_routes())
        .nest("/products", products::products_routes())
        .nest("/coupons", coupons::coupons_routes())
        .nest("/cart", carts::cart_routes())
        .nest("/orders", orders::orders_routes())
        .nest("/content", content::content_routes())
        .nest("/upload", uploads::upload_routes())
}
