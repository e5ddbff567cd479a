/*!
 * Storefront API: product catalog, coupons, per-user carts, JWT auth and
 * the order-pricing/checkout state machine against a pluggable payment
 * gateway.
 */

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::{AppConfig, PaymentEnvironment};
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::{
    CartService, CheckoutService, ContentService, CouponService, PaymentGateway, ProductService,
    RazorpayGateway, SandboxGateway,
};

/// Service handles used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub auth: auth::AuthService,
    pub products: ProductService,
    pub coupons: CouponService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub content: ContentService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let carts = CartService::new(db.clone(), event_sender.clone());
        let coupons = CouponService::new(db.clone(), event_sender.clone());
        let checkout = CheckoutService::new(
            db.clone(),
            event_sender.clone(),
            carts.clone(),
            coupons.clone(),
            gateway,
        );
        Self {
            auth: auth::AuthService::new(
                db.clone(),
                event_sender.clone(),
                config.jwt_secret.clone(),
                config.jwt_expiration_minutes,
            ),
            products: ProductService::new(db.clone(), event_sender.clone()),
            coupons,
            carts,
            checkout,
            content: ContentService::new(db, event_sender),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
}

/// Select the payment backend once, at startup. Handlers only ever see the
/// trait object; no per-request fallback between backends exists.
pub fn build_payment_gateway(
    config: &AppConfig,
) -> Result<Arc<dyn PaymentGateway>, ServiceError> {
    match config.payment_environment {
        PaymentEnvironment::Production => {
            let key_id = config.payment_key_id.clone().ok_or_else(|| {
                ServiceError::ValidationError("payment_key_id is required in production".into())
            })?;
            let key_secret = config.payment_key_secret.clone().ok_or_else(|| {
                ServiceError::ValidationError(
                    "payment_key_secret is required in production".into(),
                )
            })?;
            Ok(Arc::new(RazorpayGateway::new(key_id, key_secret)))
        }
        PaymentEnvironment::Sandbox => {
            let key_id = config
                .payment_key_id
                .clone()
                .unwrap_or_else(|| "sandbox_key".to_string());
            Ok(Arc::new(SandboxGateway::new(key_id)))
        }
    }
}
