#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use sha2::Sha256;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    config::{AppConfig, PaymentEnvironment},
    db::{self, DbConfig},
    entities::{coupon, user, CouponKind},
    events::{self, EventSender},
    handlers,
    migrator::Migrator,
    services::{
        payments::{GatewayError, PaymentGateway},
        SandboxGateway,
    },
    AppServices, AppState,
};

/// Gateway double that behaves like the production backend: deterministic
/// order ids plus real HMAC signature verification, without network I/O.
pub struct SigningTestGateway {
    key_secret: String,
}

impl SigningTestGateway {
    pub fn new(key_secret: &str) -> Self {
        Self {
            key_secret: key_secret.to_string(),
        }
    }

    pub fn sign(&self, gateway_order_id: &str, payment_id: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.key_secret.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(format!("{}|{}", gateway_order_id, payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl PaymentGateway for SigningTestGateway {
    fn key_id(&self) -> &str {
        "test_key"
    }

    async fn create_gateway_order(
        &self,
        _amount_minor: i64,
        _currency: &str,
        receipt: &str,
    ) -> Result<String, GatewayError> {
        Ok(format!("test_order_{}", receipt))
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        self.sign(gateway_order_id, payment_id) == signature
    }
}

/// Test harness: app state over an in-memory SQLite database plus a router
/// mounted like production.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        jwt_secret: "test_secret_key_for_testing_purposes_only_32chars".into(),
        jwt_expiration_minutes: 60,
        host: "127.0.0.1".into(),
        port: 18_080,
        environment: "test".into(),
        log_level: "info".into(),
        log_json: false,
        cors_allowed_origins: None,
        upload_dir: "uploads".into(),
        payment_environment: PaymentEnvironment::Sandbox,
        payment_key_id: None,
        payment_key_secret: None,
        auto_migrate: true,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 30,
        event_channel_capacity: 256,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_gateway(Arc::new(SandboxGateway::new("sandbox_key".into()))).await
    }

    pub async fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::with_config_and_gateway(test_config(), gateway).await
    }

    pub async fn with_config_and_gateway(
        cfg: AppConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        // a single connection so every query sees the same in-memory db
        let db_config = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("failed to create test database");
        Migrator::up(&pool, None)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg, gateway);
        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api", handlers::api_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Insert a user directly and return a bearer token for them.
    pub async fn seed_user(&self, email: &str, name: &str, is_admin: bool) -> (Uuid, String) {
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set(name.to_string()),
            picture: Set(None),
            is_admin: Set(is_admin),
            created_at: Set(Utc::now()),
        };
        let created = model.insert(&*self.state.db).await.expect("seed user");
        let token = self
            .state
            .services
            .auth
            .issue_token(&created.email)
            .expect("issue token");
        (created.id, token)
    }

    /// Insert a coupon directly, bypassing the admin API.
    #[allow(clippy::too_many_arguments)]
    pub async fn seed_coupon(
        &self,
        code: &str,
        kind: CouponKind,
        value: Decimal,
        min_order: Option<Decimal>,
        max_discount: Option<Decimal>,
        expires_at: Option<chrono::DateTime<Utc>>,
        usage_limit: Option<i32>,
    ) -> coupon::Model {
        let now = Utc::now();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_uppercase()),
            kind: Set(kind),
            value: Set(value),
            min_order: Set(min_order),
            max_discount: Set(max_discount),
            expires_at: Set(expires_at),
            usage_limit: Set(usage_limit),
            used_count: Set(0),
            description: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&*self.state.db).await.expect("seed coupon")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };
        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request with an explicit content type and raw body, for
    /// non-JSON payloads such as multipart uploads.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        content_type: &str,
        body: Vec<u8>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", content_type);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let request = builder.body(Body::from(body)).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// JSON payload for adding a cart line.
pub fn cart_item_payload(product_id: Uuid, price: &str, quantity: i32, size: &str) -> Value {
    serde_json::json!({
        "product_id": product_id.to_string(),
        "name": "Silk Dress",
        "price": price,
        "image": "/uploads/dress.jpg",
        "category": "dresses",
        "size": size,
        "color": "black",
        "quantity": quantity,
    })
}
