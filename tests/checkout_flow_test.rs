//! End-to-end checkout: cart → coupon → pricing → pending order → payment
//! confirmation and its side effects.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{cart_item_payload, response_json, SigningTestGateway, TestApp};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;
use uuid::Uuid;

use storefront_api::entities::{cart_item, coupon, order, CouponKind, OrderStatus};

#[tokio::test]
async fn create_order_with_empty_cart_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("shopper@example.com", "Shopper", false).await;

    let response = app
        .request(Method::POST, "/api/orders/create", Some(json!({})), Some(&token))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Your cart is empty");

    // nothing persisted, nothing priced
    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn full_checkout_flow_with_fixed_coupon() {
    let app = TestApp::new().await;
    let (user_id, token) = app.seed_user("shopper@example.com", "Shopper", false).await;
    app.seed_coupon("SAVE100", CouponKind::Fixed, dec!(100), None, None, None, None)
        .await;

    // subtotal 2000 = 2 x 999.50 + 1 x 1.00
    let response = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(cart_item_payload(Uuid::new_v4(), "999.50", 2, "M")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(cart_item_payload(Uuid::new_v4(), "1.00", 1, "L")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/orders/create",
            Some(json!({"coupon_code": "save100"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    // 2000 - 100 + 99 shipping + 342 tax = 2341
    assert_eq!(body["amount"], "2341.00");
    assert_eq!(body["user_name"], "Shopper");
    assert_eq!(body["user_email"], "shopper@example.com");
    let order_id: Uuid = body["order_id"].as_str().unwrap().parse().unwrap();
    let gateway_order_id = body["gateway_order_id"].as_str().unwrap().to_string();

    let pending = order::Entity::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.status, OrderStatus::Pending);
    assert_eq!(pending.subtotal, dec!(2000.00));
    assert_eq!(pending.discount, dec!(100.00));
    assert_eq!(pending.shipping, dec!(99.00));
    assert_eq!(pending.tax, dec!(342.00));
    assert_eq!(pending.total, dec!(2341.00));
    assert_eq!(pending.coupon_code.as_deref(), Some("SAVE100"));
    assert_eq!(pending.user_id, user_id);

    // coupon untouched until payment confirmation
    let saved = coupon::Entity::find().one(&*app.state.db).await.unwrap().unwrap();
    assert_eq!(saved.used_count, 0);

    // confirm payment (sandbox accepts any signature)
    let response = app
        .request(
            Method::POST,
            "/api/orders/verify",
            Some(json!({
                "gateway_order_id": gateway_order_id,
                "gateway_payment_id": "pay_123",
                "gateway_signature": "sig",
                "order_id": order_id.to_string(),
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "paid");

    let paid = order::Entity::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.gateway_payment_id.as_deref(), Some("pay_123"));

    // side effects: cart cleared, coupon redeemed once
    let items = cart_item::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(items.is_empty());
    let saved = coupon::Entity::find().one(&*app.state.db).await.unwrap().unwrap();
    assert_eq!(saved.used_count, 1);
}

#[tokio::test]
async fn invalid_coupon_degrades_to_zero_discount() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("shopper@example.com", "Shopper", false).await;

    let response = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(cart_item_payload(Uuid::new_v4(), "1000.00", 2, "M")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // order creation succeeds, priced as if no coupon were given
    let response = app
        .request(
            Method::POST,
            "/api/orders/create",
            Some(json!({"coupon_code": "NO_SUCH_CODE"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    // 2000 + 99 + 360 tax
    assert_eq!(body["amount"], "2459.00");

    let order_id: Uuid = body["order_id"].as_str().unwrap().parse().unwrap();
    let pending = order::Entity::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.discount, dec!(0.00));
    assert!(pending.coupon_code.is_none());
}

#[tokio::test]
async fn verify_replay_does_not_repeat_side_effects() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("shopper@example.com", "Shopper", false).await;
    app.seed_coupon("SAVE10", CouponKind::Percentage, dec!(10), None, None, None, None)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(cart_item_payload(Uuid::new_v4(), "500.00", 1, "M")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/orders/create",
            Some(json!({"coupon_code": "SAVE10"})),
            Some(&token),
        )
        .await;
    let body = response_json(response).await;
    let order_id = body["order_id"].as_str().unwrap().to_string();
    let gateway_order_id = body["gateway_order_id"].as_str().unwrap().to_string();

    let verify_payload = json!({
        "gateway_order_id": gateway_order_id,
        "gateway_payment_id": "pay_replay",
        "gateway_signature": "sig",
        "order_id": order_id,
    });

    let first = app
        .request(
            Method::POST,
            "/api/orders/verify",
            Some(verify_payload.clone()),
            Some(&token),
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request(
            Method::POST,
            "/api/orders/verify",
            Some(verify_payload),
            Some(&token),
        )
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    let body = response_json(second).await;
    assert_eq!(body["status"], "paid");

    // redeemed exactly once despite two confirmations
    let saved = coupon::Entity::find().one(&*app.state.db).await.unwrap().unwrap();
    assert_eq!(saved.used_count, 1);
}

#[tokio::test]
async fn wrong_signature_leaves_order_pending() {
    let gateway = Arc::new(SigningTestGateway::new("test_secret"));
    let app = TestApp::with_gateway(gateway.clone()).await;
    let (_, token) = app.seed_user("shopper@example.com", "Shopper", false).await;
    app.seed_coupon("SAVE10", CouponKind::Percentage, dec!(10), None, None, None, None)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(cart_item_payload(Uuid::new_v4(), "750.00", 1, "M")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/orders/create",
            Some(json!({"coupon_code": "SAVE10"})),
            Some(&token),
        )
        .await;
    let body = response_json(response).await;
    let order_id: Uuid = body["order_id"].as_str().unwrap().parse().unwrap();
    let gateway_order_id = body["gateway_order_id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/api/orders/verify",
            Some(json!({
                "gateway_order_id": gateway_order_id,
                "gateway_payment_id": "pay_forged",
                "gateway_signature": "definitely_not_the_signature",
                "order_id": order_id.to_string(),
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Payment verification failed");

    // no transition, no cart clear, no coupon increment
    let pending = order::Entity::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.status, OrderStatus::Pending);
    let items = cart_item::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(items.len(), 1);
    let saved = coupon::Entity::find().one(&*app.state.db).await.unwrap().unwrap();
    assert_eq!(saved.used_count, 0);

    // the genuine signature settles the same order
    let signature = gateway.sign(&pending.gateway_order_id, "pay_real");
    let response = app
        .request(
            Method::POST,
            "/api/orders/verify",
            Some(json!({
                "gateway_order_id": pending.gateway_order_id,
                "gateway_payment_id": "pay_real",
                "gateway_signature": signature,
                "order_id": order_id.to_string(),
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn verify_unknown_order_is_404() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("shopper@example.com", "Shopper", false).await;

    let response = app
        .request(
            Method::POST,
            "/api/orders/verify",
            Some(json!({
                "gateway_order_id": "test_order_x",
                "gateway_payment_id": "pay",
                "gateway_signature": "sig",
                "order_id": Uuid::new_v4().to_string(),
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_snapshot_survives_cart_mutation() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("shopper@example.com", "Shopper", false).await;
    let product_id = Uuid::new_v4();

    let response = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(cart_item_payload(product_id, "100.00", 3, "M")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::POST, "/api/orders/create", Some(json!({})), Some(&token))
        .await;
    let body = response_json(response).await;
    let order_id = body["order_id"].as_str().unwrap().to_string();

    // mutate the cart after order creation
    let response = app
        .request(
            Method::POST,
            "/api/cart/items",
            Some(cart_item_payload(product_id, "100.00", 5, "M")),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            &format!("/api/orders/{}", order_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
}
