mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use salesdesk_api::{
    auth::Role,
    services::orders::{AddItemRequest, CreateOrderRequest},
};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{response_json, TestApp};

async fn response_bytes(response: axum::response::Response) -> (StatusCode, Vec<u8>) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, bytes.to_vec())
}

async fn draft_order_with_item(app: &TestApp, warehouse: Uuid, product: Uuid) -> Uuid {
    let manager = app.manager();
    let orders = &app.state.services.orders;
    let order = orders
        .create_order(
            app.tenant,
            &manager,
            CreateOrderRequest {
                currency: "USD".to_string(),
                customer_name: None,
                customer_phone: None,
                customer_email: None,
            },
        )
        .await
        .expect("create");
    orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            AddItemRequest {
                warehouse_id: warehouse,
                product_id: product,
                quantity: 5,
                unit_price: dec!(10.00),
                discount_percent: rust_decimal::Decimal::ZERO,
            },
        )
        .await
        .expect("add item");
    order.id
}

#[tokio::test]
async fn retried_submit_replays_without_double_commit() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;
    let order_id = draft_order_with_item(&app, warehouse, product).await;

    let path = format!("/api/v1/orders/{}/submit", order_id);
    let headers = [("idempotency-key", "submit-key-1")];

    let first = app
        .request(Method::POST, &path, None, Role::Manager, &headers)
        .await;
    let (first_status, first_body) = response_bytes(first).await;
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(app.balance(warehouse, product).await, (5, 0));

    // A retry that reaches the server after the first attempt succeeded
    let second = app
        .request(Method::POST, &path, None, Role::Manager, &headers)
        .await;
    let (second_status, second_body) = response_bytes(second).await;
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second_body, first_body, "replay must be byte-identical");
    // No second decrement
    assert_eq!(app.balance(warehouse, product).await, (5, 0));
}

#[tokio::test]
async fn same_key_with_different_body_conflicts() {
    let app = TestApp::new().await;
    let headers = [("idempotency-key", "create-key-1")];

    let first = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"currency": "USD"})),
            Role::Manager,
            &headers,
        )
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"currency": "EUR"})),
            Role::Manager,
            &headers,
        )
        .await;
    let body = common::assert_json(second, StatusCode::CONFLICT).await;
    assert_eq!(body["error"], "idempotency_conflict");
}

#[tokio::test]
async fn keys_are_scoped_per_tenant() {
    let app = TestApp::new().await;
    let headers = [("idempotency-key", "shared-key")];
    let payload = json!({"currency": "USD"});

    let first = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(payload.clone()),
            Role::Manager,
            &headers,
        )
        .await;
    let first_body = common::assert_json(first, StatusCode::CREATED).await;

    // Another tenant reusing the same key executes for real
    let other_tenant = Uuid::new_v4().to_string();
    let second = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(payload.clone()),
            Role::Manager,
            &[
                ("idempotency-key", "shared-key"),
                ("x-tenant-id", other_tenant.as_str()),
            ],
        )
        .await;
    let second_body = common::assert_json(second, StatusCode::CREATED).await;
    assert_ne!(
        first_body["data"]["id"], second_body["data"]["id"],
        "each tenant gets its own execution"
    );

    // The original tenant still replays its own recording
    let third = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(payload),
            Role::Manager,
            &headers,
        )
        .await;
    let third_body = common::assert_json(third, StatusCode::CREATED).await;
    assert_eq!(first_body["data"]["id"], third_body["data"]["id"]);
}

#[tokio::test]
async fn failed_operations_are_not_pinned() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;
    let order_id = {
        let manager = app.manager();
        app.state
            .services
            .orders
            .create_order(
                app.tenant,
                &manager,
                CreateOrderRequest {
                    currency: "USD".to_string(),
                    customer_name: None,
                    customer_phone: None,
                    customer_email: None,
                },
            )
            .await
            .expect("create")
            .id
    };

    let path = format!("/api/v1/orders/{}/items", order_id);
    let headers = [("idempotency-key", "item-key-1")];
    let payload = json!({
        "warehouse_id": warehouse,
        "product_id": product,
        "quantity": 11,
        "unit_price": "1.00",
    });

    let first = app
        .request(Method::POST, &path, Some(payload.clone()), Role::Manager, &headers)
        .await;
    let body = common::assert_json(first, StatusCode::UNPROCESSABLE_ENTITY).await;
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["details"]["available"], 10);

    // After restocking, the same key retries the operation for real
    app.seed_stock(warehouse, product, 5).await;
    let second = app
        .request(Method::POST, &path, Some(payload), Role::Manager, &headers)
        .await;
    let body = common::assert_json(second, StatusCode::OK).await;
    assert_eq!(body["data"]["items"][0]["quantity"], 11);
}

#[tokio::test]
async fn configured_paths_require_the_header() {
    let mut cfg = common::test_config();
    cfg.idempotency.required_paths = vec!["/api/v1/orders".to_string()];
    let app = TestApp::with_config(cfg).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"currency": "USD"})),
            Role::Manager,
            &[],
        )
        .await;
    let body = common::assert_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], "validation_error");

    // Reads stay unaffected
    let response = app
        .request(Method::GET, "/api/v1/orders", None, Role::Manager, &[])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn requests_without_a_key_pass_through_unprotected() {
    let app = TestApp::new().await;

    let first = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"currency": "USD"})),
            Role::Manager,
            &[],
        )
        .await;
    let first_body = common::assert_json(first, StatusCode::CREATED).await;

    let second = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"currency": "USD"})),
            Role::Manager,
            &[],
        )
        .await;
    let second_body = common::assert_json(second, StatusCode::CREATED).await;
    assert_ne!(first_body["data"]["id"], second_body["data"]["id"]);
}

#[tokio::test]
async fn expired_keys_are_swept() {
    let app = TestApp::new().await;
    let idempotency = &app.state.services.idempotency;

    idempotency
        .store_key(
            "old-key",
            app.tenant,
            "POST /api/v1/orders",
            "hash",
            200,
            "{}",
        )
        .await
        .expect("store");
    assert!(idempotency
        .find_key("old-key", app.tenant)
        .await
        .expect("find")
        .is_some());

    // Nothing to sweep inside the retention window
    let removed = idempotency
        .cleanup_expired_keys(Utc::now())
        .await
        .expect("sweep");
    assert_eq!(removed, 0);

    // Past the 24h default TTL the row goes away
    let removed = idempotency
        .cleanup_expired_keys(Utc::now() + Duration::hours(25))
        .await
        .expect("sweep");
    assert_eq!(removed, 1);
    assert!(idempotency
        .find_key("old-key", app.tenant)
        .await
        .expect("find")
        .is_none());
}

#[tokio::test]
async fn storing_the_same_key_twice_returns_the_first_row() {
    let app = TestApp::new().await;
    let idempotency = &app.state.services.idempotency;

    let first = idempotency
        .store_key("dup-key", app.tenant, "POST /x", "hash-a", 200, "{\"a\":1}")
        .await
        .expect("store");
    let second = idempotency
        .store_key("dup-key", app.tenant, "POST /x", "hash-a", 200, "{\"a\":2}")
        .await
        .expect("second store resolves to the winner");
    assert_eq!(first.id, second.id);
    assert_eq!(second.response_body, "{\"a\":1}");
}

#[tokio::test]
async fn missing_role_header_is_rejected() {
    let app = TestApp::new().await;

    // Bypass the helper to send a request with a bogus role header
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({"currency": "USD"})),
            Role::Manager,
            &[("x-actor-role", "owner")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response_json(response).await;
    assert_eq!(body["error"], "validation_error");
}
