mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use salesdesk_api::{
    errors::ServiceError,
    services::orders::{AddItemRequest, CreateOrderRequest},
};
use uuid::Uuid;

use common::TestApp;

fn create_request() -> CreateOrderRequest {
    CreateOrderRequest {
        currency: "USD".to_string(),
        customer_name: Some("Ada Lovelace".to_string()),
        customer_phone: None,
        customer_email: None,
    }
}

fn item(warehouse_id: Uuid, product_id: Uuid, quantity: i32, unit_price: Decimal) -> AddItemRequest {
    AddItemRequest {
        warehouse_id,
        product_id,
        quantity,
        unit_price,
        discount_percent: Decimal::ZERO,
    }
}

#[tokio::test]
async fn draft_order_auto_approves_and_commits_stock() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;

    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");
    assert_eq!(order.status, "draft");
    assert!(order.order_number.starts_with("SO-"));
    assert!(!order.requires_manager_approval);

    let order = orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 5, dec!(10.00)),
        )
        .await
        .expect("add item");
    assert_eq!(app.balance(warehouse, product).await, (10, 5));
    assert!(!order.requires_manager_approval);

    let order = orders
        .submit(app.tenant, order.id, &manager)
        .await
        .expect("submit");
    assert_eq!(order.status, "approved");
    assert!(order.stock_committed);
    assert_eq!(app.balance(warehouse, product).await, (5, 0));
}

#[tokio::test]
async fn insufficient_stock_leaves_order_and_ledger_untouched() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;

    let manager = app.manager();
    let orders = &app.state.services.orders;
    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");

    let err = orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 11, dec!(1.00)),
        )
        .await
        .expect_err("should fail");
    match err {
        ServiceError::InsufficientStock {
            requested,
            available,
        } => {
            assert_eq!(requested, 11);
            assert_eq!(available, 10);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(app.balance(warehouse, product).await, (10, 0));
    let order = orders.get_order(app.tenant, order.id).await.expect("get");
    assert!(order.items.is_empty());
    assert_eq!(order.status, "draft");
}

#[tokio::test]
async fn rejection_releases_reservations_without_touching_on_hand() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;

    let employee = app.employee();
    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &employee, create_request())
        .await
        .expect("create");
    let order = orders
        .add_item(
            app.tenant,
            order.id,
            &employee,
            item(warehouse, product, 4, dec!(10.00)),
        )
        .await
        .expect("add item");
    // Non-manager actor trips the approval policy
    assert!(order.requires_manager_approval);

    let order = orders
        .submit(app.tenant, order.id, &employee)
        .await
        .expect("submit");
    assert_eq!(order.status, "submitted");
    assert!(!order.stock_committed);
    assert_eq!(app.balance(warehouse, product).await, (10, 4));

    let order = orders
        .reject(app.tenant, order.id, &manager)
        .await
        .expect("reject");
    assert_eq!(order.status, "rejected");
    assert_eq!(app.balance(warehouse, product).await, (10, 0));
}

#[tokio::test]
async fn manager_approval_commits_reservations() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;

    let employee = app.employee();
    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &employee, create_request())
        .await
        .expect("create");
    orders
        .add_item(
            app.tenant,
            order.id,
            &employee,
            item(warehouse, product, 4, dec!(10.00)),
        )
        .await
        .expect("add item");
    orders
        .submit(app.tenant, order.id, &employee)
        .await
        .expect("submit");

    let err = orders
        .approve(app.tenant, order.id, &employee)
        .await
        .expect_err("employee cannot approve");
    assert!(matches!(err, ServiceError::Unauthorized(_)));
    let unchanged = orders.get_order(app.tenant, order.id).await.expect("get");
    assert_eq!(unchanged.status, "submitted");

    let order = orders
        .approve(app.tenant, order.id, &manager)
        .await
        .expect("approve");
    assert_eq!(order.status, "approved");
    assert!(order.stock_committed);
    assert_eq!(app.balance(warehouse, product).await, (6, 0));
}

#[tokio::test]
async fn approval_flag_latches_monotonically() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 1000).await;

    let manager = app.manager();
    let orders = &app.state.services.orders;
    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");

    // Push the total over the default 1000 amount threshold
    let order = orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 3, dec!(400.00)),
        )
        .await
        .expect("add item");
    assert!(order.requires_manager_approval);

    // A later small line cannot clear the flag
    let order = orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 1, dec!(1.00)),
        )
        .await
        .expect("add item");
    assert!(order.requires_manager_approval);
    // Stock is still held speculatively for flagged orders
    assert_eq!(app.balance(warehouse, product).await, (1000, 4));
}

#[tokio::test]
async fn quantity_threshold_and_discount_trip_approval() {
    let mut cfg = common::test_config();
    cfg.sales.approval_quantity_threshold = 5;
    let app = TestApp::with_config(cfg).await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 100).await;

    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");
    let order = orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 6, dec!(1.00)),
        )
        .await
        .expect("add item");
    assert!(order.requires_manager_approval);

    // Deep discount on a fresh order also trips the policy
    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");
    let mut deep_discount = item(warehouse, product, 1, dec!(10.00));
    deep_discount.discount_percent = dec!(50);
    let order = orders
        .add_item(app.tenant, order.id, &manager, deep_discount)
        .await
        .expect("add item");
    assert!(order.requires_manager_approval);
}

#[tokio::test]
async fn cross_warehouse_order_requires_approval() {
    let app = TestApp::new().await;
    let (warehouse_a, warehouse_b, product) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse_a, product, 10).await;
    app.seed_stock(warehouse_b, product, 10).await;

    let manager = app.manager();
    let orders = &app.state.services.orders;
    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");

    let order = orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse_a, product, 1, dec!(1.00)),
        )
        .await
        .expect("add item");
    assert!(!order.requires_manager_approval);

    let order = orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse_b, product, 1, dec!(1.00)),
        )
        .await
        .expect("add item");
    assert!(order.requires_manager_approval);
}

#[tokio::test]
async fn submit_requires_draft_with_items() {
    let app = TestApp::new().await;
    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");
    let err = orders
        .submit(app.tenant, order.id, &manager)
        .await
        .expect_err("empty order");
    assert!(matches!(err, ServiceError::InvalidState(_)));

    // Items cannot be added once the order leaves draft
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;
    orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 1, dec!(1.00)),
        )
        .await
        .expect("add item");
    orders
        .submit(app.tenant, order.id, &manager)
        .await
        .expect("submit");
    let err = orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 1, dec!(1.00)),
        )
        .await
        .expect_err("not draft");
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn cancelling_a_submitted_order_releases_holds() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;

    let employee = app.employee();
    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &employee, create_request())
        .await
        .expect("create");
    orders
        .add_item(
            app.tenant,
            order.id,
            &employee,
            item(warehouse, product, 3, dec!(5.00)),
        )
        .await
        .expect("add item");
    orders
        .submit(app.tenant, order.id, &employee)
        .await
        .expect("submit");

    let order = orders
        .request_cancel(app.tenant, order.id, &employee)
        .await
        .expect("request cancel");
    assert_eq!(order.status, "cancel_requested");
    // Holds stay until a manager decides
    assert_eq!(app.balance(warehouse, product).await, (10, 3));

    let order = orders
        .approve_cancel(app.tenant, order.id, &manager)
        .await
        .expect("approve cancel");
    assert_eq!(order.status, "cancelled");
    assert_eq!(app.balance(warehouse, product).await, (10, 0));
}

#[tokio::test]
async fn cancelling_an_approved_order_restores_committed_stock() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;

    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");
    orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 4, dec!(5.00)),
        )
        .await
        .expect("add item");
    let order = orders
        .submit(app.tenant, order.id, &manager)
        .await
        .expect("submit");
    assert_eq!(order.status, "approved");
    assert_eq!(app.balance(warehouse, product).await, (6, 0));

    let order = orders
        .request_cancel(app.tenant, order.id, &manager)
        .await
        .expect("request cancel");
    let order = orders
        .approve_cancel(app.tenant, order.id, &manager)
        .await
        .expect("approve cancel");
    assert_eq!(order.status, "cancelled");
    assert!(!order.stock_committed);
    // Deduction reversed, nothing re-reserved
    assert_eq!(app.balance(warehouse, product).await, (10, 0));
}

#[tokio::test]
async fn rejected_cancellation_resumes_prior_status() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;

    let employee = app.employee();
    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &employee, create_request())
        .await
        .expect("create");
    orders
        .add_item(
            app.tenant,
            order.id,
            &employee,
            item(warehouse, product, 2, dec!(5.00)),
        )
        .await
        .expect("add item");
    orders
        .submit(app.tenant, order.id, &employee)
        .await
        .expect("submit");
    orders
        .request_cancel(app.tenant, order.id, &employee)
        .await
        .expect("request cancel");

    let err = orders
        .reject_cancel(app.tenant, order.id, &employee)
        .await
        .expect_err("employee cannot decide");
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    let order = orders
        .reject_cancel(app.tenant, order.id, &manager)
        .await
        .expect("reject cancel");
    assert_eq!(order.status, "submitted");
    assert_eq!(app.balance(warehouse, product).await, (10, 2));

    // The restored order continues through the normal flow
    let order = orders
        .approve(app.tenant, order.id, &manager)
        .await
        .expect("approve");
    assert_eq!(order.status, "approved");
}

#[tokio::test]
async fn cancellation_is_not_requestable_from_terminal_states() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 10).await;

    let employee = app.employee();
    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &employee, create_request())
        .await
        .expect("create");
    orders
        .add_item(
            app.tenant,
            order.id,
            &employee,
            item(warehouse, product, 1, dec!(1.00)),
        )
        .await
        .expect("add item");
    orders
        .submit(app.tenant, order.id, &employee)
        .await
        .expect("submit");
    orders
        .reject(app.tenant, order.id, &manager)
        .await
        .expect("reject");

    let err = orders
        .request_cancel(app.tenant, order.id, &employee)
        .await
        .expect_err("rejected is terminal");
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn total_is_the_sum_of_discounted_line_totals() {
    let app = TestApp::new().await;
    let (warehouse, product) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_stock(warehouse, product, 100).await;

    let manager = app.manager();
    let orders = &app.state.services.orders;
    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");

    orders
        .add_item(
            app.tenant,
            order.id,
            &manager,
            item(warehouse, product, 2, dec!(10.00)),
        )
        .await
        .expect("add item");
    let mut discounted = item(warehouse, product, 4, dec!(25.00));
    discounted.discount_percent = dec!(10);
    orders
        .add_item(app.tenant, order.id, &manager, discounted)
        .await
        .expect("add item");

    let order = orders.get_order(app.tenant, order.id).await.expect("get");
    // 2 x 10.00 + 4 x 25.00 x 0.9
    assert_eq!(order.total_amount, dec!(110.00));
    assert_eq!(order.total_quantity, 6);
    assert_eq!(order.items.len(), 2);
}

#[tokio::test]
async fn orders_are_tenant_scoped() {
    let app = TestApp::new().await;
    let manager = app.manager();
    let orders = &app.state.services.orders;

    let order = orders
        .create_order(app.tenant, &manager, create_request())
        .await
        .expect("create");

    let other_tenant = salesdesk_api::auth::TenantId(Uuid::new_v4());
    let err = orders
        .get_order(other_tenant, order.id)
        .await
        .expect_err("invisible to other tenants");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let listing = orders
        .list_orders(other_tenant, 1, 20)
        .await
        .expect("list");
    assert_eq!(listing.total, 0);
}
