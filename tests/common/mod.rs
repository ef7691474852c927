#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use salesdesk_api::{
    ambient_routes, api_v1_routes,
    auth::{Actor, Role, TenantId},
    config::{AppConfig, IdempotencyConfig, SalesConfig},
    db::{establish_connection_with_config, run_migrations, DbConfig},
    events,
    middleware_helpers::idempotency::idempotency_middleware,
    AppState,
};

/// Test harness backed by an in-memory SQLite database. The pool is
/// pinned to a single connection so every handle sees the same
/// `:memory:` database.
pub struct TestApp {
    pub state: AppState,
    pub tenant: TenantId,
    router: Router,
    _event_task: tokio::task::JoinHandle<()>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        auto_migrate: true,
        db_max_connections: Some(1),
        sales: SalesConfig::default(),
        idempotency: IdempotencyConfig::default(),
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout: Duration::from_secs(3600),
            ..Default::default()
        };
        let db = establish_connection_with_config(&db_cfg)
            .await
            .expect("db connect");
        run_migrations(&db).await.expect("migrations");

        let (event_sender, event_rx) = events::channel(1024);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(db), Arc::new(cfg), event_sender);

        let router = Router::new()
            .merge(ambient_routes())
            .nest("/api/v1", api_v1_routes())
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                idempotency_middleware,
            ))
            .with_state(state.clone());

        Self {
            state,
            tenant: TenantId(Uuid::new_v4()),
            router,
            _event_task: event_task,
        }
    }

    pub fn employee(&self) -> Actor {
        Actor::new("emp-1", Role::Employee)
    }

    pub fn manager(&self) -> Actor {
        Actor::new("mgr-1", Role::Manager)
    }

    /// Seeds stock through the real receipt path.
    pub async fn seed_stock(&self, warehouse_id: Uuid, product_id: Uuid, quantity: i32) {
        self.state
            .services
            .inventory
            .receive_stock(self.tenant, warehouse_id, product_id, quantity, None)
            .await
            .expect("seed stock");
    }

    pub async fn balance(&self, warehouse_id: Uuid, product_id: Uuid) -> (i32, i32) {
        let balance = self
            .state
            .services
            .inventory
            .get_balance(self.tenant, warehouse_id, product_id)
            .await
            .expect("balance");
        (balance.on_hand, balance.reserved)
    }

    /// Sends a request through the full router, idempotency middleware
    /// included. Tenant and actor headers are attached unless already
    /// present in `headers`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        role: Role,
        headers: &[(&str, &str)],
    ) -> Response {
        let overridden =
            |name: &str| headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name));

        let mut builder = Request::builder().method(method).uri(path);
        if !overridden("x-tenant-id") {
            builder = builder.header("x-tenant-id", self.tenant.as_uuid().to_string());
        }
        if !overridden("x-actor-id") {
            builder = builder.header("x-actor-id", "test-actor");
        }
        if !overridden("x-actor-role") {
            builder = builder.header(
                "x-actor-role",
                match role {
                    Role::Employee => "employee",
                    Role::Manager => "manager",
                    Role::Admin => "admin",
                },
            );
        }
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router.clone().oneshot(request).await.expect("response")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn assert_json(response: Response, expected_status: StatusCode) -> Value {
    assert_eq!(response.status(), expected_status);
    response_json(response).await
}
