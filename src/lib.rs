//! SalesDesk API Library
//!
//! Multi-tenant sales order processing and inventory reservation engine:
//! an order workflow state machine backed by a per-(warehouse, product)
//! reservation ledger, with DB-backed idempotency for mutating requests.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use services::idempotency::IdempotencyService;
use services::inventory::InventoryLedgerService;
use services::orders::SalesOrderService;

/// The domain services shared by handlers and middleware.
#[derive(Clone)]
pub struct AppServices {
    pub orders: SalesOrderService,
    pub inventory: InventoryLedgerService,
    pub idempotency: IdempotencyService,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: events::EventSender,
    pub services: AppServices,
}

impl AppState {
    /// Wires the service graph over a shared connection pool.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<config::AppConfig>,
        event_sender: events::EventSender,
    ) -> Self {
        let sender = Arc::new(event_sender.clone());
        let inventory = InventoryLedgerService::new(db.clone(), Some(sender.clone()));
        let orders = SalesOrderService::new(
            db.clone(),
            inventory.clone(),
            Some(sender),
            config.sales.clone(),
        );
        let idempotency = IdempotencyService::new(db.clone(), config.idempotency.ttl_hours);

        Self {
            db,
            config,
            event_sender,
            services: AppServices {
                orders,
                inventory,
                idempotency,
            },
        }
    }
}

/// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Envelope for every successful JSON response.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// All `/api/v1` routes. The idempotency middleware is layered on top in
/// `main` so tests can also exercise the raw routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/items", post(handlers::orders::add_item))
        .route("/orders/:id/submit", post(handlers::orders::submit_order))
        .route("/orders/:id/approve", post(handlers::orders::approve_order))
        .route("/orders/:id/reject", post(handlers::orders::reject_order))
        .route("/orders/:id/cancel", post(handlers::orders::request_cancel))
        .route(
            "/orders/:id/cancel/approve",
            post(handlers::orders::approve_cancel),
        )
        .route(
            "/orders/:id/cancel/reject",
            post(handlers::orders::reject_cancel),
        )
        .route("/inventory", get(handlers::inventory::list_balances))
        .route(
            "/inventory/receipts",
            post(handlers::inventory::receive_stock),
        )
        .route(
            "/inventory/:warehouse_id/:product_id",
            get(handlers::inventory::get_balance),
        )
}

/// Liveness probe
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Readiness probe: pings the database.
async fn status_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.db.ping().await.is_ok();
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "database": if db_ok { "up" } else { "down" },
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// Prometheus exposition endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    (
        StatusCode::OK,
        String::from_utf8_lossy(&buffer).to_string(),
    )
}

/// Health, readiness and metrics routes mounted outside `/api/v1`.
pub fn ambient_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_check))
        .route("/metrics", get(metrics))
}
