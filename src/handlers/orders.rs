use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    auth::{Actor, TenantId},
    services::orders::{AddItemRequest, CreateOrderRequest, OrderListResponse, OrderResponse},
    ApiResponse, ApiResult, AppState, ListQuery,
};

/// Create a new draft order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Create a new sales order in draft status",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    tenant: TenantId,
    actor: Actor,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    let order = state
        .services
        .orders
        .create_order(tenant, &actor, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// List orders for the tenant
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Get a paginated list of the tenant's sales orders",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<OrderListResponse>),
        (status = 400, description = "Missing tenant", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    tenant: TenantId,
    Query(query): Query<ListQuery>,
) -> ApiResult<OrderListResponse> {
    let orders = state
        .services
        .orders
        .list_orders(tenant, query.page, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Get one order with computed totals
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    tenant: TenantId,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.get_order(tenant, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Add a line item to a draft order, reserving stock
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items",
    summary = "Add order item",
    description = "Add a line item to a draft order; the quantity is reserved immediately",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item added", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not a draft", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or inventory row not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    )
)]
pub async fn add_item(
    State(state): State<AppState>,
    tenant: TenantId,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .add_item(tenant, id, &actor, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Submit a draft order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/submit",
    summary = "Submit order",
    description = "Submit a draft order; auto-approves and commits stock unless flagged for manager approval",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order submitted", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not a submittable draft", body = crate::errors::ErrorResponse),
    )
)]
pub async fn submit_order(
    State(state): State<AppState>,
    tenant: TenantId,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.submit(tenant, id, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Approve a submitted order (manager only)
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/approve",
    summary = "Approve order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order approved", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not submitted", body = crate::errors::ErrorResponse),
        (status = 403, description = "Actor is not a manager", body = crate::errors::ErrorResponse),
    )
)]
pub async fn approve_order(
    State(state): State<AppState>,
    tenant: TenantId,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.approve(tenant, id, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Reject a submitted order (manager only)
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/reject",
    summary = "Reject order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order rejected", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order is not submitted", body = crate::errors::ErrorResponse),
        (status = 403, description = "Actor is not a manager", body = crate::errors::ErrorResponse),
    )
)]
pub async fn reject_order(
    State(state): State<AppState>,
    tenant: TenantId,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.reject(tenant, id, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Request cancellation of an order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    summary = "Request cancellation",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Cancellation requested", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Cancellation not possible from current status", body = crate::errors::ErrorResponse),
    )
)]
pub async fn request_cancel(
    State(state): State<AppState>,
    tenant: TenantId,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .request_cancel(tenant, id, &actor)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Approve a pending cancellation (manager only)
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel/approve",
    summary = "Approve cancellation",
    description = "Cancel the order, releasing held stock or restoring committed stock",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 400, description = "No pending cancellation", body = crate::errors::ErrorResponse),
        (status = 403, description = "Actor is not a manager", body = crate::errors::ErrorResponse),
    )
)]
pub async fn approve_cancel(
    State(state): State<AppState>,
    tenant: TenantId,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .approve_cancel(tenant, id, &actor)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Reject a pending cancellation (manager only)
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel/reject",
    summary = "Reject cancellation",
    description = "Return the order to the status it held before cancellation was requested",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Cancellation rejected", body = ApiResponse<OrderResponse>),
        (status = 400, description = "No pending cancellation", body = crate::errors::ErrorResponse),
        (status = 403, description = "Actor is not a manager", body = crate::errors::ErrorResponse),
    )
)]
pub async fn reject_cancel(
    State(state): State<AppState>,
    tenant: TenantId,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .reject_cancel(tenant, id, &actor)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
