use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{Actor, TenantId},
    services::inventory::StockBalance,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct StockReceiptRequest {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub reorder_point: Option<i32>,
}

/// List stock balances for the tenant
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    summary = "List stock balances",
    responses(
        (status = 200, description = "Balances retrieved", body = ApiResponse<Vec<StockBalance>>),
        (status = 400, description = "Missing tenant", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_balances(
    State(state): State<AppState>,
    tenant: TenantId,
) -> ApiResult<Vec<StockBalance>> {
    let balances = state.services.inventory.list_balances(tenant).await?;
    Ok(Json(ApiResponse::success(balances)))
}

/// Get one stock balance
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{warehouse_id}/{product_id}",
    summary = "Get stock balance",
    params(
        ("warehouse_id" = Uuid, Path, description = "Warehouse ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
    ),
    responses(
        (status = 200, description = "Balance retrieved", body = ApiResponse<StockBalance>),
        (status = 404, description = "No inventory row for the pair", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    tenant: TenantId,
    Path((warehouse_id, product_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StockBalance> {
    let balance = state
        .services
        .inventory
        .get_balance(tenant, warehouse_id, product_id)
        .await?;
    Ok(Json(ApiResponse::success(balance)))
}

/// Book a stock receipt
#[utoipa::path(
    post,
    path = "/api/v1/inventory/receipts",
    summary = "Receive stock",
    description = "Add received units to on-hand stock, creating the inventory row on first receipt",
    request_body = StockReceiptRequest,
    responses(
        (status = 201, description = "Receipt booked", body = ApiResponse<StockBalance>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
    )
)]
pub async fn receive_stock(
    State(state): State<AppState>,
    tenant: TenantId,
    _actor: Actor,
    Json(request): Json<StockReceiptRequest>,
) -> Result<impl IntoResponse, crate::errors::ServiceError> {
    request.validate()?;
    let balance = state
        .services
        .inventory
        .receive_stock(
            tenant,
            request.warehouse_id,
            request.product_id,
            request.quantity,
            request.reorder_point,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(balance))))
}
