use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SalesDesk API",
        version = "0.3.0",
        description = r#"
Multi-tenant sales order processing and inventory reservation engine.

Orders move through a draft/submitted/approved state machine; every line
item holds a warehouse-level stock reservation that is committed on
approval, released on rejection, and unwound on cancellation. Mutating
requests can carry an `Idempotency-Key` header so retries replay the
first recorded response instead of re-executing.

## Request headers

- `X-Tenant-Id`: tenant UUID, required on every tenant-scoped route
- `X-Actor-Id` / `X-Actor-Role`: acting user and role
  (`employee`, `manager`, `admin`), resolved by the upstream gateway
- `Idempotency-Key`: optional retry-safety key on mutating routes
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Sales order workflow"),
        (name = "Inventory", description = "Stock balances and receipts")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::add_item,
        crate::handlers::orders::submit_order,
        crate::handlers::orders::approve_order,
        crate::handlers::orders::reject_order,
        crate::handlers::orders::request_cancel,
        crate::handlers::orders::approve_cancel,
        crate::handlers::orders::reject_cancel,
        crate::handlers::inventory::list_balances,
        crate::handlers::inventory::get_balance,
        crate::handlers::inventory::receive_stock,
    ),
    components(
        schemas(
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::AddItemRequest,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::OrderListResponse,
            crate::services::inventory::StockBalance,
            crate::handlers::inventory::StockReceiptRequest,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDocV1::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/orders"));
        assert!(doc.paths.paths.contains_key("/api/v1/inventory/receipts"));
    }
}
