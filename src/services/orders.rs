use crate::{
    auth::{Actor, TenantId},
    config::SalesConfig,
    db::DbPool,
    entities::sales_order::{self, Entity as SalesOrder, OrderStatus},
    entities::sales_order_item::{self, line_total, Entity as SalesOrderItem},
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::InventoryLedgerService,
};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,
    #[validate(length(max = 255))]
    pub customer_name: Option<String>,
    #[validate(length(max = 64))]
    pub customer_phone: Option<String>,
    #[validate(email)]
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub line_total: Decimal,
}

/// Order as reported to clients. `total_amount` is always the sum of
/// line totals, computed here and never stored on the order row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub status: String,
    pub currency: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub requires_manager_approval: bool,
    pub stock_committed: bool,
    pub total_amount: Decimal,
    pub total_quantity: i32,
    pub items: Vec<OrderItemResponse>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Workflow service for the sales order state machine. Every mutating
/// operation runs its business write and its ledger side effects inside
/// one transaction, so they commit or roll back together.
#[derive(Clone)]
pub struct SalesOrderService {
    db_pool: Arc<DbPool>,
    inventory: InventoryLedgerService,
    event_sender: Option<Arc<EventSender>>,
    policy: SalesConfig,
}

impl SalesOrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        inventory: InventoryLedgerService,
        event_sender: Option<Arc<EventSender>>,
        policy: SalesConfig,
    ) -> Self {
        Self {
            db_pool,
            inventory,
            event_sender,
            policy,
        }
    }

    fn generate_order_number() -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
        format!("SO-{}-{:04}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
    }

    async fn send_event(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send domain event");
            }
        }
    }

    async fn load_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: TenantId,
        order_id: Uuid,
    ) -> Result<sales_order::Model, ServiceError> {
        SalesOrder::find()
            .filter(sales_order::Column::Id.eq(order_id))
            .filter(sales_order::Column::TenantId.eq(tenant.as_uuid()))
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn load_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<Vec<sales_order_item::Model>, ServiceError> {
        SalesOrderItem::find()
            .filter(sales_order_item::Column::OrderId.eq(order_id))
            .order_by_asc(sales_order_item::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Statuses are stored as strings; a row holding an unknown status
    /// means the data is corrupt, not that the caller erred.
    fn parse_status(order: &sales_order::Model) -> Result<OrderStatus, ServiceError> {
        OrderStatus::from_str(&order.status).ok_or_else(|| {
            ServiceError::InvariantViolation(format!(
                "Order {} has unknown status '{}'",
                order.id, order.status
            ))
        })
    }

    fn to_response(
        order: sales_order::Model,
        items: Vec<sales_order_item::Model>,
    ) -> OrderResponse {
        let total_amount: Decimal = items.iter().map(|i| i.line_total).sum();
        let total_quantity: i32 = items.iter().map(|i| i.quantity).sum();
        OrderResponse {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            currency: order.currency,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            customer_email: order.customer_email,
            requires_manager_approval: order.requires_manager_approval,
            stock_committed: order.stock_committed,
            total_amount,
            total_quantity,
            items: items
                .into_iter()
                .map(|i| OrderItemResponse {
                    id: i.id,
                    warehouse_id: i.warehouse_id,
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    discount_percent: i.discount_percent,
                    line_total: i.line_total,
                })
                .collect(),
            created_by: order.created_by,
            updated_by: order.updated_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }

    /// Evaluates the approval policy over the full item set, including
    /// the line being added. The resulting flag is latched on the order:
    /// once true it never goes back to false.
    fn approval_required(&self, actor: &Actor, items: &[sales_order_item::Model]) -> bool {
        if !actor.role.is_manager_or_above() {
            return true;
        }

        let total_amount: Decimal = items.iter().map(|i| i.line_total).sum();
        if total_amount > self.policy.approval_amount_threshold {
            return true;
        }

        let total_quantity: i32 = items.iter().map(|i| i.quantity).sum();
        if total_quantity > self.policy.approval_quantity_threshold {
            return true;
        }

        if items
            .iter()
            .any(|i| i.discount_percent > self.policy.max_employee_discount_percent)
        {
            return true;
        }

        if self.policy.cross_warehouse_requires_approval {
            let warehouses: HashSet<Uuid> = items.iter().map(|i| i.warehouse_id).collect();
            if warehouses.len() > 1 {
                return true;
            }
        }

        false
    }

    async fn begin(&self) -> Result<DatabaseTransaction, ServiceError> {
        self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction");
            ServiceError::DatabaseError(e)
        })
    }

    async fn commit_txn(&self, txn: DatabaseTransaction) -> Result<(), ServiceError> {
        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            ServiceError::DatabaseError(e)
        })
    }

    async fn commit_lines(
        &self,
        txn: &DatabaseTransaction,
        tenant: TenantId,
        items: &[sales_order_item::Model],
    ) -> Result<(), ServiceError> {
        for item in items {
            self.inventory
                .commit(txn, tenant, item.warehouse_id, item.product_id, item.quantity)
                .await?;
        }
        Ok(())
    }

    async fn release_lines(
        &self,
        txn: &DatabaseTransaction,
        tenant: TenantId,
        items: &[sales_order_item::Model],
    ) -> Result<(), ServiceError> {
        for item in items {
            self.inventory
                .release(txn, tenant, item.warehouse_id, item.product_id, item.quantity)
                .await?;
        }
        Ok(())
    }

    async fn emit_line_events(
        &self,
        items: &[sales_order_item::Model],
        make: impl Fn(&sales_order_item::Model) -> Event,
    ) {
        for item in items {
            self.send_event(make(item)).await;
        }
    }

    #[instrument(skip(self, request), fields(tenant_id = %tenant.as_uuid(), actor_id = %actor.id))]
    pub async fn create_order(
        &self,
        tenant: TenantId,
        actor: &Actor,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let order = sales_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.as_uuid()),
            order_number: Set(Self::generate_order_number()),
            status: Set(OrderStatus::Draft.as_str().to_string()),
            currency: Set(request.currency.to_uppercase()),
            customer_name: Set(request.customer_name),
            customer_phone: Set(request.customer_phone),
            customer_email: Set(request.customer_email),
            requires_manager_approval: Set(false),
            stock_committed: Set(false),
            resume_status: Set(None),
            created_by: Set(actor.id.clone()),
            updated_by: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let db = &*self.db_pool;
        let model = order.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create order");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %model.id, order_number = %model.order_number, "order created");
        self.send_event(Event::OrderCreated(model.id)).await;

        Ok(Self::to_response(model, Vec::new()))
    }

    /// Adds a line to a draft order. The stock hold, the item row, and
    /// the approval flag update commit atomically; a failed reservation
    /// leaves both the order and the ledger untouched.
    #[instrument(skip(self, request), fields(tenant_id = %tenant.as_uuid(), order_id = %order_id, actor_id = %actor.id))]
    pub async fn add_item(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        actor: &Actor,
        request: AddItemRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        if request.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit price must not be negative".to_string(),
            ));
        }
        if request.discount_percent < Decimal::ZERO
            || request.discount_percent > Decimal::from(100)
        {
            return Err(ServiceError::ValidationError(
                "Discount percent must be between 0 and 100".to_string(),
            ));
        }

        let txn = self.begin().await?;

        let order = self.load_order(&txn, tenant, order_id).await?;
        let status = Self::parse_status(&order)?;
        if !status.is_modifiable() {
            return Err(ServiceError::InvalidState(format!(
                "Items can only be added to a draft order, current status is {}",
                order.status
            )));
        }

        self.inventory
            .reserve(
                &txn,
                tenant,
                request.warehouse_id,
                request.product_id,
                request.quantity,
            )
            .await?;

        let now = Utc::now();
        let item = sales_order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.as_uuid()),
            order_id: Set(order.id),
            warehouse_id: Set(request.warehouse_id),
            product_id: Set(request.product_id),
            quantity: Set(request.quantity),
            unit_price: Set(request.unit_price),
            discount_percent: Set(request.discount_percent),
            currency: Set(order.currency.clone()),
            line_total: Set(line_total(
                request.quantity,
                request.unit_price,
                request.discount_percent,
            )),
            created_by: Set(actor.id.clone()),
            created_at: Set(now),
        };
        let item_model = item.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order.id, "Failed to insert order item");
            ServiceError::DatabaseError(e)
        })?;

        let items = self.load_items(&txn, order.id).await?;
        let requires_approval =
            order.requires_manager_approval || self.approval_required(actor, &items);

        let mut active = order.clone().into_active_model();
        active.requires_manager_approval = Set(requires_approval);
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Some(now));
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order.id, "Failed to update order");
            ServiceError::DatabaseError(e)
        })?;

        self.commit_txn(txn).await?;

        info!(
            order_id = %order.id,
            item_id = %item_model.id,
            requires_approval = requires_approval,
            "item added"
        );
        self.send_event(Event::OrderItemAdded {
            order_id: order.id,
            product_id: item_model.product_id,
            quantity: item_model.quantity,
        })
        .await;
        self.send_event(Event::StockReserved {
            warehouse_id: item_model.warehouse_id,
            product_id: item_model.product_id,
            quantity: item_model.quantity,
        })
        .await;

        Ok(Self::to_response(order, items))
    }

    /// Submits a draft. Orders that never tripped the approval policy
    /// go straight to approved with their reservations committed;
    /// flagged orders wait in submitted with the holds intact.
    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid(), order_id = %order_id, actor_id = %actor.id))]
    pub async fn submit(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.begin().await?;

        let order = self.load_order(&txn, tenant, order_id).await?;
        let status = Self::parse_status(&order)?;
        if status != OrderStatus::Draft {
            return Err(ServiceError::InvalidState(format!(
                "Only a draft order can be submitted, current status is {}",
                order.status
            )));
        }

        let items = self.load_items(&txn, order.id).await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidState(
                "An order without items cannot be submitted".to_string(),
            ));
        }

        let (new_status, stock_committed) = if order.requires_manager_approval {
            (OrderStatus::Submitted, false)
        } else {
            self.commit_lines(&txn, tenant, &items).await?;
            (OrderStatus::Approved, true)
        };

        let old_status = order.status.clone();
        let mut active = order.into_active_model();
        active.status = Set(new_status.as_str().to_string());
        active.stock_committed = Set(stock_committed);
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        self.commit_txn(txn).await?;

        info!(order_id = %order.id, status = %order.status, "order submitted");
        self.send_event(Event::OrderStatusChanged {
            order_id: order.id,
            old_status,
            new_status: order.status.clone(),
        })
        .await;
        if stock_committed {
            self.emit_line_events(&items, |i| Event::StockCommitted {
                warehouse_id: i.warehouse_id,
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .await;
        }

        Ok(Self::to_response(order, items))
    }

    /// Manager approval of a submitted order: commits every line's hold
    /// into a permanent deduction.
    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid(), order_id = %order_id, actor_id = %actor.id))]
    pub async fn approve(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        actor.require_manager("Approving an order")?;

        let txn = self.begin().await?;

        let order = self.load_order(&txn, tenant, order_id).await?;
        let status = Self::parse_status(&order)?;
        if status != OrderStatus::Submitted {
            return Err(ServiceError::InvalidState(format!(
                "Only a submitted order can be approved, current status is {}",
                order.status
            )));
        }

        let items = self.load_items(&txn, order.id).await?;
        self.commit_lines(&txn, tenant, &items).await?;

        let old_status = order.status.clone();
        let mut active = order.into_active_model();
        active.status = Set(OrderStatus::Approved.as_str().to_string());
        active.stock_committed = Set(true);
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        self.commit_txn(txn).await?;

        info!(order_id = %order.id, "order approved");
        self.send_event(Event::OrderStatusChanged {
            order_id: order.id,
            old_status,
            new_status: order.status.clone(),
        })
        .await;
        self.emit_line_events(&items, |i| Event::StockCommitted {
            warehouse_id: i.warehouse_id,
            product_id: i.product_id,
            quantity: i.quantity,
        })
        .await;

        Ok(Self::to_response(order, items))
    }

    /// Manager rejection of a submitted order: every hold is released,
    /// on-hand stock is untouched.
    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid(), order_id = %order_id, actor_id = %actor.id))]
    pub async fn reject(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        actor.require_manager("Rejecting an order")?;

        let txn = self.begin().await?;

        let order = self.load_order(&txn, tenant, order_id).await?;
        let status = Self::parse_status(&order)?;
        if status != OrderStatus::Submitted {
            return Err(ServiceError::InvalidState(format!(
                "Only a submitted order can be rejected, current status is {}",
                order.status
            )));
        }

        let items = self.load_items(&txn, order.id).await?;
        self.release_lines(&txn, tenant, &items).await?;

        let old_status = order.status.clone();
        let mut active = order.into_active_model();
        active.status = Set(OrderStatus::Rejected.as_str().to_string());
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        self.commit_txn(txn).await?;

        info!(order_id = %order.id, "order rejected");
        self.send_event(Event::OrderStatusChanged {
            order_id: order.id,
            old_status,
            new_status: order.status.clone(),
        })
        .await;
        self.emit_line_events(&items, |i| Event::StockReleased {
            warehouse_id: i.warehouse_id,
            product_id: i.product_id,
            quantity: i.quantity,
        })
        .await;

        Ok(Self::to_response(order, items))
    }

    /// Asks for cancellation. Legal from draft, submitted, or approved;
    /// the prior status is recorded so a rejected request can restore it.
    /// No ledger effect until a manager decides.
    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid(), order_id = %order_id, actor_id = %actor.id))]
    pub async fn request_cancel(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.begin().await?;

        let order = self.load_order(&txn, tenant, order_id).await?;
        let status = Self::parse_status(&order)?;
        if !status.can_request_cancel() {
            return Err(ServiceError::InvalidState(format!(
                "Cancellation cannot be requested from status {}",
                order.status
            )));
        }

        let old_status = order.status.clone();
        let mut active = order.into_active_model();
        active.status = Set(OrderStatus::CancelRequested.as_str().to_string());
        active.resume_status = Set(Some(old_status.clone()));
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        let items = self.load_items(&txn, order.id).await?;
        self.commit_txn(txn).await?;

        info!(order_id = %order.id, "cancellation requested");
        self.send_event(Event::OrderStatusChanged {
            order_id: order.id,
            old_status,
            new_status: order.status.clone(),
        })
        .await;

        Ok(Self::to_response(order, items))
    }

    /// Manager approval of a cancellation. A committed order gets its
    /// deductions restored to on-hand without re-reserving; an
    /// uncommitted one simply releases its holds.
    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid(), order_id = %order_id, actor_id = %actor.id))]
    pub async fn approve_cancel(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        actor.require_manager("Approving a cancellation")?;

        let txn = self.begin().await?;

        let order = self.load_order(&txn, tenant, order_id).await?;
        let status = Self::parse_status(&order)?;
        if status != OrderStatus::CancelRequested {
            return Err(ServiceError::InvalidState(format!(
                "Only a pending cancellation can be approved, current status is {}",
                order.status
            )));
        }

        let items = self.load_items(&txn, order.id).await?;
        let was_committed = order.stock_committed;
        if was_committed {
            for item in &items {
                self.inventory
                    .reverse_commit(&txn, tenant, item.warehouse_id, item.product_id, item.quantity)
                    .await?;
            }
        } else {
            self.release_lines(&txn, tenant, &items).await?;
        }

        let old_status = order.status.clone();
        let mut active = order.into_active_model();
        active.status = Set(OrderStatus::Cancelled.as_str().to_string());
        active.stock_committed = Set(false);
        active.resume_status = Set(None);
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        self.commit_txn(txn).await?;

        info!(order_id = %order.id, was_committed = was_committed, "order cancelled");
        self.send_event(Event::OrderStatusChanged {
            order_id: order.id,
            old_status,
            new_status: order.status.clone(),
        })
        .await;
        if was_committed {
            self.emit_line_events(&items, |i| Event::StockCommitReversed {
                warehouse_id: i.warehouse_id,
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .await;
        } else {
            self.emit_line_events(&items, |i| Event::StockReleased {
                warehouse_id: i.warehouse_id,
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .await;
        }

        Ok(Self::to_response(order, items))
    }

    /// Manager rejection of a cancellation: the order returns to the
    /// status it held when cancellation was requested. No ledger effect.
    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid(), order_id = %order_id, actor_id = %actor.id))]
    pub async fn reject_cancel(
        &self,
        tenant: TenantId,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<OrderResponse, ServiceError> {
        actor.require_manager("Rejecting a cancellation")?;

        let txn = self.begin().await?;

        let order = self.load_order(&txn, tenant, order_id).await?;
        let status = Self::parse_status(&order)?;
        if status != OrderStatus::CancelRequested {
            return Err(ServiceError::InvalidState(format!(
                "Only a pending cancellation can be rejected, current status is {}",
                order.status
            )));
        }

        let resume = order
            .resume_status
            .clone()
            .and_then(|s| OrderStatus::from_str(&s))
            .ok_or_else(|| {
                ServiceError::InvariantViolation(format!(
                    "Order {} is awaiting cancellation but has no resumable status",
                    order.id
                ))
            })?;

        let old_status = order.status.clone();
        let mut active = order.into_active_model();
        active.status = Set(resume.as_str().to_string());
        active.resume_status = Set(None);
        active.updated_by = Set(Some(actor.id.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        let items = self.load_items(&txn, order.id).await?;
        self.commit_txn(txn).await?;

        info!(order_id = %order.id, status = %order.status, "cancellation rejected");
        self.send_event(Event::OrderStatusChanged {
            order_id: order.id,
            old_status,
            new_status: order.status.clone(),
        })
        .await;

        Ok(Self::to_response(order, items))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid(), order_id = %order_id))]
    pub async fn get_order(
        &self,
        tenant: TenantId,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let order = self.load_order(db, tenant, order_id).await?;
        let items = self.load_items(db, order.id).await?;
        Ok(Self::to_response(order, items))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid()))]
    pub async fn list_orders(
        &self,
        tenant: TenantId,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db_pool;
        let per_page = per_page.clamp(1, 100);

        let paginator = SalesOrder::find()
            .filter(sales_order::Column::TenantId.eq(tenant.as_uuid()))
            .order_by_desc(sales_order::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items = if order_ids.is_empty() {
            Vec::new()
        } else {
            SalesOrderItem::find()
                .filter(sales_order_item::Column::OrderId.is_in(order_ids))
                .order_by_asc(sales_order_item::Column::CreatedAt)
                .all(db)
                .await
                .map_err(ServiceError::DatabaseError)?
        };

        let responses = orders
            .into_iter()
            .map(|order| {
                let (mine, rest): (Vec<_>, Vec<_>) =
                    items.drain(..).partition(|i| i.order_id == order.id);
                items = rest;
                Self::to_response(order, mine)
            })
            .collect();

        Ok(OrderListResponse {
            orders: responses,
            total,
            page,
            per_page,
        })
    }
}
