use crate::{
    auth::TenantId,
    db::DbPool,
    entities::warehouse_inventory::{self, Entity as WarehouseInventory},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

lazy_static! {
    static ref STOCK_RESERVATIONS: IntCounter = register_int_counter!(
        "stock_reservations_total",
        "Total number of stock reservations"
    )
    .expect("metric can be created");
    static ref STOCK_RESERVATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "stock_reservation_failures_total",
        "Total number of failed stock reservations",
        &["error_type"]
    )
    .expect("metric can be created");
    static ref STOCK_COMMITS: IntCounter = register_int_counter!(
        "stock_commits_total",
        "Total number of reservation commits"
    )
    .expect("metric can be created");
    static ref STOCK_RELEASES: IntCounter = register_int_counter!(
        "stock_releases_total",
        "Total number of reservation releases"
    )
    .expect("metric can be created");
}

/// Attempts per row before giving up on an optimistic update. Contention
/// on a single (warehouse, product) row is short-lived, so a handful of
/// retries is enough.
const MAX_CAS_ATTEMPTS: u32 = 5;

/// A stock balance as reported to clients. `available` and `low_stock`
/// are derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockBalance {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub on_hand: i32,
    pub reserved: i32,
    pub available: i32,
    pub reorder_point: i32,
    pub low_stock: bool,
}

impl From<warehouse_inventory::Model> for StockBalance {
    fn from(model: warehouse_inventory::Model) -> Self {
        Self {
            warehouse_id: model.warehouse_id,
            product_id: model.product_id,
            on_hand: model.on_hand,
            reserved: model.reserved,
            available: model.available(),
            reorder_point: model.reorder_point,
            low_stock: model.is_low_stock(),
        }
    }
}

/// Per-(warehouse, product) reservation ledger. Every mutation is a
/// single-row read-modify-write guarded by the row's `version` column:
/// the UPDATE carries `WHERE id = ? AND version = ?`, and zero affected
/// rows means a concurrent writer won, so the operation re-reads and
/// retries. The mutating methods take any `ConnectionTrait` so order
/// workflows can run them inside their own transaction.
#[derive(Clone)]
pub struct InventoryLedgerService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventoryLedgerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn find_row<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: TenantId,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<warehouse_inventory::Model>, ServiceError> {
        WarehouseInventory::find()
            .filter(warehouse_inventory::Column::TenantId.eq(tenant.as_uuid()))
            .filter(warehouse_inventory::Column::WarehouseId.eq(warehouse_id))
            .filter(warehouse_inventory::Column::ProductId.eq(product_id))
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn require_row<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: TenantId,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> Result<warehouse_inventory::Model, ServiceError> {
        self.find_row(conn, tenant, warehouse_id, product_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No inventory for product {} in warehouse {}",
                    product_id, warehouse_id
                ))
            })
    }

    /// Writes `on_hand`/`reserved` back to a row guarded by its version.
    /// Returns true when the row was updated, false when a concurrent
    /// writer got there first.
    async fn cas_write<C: ConnectionTrait>(
        &self,
        conn: &C,
        row: &warehouse_inventory::Model,
        on_hand: i32,
        reserved: i32,
    ) -> Result<bool, ServiceError> {
        let result = WarehouseInventory::update_many()
            .col_expr(warehouse_inventory::Column::OnHand, Expr::value(on_hand))
            .col_expr(warehouse_inventory::Column::Reserved, Expr::value(reserved))
            .col_expr(
                warehouse_inventory::Column::Version,
                Expr::value(row.version + 1),
            )
            .col_expr(
                warehouse_inventory::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(warehouse_inventory::Column::Id.eq(row.id))
            .filter(warehouse_inventory::Column::Version.eq(row.version))
            .exec(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(result.rows_affected == 1)
    }

    fn contended(&self, warehouse_id: Uuid, product_id: Uuid) -> ServiceError {
        warn!(
            warehouse_id = %warehouse_id,
            product_id = %product_id,
            "inventory row contended beyond retry budget"
        );
        ServiceError::InternalError(format!(
            "Inventory row for product {} in warehouse {} is contended",
            product_id, warehouse_id
        ))
    }

    /// Places a hold of `quantity` units. Fails with `InsufficientStock`
    /// when fewer than `quantity` units are available; the row is left
    /// untouched in that case.
    #[instrument(skip(self, conn), fields(warehouse_id = %warehouse_id, product_id = %product_id, quantity = quantity))]
    pub async fn reserve<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: TenantId,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<warehouse_inventory::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Reservation quantity must be positive".to_string(),
            ));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let row = self
                .require_row(conn, tenant, warehouse_id, product_id)
                .await?;

            if !row.can_reserve(quantity) {
                STOCK_RESERVATION_FAILURES
                    .with_label_values(&["insufficient_stock"])
                    .inc();
                return Err(ServiceError::InsufficientStock {
                    requested: quantity,
                    available: row.available(),
                });
            }

            if self
                .cas_write(conn, &row, row.on_hand, row.reserved + quantity)
                .await?
            {
                STOCK_RESERVATIONS.inc();
                info!(reserved = row.reserved + quantity, "stock reserved");
                return Ok(warehouse_inventory::Model {
                    reserved: row.reserved + quantity,
                    version: row.version + 1,
                    ..row
                });
            }
        }

        STOCK_RESERVATION_FAILURES
            .with_label_values(&["contention"])
            .inc();
        Err(self.contended(warehouse_id, product_id))
    }

    /// Gives a hold back without touching on-hand stock. Releasing more
    /// than is currently reserved means the ledger and the workflow have
    /// diverged, which is an invariant violation rather than user error.
    #[instrument(skip(self, conn), fields(warehouse_id = %warehouse_id, product_id = %product_id, quantity = quantity))]
    pub async fn release<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: TenantId,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<warehouse_inventory::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Release quantity must be positive".to_string(),
            ));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let row = self
                .require_row(conn, tenant, warehouse_id, product_id)
                .await?;

            if row.reserved < quantity {
                return Err(ServiceError::InvariantViolation(format!(
                    "Releasing {} units but only {} are reserved for product {} in warehouse {}",
                    quantity, row.reserved, product_id, warehouse_id
                )));
            }

            if self
                .cas_write(conn, &row, row.on_hand, row.reserved - quantity)
                .await?
            {
                STOCK_RELEASES.inc();
                return Ok(warehouse_inventory::Model {
                    reserved: row.reserved - quantity,
                    version: row.version + 1,
                    ..row
                });
            }
        }

        Err(self.contended(warehouse_id, product_id))
    }

    /// Converts a hold into an actual deduction: both `reserved` and
    /// `on_hand` drop by `quantity`.
    #[instrument(skip(self, conn), fields(warehouse_id = %warehouse_id, product_id = %product_id, quantity = quantity))]
    pub async fn commit<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: TenantId,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<warehouse_inventory::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Commit quantity must be positive".to_string(),
            ));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let row = self
                .require_row(conn, tenant, warehouse_id, product_id)
                .await?;

            if row.reserved < quantity || row.on_hand < quantity {
                return Err(ServiceError::InvariantViolation(format!(
                    "Committing {} units with on_hand {} / reserved {} for product {} in warehouse {}",
                    quantity, row.on_hand, row.reserved, product_id, warehouse_id
                )));
            }

            if self
                .cas_write(conn, &row, row.on_hand - quantity, row.reserved - quantity)
                .await?
            {
                STOCK_COMMITS.inc();
                if row.on_hand - quantity <= row.reorder_point {
                    warn!(
                        warehouse_id = %warehouse_id,
                        product_id = %product_id,
                        on_hand = row.on_hand - quantity,
                        reorder_point = row.reorder_point,
                        "stock at or below reorder point"
                    );
                }
                return Ok(warehouse_inventory::Model {
                    on_hand: row.on_hand - quantity,
                    reserved: row.reserved - quantity,
                    version: row.version + 1,
                    ..row
                });
            }
        }

        Err(self.contended(warehouse_id, product_id))
    }

    /// Puts previously committed units back on hand. Used when a
    /// cancellation is approved after the order already deducted stock;
    /// no hold is recreated.
    #[instrument(skip(self, conn), fields(warehouse_id = %warehouse_id, product_id = %product_id, quantity = quantity))]
    pub async fn reverse_commit<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant: TenantId,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<warehouse_inventory::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Reversal quantity must be positive".to_string(),
            ));
        }

        for _ in 0..MAX_CAS_ATTEMPTS {
            let row = self
                .require_row(conn, tenant, warehouse_id, product_id)
                .await?;

            if self
                .cas_write(conn, &row, row.on_hand + quantity, row.reserved)
                .await?
            {
                return Ok(warehouse_inventory::Model {
                    on_hand: row.on_hand + quantity,
                    version: row.version + 1,
                    ..row
                });
            }
        }

        Err(self.contended(warehouse_id, product_id))
    }

    /// Books a stock receipt, creating the (tenant, warehouse, product)
    /// row on first receipt.
    #[instrument(skip(self), fields(warehouse_id = %warehouse_id, product_id = %product_id, quantity = quantity))]
    pub async fn receive_stock(
        &self,
        tenant: TenantId,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reorder_point: Option<i32>,
    ) -> Result<StockBalance, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Receipt quantity must be positive".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for stock receipt");
            ServiceError::DatabaseError(e)
        })?;

        let mut updated: Option<warehouse_inventory::Model> = None;
        for _ in 0..MAX_CAS_ATTEMPTS {
            match self.find_row(&txn, tenant, warehouse_id, product_id).await? {
                None => {
                    let now = Utc::now();
                    let model = warehouse_inventory::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        tenant_id: Set(tenant.as_uuid()),
                        warehouse_id: Set(warehouse_id),
                        product_id: Set(product_id),
                        on_hand: Set(quantity),
                        reserved: Set(0),
                        reorder_point: Set(reorder_point.unwrap_or(0)),
                        version: Set(1),
                        created_at: Set(now),
                        updated_at: Set(None),
                    };
                    updated = Some(model.insert(&txn).await.map_err(|e| {
                        error!(error = %e, "Failed to insert inventory row");
                        ServiceError::DatabaseError(e)
                    })?);
                    break;
                }
                Some(row) => {
                    if self
                        .cas_write(&txn, &row, row.on_hand + quantity, row.reserved)
                        .await?
                    {
                        updated = Some(warehouse_inventory::Model {
                            on_hand: row.on_hand + quantity,
                            version: row.version + 1,
                            ..row
                        });
                        break;
                    }
                }
            }
        }

        let row = match updated {
            Some(row) => row,
            None => {
                return Err(self.contended(warehouse_id, product_id));
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit stock receipt transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(on_hand = row.on_hand, "stock received");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::StockReceived {
                    warehouse_id,
                    product_id,
                    quantity,
                })
                .await
            {
                warn!(error = %e, "Failed to send stock received event");
            }
        }

        Ok(row.into())
    }

    /// Reads one balance. Unknown (warehouse, product) pairs are NotFound.
    #[instrument(skip(self), fields(warehouse_id = %warehouse_id, product_id = %product_id))]
    pub async fn get_balance(
        &self,
        tenant: TenantId,
        warehouse_id: Uuid,
        product_id: Uuid,
    ) -> Result<StockBalance, ServiceError> {
        let db = &*self.db_pool;
        self.require_row(db, tenant, warehouse_id, product_id)
            .await
            .map(Into::into)
    }

    /// Lists every balance for the tenant, ordered for stable output.
    #[instrument(skip(self))]
    pub async fn list_balances(&self, tenant: TenantId) -> Result<Vec<StockBalance>, ServiceError> {
        let db = &*self.db_pool;
        let rows = WarehouseInventory::find()
            .filter(warehouse_inventory::Column::TenantId.eq(tenant.as_uuid()))
            .order_by_asc(warehouse_inventory::Column::WarehouseId)
            .order_by_asc(warehouse_inventory::Column::ProductId)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
