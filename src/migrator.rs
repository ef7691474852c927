use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_sales_orders_table::Migration),
            Box::new(m20240101_000002_create_sales_order_items_table::Migration),
            Box::new(m20240101_000003_create_warehouse_inventory_table::Migration),
            Box::new(m20240101_000004_create_idempotency_keys_table::Migration),
        ]
    }
}

mod m20240101_000001_create_sales_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_sales_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrders::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(SalesOrders::OrderNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrders::Status).string().not_null())
                        .col(ColumnDef::new(SalesOrders::Currency).string().not_null())
                        .col(ColumnDef::new(SalesOrders::CustomerName).string().null())
                        .col(ColumnDef::new(SalesOrders::CustomerPhone).string().null())
                        .col(ColumnDef::new(SalesOrders::CustomerEmail).string().null())
                        .col(
                            ColumnDef::new(SalesOrders::RequiresManagerApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(SalesOrders::StockCommitted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(SalesOrders::ResumeStatus).string().null())
                        .col(ColumnDef::new(SalesOrders::CreatedBy).string().not_null())
                        .col(ColumnDef::new(SalesOrders::UpdatedBy).string().null())
                        .col(
                            ColumnDef::new(SalesOrders::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrders::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_orders_tenant_id")
                        .table(SalesOrders::Table)
                        .col(SalesOrders::TenantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_orders_status")
                        .table(SalesOrders::Table)
                        .col(SalesOrders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SalesOrders {
        Table,
        Id,
        TenantId,
        OrderNumber,
        Status,
        Currency,
        CustomerName,
        CustomerPhone,
        CustomerEmail,
        RequiresManagerApproval,
        StockCommitted,
        ResumeStatus,
        CreatedBy,
        UpdatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_sales_order_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_sales_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SalesOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesOrderItems::TenantId).uuid().not_null())
                        .col(ColumnDef::new(SalesOrderItems::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(SalesOrderItems::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::DiscountPercent)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::Currency)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::LineTotal)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SalesOrderItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_order_items_order_id")
                        .table(SalesOrderItems::Table)
                        .col(SalesOrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesOrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SalesOrderItems {
        Table,
        Id,
        TenantId,
        OrderId,
        WarehouseId,
        ProductId,
        Quantity,
        UnitPrice,
        DiscountPercent,
        Currency,
        LineTotal,
        CreatedBy,
        CreatedAt,
    }
}

mod m20240101_000003_create_warehouse_inventory_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_warehouse_inventory_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseInventory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseInventory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::OnHand)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::Reserved)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::ReorderPoint)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseInventory::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One stock row per (tenant, warehouse, product)
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("ux_warehouse_inventory_tenant_warehouse_product")
                        .table(WarehouseInventory::Table)
                        .col(WarehouseInventory::TenantId)
                        .col(WarehouseInventory::WarehouseId)
                        .col(WarehouseInventory::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseInventory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseInventory {
        Table,
        Id,
        TenantId,
        WarehouseId,
        ProductId,
        OnHand,
        Reserved,
        ReorderPoint,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_idempotency_keys_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_idempotency_keys_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(IdempotencyKeys::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(IdempotencyKeys::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(IdempotencyKeys::Key).string().not_null())
                        .col(
                            ColumnDef::new(IdempotencyKeys::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::Endpoint)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::RequestHash)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::ResponseStatus)
                                .small_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::ResponseBody)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(IdempotencyKeys::ExpiresAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // A key may be recorded at most once per tenant
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("ux_idempotency_keys_key_tenant")
                        .table(IdempotencyKeys::Table)
                        .col(IdempotencyKeys::Key)
                        .col(IdempotencyKeys::TenantId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_idempotency_keys_expires_at")
                        .table(IdempotencyKeys::Table)
                        .col(IdempotencyKeys::ExpiresAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(IdempotencyKeys::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum IdempotencyKeys {
        Table,
        Id,
        Key,
        TenantId,
        Endpoint,
        RequestHash,
        ResponseStatus,
        ResponseBody,
        CreatedAt,
        ExpiresAt,
    }
}
