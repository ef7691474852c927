pub mod idempotency_key;
pub mod sales_order;
pub mod sales_order_item;
pub mod warehouse_inventory;
