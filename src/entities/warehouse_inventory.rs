use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per (tenant, warehouse, product) stock row. `available` is always
/// derived as `on_hand - reserved` and never stored. The `version`
/// column drives optimistic compare-and-swap updates in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_inventory")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub on_hand: i32,
    pub reserved: i32,
    pub reorder_point: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn available(&self) -> i32 {
        self.on_hand - self.reserved
    }

    pub fn can_reserve(&self, quantity: i32) -> bool {
        quantity > 0 && self.available() >= quantity
    }

    pub fn is_low_stock(&self) -> bool {
        self.available() <= self.reorder_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(on_hand: i32, reserved: i32, reorder_point: i32) -> Model {
        Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            on_hand,
            reserved,
            reorder_point,
            version: 1,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn available_is_on_hand_minus_reserved() {
        assert_eq!(row(10, 4, 0).available(), 6);
        assert_eq!(row(10, 10, 0).available(), 0);
    }

    #[test]
    fn can_reserve_respects_availability() {
        let inv = row(10, 4, 0);
        assert!(inv.can_reserve(6));
        assert!(!inv.can_reserve(7));
        assert!(!inv.can_reserve(0));
        assert!(!inv.can_reserve(-1));
    }

    #[test]
    fn low_stock_compares_available_to_reorder_point() {
        assert!(row(10, 8, 2).is_low_stock());
        assert!(!row(10, 2, 2).is_low_stock());
    }
}
