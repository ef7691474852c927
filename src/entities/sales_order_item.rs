use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sales order line. Immutable once created; each line holds a stock
/// reservation against its (warehouse, product) row until the order
/// reaches a terminal state.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub order_id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub currency: String,
    pub line_total: Decimal,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_order::Entity",
        from = "Column::OrderId",
        to = "super::sales_order::Column::Id"
    )]
    Order,
}

impl Related<super::sales_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// quantity x unit_price x (1 - discount/100)
pub fn line_total(quantity: i32, unit_price: Decimal, discount_percent: Decimal) -> Decimal {
    let gross = Decimal::from(quantity) * unit_price;
    let factor = Decimal::ONE - discount_percent / Decimal::from(100);
    gross * factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_total_without_discount() {
        assert_eq!(line_total(5, dec!(10.00), Decimal::ZERO), dec!(50.00));
    }

    #[test]
    fn line_total_with_discount() {
        assert_eq!(line_total(4, dec!(25.00), dec!(10)), dec!(90.00));
    }

    #[test]
    fn full_discount_zeroes_the_line() {
        assert_eq!(line_total(3, dec!(19.99), dec!(100)), dec!(0.00));
    }
}
