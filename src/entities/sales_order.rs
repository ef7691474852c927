use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sales order header. The order total is never stored; it is computed
/// on read as the sum of line totals so it can never drift.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub order_number: String,
    pub status: String,
    pub currency: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub requires_manager_approval: bool,
    /// Whether line reservations have been converted into on-hand deductions.
    pub stock_committed: bool,
    /// Status to return to if a cancellation request is rejected.
    pub resume_status: Option<String>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_order_item::Entity")]
    Items,
}

impl Related<super::sales_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Closed order status set. Persisted as lowercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    CancelRequested,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::CancelRequested => "cancel_requested",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancel_requested" => Some(Self::CancelRequested),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Items may only be added while the order is a draft.
    pub fn is_modifiable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Cancellation may be requested from draft, submitted, or approved.
    /// Approved is included so a committed order can still be unwound
    /// through the manager-gated cancel path.
    pub fn can_request_cancel(&self) -> bool {
        matches!(self, Self::Draft | Self::Submitted | Self::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            OrderStatus::Draft,
            OrderStatus::Submitted,
            OrderStatus::Approved,
            OrderStatus::Rejected,
            OrderStatus::CancelRequested,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::from_str("fulfilled"), None);
    }

    #[test]
    fn only_draft_is_modifiable() {
        assert!(OrderStatus::Draft.is_modifiable());
        assert!(!OrderStatus::Submitted.is_modifiable());
        assert!(!OrderStatus::CancelRequested.is_modifiable());
    }

    #[test]
    fn cancel_request_legality() {
        assert!(OrderStatus::Draft.can_request_cancel());
        assert!(OrderStatus::Submitted.can_request_cancel());
        assert!(OrderStatus::Approved.can_request_cancel());
        assert!(!OrderStatus::Rejected.can_request_cancel());
        assert!(!OrderStatus::Cancelled.can_request_cancel());
        assert!(!OrderStatus::CancelRequested.can_request_cancel());
    }
}
