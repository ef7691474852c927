pub mod idempotency;
pub mod inventory;
pub mod orders;
