use crate::{
    auth::TenantId,
    db::DbPool,
    entities::idempotency_key::{self, Entity as IdempotencyKey},
    errors::ServiceError,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// DB-backed idempotency store. Rows are written at most once per
/// (key, tenant) and never updated; the first recorded response is the
/// only response a key will ever produce until the row expires.
#[derive(Clone)]
pub struct IdempotencyService {
    db_pool: Arc<DbPool>,
    ttl_hours: i64,
}

impl IdempotencyService {
    pub fn new(db_pool: Arc<DbPool>, ttl_hours: i64) -> Self {
        Self { db_pool, ttl_hours }
    }

    /// Fingerprint of the request this key protects. Two requests with
    /// the same key must hash identically to be treated as retries.
    pub fn compute_request_hash(method: &str, path: &str, body: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b":");
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(body);
        hex::encode(hasher.finalize())
    }

    /// Looks up a live key for the tenant. Expired rows are treated as
    /// absent; the sweeper deletes them later.
    #[instrument(skip(self), fields(tenant_id = %tenant.as_uuid()))]
    pub async fn find_key(
        &self,
        key: &str,
        tenant: TenantId,
    ) -> Result<Option<idempotency_key::Model>, ServiceError> {
        let db = &*self.db_pool;
        let row = IdempotencyKey::find()
            .filter(idempotency_key::Column::Key.eq(key))
            .filter(idempotency_key::Column::TenantId.eq(tenant.as_uuid()))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(row.filter(|r| r.expires_at > Utc::now()))
    }

    /// Records the first response for a key. Two racing writers can both
    /// reach the insert; the unique (key, tenant) index lets exactly one
    /// win, and the loser falls back to reading the winner's row.
    #[instrument(skip(self, response_body), fields(tenant_id = %tenant.as_uuid(), endpoint = %endpoint))]
    pub async fn store_key(
        &self,
        key: &str,
        tenant: TenantId,
        endpoint: &str,
        request_hash: &str,
        response_status: u16,
        response_body: &str,
    ) -> Result<idempotency_key::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let model = idempotency_key::ActiveModel {
            id: Set(Uuid::new_v4()),
            key: Set(key.to_string()),
            tenant_id: Set(tenant.as_uuid()),
            endpoint: Set(endpoint.to_string()),
            request_hash: Set(request_hash.to_string()),
            response_status: Set(response_status as i16),
            response_body: Set(response_body.to_string()),
            created_at: Set(now),
            expires_at: Set(now + Duration::hours(self.ttl_hours)),
        };

        match model.insert(db).await {
            Ok(row) => {
                info!(key = %key, "idempotency key recorded");
                Ok(row)
            }
            Err(insert_err) => {
                // Likely lost the unique-index race; the winner's row is
                // authoritative.
                if let Some(existing) = self.find_key(key, tenant).await? {
                    warn!(key = %key, "idempotency key already recorded by a concurrent request");
                    Ok(existing)
                } else {
                    error!(error = %insert_err, key = %key, "Failed to store idempotency key");
                    Err(ServiceError::DatabaseError(insert_err))
                }
            }
        }
    }

    /// Deletes rows whose retention window has passed. Returns the
    /// number of rows removed.
    #[instrument(skip(self))]
    pub async fn cleanup_expired_keys(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        let result = IdempotencyKey::delete_many()
            .filter(idempotency_key::Column::ExpiresAt.lte(now))
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected > 0 {
            info!(removed = result.rows_affected, "expired idempotency keys swept");
        }
        Ok(result.rows_affected)
    }
}
