//! Request identity: tenant scoping and actor roles.
//!
//! Token issuance and verification live in an upstream gateway; by the
//! time a request reaches this service the tenant and actor have been
//! resolved into headers. The extractors here turn those headers into
//! typed values that every workflow and ledger call takes explicitly.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Closed role set. Role checks go through [`Role::is_manager_or_above`]
/// so there is exactly one predicate to audit, not scattered string
/// comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Manager,
    Admin,
}

impl Role {
    pub fn is_manager_or_above(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "employee" => Some(Role::Employee),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The authenticated principal acting on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Fails with `Unauthorized` unless the actor is manager-or-above.
    pub fn require_manager(&self, action: &str) -> Result<(), ServiceError> {
        if self.role.is_manager_or_above() {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized(format!(
                "{} requires a manager-level role",
                action
            )))
        }
    }
}

/// Tenant scope for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// Parses the tenant header from request parts, if present and valid.
pub fn tenant_from_parts(parts: &Parts) -> Option<TenantId> {
    parts
        .headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(TenantId)
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        tenant_from_parts(parts).ok_or(ServiceError::MissingTenant)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("{} header is required", ACTOR_ID_HEADER))
            })?;

        let role = parts
            .headers
            .get(ACTOR_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Role::from_str)
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "{} header must be one of employee, manager, admin",
                    ACTOR_ROLE_HEADER
                ))
            })?;

        Ok(Actor { id, role })
    }
}
