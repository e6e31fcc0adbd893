//! Permission catalog domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Permission, a named (resource, action) pair.
///
/// `resource` and `action` are immutable once a grant references the
/// permission; only display metadata and the active flag stay editable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    pub is_dangerous: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create permission request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub resource: String,
    #[validate(length(min = 1, max = 64))]
    pub action: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_dangerous: bool,
}

/// Update permission request (display metadata and active flag only)
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionRequest {
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Permission summary, the unit of effective-permission resolution
#[derive(Debug, Clone, Serialize)]
pub struct PermissionSummary {
    pub name: String,
    pub resource: String,
    pub action: String,
    pub is_dangerous: bool,
    pub description: Option<String>,
}
