//! Role catalog domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role category, the separation-of-duties axis.
///
/// Assignments for `business` and `audit` roles are auto-approved at
/// creation; `technical` and `security` assignments require an explicit
/// approval decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    Technical,
    Security,
    Business,
    Audit,
}

impl RoleCategory {
    /// Categories carrying no material risk skip the approval step.
    pub fn is_auto_approved(&self) -> bool {
        matches!(self, RoleCategory::Business | RoleCategory::Audit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleCategory::Technical => "technical",
            RoleCategory::Security => "security",
            RoleCategory::Business => "business",
            RoleCategory::Audit => "audit",
        }
    }
}

/// Role
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub category: RoleCategory,
    pub description: Option<String>,
    pub requires_mfa: bool,
    pub max_session_duration_secs: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create role request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub category: RoleCategory,
    pub description: Option<String>,
    #[serde(default)]
    pub requires_mfa: bool,
    #[serde(default = "default_session_duration")]
    pub max_session_duration_secs: i64,
}

fn default_session_duration() -> i64 {
    28800
}

/// Update role request (name and category are immutable)
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub description: Option<String>,
    pub requires_mfa: Option<bool>,
    pub max_session_duration_secs: Option<i64>,
    pub is_active: Option<bool>,
}
