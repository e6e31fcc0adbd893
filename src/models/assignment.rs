//! Role grant and assignment domain models

use crate::models::role::RoleCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role-permission grant record. Created, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RolePermissionGrant {
    pub id: Uuid,
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub granted_by: Uuid,
    pub granted_at: DateTime<Utc>,
}

/// Time-bound, approval-gated binding of a role to an admin identity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_approved: bool,
    pub approved_by: Option<Uuid>,
    /// Decision timestamp. Set on approval AND on rejection, so a pending
    /// assignment (no decision yet) is distinguishable from a rejected one.
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_reason: Option<String>,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
}

/// Lifecycle state of an assignment, derived from its columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentState {
    PendingApproval,
    Approved,
    Rejected,
    Revoked,
}

impl UserRoleAssignment {
    /// Current lifecycle state. Revocation wins over any decision.
    pub fn state(&self) -> AssignmentState {
        if self.revoked_at.is_some() {
            AssignmentState::Revoked
        } else if self.approved_at.is_none() {
            AssignmentState::PendingApproval
        } else if self.is_approved {
            AssignmentState::Approved
        } else {
            AssignmentState::Rejected
        }
    }

    /// Whether the validity window contains `now`
    pub fn in_validity_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && self.valid_until.map_or(true, |until| until > now)
    }

    /// Whether the assignment grants permissions at `now`:
    /// approved, not revoked, and inside the validity window
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.state() == AssignmentState::Approved && self.in_validity_window(now)
    }
}

/// Assignment response enriched with its derived lifecycle state
#[derive(Debug, Serialize)]
pub struct AssignmentWithState {
    #[serde(flatten)]
    pub assignment: UserRoleAssignment,
    pub state: AssignmentState,
}

impl From<UserRoleAssignment> for AssignmentWithState {
    fn from(assignment: UserRoleAssignment) -> Self {
        let state = assignment.state();
        Self { assignment, state }
    }
}

/// A role held by a user, joined with its assignment metadata
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AssignedRole {
    pub assignment_id: Uuid,
    pub role_id: Uuid,
    pub role_name: String,
    pub category: RoleCategory,
    pub requires_mfa: bool,
    pub max_session_duration_secs: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Assign role request
#[derive(Debug, Deserialize, Validate)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 512))]
    pub reason: String,
}

/// Approval decision request
#[derive(Debug, Deserialize)]
pub struct ApproveAssignmentRequest {
    pub approve: bool,
    pub notes: Option<String>,
}

/// Grant permission to role request
#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub permission_id: Uuid,
}
