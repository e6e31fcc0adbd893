//! Access review domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Review lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Revoked,
}

/// Terminal decision of a completed review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_decision", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    ApproveAll,
    RevokeSome,
    RevokeAll,
}

/// Periodic access review over a snapshot of a user's roles.
///
/// `roles_reviewed` is frozen at creation time; later assignment changes do
/// not alter it. A review completes exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessReview {
    pub id: Uuid,
    pub user_id: Uuid,
    pub review_period: String,
    pub review_type: String,
    pub roles_reviewed: Vec<Uuid>,
    pub status: ReviewStatus,
    pub reviewer_id: Uuid,
    pub decision: Option<ReviewDecision>,
    pub revoked_roles: Option<Vec<Uuid>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Create review request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub user_id: Uuid,
    /// Period label, e.g. "2026-Q3"
    #[validate(length(min = 1, max = 32))]
    pub review_period: String,
    /// e.g. "quarterly", "offboarding", "incident_followup"
    #[validate(length(min = 1, max = 32))]
    pub review_type: String,
}

/// Complete review request
#[derive(Debug, Deserialize)]
pub struct CompleteReviewRequest {
    pub decision: ReviewDecision,
    pub revoked_roles: Option<Vec<Uuid>>,
    pub review_notes: Option<String>,
}

/// Review list filters
#[derive(Debug, Default, Deserialize)]
pub struct ReviewListFilters {
    pub user_id: Option<Uuid>,
    pub status: Option<ReviewStatus>,
    pub review_period: Option<String>,
}
