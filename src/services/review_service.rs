//! Access review service
//! 周期性访问审查：对用户角色集合快照做出批准或撤销决定
//!
//! 审查在创建时冻结 roles_reviewed 快照，之后的分配变化不影响快照；
//! 每个审查只能完成一次。

use chrono::Utc;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::admin_user::AdminUser;
use crate::models::review::*;
use crate::repository::assignment_repo::AssignmentRepository;
use crate::services::audit_service::{AuditAction, AuditService};

/// 访问审查服务
pub struct ReviewService {
    db: Pool<Postgres>,
    audit_service: Arc<AuditService>,
}

/// 校验完成决定与 revoked_roles 的组合，返回要撤销的角色集合
///
/// - approve_all 不得携带 revoked_roles
/// - revoke_some / revoke_all 必须携带非空 revoked_roles，且为快照子集
/// - revoke_all 必须覆盖整个快照
pub fn validate_decision(
    decision: ReviewDecision,
    revoked_roles: &Option<Vec<Uuid>>,
    roles_reviewed: &[Uuid],
) -> Result<Vec<Uuid>> {
    let revoked = revoked_roles.clone().unwrap_or_default();

    match decision {
        ReviewDecision::ApproveAll => {
            if !revoked.is_empty() {
                return Err(AppError::validation(
                    "revoked_roles must be empty when decision is approve_all",
                ));
            }
            Ok(Vec::new())
        }
        ReviewDecision::RevokeSome | ReviewDecision::RevokeAll => {
            if revoked.is_empty() {
                return Err(AppError::validation(
                    "revoked_roles is required when decision revokes roles",
                ));
            }

            if revoked.iter().any(|r| !roles_reviewed.contains(r)) {
                return Err(AppError::validation(
                    "revoked_roles must be a subset of the reviewed roles",
                ));
            }

            if decision == ReviewDecision::RevokeAll
                && roles_reviewed.iter().any(|r| !revoked.contains(r))
            {
                return Err(AppError::validation(
                    "revoke_all must cover every reviewed role",
                ));
            }

            Ok(revoked)
        }
    }
}

impl ReviewService {
    /// 创建新的访问审查服务
    pub fn new(db: Pool<Postgres>, audit_service: Arc<AuditService>) -> Self {
        Self { db, audit_service }
    }

    /// 创建审查，冻结用户当前有效角色的快照
    #[instrument(skip(self, request))]
    pub async fn create_review(
        &self,
        request: CreateReviewRequest,
        reviewer_id: Uuid,
    ) -> Result<AccessReview> {
        // 校验被审查的管理员
        sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = $1")
            .bind(request.user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("admin user"))?;

        // 快照当前有效角色
        let assignment_repo = AssignmentRepository::new(self.db.clone());
        let roles = assignment_repo
            .list_assigned_roles(request.user_id, false, Utc::now())
            .await?;

        if roles.is_empty() {
            return Err(AppError::validation("User has no effective roles to review"));
        }

        let role_ids: Vec<Uuid> = roles.iter().map(|r| r.role_id).collect();

        let review = sqlx::query_as::<_, AccessReview>(
            r#"
            INSERT INTO access_reviews (
                user_id, review_period, review_type, roles_reviewed,
                status, reviewer_id
            ) VALUES (
                $1, $2, $3, $4,
                'pending', $5
            ) RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(&request.review_period)
        .bind(&request.review_type)
        .bind(&role_ids)
        .bind(reviewer_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create access review");
            AppError::database("Failed to create access review")
        })?;

        self.audit_service
            .log_action_simple(
                reviewer_id,
                AuditAction::ReviewCreate,
                "access_reviews",
                Some(review.id),
                Some(serde_json::json!({
                    "user_id": request.user_id,
                    "review_period": request.review_period,
                    "review_type": request.review_type,
                    "roles_reviewed": role_ids,
                })),
                None,
            )
            .await?;

        info!(
            review_id = %review.id,
            user_id = %request.user_id,
            roles = role_ids.len(),
            "Access review created"
        );
        Ok(review)
    }

    /// 完成审查（恰好一次）
    ///
    /// revoke_some / revoke_all 会在同一事务内撤销 revoked_roles 中
    /// 每个角色对应的未撤销分配；快照中未点名的角色保持不变。
    #[instrument(skip(self, request))]
    pub async fn complete_review(
        &self,
        review_id: Uuid,
        request: CompleteReviewRequest,
        reviewer_id: Uuid,
    ) -> Result<AccessReview> {
        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        let review = sqlx::query_as::<_, AccessReview>(
            "SELECT * FROM access_reviews WHERE id = $1 FOR UPDATE",
        )
        .bind(review_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("access review"))?;

        // 审查只能完成一次
        if review.status != ReviewStatus::Pending {
            return Err(AppError::conflict("Access review has already been completed"));
        }

        let to_revoke =
            validate_decision(request.decision, &request.revoked_roles, &review.roles_reviewed)?;

        // 撤销点名的角色；快照后已被单独撤销的跳过
        let mut revoked_count = 0u64;
        for role_id in &to_revoke {
            let result = sqlx::query(
                r#"
                UPDATE user_role_assignments
                SET revoked_at = NOW(), revoked_by = $3
                WHERE user_id = $1 AND role_id = $2 AND revoked_at IS NULL
                "#,
            )
            .bind(review.user_id)
            .bind(role_id)
            .bind(reviewer_id)
            .execute(&mut *tx)
            .await?;

            revoked_count += result.rows_affected();
        }

        let new_status = match request.decision {
            ReviewDecision::ApproveAll => ReviewStatus::Approved,
            ReviewDecision::RevokeSome | ReviewDecision::RevokeAll => ReviewStatus::Revoked,
        };

        let updated = sqlx::query_as::<_, AccessReview>(
            r#"
            UPDATE access_reviews
            SET status = $2,
                decision = $3,
                revoked_roles = $4,
                review_notes = $5,
                reviewer_id = $6,
                completed_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(review_id)
        .bind(new_status)
        .bind(request.decision)
        .bind(&to_revoke)
        .bind(&request.review_notes)
        .bind(reviewer_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        self.audit_service
            .log_action_simple(
                reviewer_id,
                AuditAction::ReviewComplete,
                "access_reviews",
                Some(review_id),
                Some(serde_json::json!({
                    "user_id": review.user_id,
                    "decision": request.decision,
                    "revoked_roles": to_revoke,
                    "assignments_revoked": revoked_count,
                })),
                None,
            )
            .await?;

        info!(
            review_id = %review_id,
            decision = ?request.decision,
            assignments_revoked = revoked_count,
            "Access review completed"
        );
        Ok(updated)
    }

    /// 获取审查详情
    #[instrument(skip(self))]
    pub async fn get_review(&self, review_id: Uuid) -> Result<AccessReview> {
        sqlx::query_as::<_, AccessReview>("SELECT * FROM access_reviews WHERE id = $1")
            .bind(review_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("access review"))
    }

    /// 查询审查列表
    #[instrument(skip(self))]
    pub async fn list_reviews(&self, filters: ReviewListFilters) -> Result<Vec<AccessReview>> {
        let mut query = String::from("SELECT * FROM access_reviews WHERE 1=1");
        let mut count = 0;

        if filters.user_id.is_some() {
            count += 1;
            query.push_str(&format!(" AND user_id = ${}", count));
        }
        if filters.status.is_some() {
            count += 1;
            query.push_str(&format!(" AND status = ${}", count));
        }
        if filters.review_period.is_some() {
            count += 1;
            query.push_str(&format!(" AND review_period = ${}", count));
        }

        query.push_str(" ORDER BY created_at DESC LIMIT 100");

        let mut q = sqlx::query_as::<_, AccessReview>(&query);

        if let Some(user_id) = filters.user_id {
            q = q.bind(user_id);
        }
        if let Some(status) = filters.status {
            q = q.bind(status);
        }
        if let Some(review_period) = filters.review_period {
            q = q.bind(review_period);
        }

        q.fetch_all(&self.db).await.map_err(|e| {
            error!(error = %e, "Failed to fetch access reviews");
            AppError::database("Failed to fetch access reviews")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_approve_all_rejects_revoked_roles() {
        let reviewed = roles(2);
        let result = validate_decision(
            ReviewDecision::ApproveAll,
            &Some(vec![reviewed[0]]),
            &reviewed,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_approve_all_with_no_roles_ok() {
        let reviewed = roles(2);
        assert!(validate_decision(ReviewDecision::ApproveAll, &None, &reviewed)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_revoke_requires_roles() {
        let reviewed = roles(2);
        assert!(validate_decision(ReviewDecision::RevokeSome, &None, &reviewed).is_err());
        assert!(validate_decision(ReviewDecision::RevokeAll, &None, &reviewed).is_err());
        assert!(
            validate_decision(ReviewDecision::RevokeSome, &Some(Vec::new()), &reviewed).is_err()
        );
    }

    #[test]
    fn test_revoke_some_subset_ok() {
        let reviewed = roles(3);
        let picked = vec![reviewed[1]];
        let result =
            validate_decision(ReviewDecision::RevokeSome, &Some(picked.clone()), &reviewed)
                .unwrap();
        assert_eq!(result, picked);
    }

    #[test]
    fn test_revoke_some_rejects_unreviewed_role() {
        let reviewed = roles(2);
        let result =
            validate_decision(ReviewDecision::RevokeSome, &Some(vec![Uuid::new_v4()]), &reviewed);
        assert!(result.is_err());
    }

    #[test]
    fn test_revoke_all_must_cover_snapshot() {
        let reviewed = roles(3);

        let partial = vec![reviewed[0]];
        assert!(validate_decision(ReviewDecision::RevokeAll, &Some(partial), &reviewed).is_err());

        let full = reviewed.clone();
        let result = validate_decision(ReviewDecision::RevokeAll, &Some(full), &reviewed).unwrap();
        assert_eq!(result.len(), 3);
    }
}
