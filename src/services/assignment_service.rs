//! Assignment service
//! 用户角色分配的状态机：分配 → 审批/拒绝 → 撤销
//!
//! 每次状态迁移是一个独立的数据库事务；并发正确性依赖行锁与
//! (user, role) 未撤销分配的部分唯一索引。

use chrono::Utc;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::error::{is_unique_violation, AppError, Result};
use crate::models::admin_user::AdminUser;
use crate::models::assignment::*;
use crate::models::role::Role;
use crate::services::audit_service::{AuditAction, AuditService};

/// 角色分配服务
pub struct AssignmentService {
    db: Pool<Postgres>,
    audit_service: Arc<AuditService>,
}

impl AssignmentService {
    /// 创建新的角色分配服务
    pub fn new(db: Pool<Postgres>, audit_service: Arc<AuditService>) -> Self {
        Self { db, audit_service }
    }

    /// 分配角色
    ///
    /// business/audit 类角色在创建时自动批准；technical/security 类
    /// 创建为待审批状态。同一 (user, role) 已存在未撤销分配时返回 Conflict。
    #[instrument(skip(self, request))]
    pub async fn assign(
        &self,
        user_id: Uuid,
        request: AssignRoleRequest,
        assigned_by: Uuid,
    ) -> Result<UserRoleAssignment> {
        let valid_from = request.valid_from.unwrap_or_else(Utc::now);

        // 有效期窗口不可倒置
        if let Some(valid_until) = request.valid_until {
            if valid_until <= valid_from {
                return Err(AppError::validation("valid_until must be after valid_from"));
            }
        }

        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        // 校验目标管理员
        let user = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("admin user"))?;

        if !user.is_active {
            return Err(AppError::validation("Admin user is not active"));
        }

        // 校验角色
        let role = sqlx::query_as::<_, Role>("SELECT * FROM admin_roles WHERE id = $1")
            .bind(request.role_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("role"))?;

        if !role.is_active {
            return Err(AppError::validation("Role is not active"));
        }

        // 事务内预检：同一 (user, role) 最多一条未撤销分配
        let existing = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM user_role_assignments
            WHERE user_id = $1 AND role_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(request.role_id)
        .fetch_one(&mut *tx)
        .await?;

        if existing > 0 {
            return Err(AppError::conflict("User already has an active assignment for this role"));
        }

        // 职责分离策略：business/audit 类无实质风险，创建即批准
        let auto_approved = role.category.is_auto_approved();

        let assignment = sqlx::query_as::<_, UserRoleAssignment>(
            r#"
            INSERT INTO user_role_assignments (
                user_id, role_id, valid_from, valid_until,
                is_approved, approved_by, approved_at, approval_reason,
                assigned_by, assigned_at
            ) VALUES (
                $1, $2, $3, $4,
                $5, $6, $7, $8,
                $9, NOW()
            ) RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(request.role_id)
        .bind(valid_from)
        .bind(request.valid_until)
        .bind(auto_approved)
        .bind(auto_approved.then_some(assigned_by))
        .bind(auto_approved.then(Utc::now))
        .bind(&request.reason)
        .bind(assigned_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // 并发分配竞争时由部分唯一索引兜底
            if is_unique_violation(&e) {
                AppError::conflict("User already has an active assignment for this role")
            } else {
                error!(error = %e, "Failed to create role assignment");
                AppError::database("Failed to create role assignment")
            }
        })?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        // 记录审计
        self.audit_service
            .log_action_simple(
                assigned_by,
                AuditAction::AssignmentCreate,
                "user_role_assignments",
                Some(assignment.id),
                Some(serde_json::json!({
                    "user_id": user_id,
                    "role": role.name,
                    "category": role.category.as_str(),
                    "auto_approved": auto_approved,
                    "valid_until": request.valid_until,
                })),
                None,
            )
            .await?;

        info!(
            assignment_id = %assignment.id,
            role = %role.name,
            auto_approved,
            "Role assignment created"
        );
        Ok(assignment)
    }

    /// 审批或拒绝分配
    ///
    /// 只有待审批的分配可以被裁决；approved_at 记录裁决时间，
    /// 因此拒绝与未裁决可以区分。
    #[instrument(skip(self, request))]
    pub async fn approve(
        &self,
        assignment_id: Uuid,
        approver: Uuid,
        request: ApproveAssignmentRequest,
    ) -> Result<UserRoleAssignment> {
        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        let assignment = sqlx::query_as::<_, UserRoleAssignment>(
            "SELECT * FROM user_role_assignments WHERE id = $1 FOR UPDATE",
        )
        .bind(assignment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("role assignment"))?;

        match assignment.state() {
            AssignmentState::PendingApproval => {}
            AssignmentState::Revoked => {
                return Err(AppError::conflict("Assignment has been revoked"));
            }
            AssignmentState::Approved | AssignmentState::Rejected => {
                return Err(AppError::conflict("Assignment has already been decided"));
            }
        }

        let updated = sqlx::query_as::<_, UserRoleAssignment>(
            r#"
            UPDATE user_role_assignments
            SET is_approved = $2,
                approved_by = $3,
                approved_at = NOW(),
                approval_reason = COALESCE($4, approval_reason)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(request.approve)
        .bind(approver)
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        let audit_action = if request.approve {
            AuditAction::AssignmentApprove
        } else {
            AuditAction::AssignmentReject
        };

        self.audit_service
            .log_action_simple(
                approver,
                audit_action,
                "user_role_assignments",
                Some(assignment_id),
                Some(serde_json::json!({
                    "user_id": updated.user_id,
                    "role_id": updated.role_id,
                    "approved": request.approve,
                })),
                None,
            )
            .await?;

        info!(
            assignment_id = %assignment_id,
            approved = request.approve,
            "Assignment decision recorded"
        );
        Ok(updated)
    }

    /// 撤销分配
    ///
    /// 已撤销或已拒绝的分配不可再撤销；每次成功撤销对应恰好一次状态迁移。
    #[instrument(skip(self))]
    pub async fn revoke(
        &self,
        assignment_id: Uuid,
        revoked_by: Uuid,
    ) -> Result<UserRoleAssignment> {
        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        let assignment = sqlx::query_as::<_, UserRoleAssignment>(
            "SELECT * FROM user_role_assignments WHERE id = $1 FOR UPDATE",
        )
        .bind(assignment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("role assignment"))?;

        match assignment.state() {
            AssignmentState::Revoked => {
                return Err(AppError::conflict("Assignment is already revoked"));
            }
            AssignmentState::Rejected => {
                return Err(AppError::conflict("Rejected assignment cannot be revoked"));
            }
            // 待审批的分配允许撤销，等同于取消该请求
            AssignmentState::PendingApproval | AssignmentState::Approved => {}
        }

        let updated = sqlx::query_as::<_, UserRoleAssignment>(
            r#"
            UPDATE user_role_assignments
            SET revoked_at = NOW(), revoked_by = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(revoked_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        self.audit_service
            .log_action_simple(
                revoked_by,
                AuditAction::AssignmentRevoke,
                "user_role_assignments",
                Some(assignment_id),
                Some(serde_json::json!({
                    "user_id": updated.user_id,
                    "role_id": updated.role_id,
                })),
                None,
            )
            .await?;

        info!(assignment_id = %assignment_id, "Assignment revoked");
        Ok(updated)
    }
}
