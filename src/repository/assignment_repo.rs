//! Assignment repository (用户角色分配数据访问)
//!
//! 状态迁移（分配/审批/撤销）在 assignment_service 的事务中执行，
//! 此处只提供读取查询。

use crate::{
    error::AppError,
    models::assignment::{AssignedRole, UserRoleAssignment},
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct AssignmentRepository {
    db: PgPool,
}

impl AssignmentRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 根据 ID 查找分配
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserRoleAssignment>, AppError> {
        let assignment = sqlx::query_as::<_, UserRoleAssignment>(
            "SELECT * FROM user_role_assignments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(assignment)
    }

    /// 列出用户的全部分配记录（含已撤销/已拒绝，最新在前）
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<UserRoleAssignment>, AppError> {
        let assignments = sqlx::query_as::<_, UserRoleAssignment>(
            "SELECT * FROM user_role_assignments WHERE user_id = $1 ORDER BY assigned_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(assignments)
    }

    /// 列出用户当前持有的角色：已批准、未撤销、角色本身启用。
    /// `include_expired` 只放宽有效期窗口过滤，不放宽审批/撤销过滤。
    pub async fn list_assigned_roles(
        &self,
        user_id: Uuid,
        include_expired: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<AssignedRole>, AppError> {
        let mut query = String::from(
            r#"
            SELECT
                a.id AS assignment_id,
                r.id AS role_id,
                r.name AS role_name,
                r.category,
                r.requires_mfa,
                r.max_session_duration_secs,
                a.valid_from,
                a.valid_until
            FROM user_role_assignments a
            JOIN admin_roles r ON a.role_id = r.id
            WHERE a.user_id = $1
              AND a.is_approved = TRUE
              AND a.approved_at IS NOT NULL
              AND a.revoked_at IS NULL
              AND r.is_active = TRUE
            "#,
        );

        if !include_expired {
            query.push_str(" AND a.valid_from <= $2 AND (a.valid_until IS NULL OR a.valid_until > $2)");
        }

        query.push_str(" ORDER BY r.name");

        let mut q = sqlx::query_as::<_, AssignedRole>(&query).bind(user_id);
        if !include_expired {
            q = q.bind(now);
        }

        let roles = q.fetch_all(&self.db).await?;
        Ok(roles)
    }
}
