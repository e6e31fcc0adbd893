//! Role repository (角色与权限目录数据访问)

use crate::{
    error::AppError,
    models::{permission::*, role::*},
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Roles ====================

    /// 列出所有角色
    pub async fn list(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM admin_roles ORDER BY name")
            .fetch_all(&self.db)
            .await?;

        Ok(roles)
    }

    /// 根据名称查找角色
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM admin_roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// 根据 ID 查找角色
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM admin_roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// 创建角色
    pub async fn create(&self, req: &CreateRoleRequest) -> Result<Role, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO admin_roles (name, category, description, requires_mfa, max_session_duration_secs)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(req.category)
        .bind(&req.description)
        .bind(req.requires_mfa)
        .bind(req.max_session_duration_secs)
        .fetch_one(&self.db)
        .await?;

        Ok(role)
    }

    /// 更新角色（名称与类别不可变）
    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateRoleRequest,
    ) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE admin_roles
            SET
                description = COALESCE($2, description),
                requires_mfa = COALESCE($3, requires_mfa),
                max_session_duration_secs = COALESCE($4, max_session_duration_secs),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.description)
        .bind(req.requires_mfa)
        .bind(req.max_session_duration_secs)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// 删除角色
    /// 仍被未撤销分配引用的角色不可删除
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found("role"))?;

        let live_assignments: i64 = sqlx::query(
            "SELECT COUNT(*) FROM user_role_assignments WHERE role_id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?
        .get(0);

        if live_assignments > 0 {
            return Err(AppError::conflict("Role has active assignments and cannot be deleted"));
        }

        let result = sqlx::query("DELETE FROM admin_roles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Permissions ====================

    /// 列出所有权限
    pub async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT * FROM admin_permissions ORDER BY resource, action",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// 根据 ID 查找权限
    pub async fn find_permission_by_id(&self, id: &Uuid) -> Result<Option<Permission>, AppError> {
        let permission =
            sqlx::query_as::<_, Permission>("SELECT * FROM admin_permissions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(permission)
    }

    /// 创建权限
    pub async fn create_permission(
        &self,
        req: &CreatePermissionRequest,
    ) -> Result<Permission, AppError> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO admin_permissions (name, resource, action, description, is_dangerous)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.resource)
        .bind(&req.action)
        .bind(&req.description)
        .bind(req.is_dangerous)
        .fetch_one(&self.db)
        .await?;

        Ok(permission)
    }

    /// 更新权限（仅展示元数据与启用标记）
    pub async fn update_permission(
        &self,
        id: Uuid,
        req: &UpdatePermissionRequest,
    ) -> Result<Option<Permission>, AppError> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            UPDATE admin_permissions
            SET
                description = COALESCE($2, description),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.description)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(permission)
    }

    // ==================== Grants ====================

    /// 获取角色的所有权限
    pub async fn get_role_permissions(&self, role_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.*
            FROM admin_permissions p
            JOIN role_permission_grants g ON p.id = g.permission_id
            WHERE g.role_id = $1
            ORDER BY p.resource, p.action
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// 检查角色是否拥有特定权限
    pub async fn role_has_permission(
        &self,
        role_id: Uuid,
        resource: &str,
        action: &str,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query(
            r#"
            SELECT COUNT(*)
            FROM role_permission_grants g
            JOIN admin_permissions p ON g.permission_id = p.id
            WHERE g.role_id = $1 AND p.resource = $2 AND p.action = $3 AND p.is_active = TRUE
            "#,
        )
        .bind(role_id)
        .bind(resource)
        .bind(action)
        .fetch_one(&self.db)
        .await?
        .get(0);

        Ok(count > 0)
    }

    /// 为角色授予权限，记录授予人
    /// 返回是否新建（重复授予为幂等空操作）
    pub async fn add_permission_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        granted_by: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO role_permission_grants (role_id, permission_id, granted_by)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .bind(granted_by)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 从角色移除权限
    pub async fn remove_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM role_permission_grants WHERE role_id = $1 AND permission_id = $2",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
