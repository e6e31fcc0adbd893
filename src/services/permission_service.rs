//! 有效权限解析服务
//!
//! 每次授权检查都基于当前数据即时解析，不做缓存；
//! 撤销或过期的角色在下一次调用即消失，无需额外失效步骤。

use crate::{
    error::AppError,
    models::{assignment::AssignedRole, permission::PermissionSummary},
    repository::{assignment_repo::AssignmentRepository, role_repo::RoleRepository},
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PermissionService {
    db: PgPool,
}

impl PermissionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 获取用户当前持有的角色
    ///
    /// 已批准、未撤销；`include_expired` 为 false 时还要求处于有效期窗口内。
    pub async fn get_user_roles(
        &self,
        user_id: Uuid,
        include_expired: bool,
    ) -> Result<Vec<AssignedRole>, AppError> {
        let repo = AssignmentRepository::new(self.db.clone());
        repo.list_assigned_roles(user_id, include_expired, Utc::now()).await
    }

    /// 获取用户的全部有效权限（按权限名去重，仅含启用的权限）
    pub async fn get_user_permissions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PermissionSummary>, AppError> {
        let role_repo = RoleRepository::new(self.db.clone());
        let roles = self.get_user_roles(user_id, false).await?;

        let mut permissions = Vec::new();

        for role in roles {
            let role_permissions = role_repo.get_role_permissions(role.role_id).await?;

            for perm in role_permissions {
                if !perm.is_active {
                    continue;
                }
                permissions.push(PermissionSummary {
                    name: perm.name,
                    resource: perm.resource,
                    action: perm.action,
                    is_dangerous: perm.is_dangerous,
                    description: perm.description,
                });
            }
        }

        // 去重
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        permissions.dedup_by(|a, b| a.name == b.name);

        Ok(permissions)
    }

    /// 检查用户是否拥有权限
    pub async fn check_permission(
        &self,
        user_id: Uuid,
        resource: &str,
        action: &str,
    ) -> Result<bool, AppError> {
        let role_repo = RoleRepository::new(self.db.clone());
        let roles = self.get_user_roles(user_id, false).await?;

        for role in roles {
            let has_perm = role_repo
                .role_has_permission(role.role_id, resource, action)
                .await?;

            if has_perm {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// 检查权限，如果无权限则返回错误
    pub async fn require_permission(
        &self,
        user_id: Uuid,
        resource: &str,
        action: &str,
    ) -> Result<(), AppError> {
        let has_permission = self.check_permission(user_id, resource, action).await?;

        if !has_permission {
            tracing::warn!(
                user_id = %user_id,
                resource = %resource,
                action = %action,
                "Permission denied"
            );
            return Err(AppError::Forbidden);
        }

        Ok(())
    }

    /// 用户当前任一有效角色是否要求 MFA
    pub async fn requires_mfa(&self, user_id: Uuid) -> Result<bool, AppError> {
        let roles = self.get_user_roles(user_id, false).await?;
        Ok(roles.iter().any(|r| r.requires_mfa))
    }

    /// 用户会话时长上限：取有效角色中最严格（最小）的限制
    pub async fn max_session_duration(&self, user_id: Uuid) -> Result<Option<i64>, AppError> {
        let roles = self.get_user_roles(user_id, false).await?;
        Ok(roles.iter().map(|r| r.max_session_duration_secs).min())
    }
}
