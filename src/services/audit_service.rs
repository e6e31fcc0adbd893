//! 审计日志服务
//! 子系统内每个特权变更都会在此留下一条只追加的记录

use crate::{error::AppError, models::audit::*, repository::audit_repo::AuditRepository};
use sqlx::PgPool;
use uuid::Uuid;

/// 审计操作类型
#[derive(Debug, Clone, Copy)]
pub enum AuditAction {
    // 角色目录
    RoleCreate,
    RoleUpdate,
    RoleDelete,

    // 权限目录
    PermissionCreate,
    PermissionUpdate,

    // 角色-权限授予
    GrantCreate,
    GrantDelete,

    // 用户角色分配
    AssignmentCreate,
    AssignmentApprove,
    AssignmentReject,
    AssignmentRevoke,

    // 访问审查
    ReviewCreate,
    ReviewComplete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RoleCreate => "role.create",
            AuditAction::RoleUpdate => "role.update",
            AuditAction::RoleDelete => "role.delete",

            AuditAction::PermissionCreate => "permission.create",
            AuditAction::PermissionUpdate => "permission.update",

            AuditAction::GrantCreate => "role_grant.create",
            AuditAction::GrantDelete => "role_grant.delete",

            AuditAction::AssignmentCreate => "assignment.create",
            AuditAction::AssignmentApprove => "assignment.approve",
            AuditAction::AssignmentReject => "assignment.reject",
            AuditAction::AssignmentRevoke => "assignment.revoke",

            AuditAction::ReviewCreate => "review.create",
            AuditAction::ReviewComplete => "review.complete",
        }
    }
}

/// 审计日志参数结构体
#[derive(Debug, Clone)]
pub struct AuditLogParams<'a> {
    pub admin_id: Uuid,
    pub action: &'a str,
    pub resource_type: &'a str,
    pub resource_id: Option<Uuid>,
    pub changes: Option<serde_json::Value>,
    pub status: AuditStatus,
    pub error_message: Option<&'a str>,
    pub source_ip: Option<&'a str>,
    pub trace_id: Option<&'a str>,
}

pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 记录审计日志条目
    pub async fn record(&self, params: AuditLogParams<'_>) -> Result<(), AppError> {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            admin_id: params.admin_id,
            action: params.action.to_string(),
            resource_type: params.resource_type.to_string(),
            resource_id: params.resource_id,
            changes: params.changes,
            status: params.status,
            error_message: params.error_message.map(|s| s.to_string()),
            source_ip: params.source_ip.map(|s| s.to_string()),
            trace_id: params.trace_id.map(|s| s.to_string()),
            occurred_at: chrono::Utc::now(),
        };

        let repo = AuditRepository::new(self.db.clone());
        repo.insert_entry(&entry).await?;

        Ok(())
    }

    /// 简化的审计日志记录方法
    pub async fn log_action_simple(
        &self,
        admin_id: Uuid,
        action: AuditAction,
        resource_type: &str,
        resource_id: Option<Uuid>,
        changes: Option<serde_json::Value>,
        error_message: Option<&str>,
    ) -> Result<(), AppError> {
        let params = AuditLogParams {
            admin_id,
            action: action.as_str(),
            resource_type,
            resource_id,
            changes,
            status: if error_message.is_some() {
                AuditStatus::Failed
            } else {
                AuditStatus::Success
            },
            error_message,
            source_ip: None,
            trace_id: None,
        };

        self.record(params).await
    }

    /// 查询审计日志
    pub async fn query_entries(
        &self,
        filters: &AuditLogFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let repo = AuditRepository::new(self.db.clone());
        repo.query_entries(filters, limit, offset).await
    }

    /// 查询审计日志数量
    pub async fn count_entries(&self, filters: &AuditLogFilters) -> Result<i64, AppError> {
        let repo = AuditRepository::new(self.db.clone());
        repo.count_entries(filters).await
    }
}
