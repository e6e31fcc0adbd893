//! 角色与权限目录的 HTTP 处理器

use crate::{
    auth::middleware::{require_admin_roles, AuthContext},
    error::AppError,
    middleware::AppState,
    models::{assignment::GrantPermissionRequest, permission::*, role::*},
    services::audit_service::AuditAction,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 可以读取目录的角色
const CATALOG_READERS: &[&str] = &["super_admin", "security_admin", "auditor"];
/// 可以修改目录的角色
const CATALOG_WRITERS: &[&str] = &["super_admin"];

// ==================== Roles ====================

/// 列出角色
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_READERS)?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let roles = repo.list().await?;

    Ok(Json(json!({
        "roles": roles,
        "count": roles.len()
    })))
}

/// 获取角色详情
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_READERS)?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let role = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("role"))?;

    Ok(Json(role))
}

/// 创建角色
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_WRITERS)?;
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let role = repo.create(&req).await.map_err(|e| match e {
        AppError::Database(ref db_err) if crate::error::is_unique_violation(db_err) => {
            AppError::conflict("Role name already exists")
        }
        other => other,
    })?;

    state
        .audit_service
        .log_action_simple(
            auth_context.admin_id,
            AuditAction::RoleCreate,
            "admin_roles",
            Some(role.id),
            Some(json!({ "name": role.name, "category": role.category.as_str() })),
            None,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(role)))
}

/// 更新角色
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_WRITERS)?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let role = repo
        .update(id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("role"))?;

    state
        .audit_service
        .log_action_simple(
            auth_context.admin_id,
            AuditAction::RoleUpdate,
            "admin_roles",
            Some(role.id),
            Some(json!({
                "description": req.description,
                "requires_mfa": req.requires_mfa,
                "max_session_duration_secs": req.max_session_duration_secs,
                "is_active": req.is_active,
            })),
            None,
        )
        .await?;

    Ok(Json(role))
}

/// 删除角色
/// 仍被未撤销分配引用的角色返回 Conflict
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_WRITERS)?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    repo.delete(id).await?;

    state
        .audit_service
        .log_action_simple(
            auth_context.admin_id,
            AuditAction::RoleDelete,
            "admin_roles",
            Some(id),
            None,
            None,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Permissions ====================

/// 列出权限
pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_READERS)?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let permissions = repo.list_permissions().await?;

    Ok(Json(json!({
        "permissions": permissions,
        "count": permissions.len()
    })))
}

/// 获取权限详情
pub async fn get_permission(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_READERS)?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let permission = repo
        .find_permission_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("permission"))?;

    Ok(Json(permission))
}

/// 创建权限
pub async fn create_permission(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<CreatePermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_WRITERS)?;
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let permission = repo.create_permission(&req).await.map_err(|e| match e {
        AppError::Database(ref db_err) if crate::error::is_unique_violation(db_err) => {
            AppError::conflict("Permission name already exists")
        }
        other => other,
    })?;

    state
        .audit_service
        .log_action_simple(
            auth_context.admin_id,
            AuditAction::PermissionCreate,
            "admin_permissions",
            Some(permission.id),
            Some(json!({
                "name": permission.name,
                "is_dangerous": permission.is_dangerous,
            })),
            None,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(permission)))
}

/// 更新权限（仅展示元数据与启用标记）
pub async fn update_permission(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_WRITERS)?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let permission = repo
        .update_permission(id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("permission"))?;

    state
        .audit_service
        .log_action_simple(
            auth_context.admin_id,
            AuditAction::PermissionUpdate,
            "admin_permissions",
            Some(permission.id),
            Some(json!({
                "description": req.description,
                "is_active": req.is_active,
            })),
            None,
        )
        .await?;

    Ok(Json(permission))
}

// ==================== Grants ====================

/// 获取角色的权限列表
pub async fn get_role_permissions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, CATALOG_READERS)?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    repo.find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("role"))?;

    let permissions = repo.get_role_permissions(id).await?;

    Ok(Json(json!({
        "permissions": permissions,
        "count": permissions.len()
    })))
}

/// 为角色授予权限
/// 授予危险权限必须持有 super_admin 角色
pub async fn grant_permission(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<GrantPermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, &["super_admin", "security_admin"])?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let role = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("role"))?;

    let permission = repo
        .find_permission_by_id(&req.permission_id)
        .await?
        .ok_or_else(|| AppError::not_found("permission"))?;

    // 危险权限需要更高的授权门槛
    if permission.is_dangerous {
        require_admin_roles(&auth_context, &["super_admin"])?;
    }

    let created = repo
        .add_permission_to_role(role.id, permission.id, auth_context.admin_id)
        .await?;

    state
        .audit_service
        .log_action_simple(
            auth_context.admin_id,
            AuditAction::GrantCreate,
            "role_permission_grants",
            Some(role.id),
            Some(json!({
                "role": role.name,
                "permission": permission.name,
                "is_dangerous": permission.is_dangerous,
                "created": created,
            })),
            None,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(json!({
        "role_id": role.id,
        "permission_id": permission.id,
        "created": created
    }))))
}

/// 从角色移除权限
pub async fn revoke_grant(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path((id, permission_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, &["super_admin", "security_admin"])?;

    let repo = crate::repository::RoleRepository::new(state.db.clone());
    let removed = repo.remove_permission_from_role(id, permission_id).await?;

    if !removed {
        return Err(AppError::not_found("role permission grant"));
    }

    state
        .audit_service
        .log_action_simple(
            auth_context.admin_id,
            AuditAction::GrantDelete,
            "role_permission_grants",
            Some(id),
            Some(json!({ "permission_id": permission_id })),
            None,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
