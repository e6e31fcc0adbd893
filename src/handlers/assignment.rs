//! 用户角色分配的 HTTP 处理器

use crate::{
    auth::middleware::{require_admin_roles, AuthContext},
    error::AppError,
    middleware::AppState,
    models::assignment::*,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 可以操作分配状态机的角色
const ASSIGNMENT_WRITERS: &[&str] = &["super_admin", "security_admin"];
/// 可以查看用户角色与权限的角色
const ASSIGNMENT_READERS: &[&str] = &["super_admin", "security_admin", "auditor"];

#[derive(Debug, Deserialize)]
pub struct ListUserRolesQuery {
    #[serde(default)]
    pub include_expired: bool,
}

/// 为用户分配角色
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, ASSIGNMENT_WRITERS)?;
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let assignment = state
        .assignment_service
        .assign(user_id, req, auth_context.admin_id)
        .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// 查看用户当前持有的角色
pub async fn list_user_roles(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListUserRolesQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, ASSIGNMENT_READERS)?;

    let user_repo = crate::repository::AdminUserRepository::new(state.db.clone());
    user_repo
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("admin user"))?;

    let roles = state
        .permission_service
        .get_user_roles(user_id, query.include_expired)
        .await?;

    Ok(Json(json!({
        "roles": roles,
        "count": roles.len()
    })))
}

/// 查看用户的有效权限
/// 附带角色元数据推导出的 MFA 要求与会话时长上限
pub async fn list_user_permissions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, ASSIGNMENT_READERS)?;

    let user_repo = crate::repository::AdminUserRepository::new(state.db.clone());
    user_repo
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("admin user"))?;

    let permissions = state.permission_service.get_user_permissions(user_id).await?;
    let requires_mfa = state.permission_service.requires_mfa(user_id).await?;
    let max_session = state.permission_service.max_session_duration(user_id).await?;

    Ok(Json(json!({
        "permissions": permissions,
        "count": permissions.len(),
        "requires_mfa": requires_mfa,
        "max_session_duration_secs": max_session
    })))
}

/// 查看用户的分配历史（含已撤销与已拒绝的记录）
pub async fn list_user_assignments(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, ASSIGNMENT_READERS)?;

    let user_repo = crate::repository::AdminUserRepository::new(state.db.clone());
    user_repo
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("admin user"))?;

    let repo = crate::repository::AssignmentRepository::new(state.db.clone());
    let assignments: Vec<AssignmentWithState> = repo
        .list_by_user(user_id)
        .await?
        .into_iter()
        .map(AssignmentWithState::from)
        .collect();

    Ok(Json(json!({
        "assignments": assignments,
        "count": assignments.len()
    })))
}

/// 获取分配详情
pub async fn get_assignment(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, ASSIGNMENT_READERS)?;

    let repo = crate::repository::AssignmentRepository::new(state.db.clone());
    let assignment = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("role assignment"))?;

    Ok(Json(AssignmentWithState::from(assignment)))
}

/// 审批或拒绝分配
pub async fn approve_assignment(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<ApproveAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, ASSIGNMENT_WRITERS)?;

    let assignment = state
        .assignment_service
        .approve(id, auth_context.admin_id, req)
        .await?;

    Ok(Json(assignment))
}

/// 撤销分配
pub async fn revoke_assignment(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, ASSIGNMENT_WRITERS)?;

    state
        .assignment_service
        .revoke(id, auth_context.admin_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
