//! 审计日志的 HTTP 处理器

use crate::{
    auth::middleware::{require_admin_roles, AuthContext},
    error::AppError,
    middleware::AppState,
    models::audit::*,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// 可以查询审计日志的角色
const AUDIT_READERS: &[&str] = &["super_admin", "security_admin", "auditor"];

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub admin_id: Option<uuid::Uuid>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub status: Option<AuditStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// 查询审计日志（最新在前）
pub async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, AUDIT_READERS)?;

    let filters = AuditLogFilters {
        admin_id: query.admin_id,
        action: query.action,
        resource_type: query.resource_type,
        status: query.status,
        start_time: query.start_time,
        end_time: query.end_time,
    };

    let logs = state
        .audit_service
        .query_entries(&filters, query.limit, query.offset)
        .await?;
    let count = state.audit_service.count_entries(&filters).await?;

    Ok(Json(json!({
        "logs": logs,
        "count": logs.len(),
        "total": count
    })))
}
