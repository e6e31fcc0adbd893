//! 访问审查的 HTTP 处理器

use crate::{
    auth::middleware::{require_admin_roles, AuthContext},
    error::AppError,
    middleware::AppState,
    models::review::*,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 可以创建与完成访问审查的角色
const REVIEWERS: &[&str] = &["super_admin", "security_admin", "access_reviewer"];

/// 创建访问审查
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, REVIEWERS)?;
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let review = state
        .review_service
        .create_review(req, auth_context.admin_id)
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// 查询审查列表
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(filters): Query<ReviewListFilters>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, REVIEWERS)?;

    let reviews = state.review_service.list_reviews(filters).await?;
    Ok(Json(reviews))
}

/// 获取审查详情
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, REVIEWERS)?;

    let review = state.review_service.get_review(id).await?;
    Ok(Json(review))
}

/// 完成审查
pub async fn complete_review(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_admin_roles(&auth_context, REVIEWERS)?;

    let review = state
        .review_service
        .complete_review(id, req, auth_context.admin_id)
        .await?;

    Ok(Json(review))
}
