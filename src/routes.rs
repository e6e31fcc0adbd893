//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 需要认证的管理端路由
    let admin_routes = Router::new()
        // 角色目录
        .route(
            "/roles",
            get(handlers::role::list_roles).post(handlers::role::create_role),
        )
        .route(
            "/roles/{id}",
            get(handlers::role::get_role)
                .put(handlers::role::update_role)
                .delete(handlers::role::delete_role),
        )
        .route(
            "/roles/{id}/permissions",
            get(handlers::role::get_role_permissions).post(handlers::role::grant_permission),
        )
        .route(
            "/roles/{id}/permissions/{permission_id}",
            axum::routing::delete(handlers::role::revoke_grant),
        )

        // 权限目录
        .route(
            "/permissions",
            get(handlers::role::list_permissions).post(handlers::role::create_permission),
        )
        .route(
            "/permissions/{id}",
            get(handlers::role::get_permission).put(handlers::role::update_permission),
        )

        // 用户角色分配
        .route(
            "/users/{id}/roles",
            get(handlers::assignment::list_user_roles).post(handlers::assignment::assign_role),
        )
        .route(
            "/users/{id}/permissions",
            get(handlers::assignment::list_user_permissions),
        )
        .route(
            "/users/{id}/role-assignments",
            get(handlers::assignment::list_user_assignments),
        )
        .route(
            "/role-assignments/{id}/approve",
            post(handlers::assignment::approve_assignment),
        )
        .route(
            "/role-assignments/{id}",
            get(handlers::assignment::get_assignment)
                .delete(handlers::assignment::revoke_assignment),
        )

        // 访问审查
        .route(
            "/access-reviews",
            get(handlers::review::list_reviews).post(handlers::review::create_review),
        )
        .route("/access-reviews/{id}", get(handlers::review::get_review))
        .route(
            "/access-reviews/{id}/complete",
            post(handlers::review::complete_review),
        )

        // 审计日志
        .route("/audit-logs", get(handlers::audit::list_audit_logs))
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .nest("/api/v1/admin-system", admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::ip_whitelist_middleware,
        ))
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(state)
}
