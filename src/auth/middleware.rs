//! JWT 认证中间件与角色门禁

use crate::{auth::jwt::JwtService, error::AppError};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub admin_id: Uuid,
    pub username: String,
    pub roles: Vec<String>,
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(|t| t.to_string()))
        .ok_or(AppError::Unauthorized)
}

/// JWT 认证中间件 - 必须认证
pub async fn jwt_auth_middleware(
    State(jwt_service): State<Arc<JwtService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 从 Authorization 头提取令牌
    let token = extract_token(req.headers())?;

    // 验证令牌
    let claims = jwt_service.validate_access_token(&token)?;

    // 创建认证上下文
    let admin_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
    let auth_context = AuthContext {
        admin_id,
        username: claims.username,
        roles: claims.roles,
    };

    // 附加到请求扩展
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// 角色门禁：调用者必须持有所列角色之一
pub fn require_admin_roles(ctx: &AuthContext, required: &[&str]) -> Result<(), AppError> {
    if ctx.roles.iter().any(|r| required.contains(&r.as_str())) {
        return Ok(());
    }

    tracing::warn!(
        admin_id = %ctx.admin_id,
        required = ?required,
        "Admin role gate denied"
    );
    Err(AppError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test_token_123".parse().unwrap());

        let token = extract_token(&headers).unwrap();
        assert_eq!(token, "test_token_123");
    }

    #[test]
    fn test_extract_token_missing() {
        let headers = HeaderMap::new();
        assert!(extract_token(&headers).is_err());
    }

    #[test]
    fn test_extract_token_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "InvalidFormat".parse().unwrap());

        assert!(extract_token(&headers).is_err());
    }

    fn ctx_with_roles(roles: &[&str]) -> AuthContext {
        AuthContext {
            admin_id: Uuid::new_v4(),
            username: "tester".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_require_admin_roles_allows_any_listed_role() {
        let ctx = ctx_with_roles(&["security_admin"]);
        assert!(require_admin_roles(&ctx, &["super_admin", "security_admin"]).is_ok());
    }

    #[test]
    fn test_require_admin_roles_denies_unlisted_role() {
        let ctx = ctx_with_roles(&["auditor"]);
        let err = require_admin_roles(&ctx, &["super_admin"]).unwrap_err();
        assert_eq!(err.code(), 403);
    }

    #[test]
    fn test_require_admin_roles_denies_empty_roles() {
        let ctx = ctx_with_roles(&[]);
        assert!(require_admin_roles(&ctx, &["super_admin"]).is_err());
    }
}
