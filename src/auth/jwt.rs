//! JWT bearer token validation
//! Access tokens are minted by the platform auth service with a shared
//! HS256 secret; this service validates them and reads the admin claims.

use crate::{config::AppConfig, error::AppError};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for admin access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (admin user ID)
    pub sub: String,

    /// Username
    pub username: String,

    /// Token type (this service only accepts "access")
    pub token_type: String,

    /// Admin roles encoded by the issuer
    pub roles: Vec<String>,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID (unique token identifier)
    pub jti: String,
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let secret = config.security.jwt_secret.expose_secret();

        // HS256 需要足够长的密钥
        if secret.len() < 32 {
            return Err(AppError::Config(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// 签发访问令牌（与平台认证服务使用同一密钥；主要供测试与本地工具使用）
    pub fn generate_access_token(
        &self,
        admin_id: Uuid,
        username: &str,
        roles: Vec<String>,
        ttl_secs: i64,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: admin_id.to_string(),
            username: username.to_string(),
            token_type: "access".to_string(),
            roles,
            iat: now,
            exp: now + ttl_secs,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to encode token: {}", e)))
    }

    /// 验证令牌签名与有效期
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        Ok(decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| AppError::Unauthorized)?
            .claims)
    }

    /// 验证访问令牌（拒绝其他类型的令牌）
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != "access" {
            return Err(AppError::Unauthorized);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig,
    };
    use secrecy::Secret;

    fn test_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                addr: "127.0.0.1:0".to_string(),
                graceful_shutdown_timeout_secs: 5,
            },
            database: DatabaseConfig {
                url: Secret::new("postgresql://localhost/test".to_string()),
                max_connections: 5,
                min_connections: 1,
                acquire_timeout_secs: 5,
                idle_timeout_secs: 300,
                max_lifetime_secs: 1800,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: Secret::new(
                    "test-secret-key-for-testing-only-min-32-chars".to_string(),
                ),
                trust_proxy: false,
                allowed_ips: None,
            },
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let admin_id = Uuid::new_v4();

        let token = service
            .generate_access_token(admin_id, "alice", vec!["super_admin".to_string()], 300)
            .unwrap();

        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, admin_id.to_string());
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.roles, vec!["super_admin".to_string()]);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let service = JwtService::from_config(&test_config()).unwrap();
        assert!(service.validate_access_token("invalid_token").is_err());
    }

    #[test]
    fn test_validate_rejects_expired_token() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let token = service
            .generate_access_token(Uuid::new_v4(), "alice", vec![], -120)
            .unwrap();
        assert!(service.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_validate_rejects_non_access_token_type() {
        let service = JwtService::from_config(&test_config()).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "alice".to_string(),
            token_type: "refresh".to_string(),
            roles: vec![],
            iat: now,
            exp: now + 300,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret("test-secret-key-for-testing-only-min-32-chars".as_bytes()),
        )
        .unwrap();

        assert!(service.validate_access_token(&token).is_err());
        assert!(service.validate_token(&token).is_ok());
    }
}
