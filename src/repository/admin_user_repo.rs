//! Admin user repository (管理员身份数据访问)

use crate::{error::AppError, models::admin_user::AdminUser};
use sqlx::PgPool;
use uuid::Uuid;

pub struct AdminUserRepository {
    db: PgPool,
}

impl AdminUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 根据 ID 查找管理员
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<AdminUser>, AppError> {
        let user = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 根据用户名查找管理员
    pub async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, AppError> {
        let user = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 列出管理员
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AdminUser>, AppError> {
        let users = sqlx::query_as::<_, AdminUser>(
            "SELECT * FROM admin_users ORDER BY username LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }
}
