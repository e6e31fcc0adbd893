//! Audit repository (审计数据访问)
//!
//! 只追加：本仓库不提供任何更新或删除操作。

use crate::{error::AppError, models::audit::*};
use sqlx::{PgPool, Row};

pub struct AuditRepository {
    db: PgPool,
}

impl AuditRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 插入审计日志
    pub async fn insert_entry(&self, entry: &AuditLogEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, admin_id, action, resource_type, resource_id,
                changes, status, error_message, source_ip, trace_id, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(entry.admin_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(entry.resource_id)
        .bind(&entry.changes)
        .bind(entry.status)
        .bind(&entry.error_message)
        .bind(&entry.source_ip)
        .bind(&entry.trace_id)
        .bind(entry.occurred_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 查询审计日志（最新在前）
    pub async fn query_entries(
        &self,
        filters: &AuditLogFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let mut query = String::from("SELECT * FROM audit_logs WHERE 1=1");
        let mut index = 0;

        if filters.admin_id.is_some() {
            index += 1;
            query.push_str(&format!(" AND admin_id = ${}", index));
        }
        if filters.action.is_some() {
            index += 1;
            query.push_str(&format!(" AND action = ${}", index));
        }
        if filters.resource_type.is_some() {
            index += 1;
            query.push_str(&format!(" AND resource_type = ${}", index));
        }
        if filters.status.is_some() {
            index += 1;
            query.push_str(&format!(" AND status = ${}", index));
        }
        if filters.start_time.is_some() {
            index += 1;
            query.push_str(&format!(" AND occurred_at >= ${}", index));
        }
        if filters.end_time.is_some() {
            index += 1;
            query.push_str(&format!(" AND occurred_at <= ${}", index));
        }

        query.push_str(&format!(
            " ORDER BY occurred_at DESC LIMIT ${} OFFSET ${}",
            index + 1,
            index + 2
        ));

        let mut query_builder = sqlx::query_as::<_, AuditLogEntry>(&query);

        if let Some(admin_id) = filters.admin_id {
            query_builder = query_builder.bind(admin_id);
        }
        if let Some(action) = &filters.action {
            query_builder = query_builder.bind(action);
        }
        if let Some(resource_type) = &filters.resource_type {
            query_builder = query_builder.bind(resource_type);
        }
        if let Some(status) = filters.status {
            query_builder = query_builder.bind(status);
        }
        if let Some(start_time) = filters.start_time {
            query_builder = query_builder.bind(start_time);
        }
        if let Some(end_time) = filters.end_time {
            query_builder = query_builder.bind(end_time);
        }

        let entries = query_builder
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;

        Ok(entries)
    }

    /// 统计审计日志数量
    pub async fn count_entries(&self, filters: &AuditLogFilters) -> Result<i64, AppError> {
        let mut query = String::from("SELECT COUNT(*) FROM audit_logs WHERE 1=1");
        let mut index = 0;

        if filters.admin_id.is_some() {
            index += 1;
            query.push_str(&format!(" AND admin_id = ${}", index));
        }
        if filters.action.is_some() {
            index += 1;
            query.push_str(&format!(" AND action = ${}", index));
        }
        if filters.resource_type.is_some() {
            index += 1;
            query.push_str(&format!(" AND resource_type = ${}", index));
        }
        if filters.status.is_some() {
            index += 1;
            query.push_str(&format!(" AND status = ${}", index));
        }
        if filters.start_time.is_some() {
            index += 1;
            query.push_str(&format!(" AND occurred_at >= ${}", index));
        }
        if filters.end_time.is_some() {
            index += 1;
            query.push_str(&format!(" AND occurred_at <= ${}", index));
        }

        let mut query_builder = sqlx::query(&query);

        if let Some(admin_id) = filters.admin_id {
            query_builder = query_builder.bind(admin_id);
        }
        if let Some(action) = &filters.action {
            query_builder = query_builder.bind(action);
        }
        if let Some(resource_type) = &filters.resource_type {
            query_builder = query_builder.bind(resource_type);
        }
        if let Some(status) = filters.status {
            query_builder = query_builder.bind(status);
        }
        if let Some(start_time) = filters.start_time {
            query_builder = query_builder.bind(start_time);
        }
        if let Some(end_time) = filters.end_time {
            query_builder = query_builder.bind(end_time);
        }

        let count: i64 = query_builder.fetch_one(&self.db).await?.get(0);
        Ok(count)
    }
}
