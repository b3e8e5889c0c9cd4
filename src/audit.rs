//! Append-only trail of significant writes.

use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug)]
pub struct AuditEntry<'a> {
    pub user_id: Uuid,
    pub action: &'a str,
    pub resource: &'a str,
    pub metadata: Value,
}

async fn insert(pool: &DbPool, entry: &AuditEntry<'_>) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(&entry.metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record an audit entry. A failed write is logged and never fails the request that
/// caused it.
pub async fn record(pool: &DbPool, user_id: Uuid, action: &str, resource: &str, metadata: Value) {
    let entry = AuditEntry {
        user_id,
        action,
        resource,
        metadata,
    };
    if let Err(err) = insert(pool, &entry).await {
        tracing::warn!(
            error = %err,
            action = entry.action,
            user = %entry.user_id,
            "audit log failed"
        );
    }
}
