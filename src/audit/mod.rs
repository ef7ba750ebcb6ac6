use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgExecutor, PgPool};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub utilisateur_id: i64,
    pub action: String,
    pub cible_type: String,
    pub cible_id: i64,
    pub details: Value,
    pub date_creation: DateTime<Utc>,
}

/// Record an action. Accepts a pool or an open transaction, so workflow
/// changes and their audit entry commit together.
pub async fn log<'e, E>(
    executor: E,
    user_id: i64,
    action: &str,
    target_type: &str,
    target_id: i64,
    details: Value,
) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO audit_log (utilisateur_id, action, cible_type, cible_id, details) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(details)
    .execute(executor)
    .await?;
    Ok(())
}

/// Entries about one target, oldest first.
pub async fn find_for_target(
    pool: &PgPool,
    target_type: &str,
    target_id: i64,
) -> Result<Vec<AuditEntry>, AppError> {
    let rows = sqlx::query_as::<_, AuditEntry>(
        "SELECT id, utilisateur_id, action, cible_type, cible_id, details, date_creation \
         FROM audit_log WHERE cible_type = $1 AND cible_id = $2 \
         ORDER BY date_creation, id",
    )
    .bind(target_type)
    .bind(target_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Drop entries older than the retention window. Returns the number removed.
pub async fn cleanup_old_entries(pool: &PgPool, retention_days: i64) -> Result<u64, AppError> {
    if retention_days <= 0 {
        return Ok(0);
    }
    let result = sqlx::query(
        "DELETE FROM audit_log WHERE date_creation < NOW() - make_interval(days => $1)",
    )
    .bind(i32::try_from(retention_days).unwrap_or(i32::MAX))
    .execute(pool)
    .await?;
    let removed = result.rows_affected();
    if removed > 0 {
        log::info!("Audit cleanup removed {removed} entries older than {retention_days} days");
    }
    Ok(removed)
}
