use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;

pub const KIND_STATUT_CHANGE: &str = "statut_change";
pub const KIND_PHASE_EN_RETARD: &str = "phase_en_retard";
pub const KIND_PHASE_OUVERTE: &str = "phase_ouverte";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub utilisateur_id: i64,
    pub dossier_id: Option<i64>,
    pub phase_id: Option<i64>,
    pub kind: String,
    pub message: String,
    pub lu: bool,
    pub date_creation: DateTime<Utc>,
}

/// Where a notification points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target {
    pub dossier_id: Option<i64>,
    pub phase_id: Option<i64>,
}

pub async fn create(
    pool: &PgPool,
    utilisateur_id: i64,
    target: Target,
    kind: &str,
    message: &str,
) -> Result<i64, AppError> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO notifications (utilisateur_id, dossier_id, phase_id, kind, message) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(utilisateur_id)
    .bind(target.dossier_id)
    .bind(target.phase_id)
    .bind(kind)
    .bind(message)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// True if a notification of `kind` about `phase_id` was already issued.
pub async fn exists_for_phase(pool: &PgPool, kind: &str, phase_id: i64) -> Result<bool, AppError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM notifications WHERE kind = $1 AND phase_id = $2)",
    )
    .bind(kind)
    .bind(phase_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// A user's notifications, newest first.
pub async fn find_for_user(pool: &PgPool, utilisateur_id: i64) -> Result<Vec<Notification>, AppError> {
    let rows = sqlx::query_as::<_, Notification>(
        "SELECT id, utilisateur_id, dossier_id, phase_id, kind, message, lu, date_creation \
         FROM notifications WHERE utilisateur_id = $1 \
         ORDER BY date_creation DESC, id DESC",
    )
    .bind(utilisateur_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_unread(pool: &PgPool, utilisateur_id: i64) -> Result<i64, AppError> {
    let (n,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE utilisateur_id = $1 AND NOT lu",
    )
    .bind(utilisateur_id)
    .fetch_one(pool)
    .await?;
    Ok(n)
}

/// Mark one of the user's notifications as read. `NotFound` if it is not theirs.
pub async fn mark_read(pool: &PgPool, utilisateur_id: i64, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE notifications SET lu = TRUE WHERE id = $1 AND utilisateur_id = $2")
        .bind(id)
        .bind(utilisateur_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
