use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;
use super::types::*;

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    dossier_id: i64,
    type_phase: String,
    mode_scrutin: Option<String>,
    description: String,
    date_debut: DateTime<Utc>,
    date_fin: Option<DateTime<Utc>>,
    duree_jours: i32,
}

fn decode<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|e: String| AppError::Db(sqlx::Error::Decode(e.into())))
}

impl TryFrom<Row> for Phase {
    type Error = AppError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(Phase {
            id: row.id,
            dossier_id: row.dossier_id,
            type_phase: decode(&row.type_phase)?,
            mode_scrutin: row.mode_scrutin.as_deref().map(decode).transpose()?,
            description: row.description,
            date_debut: row.date_debut,
            date_fin: row.date_fin,
            duree_jours: row.duree_jours,
        })
    }
}

const SELECT_PHASE: &str = "SELECT id, dossier_id, type_phase, mode_scrutin, description, \
            date_debut, date_fin, duree_jours \
     FROM phases";

/// Row lock taken by [`lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Closing or extending the phase.
    Update,
    /// Submitting a judgment: blocks a concurrent close, not other judgments.
    Share,
}

pub async fn insert(
    conn: &mut PgConnection,
    dossier_id: i64,
    type_phase: PhaseType,
    mode_scrutin: Option<ModeScrutin>,
    description: &str,
    duree_jours: i32,
) -> Result<Phase, sqlx::Error> {
    let row = sqlx::query_as::<_, Row>(
        "INSERT INTO phases (dossier_id, type_phase, mode_scrutin, description, duree_jours) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, dossier_id, type_phase, mode_scrutin, description, \
                   date_debut, date_fin, duree_jours",
    )
    .bind(dossier_id)
    .bind(type_phase.as_str())
    .bind(mode_scrutin.map(ModeScrutin::as_str))
    .bind(description.trim())
    .bind(duree_jours)
    .fetch_one(&mut *conn)
    .await?;
    Phase::try_from(row).map_err(|e| sqlx::Error::Decode(e.to_string().into()))
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Phase>, AppError> {
    let row = sqlx::query_as::<_, Row>(&format!("{SELECT_PHASE} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Phase::try_from).transpose()
}

/// Load and lock a phase inside a transaction.
pub async fn lock(conn: &mut PgConnection, id: i64, mode: LockMode) -> Result<Phase, AppError> {
    let clause = match mode {
        LockMode::Update => "FOR UPDATE",
        LockMode::Share => "FOR SHARE",
    };
    let row = sqlx::query_as::<_, Row>(&format!("{SELECT_PHASE} WHERE id = $1 {clause}"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound)?;
    Phase::try_from(row)
}

pub async fn find_active_for_dossier(
    conn: &mut PgConnection,
    dossier_id: i64,
) -> Result<Option<Phase>, AppError> {
    let row = sqlx::query_as::<_, Row>(&format!(
        "{SELECT_PHASE} WHERE dossier_id = $1 AND date_fin IS NULL"
    ))
    .bind(dossier_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(Phase::try_from).transpose()
}

/// All phases of a dossier, oldest first.
pub async fn find_for_dossier(pool: &PgPool, dossier_id: i64) -> Result<Vec<Phase>, AppError> {
    let rows = sqlx::query_as::<_, Row>(&format!(
        "{SELECT_PHASE} WHERE dossier_id = $1 ORDER BY date_debut, id"
    ))
    .bind(dossier_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Phase::try_from).collect()
}

/// Set `date_fin = NOW()` on a still-open phase and return the closed row.
pub async fn close(conn: &mut PgConnection, id: i64) -> Result<Phase, AppError> {
    let row = sqlx::query_as::<_, Row>(
        "UPDATE phases SET date_fin = NOW() WHERE id = $1 AND date_fin IS NULL \
         RETURNING id, dossier_id, type_phase, mode_scrutin, description, \
                   date_debut, date_fin, duree_jours",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::PhaseClosed(id))?;
    Phase::try_from(row)
}

pub async fn extend(conn: &mut PgConnection, id: i64, jours: i32) -> Result<Phase, AppError> {
    let row = sqlx::query_as::<_, Row>(
        "UPDATE phases SET duree_jours = duree_jours + $2 WHERE id = $1 AND date_fin IS NULL \
         RETURNING id, dossier_id, type_phase, mode_scrutin, description, \
                   date_debut, date_fin, duree_jours",
    )
    .bind(id)
    .bind(jours)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::PhaseClosed(id))?;
    Phase::try_from(row)
}

/// Open phases whose advisory deadline is before `now`.
pub async fn find_overdue(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Phase>, AppError> {
    let rows = sqlx::query_as::<_, Row>(&format!(
        "{SELECT_PHASE} \
         WHERE date_fin IS NULL \
           AND date_debut + make_interval(days => duree_jours) < $1 \
         ORDER BY date_debut"
    ))
    .bind(now)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Phase::try_from).collect()
}

pub async fn count_active(pool: &PgPool) -> Result<i64, AppError> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM phases WHERE date_fin IS NULL")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
