use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use sqlx::{PgConnection, PgPool};

use crate::errors::{AppError, is_unique_violation};
use super::types::*;

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    numero_dossier: String,
    titre: String,
    description: String,
    statut: String,
    deposant_id: i64,
    deposant_nom: String,
    date_creation: DateTime<Utc>,
    date_modification: DateTime<Utc>,
}

impl TryFrom<Row> for Dossier {
    type Error = AppError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        let statut = parse_status(&row.statut)?;
        Ok(Dossier {
            id: row.id,
            numero_dossier: row.numero_dossier,
            titre: row.titre,
            description: row.description,
            statut,
            deposant_id: row.deposant_id,
            deposant_nom: row.deposant_nom,
            date_creation: row.date_creation,
            date_modification: row.date_modification,
        })
    }
}

pub(crate) fn parse_status(raw: &str) -> Result<DossierStatus, AppError> {
    raw.parse()
        .map_err(|e: String| AppError::Db(sqlx::Error::Decode(e.into())))
}

const SELECT_DOSSIER: &str = "SELECT d.id, d.numero_dossier, d.titre, d.description, d.statut, \
            d.deposant_id, COALESCE(NULLIF(u.nom, ''), u.username) AS deposant_nom, \
            d.date_creation, d.date_modification \
     FROM dossiers d \
     JOIN utilisateurs u ON u.id = d.deposant_id";

const NUMERO_ATTEMPTS: usize = 3;

/// Display code such as `DOS-2026-4F0A1C`.
fn generate_numero(now: DateTime<Utc>) -> String {
    let bytes: [u8; 3] = rand::rng().random();
    format!("DOS-{}-{}", now.year(), hex::encode_upper(bytes))
}

/// Create a dossier in status SOUMIS and return its id.
pub async fn create(pool: &PgPool, deposant_id: i64, new: &NewDossier) -> Result<i64, AppError> {
    // The numero is random; retry the rare collision a few times.
    for _ in 0..NUMERO_ATTEMPTS {
        let numero = generate_numero(Utc::now());
        let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO dossiers (numero_dossier, titre, description, statut, deposant_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&numero)
        .bind(new.titre.trim())
        .bind(new.description.trim())
        .bind(DossierStatus::Soumis.as_str())
        .bind(deposant_id)
        .fetch_one(pool)
        .await;

        match result {
            Ok((id,)) => return Ok(id),
            Err(e) if is_unique_violation(&e, "dossiers_numero_dossier_key") => {
                log::warn!("Dossier numero collision on {numero}, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(format!(
        "could not allocate a unique dossier number after {NUMERO_ATTEMPTS} attempts"
    )))
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Dossier>, AppError> {
    let row = sqlx::query_as::<_, Row>(&format!("{SELECT_DOSSIER} WHERE d.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Dossier::try_from).transpose()
}

/// Status under a share lock: status changes wait, readers do not.
pub async fn share_status(conn: &mut PgConnection, id: i64) -> Result<DossierStatus, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT statut FROM dossiers WHERE id = $1 FOR SHARE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let (raw,) = row.ok_or(AppError::NotFound)?;
    parse_status(&raw)
}

/// Lock the dossier row for the rest of the transaction and return its status.
pub async fn lock_status(conn: &mut PgConnection, id: i64) -> Result<DossierStatus, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT statut FROM dossiers WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let (raw,) = row.ok_or(AppError::NotFound)?;
    parse_status(&raw)
}

pub async fn set_status(
    conn: &mut PgConnection,
    id: i64,
    statut: DossierStatus,
) -> Result<(), AppError> {
    sqlx::query("UPDATE dossiers SET statut = $1, date_modification = NOW() WHERE id = $2")
        .bind(statut.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// One page of dossiers, newest first, with the total matching count.
pub async fn find_page(
    pool: &PgPool,
    filter: &DossierFilter,
    page: i64,
    per_page: i64,
) -> Result<(Vec<Dossier>, i64), AppError> {
    const WHERE: &str = "WHERE ($1::TEXT IS NULL OR d.statut = $1) \
                           AND ($2::BIGINT IS NULL OR d.deposant_id = $2)";
    let statut = filter.statut.map(DossierStatus::as_str);
    let offset = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(per_page))
        .filter(|o| *o >= 0)
        .ok_or_else(|| AppError::Validation(format!("page {page} is out of range")))?;

    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM dossiers d {WHERE}"))
        .bind(statut)
        .bind(filter.deposant_id)
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, Row>(&format!(
        "{SELECT_DOSSIER} {WHERE} \
         ORDER BY d.date_creation DESC, d.id DESC \
         LIMIT $3 OFFSET $4"
    ))
    .bind(statut)
    .bind(filter.deposant_id)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    let items = rows.into_iter().map(Dossier::try_from).collect::<Result<_, _>>()?;
    Ok((items, total))
}

/// Number of dossiers per status; statuses with no dossier are omitted.
pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(DossierStatus, i64)>, AppError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT statut, COUNT(*) FROM dossiers GROUP BY statut ORDER BY statut")
            .fetch_all(pool)
            .await?;
    rows.into_iter()
        .map(|(raw, n)| Ok((parse_status(&raw)?, n)))
        .collect()
}
