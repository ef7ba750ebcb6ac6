use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;
use super::types::*;

#[derive(sqlx::FromRow)]
struct VoteRow {
    id: i64,
    phase_id: i64,
    utilisateur_id: i64,
    utilisateur_nom: String,
    decision: String,
    commentaire: String,
    date_creation: DateTime<Utc>,
    date_modification: DateTime<Utc>,
}

impl TryFrom<VoteRow> for Vote {
    type Error = AppError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let decision = row
            .decision
            .parse()
            .map_err(|e: String| AppError::Db(sqlx::Error::Decode(e.into())))?;
        Ok(Vote {
            id: row.id,
            phase_id: row.phase_id,
            utilisateur_id: row.utilisateur_id,
            utilisateur_nom: row.utilisateur_nom,
            decision,
            commentaire: row.commentaire,
            date_creation: row.date_creation,
            date_modification: row.date_modification,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NoteRow {
    id: i64,
    phase_id: i64,
    utilisateur_id: i64,
    utilisateur_nom: String,
    note: f64,
    commentaire: String,
    date_creation: DateTime<Utc>,
    date_modification: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            id: row.id,
            phase_id: row.phase_id,
            utilisateur_id: row.utilisateur_id,
            utilisateur_nom: row.utilisateur_nom,
            note: row.note,
            commentaire: row.commentaire,
            date_creation: row.date_creation,
            date_modification: row.date_modification,
        }
    }
}

/// Insert or overwrite the member's vote on a phase. The unique
/// `(phase_id, utilisateur_id)` constraint makes this a single atomic upsert.
pub async fn upsert_vote(
    conn: &mut PgConnection,
    phase_id: i64,
    utilisateur_id: i64,
    input: &VoteInput,
) -> Result<Vote, AppError> {
    let row = sqlx::query_as::<_, VoteRow>(
        "WITH v AS ( \
             INSERT INTO votes (phase_id, utilisateur_id, decision, commentaire) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (phase_id, utilisateur_id) DO UPDATE \
                 SET decision = EXCLUDED.decision, \
                     commentaire = EXCLUDED.commentaire, \
                     date_modification = NOW() \
             RETURNING * \
         ) \
         SELECT v.id, v.phase_id, v.utilisateur_id, \
                COALESCE(NULLIF(u.nom, ''), u.username) AS utilisateur_nom, \
                v.decision, v.commentaire, v.date_creation, v.date_modification \
         FROM v JOIN utilisateurs u ON u.id = v.utilisateur_id",
    )
    .bind(phase_id)
    .bind(utilisateur_id)
    .bind(input.decision.as_str())
    .bind(input.commentaire.trim())
    .fetch_one(&mut *conn)
    .await?;
    Vote::try_from(row)
}

/// Insert or overwrite the member's note on a phase.
pub async fn upsert_note(
    conn: &mut PgConnection,
    phase_id: i64,
    utilisateur_id: i64,
    input: &NoteInput,
) -> Result<Note, AppError> {
    let row = sqlx::query_as::<_, NoteRow>(
        "WITH n AS ( \
             INSERT INTO notes (phase_id, utilisateur_id, note, commentaire) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (phase_id, utilisateur_id) DO UPDATE \
                 SET note = EXCLUDED.note, \
                     commentaire = EXCLUDED.commentaire, \
                     date_modification = NOW() \
             RETURNING * \
         ) \
         SELECT n.id, n.phase_id, n.utilisateur_id, \
                COALESCE(NULLIF(u.nom, ''), u.username) AS utilisateur_nom, \
                n.note, n.commentaire, n.date_creation, n.date_modification \
         FROM n JOIN utilisateurs u ON u.id = n.utilisateur_id",
    )
    .bind(phase_id)
    .bind(utilisateur_id)
    .bind(input.note)
    .bind(input.commentaire.trim())
    .fetch_one(&mut *conn)
    .await?;
    Ok(Note::from(row))
}

pub async fn find_votes_for_phase(pool: &PgPool, phase_id: i64) -> Result<Vec<Vote>, AppError> {
    let rows = sqlx::query_as::<_, VoteRow>(
        "SELECT v.id, v.phase_id, v.utilisateur_id, \
                COALESCE(NULLIF(u.nom, ''), u.username) AS utilisateur_nom, \
                v.decision, v.commentaire, v.date_creation, v.date_modification \
         FROM votes v JOIN utilisateurs u ON u.id = v.utilisateur_id \
         WHERE v.phase_id = $1 \
         ORDER BY v.date_creation, v.id",
    )
    .bind(phase_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Vote::try_from).collect()
}

pub async fn find_notes_for_phase(pool: &PgPool, phase_id: i64) -> Result<Vec<Note>, AppError> {
    let rows = sqlx::query_as::<_, NoteRow>(
        "SELECT n.id, n.phase_id, n.utilisateur_id, \
                COALESCE(NULLIF(u.nom, ''), u.username) AS utilisateur_nom, \
                n.note, n.commentaire, n.date_creation, n.date_modification \
         FROM notes n JOIN utilisateurs u ON u.id = n.utilisateur_id \
         WHERE n.phase_id = $1 \
         ORDER BY n.date_creation, n.id",
    )
    .bind(phase_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Note::from).collect())
}

pub async fn find_for_phase(pool: &PgPool, phase_id: i64) -> Result<PhaseJudgments, AppError> {
    Ok(PhaseJudgments {
        votes: find_votes_for_phase(pool, phase_id).await?,
        notes: find_notes_for_phase(pool, phase_id).await?,
    })
}

/// Note values across every phase of a dossier.
pub async fn note_values_for_dossier(pool: &PgPool, dossier_id: i64) -> Result<Vec<f64>, AppError> {
    let rows: Vec<(f64,)> = sqlx::query_as(
        "SELECT n.note FROM notes n JOIN phases p ON p.id = n.phase_id \
         WHERE p.dossier_id = $1 ORDER BY n.id",
    )
    .bind(dossier_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Every note value in the system, for global statistics.
pub async fn all_note_values(pool: &PgPool) -> Result<Vec<f64>, AppError> {
    let rows: Vec<(f64,)> = sqlx::query_as("SELECT note FROM notes ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn count_all(pool: &PgPool) -> Result<i64, AppError> {
    let (n,): (i64,) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM votes) + (SELECT COUNT(*) FROM notes)",
    )
    .fetch_one(pool)
    .await?;
    Ok(n)
}
