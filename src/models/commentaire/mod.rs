use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;

/// Discussion comment on a dossier, optionally tied to one of its phases.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Commentaire {
    pub id: i64,
    pub dossier_id: i64,
    pub phase_id: Option<i64>,
    pub auteur_id: i64,
    pub auteur_nom: String,
    pub contenu: String,
    pub date_creation: DateTime<Utc>,
}

/// Body of `POST /commentaires`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentaire {
    pub dossier_id: i64,
    #[serde(default)]
    pub phase_id: Option<i64>,
    pub contenu: String,
}

pub const CONTENU_MAX_LEN: usize = 5000;

pub async fn create(
    conn: &mut PgConnection,
    auteur_id: i64,
    new: &NewCommentaire,
) -> Result<Commentaire, AppError> {
    let row = sqlx::query_as::<_, Commentaire>(
        "WITH c AS ( \
             INSERT INTO commentaires (dossier_id, phase_id, auteur_id, contenu) \
             VALUES ($1, $2, $3, $4) RETURNING * \
         ) \
         SELECT c.id, c.dossier_id, c.phase_id, c.auteur_id, \
                COALESCE(NULLIF(u.nom, ''), u.username) AS auteur_nom, \
                c.contenu, c.date_creation \
         FROM c JOIN utilisateurs u ON u.id = c.auteur_id",
    )
    .bind(new.dossier_id)
    .bind(new.phase_id)
    .bind(auteur_id)
    .bind(new.contenu.trim())
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Comments of a dossier, oldest first.
pub async fn find_for_dossier(pool: &PgPool, dossier_id: i64) -> Result<Vec<Commentaire>, AppError> {
    let rows = sqlx::query_as::<_, Commentaire>(
        "SELECT c.id, c.dossier_id, c.phase_id, c.auteur_id, \
                COALESCE(NULLIF(u.nom, ''), u.username) AS auteur_nom, \
                c.contenu, c.date_creation \
         FROM commentaires c JOIN utilisateurs u ON u.id = c.auteur_id \
         WHERE c.dossier_id = $1 \
         ORDER BY c.date_creation, c.id",
    )
    .bind(dossier_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
