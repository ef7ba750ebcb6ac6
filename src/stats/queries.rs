use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::dossier::{self, DossierStatus};
use crate::models::{judgment, phase};
use super::aggregate::{NoteSummary, PhaseResults, phase_results, summarize_notes};
use super::ranking::RankedDossier;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub statut: DossierStatus,
    pub nombre: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStatistics {
    /// One entry per status, zero counts included.
    pub dossiers_par_statut: Vec<StatusCount>,
    pub total_dossiers: i64,
    pub phases_actives: i64,
    pub total_jugements: i64,
    pub notes: NoteSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DossierStatistics {
    pub dossier_id: i64,
    pub phases: Vec<PhaseResults>,
    /// Across every note of every phase of the dossier.
    pub notes: NoteSummary,
}

pub async fn global(pool: &PgPool) -> Result<GlobalStatistics, AppError> {
    let counts = dossier::count_by_status(pool).await?;
    let dossiers_par_statut: Vec<StatusCount> = DossierStatus::ALL
        .into_iter()
        .map(|statut| StatusCount {
            statut,
            nombre: counts
                .iter()
                .find(|(s, _)| *s == statut)
                .map_or(0, |(_, n)| *n),
        })
        .collect();
    let total_dossiers = dossiers_par_statut.iter().map(|c| c.nombre).sum();

    Ok(GlobalStatistics {
        dossiers_par_statut,
        total_dossiers,
        phases_actives: phase::count_active(pool).await?,
        total_jugements: judgment::count_all(pool).await?,
        notes: summarize_notes(&judgment::all_note_values(pool).await?),
    })
}

/// Results of every VOTE phase of a dossier plus the dossier-wide summary.
pub async fn for_dossier(pool: &PgPool, dossier_id: i64) -> Result<DossierStatistics, AppError> {
    let mut phases = Vec::new();
    for p in phase::find_for_dossier(pool, dossier_id).await? {
        if p.type_phase != phase::PhaseType::Vote {
            continue;
        }
        let judgments = judgment::find_for_phase(pool, p.id).await?;
        phases.push(phase_results(&p, &judgments));
    }

    Ok(DossierStatistics {
        dossier_id,
        phases,
        notes: summarize_notes(&judgment::note_values_for_dossier(pool, dossier_id).await?),
    })
}

/// Every dossier with its mean note and note count, for the Excellence view.
pub async fn ranked_dossiers(pool: &PgPool) -> Result<Vec<RankedDossier>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        numero_dossier: String,
        titre: String,
        statut: String,
        moyenne: Option<f64>,
        nombre_votes: i64,
        date_creation: DateTime<Utc>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT d.id, d.numero_dossier, d.titre, d.statut, \
                AVG(n.note) AS moyenne, \
                COUNT(n.id) AS nombre_votes, \
                d.date_creation \
         FROM dossiers d \
         LEFT JOIN phases p ON p.dossier_id = d.id \
         LEFT JOIN notes n ON n.phase_id = p.id \
         GROUP BY d.id \
         ORDER BY d.id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(RankedDossier {
                dossier_id: row.id,
                numero_dossier: row.numero_dossier,
                titre: row.titre,
                statut: dossier::parse_status(&row.statut)?,
                moyenne: row.moyenne,
                nombre_votes: row.nombre_votes,
                date_creation: row.date_creation,
            })
        })
        .collect()
}
