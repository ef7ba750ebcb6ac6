use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::session::Actor;
use crate::config::WorkflowConfig;
use crate::errors::AppError;
use crate::models::judgment::{self, NoteInput, VoteInput};
use crate::models::phase;
use crate::models::user::perm;
use crate::stats::aggregate::phase_results;
use crate::workflow;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendRequest {
    pub jours_supplementaires: i32,
}

/// GET /api/v1/phases/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::DOSSIER_VIEW_ALL)?;
    let found = phase::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(found))
}

/// PUT /api/v1/phases/{id}/terminer
pub async fn close(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let closure = workflow::close_phase(&pool, &actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(closure))
}

/// PUT /api/v1/phases/{id}/prolonger
pub async fn extend(
    pool: web::Data<PgPool>,
    cfg: web::Data<WorkflowConfig>,
    actor: Actor,
    path: web::Path<i64>,
    body: web::Json<ExtendRequest>,
) -> Result<HttpResponse, AppError> {
    let extended =
        workflow::extend_phase(&pool, **cfg, &actor, path.into_inner(), body.jours_supplementaires).await?;
    Ok(HttpResponse::Ok().json(extended))
}

/// GET /api/v1/phases/{id}/votes - Votes and notes recorded on a phase
pub async fn judgments(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::DOSSIER_VIEW_ALL)?;
    let phase_id = path.into_inner();
    phase::find_by_id(&pool, phase_id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(judgment::find_for_phase(&pool, phase_id).await?))
}

/// PUT /api/v1/phases/{id}/votes
pub async fn submit_vote(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
    body: web::Json<VoteInput>,
) -> Result<HttpResponse, AppError> {
    let vote = workflow::submit_vote(&pool, &actor, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(vote))
}

/// PUT /api/v1/phases/{id}/notes
pub async fn submit_note(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
    body: web::Json<NoteInput>,
) -> Result<HttpResponse, AppError> {
    let note = workflow::submit_note(&pool, &actor, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(note))
}

/// GET /api/v1/phases/{id}/resultats - Recomputed on every read
pub async fn results(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::STATS_VIEW)?;
    let found = phase::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    let recorded = judgment::find_for_phase(&pool, found.id).await?;
    Ok(HttpResponse::Ok().json(phase_results(&found, &recorded)))
}
