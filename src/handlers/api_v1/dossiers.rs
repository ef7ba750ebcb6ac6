use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit;
use crate::auth::abac;
use crate::auth::session::Actor;
use crate::auth::validate::{self, FieldErrors};
use crate::config::WorkflowConfig;
use crate::errors::AppError;
use crate::models::dossier::{self, DossierFilter, DossierStatus, NewDossier};
use crate::models::phase::{self, NewPhase};
use crate::models::user::perm;
use crate::notify::ConnectionMap;
use crate::stats;
use crate::workflow;
use super::{PaginatedResponse, page_params};

#[derive(Deserialize)]
pub struct ListQuery {
    pub statut: Option<DossierStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub statut: DossierStatus,
}

/// GET /api/v1/dossiers - Depositors only see their own dossiers
pub async fn list(
    pool: web::Data<PgPool>,
    actor: Actor,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);
    let filter = DossierFilter {
        statut: query.statut,
        deposant_id: abac::listing_scope(&actor),
    };
    let (items, total) = dossier::find_page(&pool, &filter, page, per_page).await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse { items, page, per_page, total }))
}

/// POST /api/v1/dossiers - Submit a new dossier (status SOUMIS)
pub async fn create(
    pool: web::Data<PgPool>,
    actor: Actor,
    body: web::Json<NewDossier>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::DOSSIER_CREATE)?;

    let mut errors = FieldErrors::new();
    errors.push(validate::required(&body.titre, "titre", 200));
    errors.push(validate::max_length(&body.description, "description", 10_000));
    errors.into_result()?;

    let id = dossier::create(&pool, actor.user_id, &body).await?;
    let created = dossier::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;

    let _ = audit::log(
        pool.get_ref(),
        actor.user_id,
        "dossier.created",
        "dossier",
        id,
        serde_json::json!({ "numeroDossier": created.numero_dossier }),
    )
    .await;
    log::info!("Dossier {} submitted by {}", created.numero_dossier, actor.username);

    Ok(HttpResponse::Created().json(created))
}

/// GET /api/v1/dossiers/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let found = dossier::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    abac::require_view_dossier(&actor, &found)?;
    Ok(HttpResponse::Ok().json(found))
}

/// PUT /api/v1/dossiers/{id}/statut
pub async fn change_status(
    pool: web::Data<PgPool>,
    conn_map: web::Data<ConnectionMap>,
    actor: Actor,
    path: web::Path<i64>,
    body: web::Json<StatusRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = workflow::change_status(&pool, &conn_map, &actor, path.into_inner(), body.statut).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// GET /api/v1/dossiers/{id}/phases
pub async fn list_phases(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::DOSSIER_VIEW_ALL)?;
    let dossier_id = path.into_inner();
    dossier::find_by_id(&pool, dossier_id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(phase::find_for_dossier(&pool, dossier_id).await?))
}

/// POST /api/v1/dossiers/{id}/phases
pub async fn start_phase(
    pool: web::Data<PgPool>,
    conn_map: web::Data<ConnectionMap>,
    cfg: web::Data<WorkflowConfig>,
    actor: Actor,
    path: web::Path<i64>,
    body: web::Json<NewPhase>,
) -> Result<HttpResponse, AppError> {
    let started =
        workflow::start_phase(&pool, &conn_map, **cfg, &actor, path.into_inner(), &body).await?;
    Ok(HttpResponse::Created().json(started))
}

/// GET /api/v1/dossiers/{id}/statistiques
pub async fn statistics(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::STATS_VIEW)?;
    let dossier_id = path.into_inner();
    dossier::find_by_id(&pool, dossier_id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(stats::queries::for_dossier(&pool, dossier_id).await?))
}
