use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::session::Actor;
use crate::errors::AppError;
use crate::models::commentaire::{self, NewCommentaire};
use crate::models::dossier;
use crate::models::user::perm;
use crate::workflow;

/// GET /api/v1/commentaires/dossier/{id}
pub async fn list_for_dossier(
    pool: web::Data<PgPool>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::DOSSIER_VIEW_ALL)?;
    let dossier_id = path.into_inner();
    dossier::find_by_id(&pool, dossier_id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(commentaire::find_for_dossier(&pool, dossier_id).await?))
}

/// POST /api/v1/commentaires
pub async fn create(
    pool: web::Data<PgPool>,
    actor: Actor,
    body: web::Json<NewCommentaire>,
) -> Result<HttpResponse, AppError> {
    let created = workflow::add_comment(&pool, &actor, &body).await?;
    Ok(HttpResponse::Created().json(created))
}
