use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::session::Actor;
use crate::errors::AppError;
use crate::models::user::perm;
use crate::stats::queries;
use crate::stats::ranking::{RankingCriteria, rank};

/// GET /api/v1/statistiques
pub async fn global(pool: web::Data<PgPool>, actor: Actor) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::STATS_VIEW)?;
    Ok(HttpResponse::Ok().json(queries::global(&pool).await?))
}

/// GET /api/v1/excellence?seuil_min=&seuil_max=&min_votes=&top_n=&tri=
pub async fn excellence(
    pool: web::Data<PgPool>,
    actor: Actor,
    criteria: web::Query<RankingCriteria>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::EXCELLENCE_VIEW)?;
    criteria.validate()?;
    let dossiers = queries::ranked_dossiers(&pool).await?;
    Ok(HttpResponse::Ok().json(rank(dossiers, &criteria)))
}
