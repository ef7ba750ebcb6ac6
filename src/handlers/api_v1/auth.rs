use std::net::{IpAddr, Ipv4Addr};

use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit;
use crate::auth::password;
use crate::auth::rate_limit::RateLimiter;
use crate::auth::session::{Actor, store_actor};
use crate::errors::{ApiErrorResponse, AppError};
use crate::models::user;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/auth/login
pub async fn login(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<LoginRequest>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    // Rate-limit check BEFORE any database access
    let ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if limiter.is_blocked(ip) {
        log::warn!("Login blocked for {ip}: too many failed attempts");
        return Ok(HttpResponse::TooManyRequests().json(ApiErrorResponse {
            error: "TooManyRequests".to_string(),
            details: Some("Too many failed login attempts. Please try again later.".to_string()),
        }));
    }

    let found = user::find_by_username(&pool, body.username.trim()).await?;
    match found {
        Some(u) if password::verify_password(&body.password, &u.password) => {
            limiter.clear(ip);
            let actor = Actor {
                user_id: u.id,
                username: u.username,
                role: u.role,
            };
            store_actor(&session, &actor)?;
            let _ = audit::log(
                pool.get_ref(),
                actor.user_id,
                "auth.login",
                "utilisateur",
                actor.user_id,
                serde_json::json!({ "ip": ip.to_string() }),
            )
            .await;
            log::info!("User '{}' logged in as {}", actor.username, actor.role);
            Ok(HttpResponse::Ok().json(actor))
        }
        _ => {
            limiter.record_failure(ip);
            log::warn!("Failed login for '{}' from {ip}", body.username.trim());
            Err(AppError::Unauthorized)
        }
    }
}

/// POST /api/v1/auth/logout
pub async fn logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

/// GET /api/v1/auth/me
pub async fn me(pool: web::Data<PgPool>, actor: Actor) -> Result<HttpResponse, AppError> {
    let profile = user::find_display_by_id(&pool, actor.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(profile))
}
