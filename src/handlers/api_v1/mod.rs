pub mod auth;
pub mod commentaires;
pub mod dossiers;
pub mod notifications;
pub mod phases;
pub mod statistiques;
pub mod utilisateurs;
pub mod ws;

use actix_web::{HttpResponse, middleware::from_fn, web};
use serde::Serialize;

use crate::auth::middleware::{require_auth, require_json_content_type};
use crate::errors::AppError;

pub const DEFAULT_PER_PAGE: i64 = 25;
pub const MAX_PER_PAGE: i64 = 100;
pub const MAX_PAGE: i64 = 1_000_000;

/// Envelope for paginated list endpoints.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Clamp raw `page` / `per_page` query values.
pub fn page_params(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    (
        page.unwrap_or(1).clamp(1, MAX_PAGE),
        per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
    )
}

/// JSON 404 for unknown routes.
pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound)
}

/// Configure API v1 routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );

    cfg.service(
        web::scope("/auth")
            .wrap(from_fn(require_json_content_type))
            .route("/login", web::post().to(auth::login))
            .route("/logout", web::post().to(auth::logout))
            .route("/me", web::get().to(auth::me)),
    );
    cfg.service(
        web::scope("/utilisateurs")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::get().to(utilisateurs::list))
            .route("", web::post().to(utilisateurs::create)),
    );
    cfg.service(
        web::scope("/dossiers")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::get().to(dossiers::list))
            .route("", web::post().to(dossiers::create))
            .route("/{id}", web::get().to(dossiers::read))
            .route("/{id}/statut", web::put().to(dossiers::change_status))
            .route("/{id}/phases", web::get().to(dossiers::list_phases))
            .route("/{id}/phases", web::post().to(dossiers::start_phase))
            .route("/{id}/statistiques", web::get().to(dossiers::statistics)),
    );
    cfg.service(
        web::scope("/phases")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("/{id}", web::get().to(phases::read))
            .route("/{id}/terminer", web::put().to(phases::close))
            .route("/{id}/prolonger", web::put().to(phases::extend))
            .route("/{id}/votes", web::get().to(phases::judgments))
            .route("/{id}/votes", web::put().to(phases::submit_vote))
            .route("/{id}/notes", web::put().to(phases::submit_note))
            .route("/{id}/resultats", web::get().to(phases::results)),
    );
    cfg.service(
        web::scope("/statistiques")
            .wrap(from_fn(require_auth))
            .route("", web::get().to(statistiques::global)),
    );
    cfg.service(
        web::scope("/excellence")
            .wrap(from_fn(require_auth))
            .route("", web::get().to(statistiques::excellence)),
    );
    cfg.service(
        web::scope("/commentaires")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::post().to(commentaires::create))
            .route("/dossier/{id}", web::get().to(commentaires::list_for_dossier)),
    );
    cfg.service(
        web::scope("/notifications")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::get().to(notifications::list))
            .route("/{id}/lu", web::put().to(notifications::mark_read)),
    );
    cfg.service(
        web::resource("/ws")
            .wrap(from_fn(require_auth))
            .route(web::get().to(ws::ws_connect)),
    );
}
