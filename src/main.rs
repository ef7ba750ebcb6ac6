use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use comite::auth::rate_limit::RateLimiter;
use comite::config::Config;
use comite::{audit, db, handlers, notify, scheduler};

/// Session encryption key: SESSION_KEY keeps sessions valid across restarts.
fn session_key(raw: Option<&str>) -> Key {
    match raw {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = Config::from_env().map_err(std::io::Error::other)?;

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .map_err(std::io::Error::other)?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;
    db::seed_admin(&pool, config.admin_password.as_deref())
        .await
        .map_err(std::io::Error::other)?;

    // Clean up old audit entries based on retention policy
    match audit::cleanup_old_entries(&pool, config.audit_retention_days).await {
        Ok(n) if n > 0 => log::info!("Removed {n} audit entries older than {} days", config.audit_retention_days),
        Ok(_) => {}
        Err(e) => log::error!("Audit cleanup failed: {e}"),
    }

    let secret_key = session_key(config.session_key.as_deref());
    let conn_map = notify::new_connection_map();
    let limiter = web::Data::new(RateLimiter::new(config.login_max_attempts, config.login_window));
    let workflow_cfg = config.workflow;

    scheduler::spawn_scheduler(
        pool.clone(),
        conn_map.clone(),
        config.scheduler_interval,
        config.audit_retention_days,
    );

    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(false)
            .cookie_http_only(true)
            .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(conn_map.clone()))
            .app_data(web::Data::new(workflow_cfg))
            .app_data(limiter.clone())
            .service(web::scope("/api/v1").configure(handlers::api_v1::configure))
            // Default 404 handler (must be registered last)
            .default_service(web::to(handlers::api_v1::not_found))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
