use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::auth::password;
use crate::errors::AppError;
use crate::models::user::{self, NewUser, Role};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    MIGRATOR.run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the initial `admin` account when the user table is empty.
/// Without a configured password nothing is seeded.
pub async fn seed_admin(pool: &PgPool, admin_password: Option<&str>) -> Result<(), AppError> {
    if user::count(pool).await? > 0 {
        return Ok(());
    }
    let Some(plain) = admin_password else {
        log::warn!("No users exist and ADMIN_PASSWORD is not set; skipping admin seed");
        return Ok(());
    };

    let hash = password::hash_password(plain).map_err(AppError::Hash)?;
    let id = user::create(
        pool,
        &NewUser {
            username: "admin".to_string(),
            password: hash,
            nom: "Administrateur".to_string(),
            email: String::new(),
            role: Role::Admin,
        },
    )
    .await?;
    log::info!("Seeded admin account (id={id})");
    Ok(())
}
