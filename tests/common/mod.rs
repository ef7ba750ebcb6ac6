//! Shared test infrastructure for integration tests.
//!
//! Every test gets its own freshly migrated Postgres database, created from
//! `TEST_DATABASE_URL` (a URL of a database the test user may connect to,
//! typically `postgres`) and dropped when the returned [`TestDb`] goes away.
//! When `TEST_DATABASE_URL` is unset, `setup_test_db()` returns `None` and the
//! database tests return early.

#![allow(dead_code)]

use rand::Rng;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, Executor, PgConnection, PgPool};

use comite::auth::session::Actor;
use comite::db::MIGRATOR;
use comite::models::dossier::{self, NewDossier};
use comite::models::user::{self, NewUser, Role};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const TEST_PASS: &str = "motdepasse-test";

// ============================================================================
// DATABASE SETUP
// ============================================================================

pub struct TestDb {
    pool: PgPool,
    admin_url: String,
    name: String,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let admin_url = self.admin_url.clone();
        let sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name);
        // Drop runs outside any async context; use a private runtime.
        let _ = std::thread::spawn(move || {
            let Ok(rt) = tokio::runtime::Builder::new_current_thread().enable_all().build() else {
                return;
            };
            rt.block_on(async move {
                if let Ok(mut conn) = PgConnection::connect(&admin_url).await {
                    let _ = conn.execute(sql.as_str()).await;
                }
            });
        })
        .join();
    }
}

/// Create and migrate a throwaway database. `None` when no test server is
/// configured.
pub async fn setup_test_db() -> Option<TestDb> {
    let admin_url = std::env::var("TEST_DATABASE_URL").ok()?;
    let name = format!("comite_test_{:016x}", rand::rng().random::<u64>());

    let mut admin = PgConnection::connect(&admin_url)
        .await
        .expect("Failed to connect to TEST_DATABASE_URL");
    admin
        .execute(format!("CREATE DATABASE \"{name}\"").as_str())
        .await
        .expect("Failed to create test database");
    admin.close().await.expect("Failed to close admin connection");

    let options = admin_url
        .parse::<PgConnectOptions>()
        .expect("Invalid TEST_DATABASE_URL")
        .database(&name);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to connect to test database");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");

    Some(TestDb { pool, admin_url, name })
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Insert a user that cannot log in (no valid hash). Enough for model and
/// workflow tests.
pub async fn create_actor(pool: &PgPool, username: &str, role: Role) -> Actor {
    insert_user(pool, username, role, "!".to_string()).await
}

/// Insert a user with a real argon2 hash of [`TEST_PASS`].
pub async fn create_login_user(pool: &PgPool, username: &str, role: Role) -> Actor {
    let hash = comite::auth::password::hash_password(TEST_PASS).expect("hash");
    insert_user(pool, username, role, hash).await
}

async fn insert_user(pool: &PgPool, username: &str, role: Role, hash: String) -> Actor {
    let id = user::create(
        pool,
        &NewUser {
            username: username.to_string(),
            password: hash,
            nom: format!("Nom {username}"),
            email: format!("{username}@example.org"),
            role,
        },
    )
    .await
    .expect("create user");
    Actor {
        user_id: id,
        username: username.to_string(),
        role,
    }
}

pub struct Cast {
    pub deposant: Actor,
    pub receptionniste: Actor,
    pub coordinateur: Actor,
    pub membres: Vec<Actor>,
}

/// One user per role plus three committee members.
pub async fn create_cast(pool: &PgPool) -> Cast {
    let deposant = create_actor(pool, "deposant", Role::Deposant).await;
    let receptionniste = create_actor(pool, "reception", Role::Receptionniste).await;
    let coordinateur = create_actor(pool, "coordo", Role::Coordinateur).await;
    let mut membres = Vec::new();
    for i in 1..=3 {
        membres.push(create_actor(pool, &format!("membre_{i}"), Role::MembreComite).await);
    }
    Cast {
        deposant,
        receptionniste,
        coordinateur,
        membres,
    }
}

pub async fn create_dossier(pool: &PgPool, deposant: &Actor, titre: &str) -> i64 {
    dossier::create(
        pool,
        deposant.user_id,
        &NewDossier {
            titre: titre.to_string(),
            description: String::new(),
        },
    )
    .await
    .expect("create dossier")
}
