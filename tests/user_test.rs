mod common;

use comite::auth::password::verify_password;
use comite::db;
use comite::errors::AppError;
use comite::models::user::{self, NewUser, Role};
use common::*;

#[tokio::test]
async fn test_duplicate_username_rejected() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    create_actor(pool, "alice", Role::Deposant).await;

    let result = user::create(
        pool,
        &NewUser {
            username: " alice ".to_string(),
            password: "!".to_string(),
            nom: "Alice bis".to_string(),
            email: String::new(),
            role: Role::MembreComite,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(user::count(pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_login_user_password_verifies() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let actor = create_login_user(pool, "bob", Role::Coordinateur).await;

    let found = user::find_by_username(pool, "bob").await.unwrap().unwrap();
    assert_eq!(found.id, actor.user_id);
    assert_eq!(found.role, Role::Coordinateur);
    assert!(verify_password(TEST_PASS, &found.password));
    assert!(!verify_password("mauvais", &found.password));

    assert!(user::find_by_username(pool, "nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_seed_admin_only_on_empty_table() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    db::seed_admin(pool, None).await.unwrap();
    assert_eq!(user::count(pool).await.unwrap(), 0);

    db::seed_admin(pool, Some("admin-secret")).await.unwrap();
    let admin = user::find_by_username(pool, "admin").await.unwrap().unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert!(verify_password("admin-secret", &admin.password));

    db::seed_admin(pool, Some("autre")).await.unwrap();
    assert_eq!(user::count(pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_role_fan_out_lists_members() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let cast = create_cast(pool).await;

    let ids = user::ids_with_role(pool, Role::MembreComite).await.unwrap();
    let expected: Vec<i64> = cast.membres.iter().map(|m| m.user_id).collect();
    assert_eq!(ids, expected);
    assert!(user::ids_with_role(pool, Role::Admin).await.unwrap().is_empty());
}
