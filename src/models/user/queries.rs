use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::AppError;
use super::types::*;

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    username: String,
    password_hash: String,
    nom: String,
    email: String,
    role: String,
    date_creation: DateTime<Utc>,
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    raw.parse().map_err(|e: String| AppError::Db(sqlx::Error::Decode(e.into())))
}

impl Row {
    fn into_user(self) -> Result<User, AppError> {
        Ok(User {
            id: self.id,
            role: parse_role(&self.role)?,
            username: self.username,
            password: self.password_hash,
            nom: self.nom,
            email: self.email,
        })
    }

    fn into_display(self) -> Result<UserDisplay, AppError> {
        Ok(UserDisplay {
            id: self.id,
            role: parse_role(&self.role)?,
            username: self.username,
            nom: self.nom,
            email: self.email,
            date_creation: self.date_creation,
        })
    }
}

const SELECT_USER: &str =
    "SELECT id, username, password_hash, nom, email, role, date_creation FROM utilisateurs";

pub async fn count(pool: &PgPool) -> Result<i64, AppError> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM utilisateurs")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Insert a user and return its id. A duplicate username is a validation error.
pub async fn create(pool: &PgPool, new_user: &NewUser) -> Result<i64, AppError> {
    let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
        "INSERT INTO utilisateurs (username, password_hash, nom, email, role) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(new_user.username.trim())
    .bind(&new_user.password)
    .bind(new_user.nom.trim())
    .bind(new_user.email.trim())
    .bind(new_user.role.as_str())
    .fetch_one(pool)
    .await;

    match result {
        Ok((id,)) => Ok(id),
        Err(e) if crate::errors::is_unique_violation(&e, "utilisateurs_username_key") => Err(
            AppError::Validation(format!("Username '{}' is already taken", new_user.username.trim())),
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, Row>(&format!("{SELECT_USER} WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await?;
    row.map(Row::into_user).transpose()
}

pub async fn find_display_by_id(pool: &PgPool, id: i64) -> Result<Option<UserDisplay>, AppError> {
    let row = sqlx::query_as::<_, Row>(&format!("{SELECT_USER} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Row::into_display).transpose()
}

pub async fn find_all(pool: &PgPool) -> Result<Vec<UserDisplay>, AppError> {
    let rows = sqlx::query_as::<_, Row>(&format!("{SELECT_USER} ORDER BY username"))
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(Row::into_display).collect()
}

/// Ids of every user holding `role` (notification fan-out).
pub async fn ids_with_role(pool: &PgPool, role: Role) -> Result<Vec<i64>, AppError> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM utilisateurs WHERE role = $1 ORDER BY id")
        .bind(role.as_str())
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
