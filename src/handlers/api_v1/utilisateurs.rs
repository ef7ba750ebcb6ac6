use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit;
use crate::auth::session::Actor;
use crate::auth::validate::{self, FieldErrors};
use crate::auth::password;
use crate::errors::AppError;
use crate::models::user::{self, NewUser, Role, perm};

#[derive(Deserialize)]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

/// GET /api/v1/utilisateurs
pub async fn list(pool: web::Data<PgPool>, actor: Actor) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::USER_MANAGE)?;
    Ok(HttpResponse::Ok().json(user::find_all(&pool).await?))
}

/// POST /api/v1/utilisateurs
pub async fn create(
    pool: web::Data<PgPool>,
    actor: Actor,
    body: web::Json<NewUserRequest>,
) -> Result<HttpResponse, AppError> {
    actor.require_permission(perm::USER_MANAGE)?;

    let mut errors = FieldErrors::new();
    errors.push(validate::username(body.username.trim()));
    errors.push(validate::password(&body.password));
    errors.push(validate::email(body.email.trim()));
    errors.push(validate::max_length(&body.nom, "nom", 100));
    errors.into_result()?;

    let hashed = password::hash_password(&body.password)
        .map_err(|_| AppError::Hash("Password hash failed".to_string()))?;

    let new_user = NewUser {
        username: body.username.trim().to_string(),
        password: hashed,
        nom: body.nom.trim().to_string(),
        email: body.email.trim().to_string(),
        role: body.role,
    };
    let created_id = user::create(&pool, &new_user).await?;

    let details = serde_json::json!({
        "username": new_user.username,
        "role": new_user.role.as_str(),
    });
    let _ = audit::log(pool.get_ref(), actor.user_id, "utilisateur.created", "utilisateur", created_id, details).await;
    log::info!("User '{}' ({}) created by {}", new_user.username, new_user.role, actor.username);

    let created = user::find_display_by_id(&pool, created_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Created().json(created))
}
