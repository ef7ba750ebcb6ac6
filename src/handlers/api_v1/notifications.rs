use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::session::Actor;
use crate::errors::AppError;
use crate::models::notification;
use crate::notify::{self, ConnectionMap};

/// GET /api/v1/notifications - The caller's own notifications, newest first
pub async fn list(pool: web::Data<PgPool>, actor: Actor) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(notification::find_for_user(&pool, actor.user_id).await?))
}

/// PUT /api/v1/notifications/{id}/lu
pub async fn mark_read(
    pool: web::Data<PgPool>,
    conn_map: web::Data<ConnectionMap>,
    actor: Actor,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    notification::mark_read(&pool, actor.user_id, path.into_inner()).await?;
    let unread = notification::count_unread(&pool, actor.user_id).await?;

    // Keep other open tabs of the same user in sync.
    let msg = serde_json::json!({ "type": "count_update", "unreadCount": unread });
    notify::push(&conn_map, actor.user_id, &msg.to_string());

    Ok(HttpResponse::Ok().json(serde_json::json!({ "unreadCount": unread })))
}
