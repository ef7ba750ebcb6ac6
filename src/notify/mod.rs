//! Notification delivery: persisted rows plus a live push to connected
//! websocket sessions.
//!
//! Delivery failures are logged and swallowed. A workflow change that already
//! committed is never undone because a notification could not be sent.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::models::notification::{self, Target};
use crate::models::user::{self, Role};

pub type ConnectionMap = Arc<RwLock<HashMap<i64, Vec<mpsc::UnboundedSender<String>>>>>;

pub fn new_connection_map() -> ConnectionMap {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Register a websocket sender for a user.
pub fn register(conn_map: &ConnectionMap, user_id: i64, sender: mpsc::UnboundedSender<String>) {
    let mut map = conn_map.write().unwrap_or_else(|e| e.into_inner());
    map.entry(user_id).or_default().push(sender);
}

/// Drop senders whose receiving session has gone away.
pub fn prune_closed(conn_map: &ConnectionMap, user_id: i64) {
    let mut map = conn_map.write().unwrap_or_else(|e| e.into_inner());
    if let Some(senders) = map.get_mut(&user_id) {
        senders.retain(|s| !s.is_closed());
        if senders.is_empty() {
            map.remove(&user_id);
        }
    }
}

/// Send a raw message to every open session of a user. Returns how many
/// sessions received it.
pub fn push(conn_map: &ConnectionMap, user_id: i64, message: &str) -> usize {
    let map = conn_map.read().unwrap_or_else(|e| e.into_inner());
    map.get(&user_id)
        .map(|senders| {
            senders
                .iter()
                .filter(|s| s.send(message.to_string()).is_ok())
                .count()
        })
        .unwrap_or(0)
}

/// Persist a notification for one user and push it live.
pub async fn notify_user(
    pool: &PgPool,
    conn_map: &ConnectionMap,
    user_id: i64,
    target: Target,
    kind: &str,
    message: &str,
) {
    let notification_id = match notification::create(pool, user_id, target, kind, message).await {
        Ok(id) => id,
        Err(e) => {
            log::error!("Failed to store {kind} notification for user {user_id}: {e}");
            return;
        }
    };

    let unread = notification::count_unread(pool, user_id).await.unwrap_or(0);
    let payload = serde_json::json!({
        "type": "notification",
        "notificationId": notification_id,
        "kind": kind,
        "dossierId": target.dossier_id,
        "phaseId": target.phase_id,
        "message": message,
        "unreadCount": unread,
    })
    .to_string();

    if push(conn_map, user_id, &payload) == 0 {
        log::debug!("User {user_id} not connected; notification #{notification_id} stored only");
    }
}

/// Notify every user holding `role`.
pub async fn notify_role(
    pool: &PgPool,
    conn_map: &ConnectionMap,
    role: Role,
    target: Target,
    kind: &str,
    message: &str,
) {
    let user_ids = match user::ids_with_role(pool, role).await {
        Ok(ids) => ids,
        Err(e) => {
            log::error!("Failed to resolve {role} users for {kind} notification: {e}");
            return;
        }
    };
    for user_id in user_ids {
        notify_user(pool, conn_map, user_id, target, kind, message).await;
    }
}
