use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::audit;
use crate::errors::AppError;
use crate::models::notification::{self, KIND_PHASE_EN_RETARD, Target};
use crate::models::phase;
use crate::models::user::Role;
use crate::notify::{self, ConnectionMap};

/// Periodic housekeeping: overdue-phase reminders and audit retention.
/// Phases are never closed here; closing stays a coordinator action.
pub fn spawn_scheduler(pool: PgPool, conn_map: ConnectionMap, interval: Duration, audit_retention_days: i64) {
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            log::info!("Running workflow scheduler");

            match remind_overdue_phases(&pool, &conn_map).await {
                Ok(0) => {}
                Ok(n) => log::info!("Scheduler: {n} overdue phase reminder(s) sent"),
                Err(e) => log::error!("Scheduler: overdue phase check failed: {e}"),
            }
            match audit::cleanup_old_entries(&pool, audit_retention_days).await {
                Ok(0) => {}
                Ok(n) => log::info!("Scheduler: removed {n} audit entries"),
                Err(e) => log::error!("Audit cleanup failed: {e}"),
            }
        }
    });
}

/// Notify coordinators once per phase that ran past its advisory deadline.
/// Returns how many phases were newly reported.
pub async fn remind_overdue_phases(pool: &PgPool, conn_map: &ConnectionMap) -> Result<usize, AppError> {
    let mut reported = 0;
    for p in phase::find_overdue(pool, Utc::now()).await? {
        if notification::exists_for_phase(pool, KIND_PHASE_EN_RETARD, p.id).await? {
            continue;
        }
        let msg = format!(
            "La phase #{} ({}) du dossier #{} a dépassé sa date limite du {}",
            p.id,
            p.type_phase,
            p.dossier_id,
            p.date_limite().format("%Y-%m-%d")
        );
        let target = Target { dossier_id: Some(p.dossier_id), phase_id: Some(p.id) };
        notify::notify_role(pool, conn_map, Role::Coordinateur, target, KIND_PHASE_EN_RETARD, &msg).await;
        reported += 1;
    }
    Ok(reported)
}
