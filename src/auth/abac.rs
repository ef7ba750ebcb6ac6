//! Resource-scoped access checks for dossiers.
//!
//! Role permissions answer "may this kind of user do X"; this module answers
//! "may this user do X on *this* dossier". Staff roles see every dossier, a
//! depositor only sees the dossiers they submitted.

use crate::auth::session::Actor;
use crate::errors::AppError;
use crate::models::dossier::Dossier;
use crate::models::user::perm;

pub fn can_view_dossier(actor: &Actor, dossier: &Dossier) -> bool {
    actor.has(perm::DOSSIER_VIEW_ALL) || dossier.deposant_id == actor.user_id
}

/// Resolve to `NotFound` rather than `Forbidden` so that dossier ids of other
/// depositors are not disclosed.
pub fn require_view_dossier(actor: &Actor, dossier: &Dossier) -> Result<(), AppError> {
    if can_view_dossier(actor, dossier) {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

/// Restrict a dossier listing to the caller's own dossiers unless staff.
pub fn listing_scope(actor: &Actor) -> Option<i64> {
    if actor.has(perm::DOSSIER_VIEW_ALL) {
        None
    } else {
        Some(actor.user_id)
    }
}
