//! Transition graph and guards of the dossier review workflow.
//!
//! ```text
//! SOUMIS ──► COMPLET ──► EN_COURS ──► APPROUVE
//!    │                      │
//!    └──► INCOMPLET         └──► REJETE
//! ```
//!
//! INCOMPLET, APPROUVE and REJETE have no outgoing edge. Every rule here is a
//! pure function; the controller calls them on rows locked inside its
//! transaction.

use crate::config::WorkflowConfig;
use crate::errors::AppError;
use crate::models::dossier::DossierStatus;
use crate::models::phase::{ModeScrutin, Phase, PhaseType};
use crate::models::user::{Role, perm};

use DossierStatus::*;

pub fn allowed_targets(from: DossierStatus) -> &'static [DossierStatus] {
    match from {
        Soumis => &[Complet, Incomplet],
        Complet => &[EnCours],
        EnCours => &[Approuve, Rejete],
        Incomplet | Approuve | Rejete => &[],
    }
}

pub fn check_transition(from: DossierStatus, to: DossierStatus) -> Result<(), AppError> {
    if allowed_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(AppError::IllegalTransition { from, to })
    }
}

/// Permission needed to take a (legal) edge.
pub fn required_permission(from: DossierStatus) -> &'static str {
    match from {
        Soumis => perm::DOSSIER_CHECK,
        _ => perm::DOSSIER_DECIDE,
    }
}

/// Graph first, then role: an illegal edge is `IllegalTransition` for
/// everyone, a legal edge taken by the wrong role is `PermissionDenied`.
pub fn authorize_transition(role: Role, from: DossierStatus, to: DossierStatus) -> Result<(), AppError> {
    check_transition(from, to)?;
    let code = required_permission(from);
    if role.has(code) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(code.to_string()))
    }
}

/// A phase may start on a COMPLET dossier (which then moves to EN_COURS) or
/// on a dossier already EN_COURS.
pub fn check_phase_start(statut: DossierStatus) -> Result<(), AppError> {
    match statut {
        Complet | EnCours => Ok(()),
        other => Err(AppError::IllegalTransition { from: other, to: EnCours }),
    }
}

/// Resolve the scrutin mode of a new phase.
pub fn scrutin_for(type_phase: PhaseType, requested: Option<ModeScrutin>) -> Result<Option<ModeScrutin>, AppError> {
    match (type_phase, requested) {
        (PhaseType::Vote, mode) => Ok(Some(mode.unwrap_or(ModeScrutin::Notation))),
        (PhaseType::Discussion, None) => Ok(None),
        (PhaseType::Discussion, Some(_)) => Err(AppError::Validation(
            "modeScrutin only applies to VOTE phases".to_string(),
        )),
    }
}

/// Can a judgment of kind `mode` be recorded on this phase right now?
pub fn check_judgment(phase: &Phase, mode: ModeScrutin) -> Result<(), AppError> {
    if !phase.is_active() {
        return Err(AppError::PhaseClosed(phase.id));
    }
    match (phase.type_phase, phase.mode_scrutin) {
        (PhaseType::Vote, Some(m)) if m == mode => Ok(()),
        (PhaseType::Vote, Some(m)) => Err(AppError::Validation(format!(
            "phase #{} collects {} judgments, not {}",
            phase.id,
            m.as_str(),
            mode.as_str()
        ))),
        _ => Err(AppError::Validation(format!(
            "phase #{} is not a VOTE phase",
            phase.id
        ))),
    }
}

/// Requested duration of a new phase, in days.
pub fn check_duration(duree_jours: i32, cfg: &WorkflowConfig) -> Result<(), AppError> {
    if duree_jours <= 0 || duree_jours > cfg.phase_max_days {
        return Err(AppError::Validation(format!(
            "dureeJours must be between 1 and {}",
            cfg.phase_max_days
        )));
    }
    Ok(())
}

/// An extension is bounded on its own and by the phase's resulting total.
pub fn check_extension(phase: &Phase, jours: i32, cfg: &WorkflowConfig) -> Result<(), AppError> {
    if !phase.is_active() {
        return Err(AppError::PhaseClosed(phase.id));
    }
    let max = cfg.phase_max_extension_days;
    if jours <= 0 || jours > max {
        return Err(AppError::Validation(format!(
            "joursSupplementaires must be between 1 and {max}"
        )));
    }
    if i64::from(phase.duree_jours) + i64::from(jours) > i64::from(cfg.phase_max_days) {
        return Err(AppError::Validation(format!(
            "phase #{} would last more than {} days",
            phase.id, cfg.phase_max_days
        )));
    }
    Ok(())
}

/// Phase suggested once a phase of this type ends.
pub fn follow_up(type_phase: PhaseType) -> Option<PhaseType> {
    match type_phase {
        PhaseType::Discussion => Some(PhaseType::Vote),
        PhaseType::Vote => None,
    }
}
