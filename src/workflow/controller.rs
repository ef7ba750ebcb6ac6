use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;

use crate::audit;
use crate::auth::session::Actor;
use crate::auth::validate::{self, FieldErrors};
use crate::config::WorkflowConfig;
use crate::errors::{AppError, is_unique_violation};
use crate::models::commentaire::{self, CONTENU_MAX_LEN, Commentaire, NewCommentaire};
use crate::models::dossier::{self, Dossier, DossierStatus};
use crate::models::judgment::{self, Note, NoteInput, Vote, VoteInput};
use crate::models::notification::{KIND_PHASE_OUVERTE, KIND_STATUT_CHANGE, Target};
use crate::models::phase::{self, LockMode, ModeScrutin, NewPhase, Phase, PhaseType};
use crate::models::user::{Role, perm};
use crate::notify::{self, ConnectionMap};
use crate::stats::aggregate::{PhaseResults, phase_results};

use super::rules;

const ONE_ACTIVE_PHASE_INDEX: &str = "phases_one_active_per_dossier";
const DESCRIPTION_MAX_LEN: usize = 2000;

/// Outcome of opening a phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStarted {
    pub phase: Phase,
    pub statut_dossier: DossierStatus,
}

/// Outcome of closing a phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseClosure {
    pub phase: Phase,
    /// Present for VOTE phases.
    pub resultats: Option<PhaseResults>,
    pub phase_suivante_suggeree: Option<PhaseType>,
}

/// Move a dossier along one edge of the status graph.
pub async fn change_status(
    pool: &PgPool,
    conn_map: &ConnectionMap,
    actor: &Actor,
    dossier_id: i64,
    target: DossierStatus,
) -> Result<Dossier, AppError> {
    let mut tx = pool.begin().await?;

    let from = dossier::lock_status(&mut *tx, dossier_id).await?;
    rules::authorize_transition(actor.role, from, target)?;

    // A decision closes the review; it cannot be taken while a phase is open.
    if target.is_terminal() {
        if phase::find_active_for_dossier(&mut *tx, dossier_id).await?.is_some() {
            return Err(AppError::PhaseAlreadyActive(dossier_id));
        }
    }

    dossier::set_status(&mut *tx, dossier_id, target).await?;
    audit::log(
        &mut *tx,
        actor.user_id,
        "dossier.statut_change",
        "dossier",
        dossier_id,
        json!({ "from": from.as_str(), "to": target.as_str() }),
    )
    .await?;
    tx.commit().await?;

    log::info!(
        "Dossier #{dossier_id}: {from} -> {target} by {} ({})",
        actor.username,
        actor.role
    );

    let updated = dossier::find_by_id(pool, dossier_id)
        .await?
        .ok_or(AppError::NotFound)?;
    announce_status(pool, conn_map, &updated, from).await;
    Ok(updated)
}

/// Open a DISCUSSION or VOTE phase. A COMPLET dossier moves to EN_COURS in
/// the same transaction.
pub async fn start_phase(
    pool: &PgPool,
    conn_map: &ConnectionMap,
    cfg: WorkflowConfig,
    actor: &Actor,
    dossier_id: i64,
    new: &NewPhase,
) -> Result<PhaseStarted, AppError> {
    actor.require_permission(perm::PHASE_MANAGE)?;

    let mut errors = FieldErrors::new();
    errors.push(validate::max_length(&new.description, "description", DESCRIPTION_MAX_LEN));
    errors.into_result()?;
    let duree_jours = new.duree_jours.unwrap_or(cfg.phase_default_days);
    rules::check_duration(duree_jours, &cfg)?;
    let mode_scrutin = rules::scrutin_for(new.type_phase, new.mode_scrutin)?;

    let mut tx = pool.begin().await?;

    let statut = dossier::lock_status(&mut *tx, dossier_id).await?;
    rules::check_phase_start(statut)?;
    if phase::find_active_for_dossier(&mut *tx, dossier_id).await?.is_some() {
        return Err(AppError::PhaseAlreadyActive(dossier_id));
    }

    let started = match phase::insert(
        &mut *tx,
        dossier_id,
        new.type_phase,
        mode_scrutin,
        &new.description,
        duree_jours,
    )
    .await
    {
        Ok(p) => p,
        Err(e) if is_unique_violation(&e, ONE_ACTIVE_PHASE_INDEX) => {
            log::warn!("Concurrent phase start on dossier #{dossier_id} rejected by index");
            return Err(AppError::PhaseAlreadyActive(dossier_id));
        }
        Err(e) => return Err(e.into()),
    };

    let statut_dossier = if statut == DossierStatus::Complet {
        rules::check_transition(statut, DossierStatus::EnCours)?;
        dossier::set_status(&mut *tx, dossier_id, DossierStatus::EnCours).await?;
        DossierStatus::EnCours
    } else {
        statut
    };

    audit::log(
        &mut *tx,
        actor.user_id,
        "phase.started",
        "phase",
        started.id,
        json!({
            "dossierId": dossier_id,
            "type": started.type_phase.as_str(),
            "modeScrutin": started.mode_scrutin.map(ModeScrutin::as_str),
            "dureeJours": started.duree_jours,
        }),
    )
    .await?;
    tx.commit().await?;

    log::info!(
        "Phase #{} ({}) opened on dossier #{dossier_id} by {}",
        started.id,
        started.type_phase,
        actor.username
    );

    if statut_dossier != statut {
        if let Some(d) = dossier::find_by_id(pool, dossier_id).await? {
            announce_status(pool, conn_map, &d, statut).await;
        }
    }
    if started.type_phase == PhaseType::Vote {
        let msg = format!("Une phase de vote est ouverte sur le dossier #{dossier_id}");
        let target = Target { dossier_id: Some(dossier_id), phase_id: Some(started.id) };
        notify::notify_role(pool, conn_map, Role::MembreComite, target, KIND_PHASE_OUVERTE, &msg).await;
    }

    Ok(PhaseStarted { phase: started, statut_dossier })
}

/// Close an active phase. VOTE phases return their aggregated results; a
/// DISCUSSION phase suggests a VOTE phase as the next step.
pub async fn close_phase(pool: &PgPool, actor: &Actor, phase_id: i64) -> Result<PhaseClosure, AppError> {
    actor.require_permission(perm::PHASE_MANAGE)?;

    let mut tx = pool.begin().await?;
    let current = phase::lock(&mut *tx, phase_id, LockMode::Update).await?;
    if !current.is_active() {
        return Err(AppError::PhaseClosed(phase_id));
    }
    let closed = phase::close(&mut *tx, phase_id).await?;
    audit::log(
        &mut *tx,
        actor.user_id,
        "phase.closed",
        "phase",
        phase_id,
        json!({ "dossierId": closed.dossier_id, "type": closed.type_phase.as_str() }),
    )
    .await?;
    tx.commit().await?;

    log::info!("Phase #{phase_id} closed by {}", actor.username);

    // The phase is closed, so no judgment can land between commit and read.
    let resultats = match closed.type_phase {
        PhaseType::Vote => {
            let judgments = judgment::find_for_phase(pool, phase_id).await?;
            Some(phase_results(&closed, &judgments))
        }
        PhaseType::Discussion => None,
    };
    let phase_suivante_suggeree = rules::follow_up(closed.type_phase);

    Ok(PhaseClosure { phase: closed, resultats, phase_suivante_suggeree })
}

/// Push back the advisory deadline of an active phase.
pub async fn extend_phase(
    pool: &PgPool,
    cfg: WorkflowConfig,
    actor: &Actor,
    phase_id: i64,
    jours: i32,
) -> Result<Phase, AppError> {
    actor.require_permission(perm::PHASE_MANAGE)?;

    let mut tx = pool.begin().await?;
    let current = phase::lock(&mut *tx, phase_id, LockMode::Update).await?;
    rules::check_extension(&current, jours, &cfg)?;
    let extended = phase::extend(&mut *tx, phase_id, jours).await?;
    audit::log(
        &mut *tx,
        actor.user_id,
        "phase.extended",
        "phase",
        phase_id,
        json!({ "joursSupplementaires": jours, "dureeJours": extended.duree_jours }),
    )
    .await?;
    tx.commit().await?;

    log::info!(
        "Phase #{phase_id} extended by {jours} day(s) to {} by {}",
        extended.duree_jours,
        actor.username
    );
    Ok(extended)
}

/// Record (or overwrite) the caller's decision vote on a DECISION phase.
pub async fn submit_vote(
    pool: &PgPool,
    actor: &Actor,
    phase_id: i64,
    input: &VoteInput,
) -> Result<Vote, AppError> {
    actor.require_permission(perm::JUDGMENT_SUBMIT)?;
    let mut errors = FieldErrors::new();
    errors.push(validate::max_length(&input.commentaire, "commentaire", CONTENU_MAX_LEN));
    errors.into_result()?;

    let mut tx = pool.begin().await?;
    let current = phase::lock(&mut *tx, phase_id, LockMode::Share).await?;
    rules::check_judgment(&current, ModeScrutin::Decision)?;
    let vote = judgment::upsert_vote(&mut *tx, phase_id, actor.user_id, input).await?;
    audit::log(
        &mut *tx,
        actor.user_id,
        "vote.submitted",
        "phase",
        phase_id,
        json!({ "decision": vote.decision.as_str() }),
    )
    .await?;
    tx.commit().await?;

    log::debug!("Vote on phase #{phase_id} recorded for user {}", actor.user_id);
    Ok(vote)
}

/// Record (or overwrite) the caller's 0..=20 note on a NOTATION phase.
pub async fn submit_note(
    pool: &PgPool,
    actor: &Actor,
    phase_id: i64,
    input: &NoteInput,
) -> Result<Note, AppError> {
    actor.require_permission(perm::JUDGMENT_SUBMIT)?;
    input.validate()?;
    let mut errors = FieldErrors::new();
    errors.push(validate::max_length(&input.commentaire, "commentaire", CONTENU_MAX_LEN));
    errors.into_result()?;

    let mut tx = pool.begin().await?;
    let current = phase::lock(&mut *tx, phase_id, LockMode::Share).await?;
    rules::check_judgment(&current, ModeScrutin::Notation)?;
    let note = judgment::upsert_note(&mut *tx, phase_id, actor.user_id, input).await?;
    audit::log(
        &mut *tx,
        actor.user_id,
        "note.submitted",
        "phase",
        phase_id,
        json!({ "note": note.note }),
    )
    .await?;
    tx.commit().await?;

    log::debug!("Note on phase #{phase_id} recorded for user {}", actor.user_id);
    Ok(note)
}

/// Post a comment on a dossier under review. A comment tied to a phase
/// requires that phase to be open; the phase stays share-locked until the
/// comment is committed.
pub async fn add_comment(
    pool: &PgPool,
    actor: &Actor,
    new: &NewCommentaire,
) -> Result<Commentaire, AppError> {
    actor.require_permission(perm::COMMENT_WRITE)?;
    let mut errors = FieldErrors::new();
    errors.push(validate::required(&new.contenu, "contenu", CONTENU_MAX_LEN));
    errors.into_result()?;

    let target = dossier::find_by_id(pool, new.dossier_id)
        .await?
        .ok_or(AppError::NotFound)?;
    crate::auth::abac::require_view_dossier(actor, &target)?;

    let mut tx = pool.begin().await?;
    let statut = dossier::share_status(&mut *tx, target.id).await?;
    if statut.is_terminal() {
        return Err(AppError::Validation(format!(
            "dossier {} is {statut} and no longer open for comments",
            target.numero_dossier
        )));
    }

    if let Some(phase_id) = new.phase_id {
        let p = phase::lock(&mut *tx, phase_id, LockMode::Share).await?;
        if p.dossier_id != target.id {
            return Err(AppError::Validation(format!(
                "phase #{phase_id} does not belong to dossier #{}",
                target.id
            )));
        }
        if !p.is_active() {
            return Err(AppError::PhaseClosed(phase_id));
        }
    }

    let created = commentaire::create(&mut *tx, actor.user_id, new).await?;
    audit::log(
        &mut *tx,
        actor.user_id,
        "commentaire.created",
        "dossier",
        target.id,
        json!({ "commentaireId": created.id, "phaseId": created.phase_id }),
    )
    .await?;
    tx.commit().await?;

    log::debug!("Comment #{} on dossier #{} by {}", created.id, target.id, actor.username);
    Ok(created)
}

/// Tell the depositor their dossier changed status.
async fn announce_status(pool: &PgPool, conn_map: &ConnectionMap, d: &Dossier, from: DossierStatus) {
    let msg = format!(
        "Le dossier {} est passé de {} à {}",
        d.numero_dossier, from, d.statut
    );
    let target = Target { dossier_id: Some(d.id), phase_id: None };
    notify::notify_user(pool, conn_map, d.deposant_id, target, KIND_STATUT_CHANGE, &msg).await;
}
