//! Statistics, Excellence ranking, scheduler and notification tests.

mod common;

use comite::config::WorkflowConfig;
use comite::errors::AppError;
use comite::handlers::api_v1::page_params;
use comite::models::dossier::{self, DossierFilter, DossierStatus};
use comite::models::judgment::NoteInput;
use comite::models::notification::{self, KIND_PHASE_EN_RETARD};
use comite::models::phase::{ModeScrutin, NewPhase, PhaseType};
use comite::notify::{ConnectionMap, new_connection_map};
use comite::scheduler;
use comite::stats::queries;
use comite::stats::ranking::{RankingCriteria, Tri, rank};
use comite::workflow;
use common::*;
use sqlx::PgPool;

// --- Helpers ---

/// Take a fresh dossier through review with the given notes; returns its id.
async fn scored_dossier(pool: &PgPool, map: &ConnectionMap, cast: &Cast, titre: &str, notes: &[f64]) -> i64 {
    let id = create_dossier(pool, &cast.deposant, titre).await;
    workflow::change_status(pool, map, &cast.receptionniste, id, DossierStatus::Complet)
        .await
        .unwrap();
    let new = NewPhase {
        type_phase: PhaseType::Vote,
        description: String::new(),
        mode_scrutin: Some(ModeScrutin::Notation),
        duree_jours: None,
    };
    let started = workflow::start_phase(pool, map, WorkflowConfig::default(), &cast.coordinateur, id, &new)
        .await
        .unwrap();
    for (membre, &value) in cast.membres.iter().zip(notes) {
        let input = NoteInput {
            note: value,
            commentaire: String::new(),
        };
        workflow::submit_note(pool, membre, started.phase.id, &input).await.unwrap();
    }
    workflow::close_phase(pool, &cast.coordinateur, started.phase.id).await.unwrap();
    id
}

// --- Statistics ---

#[tokio::test]
async fn test_global_statistics() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let map = new_connection_map();
    let cast = create_cast(pool).await;

    scored_dossier(pool, &map, &cast, "A", &[12.0, 16.0, 20.0]).await;
    create_dossier(pool, &cast.deposant, "B").await;

    let stats = queries::global(pool).await.unwrap();
    assert_eq!(stats.total_dossiers, 2);
    assert_eq!(stats.dossiers_par_statut.len(), DossierStatus::ALL.len());
    let count_of = |s: DossierStatus| {
        stats.dossiers_par_statut.iter().find(|c| c.statut == s).unwrap().nombre
    };
    assert_eq!(count_of(DossierStatus::EnCours), 1);
    assert_eq!(count_of(DossierStatus::Soumis), 1);
    assert_eq!(count_of(DossierStatus::Approuve), 0);
    assert_eq!(stats.phases_actives, 0);
    assert_eq!(stats.total_jugements, 3);
    assert_eq!(stats.notes.moyenne, Some(16.0));
    assert_eq!(stats.notes.repartition.excellent, 2);
    assert_eq!(stats.notes.repartition.bon, 1);
}

#[tokio::test]
async fn test_empty_statistics_have_no_mean() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let stats = queries::global(pool).await.unwrap();
    assert_eq!(stats.total_dossiers, 0);
    assert_eq!(stats.notes.count, 0);
    assert_eq!(stats.notes.moyenne, None);
    let json = serde_json::to_value(&stats).unwrap();
    assert!(json["notes"]["moyenne"].is_null());
}

#[tokio::test]
async fn test_dossier_statistics_cover_vote_phases() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let map = new_connection_map();
    let cast = create_cast(pool).await;

    let id = scored_dossier(pool, &map, &cast, "A", &[10.0, 14.0]).await;
    let stats = queries::for_dossier(pool, id).await.unwrap();
    assert_eq!(stats.dossier_id, id);
    assert_eq!(stats.phases.len(), 1);
    assert!(stats.phases[0].cloturee);
    assert_eq!(stats.notes.moyenne, Some(12.0));
    assert_eq!(stats.notes.min, Some(10.0));
}

// --- Excellence ---

#[tokio::test]
async fn test_excellence_thresholds_exclude_unscored() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let map = new_connection_map();
    let cast = create_cast(pool).await;

    scored_dossier(pool, &map, &cast, "dix", &[10.0]).await;
    scored_dossier(pool, &map, &cast, "quinze", &[15.0]).await;
    scored_dossier(pool, &map, &cast, "dix-huit", &[18.0]).await;
    create_dossier(pool, &cast.deposant, "sans note").await;

    let all = queries::ranked_dossiers(pool).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().any(|d| d.moyenne.is_none() && d.nombre_votes == 0));

    let criteria = RankingCriteria {
        seuil_min: Some(12.0),
        seuil_max: Some(20.0),
        min_votes: Some(1),
        tri: Tri::MoyenneAsc,
        ..Default::default()
    };
    let ranking = rank(all.clone(), &criteria);
    let titres: Vec<&str> = ranking.items.iter().map(|d| d.titre.as_str()).collect();
    assert_eq!(titres, vec!["quinze", "dix-huit"]);

    let top = rank(all, &RankingCriteria { top_n: Some(2), tri: Tri::DateAsc, ..Default::default() });
    assert_eq!(top.tri_effectif, Tri::MoyenneDesc);
    let means: Vec<Option<f64>> = top.items.iter().map(|d| d.moyenne).collect();
    assert_eq!(means, vec![Some(18.0), Some(15.0)]);
}

#[tokio::test]
async fn test_mean_spans_every_phase_of_a_dossier() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let map = new_connection_map();
    let cast = create_cast(pool).await;

    let id = scored_dossier(pool, &map, &cast, "deux tours", &[8.0, 10.0]).await;
    let new = NewPhase {
        type_phase: PhaseType::Vote,
        description: "Second tour".to_string(),
        mode_scrutin: None,
        duree_jours: Some(3),
    };
    let second = workflow::start_phase(pool, &map, WorkflowConfig::default(), &cast.coordinateur, id, &new)
        .await
        .unwrap();
    let input = NoteInput { note: 18.0, commentaire: String::new() };
    workflow::submit_note(pool, &cast.membres[0], second.phase.id, &input).await.unwrap();

    let ranked = queries::ranked_dossiers(pool).await.unwrap();
    let d = ranked.iter().find(|d| d.dossier_id == id).unwrap();
    assert_eq!(d.nombre_votes, 3);
    assert_eq!(d.moyenne, Some(12.0));
}

// --- Scheduler ---

#[tokio::test]
async fn test_overdue_phase_reminded_once() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let map = new_connection_map();
    let cast = create_cast(pool).await;

    let id = create_dossier(pool, &cast.deposant, "En retard").await;
    workflow::change_status(pool, &map, &cast.receptionniste, id, DossierStatus::Complet)
        .await
        .unwrap();
    let new = NewPhase {
        type_phase: PhaseType::Discussion,
        description: String::new(),
        mode_scrutin: None,
        duree_jours: Some(2),
    };
    let started = workflow::start_phase(pool, &map, WorkflowConfig::default(), &cast.coordinateur, id, &new)
        .await
        .unwrap();

    assert_eq!(scheduler::remind_overdue_phases(pool, &map).await.unwrap(), 0);

    sqlx::query("UPDATE phases SET date_debut = NOW() - INTERVAL '3 days' WHERE id = $1")
        .bind(started.phase.id)
        .execute(pool)
        .await
        .unwrap();

    assert_eq!(scheduler::remind_overdue_phases(pool, &map).await.unwrap(), 1);
    assert_eq!(scheduler::remind_overdue_phases(pool, &map).await.unwrap(), 0);

    let inbox = notification::find_for_user(pool, cast.coordinateur.user_id).await.unwrap();
    let reminders: Vec<_> = inbox.iter().filter(|n| n.kind == KIND_PHASE_EN_RETARD).collect();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].phase_id, Some(started.phase.id));
}

// --- Notifications ---

#[tokio::test]
async fn test_mark_read_is_owner_only() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let map = new_connection_map();
    let cast = create_cast(pool).await;

    let id = create_dossier(pool, &cast.deposant, "Projet").await;
    workflow::change_status(pool, &map, &cast.receptionniste, id, DossierStatus::Complet)
        .await
        .unwrap();

    let inbox = notification::find_for_user(pool, cast.deposant.user_id).await.unwrap();
    let notification_id = inbox[0].id;
    assert_eq!(notification::count_unread(pool, cast.deposant.user_id).await.unwrap(), 1);

    let foreign = notification::mark_read(pool, cast.coordinateur.user_id, notification_id).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    notification::mark_read(pool, cast.deposant.user_id, notification_id).await.unwrap();
    assert_eq!(notification::count_unread(pool, cast.deposant.user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_live_push_reaches_connected_depositor() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let map = new_connection_map();
    let cast = create_cast(pool).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    comite::notify::register(&map, cast.deposant.user_id, tx);

    let id = create_dossier(pool, &cast.deposant, "Projet").await;
    workflow::change_status(pool, &map, &cast.receptionniste, id, DossierStatus::Incomplet)
        .await
        .unwrap();

    let pushed: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
    assert_eq!(pushed["type"], "notification");
    assert_eq!(pushed["dossierId"], id);
    assert_eq!(pushed["unreadCount"], 1);
}

// --- Listing ---

#[tokio::test]
async fn test_dossier_paging_and_scope() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let cast = create_cast(pool).await;
    let other = create_actor(pool, "autre_deposant", comite::models::user::Role::Deposant).await;

    for i in 0..5 {
        create_dossier(pool, &cast.deposant, &format!("Mien {i}")).await;
    }
    create_dossier(pool, &other, "Pas le mien").await;

    let all = DossierFilter::default();
    let (page1, total) = dossier::find_page(pool, &all, 1, 4).await.unwrap();
    assert_eq!(total, 6);
    assert_eq!(page1.len(), 4);
    let (page2, _) = dossier::find_page(pool, &all, 2, 4).await.unwrap();
    assert_eq!(page2.len(), 2);

    let mine = DossierFilter {
        statut: Some(DossierStatus::Soumis),
        deposant_id: Some(cast.deposant.user_id),
    };
    let (items, total) = dossier::find_page(pool, &mine, 1, 25).await.unwrap();
    assert_eq!(total, 5);
    assert!(items.iter().all(|d| d.deposant_id == cast.deposant.user_id));
    assert!(items.iter().all(|d| d.numero_dossier.starts_with("DOS-")));
}

#[tokio::test]
async fn test_far_pages_are_empty_or_rejected() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let cast = create_cast(pool).await;
    create_dossier(pool, &cast.deposant, "Seul").await;
    let all = DossierFilter::default();

    let (page, per_page) = page_params(Some(i64::MAX), Some(25));
    let (items, total) = dossier::find_page(pool, &all, page, per_page).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 1);

    let overflow = dossier::find_page(pool, &all, i64::MAX, 25).await;
    assert!(matches!(overflow, Err(AppError::Validation(_))));
}
