//! Dossier review workflow: the status graph and the transactional
//! operations that enforce it.

pub mod controller;
pub mod rules;

pub use controller::{
    PhaseClosure, PhaseStarted, add_comment, change_status, close_phase, extend_phase, start_phase,
    submit_note, submit_vote,
};
