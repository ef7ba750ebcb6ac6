//! Vote and note aggregation.
//!
//! Everything here is a pure function over in-memory judgments: results are
//! recomputed on each read and never stored. Vote tallies are informational
//! only; no pass/fail rule is derived from them.

use serde::Serialize;

use crate::models::judgment::{Decision, PhaseJudgments};
use crate::models::phase::{ModeScrutin, Phase, PhaseType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub favorable: usize,
    pub defavorable: usize,
    pub complement_requis: usize,
    pub total: usize,
}

pub fn tally_votes<I>(decisions: I) -> VoteTally
where
    I: IntoIterator<Item = Decision>,
{
    decisions
        .into_iter()
        .fold(VoteTally::default(), |mut tally, decision| {
            match decision {
                Decision::Favorable => tally.favorable += 1,
                Decision::Defavorable => tally.defavorable += 1,
                Decision::ComplementRequis => tally.complement_requis += 1,
            }
            tally.total += 1;
            tally
        })
}

/// Qualitative band of a 0-20 note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Band {
    /// >= 16
    Excellent,
    /// [12, 16)
    Bon,
    /// [8, 12)
    Passable,
    /// < 8
    Insuffisant,
}

impl Band {
    pub fn of(note: f64) -> Band {
        if note >= 16.0 {
            Band::Excellent
        } else if note >= 12.0 {
            Band::Bon
        } else if note >= 8.0 {
            Band::Passable
        } else {
            Band::Insuffisant
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandDistribution {
    pub excellent: usize,
    pub bon: usize,
    pub passable: usize,
    pub insuffisant: usize,
}

/// Summary of a set of notes. On an empty set `moyenne`, `min` and `max` are
/// `None` (serialized as `null`), never NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub count: usize,
    pub moyenne: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub repartition: BandDistribution,
}

pub fn summarize_notes(values: &[f64]) -> NoteSummary {
    let mut summary = NoteSummary::default();
    let mut sum = 0.0;

    for &note in values.iter().filter(|v| v.is_finite()) {
        summary.count += 1;
        sum += note;
        summary.min = Some(summary.min.map_or(note, |m| m.min(note)));
        summary.max = Some(summary.max.map_or(note, |m| m.max(note)));
        match Band::of(note) {
            Band::Excellent => summary.repartition.excellent += 1,
            Band::Bon => summary.repartition.bon += 1,
            Band::Passable => summary.repartition.passable += 1,
            Band::Insuffisant => summary.repartition.insuffisant += 1,
        }
    }

    if summary.count > 0 {
        summary.moyenne = Some(sum / summary.count as f64);
    }
    summary
}

/// Aggregated outcome of one phase. Which of `votes` / `notes` is present
/// depends on the phase type and scrutin mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseResults {
    pub phase_id: i64,
    #[serde(rename = "type")]
    pub type_phase: PhaseType,
    pub mode_scrutin: Option<ModeScrutin>,
    pub cloturee: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<VoteTally>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<NoteSummary>,
}

pub fn phase_results(phase: &Phase, judgments: &PhaseJudgments) -> PhaseResults {
    let (votes, notes) = match (phase.type_phase, phase.mode_scrutin) {
        (PhaseType::Vote, Some(ModeScrutin::Decision)) => {
            (Some(tally_votes(judgments.votes.iter().map(|v| v.decision))), None)
        }
        (PhaseType::Vote, _) => {
            let values: Vec<f64> = judgments.notes.iter().map(|n| n.note).collect();
            (None, Some(summarize_notes(&values)))
        }
        (PhaseType::Discussion, _) => (None, None),
    };

    PhaseResults {
        phase_id: phase.id,
        type_phase: phase.type_phase,
        mode_scrutin: phase.mode_scrutin,
        cloturee: !phase.is_active(),
        votes,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn mean_of_12_16_20_is_16() {
        let notes = [12.0, 16.0, 20.0];
        let first = summarize_notes(&notes);
        assert_eq!(first.moyenne, Some(16.0));
        assert_eq!(first.min, Some(12.0));
        assert_eq!(first.max, Some(20.0));
        assert_eq!(first.count, 3);
        // Recomputing is idempotent.
        assert_eq!(summarize_notes(&notes), first);
    }

    #[test]
    fn empty_notes_have_no_mean() {
        let s = summarize_notes(&[]);
        assert_eq!(s.count, 0);
        assert_eq!(s.moyenne, None);
        assert_eq!(s.min, None);
        assert_eq!(s.max, None);
        assert_eq!(s.repartition, BandDistribution::default());
        let json = serde_json::to_value(s).unwrap();
        assert!(json["moyenne"].is_null());
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(Band::of(16.0), Band::Excellent);
        assert_eq!(Band::of(15.99), Band::Bon);
        assert_eq!(Band::of(12.0), Band::Bon);
        assert_eq!(Band::of(11.5), Band::Passable);
        assert_eq!(Band::of(8.0), Band::Passable);
        assert_eq!(Band::of(7.99), Band::Insuffisant);
        assert_eq!(Band::of(0.0), Band::Insuffisant);
    }

    #[test]
    fn distribution_counts_each_band() {
        let s = summarize_notes(&[18.0, 16.0, 13.0, 9.0, 2.0, 7.5]);
        assert_eq!(
            s.repartition,
            BandDistribution { excellent: 2, bon: 1, passable: 1, insuffisant: 2 }
        );
    }

    #[test]
    fn tally_counts_each_decision() {
        let t = tally_votes([
            Decision::Favorable,
            Decision::Favorable,
            Decision::Defavorable,
            Decision::ComplementRequis,
        ]);
        assert_eq!(
            t,
            VoteTally { favorable: 2, defavorable: 1, complement_requis: 1, total: 4 }
        );
        assert_eq!(tally_votes(std::iter::empty()), VoteTally::default());
    }

    fn phase(type_phase: PhaseType, mode: Option<ModeScrutin>) -> Phase {
        Phase {
            id: 4,
            dossier_id: 1,
            type_phase,
            mode_scrutin: mode,
            description: String::new(),
            date_debut: Utc::now(),
            date_fin: Some(Utc::now()),
            duree_jours: 7,
        }
    }

    #[test]
    fn phase_results_follow_scrutin_mode() {
        let empty = PhaseJudgments { votes: vec![], notes: vec![] };

        let r = phase_results(&phase(PhaseType::Vote, Some(ModeScrutin::Notation)), &empty);
        assert!(r.cloturee);
        assert!(r.votes.is_none());
        assert_eq!(r.notes.map(|n| n.count), Some(0));

        let r = phase_results(&phase(PhaseType::Vote, Some(ModeScrutin::Decision)), &empty);
        assert_eq!(r.votes, Some(VoteTally::default()));
        assert!(r.notes.is_none());

        let r = phase_results(&phase(PhaseType::Discussion, None), &empty);
        assert!(r.votes.is_none() && r.notes.is_none());
    }
}
