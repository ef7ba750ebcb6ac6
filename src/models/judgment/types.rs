use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

pub const NOTE_MIN: f64 = 0.0;
pub const NOTE_MAX: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Favorable,
    Defavorable,
    ComplementRequis,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Favorable => "FAVORABLE",
            Decision::Defavorable => "DEFAVORABLE",
            Decision::ComplementRequis => "COMPLEMENT_REQUIS",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FAVORABLE" => Ok(Decision::Favorable),
            "DEFAVORABLE" => Ok(Decision::Defavorable),
            "COMPLEMENT_REQUIS" => Ok(Decision::ComplementRequis),
            other => Err(format!("unknown decision '{other}'")),
        }
    }
}

/// A committee member's categorical judgment in a DECISION-mode vote phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: i64,
    pub phase_id: i64,
    pub utilisateur_id: i64,
    pub utilisateur_nom: String,
    pub decision: Decision,
    pub commentaire: String,
    pub date_creation: DateTime<Utc>,
    pub date_modification: DateTime<Utc>,
}

/// A committee member's 0-20 score in a NOTATION-mode vote phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub phase_id: i64,
    pub utilisateur_id: i64,
    pub utilisateur_nom: String,
    pub note: f64,
    pub commentaire: String,
    pub date_creation: DateTime<Utc>,
    pub date_modification: DateTime<Utc>,
}

/// Body of `PUT /phases/{id}/votes`.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteInput {
    pub decision: Decision,
    #[serde(default)]
    pub commentaire: String,
}

/// Body of `PUT /phases/{id}/notes`.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteInput {
    pub note: f64,
    #[serde(default)]
    pub commentaire: String,
}

impl NoteInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.note.is_finite() || self.note < NOTE_MIN || self.note > NOTE_MAX {
            return Err(AppError::Validation(format!(
                "note must be between {NOTE_MIN} and {NOTE_MAX}, got {}",
                self.note
            )));
        }
        Ok(())
    }
}

/// Everything recorded on one phase, whichever kind it collects.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseJudgments {
    pub votes: Vec<Vote>,
    pub notes: Vec<Note>,
}
