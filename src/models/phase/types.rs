use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseType {
    Discussion,
    Vote,
}

impl PhaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseType::Discussion => "DISCUSSION",
            PhaseType::Vote => "VOTE",
        }
    }
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISCUSSION" => Ok(PhaseType::Discussion),
            "VOTE" => Ok(PhaseType::Vote),
            other => Err(format!("unknown phase type '{other}'")),
        }
    }
}

/// What a VOTE phase collects: categorical votes or 0-20 notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModeScrutin {
    Decision,
    Notation,
}

impl ModeScrutin {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeScrutin::Decision => "DECISION",
            ModeScrutin::Notation => "NOTATION",
        }
    }
}

impl FromStr for ModeScrutin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DECISION" => Ok(ModeScrutin::Decision),
            "NOTATION" => Ok(ModeScrutin::Notation),
            other => Err(format!("unknown scrutin mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: i64,
    pub dossier_id: i64,
    #[serde(rename = "type")]
    pub type_phase: PhaseType,
    /// `None` for DISCUSSION phases.
    pub mode_scrutin: Option<ModeScrutin>,
    pub description: String,
    pub date_debut: DateTime<Utc>,
    pub date_fin: Option<DateTime<Utc>>,
    pub duree_jours: i32,
}

impl Phase {
    pub fn is_active(&self) -> bool {
        self.date_fin.is_none()
    }

    /// Advisory deadline; nothing closes a phase automatically.
    pub fn date_limite(&self) -> DateTime<Utc> {
        Duration::try_days(i64::from(self.duree_jours))
            .and_then(|d| self.date_debut.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.date_limite()
    }
}

/// Body of `POST /dossiers/{id}/phases`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhase {
    #[serde(rename = "type")]
    pub type_phase: PhaseType,
    #[serde(default)]
    pub description: String,
    /// Only meaningful for VOTE phases; defaults to NOTATION.
    #[serde(default)]
    pub mode_scrutin: Option<ModeScrutin>,
    #[serde(default)]
    pub duree_jours: Option<i32>,
}
