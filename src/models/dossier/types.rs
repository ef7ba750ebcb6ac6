use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DossierStatus {
    Soumis,
    Incomplet,
    Complet,
    EnCours,
    Approuve,
    Rejete,
}

impl DossierStatus {
    pub const ALL: [DossierStatus; 6] = [
        DossierStatus::Soumis,
        DossierStatus::Incomplet,
        DossierStatus::Complet,
        DossierStatus::EnCours,
        DossierStatus::Approuve,
        DossierStatus::Rejete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DossierStatus::Soumis => "SOUMIS",
            DossierStatus::Incomplet => "INCOMPLET",
            DossierStatus::Complet => "COMPLET",
            DossierStatus::EnCours => "EN_COURS",
            DossierStatus::Approuve => "APPROUVE",
            DossierStatus::Rejete => "REJETE",
        }
    }

    /// APPROUVE and REJETE accept no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, DossierStatus::Approuve | DossierStatus::Rejete)
    }
}

impl fmt::Display for DossierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DossierStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DossierStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown dossier status '{s}'"))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dossier {
    pub id: i64,
    pub numero_dossier: String,
    pub titre: String,
    pub description: String,
    pub statut: DossierStatus,
    pub deposant_id: i64,
    pub deposant_nom: String,
    pub date_creation: DateTime<Utc>,
    pub date_modification: DateTime<Utc>,
}

/// Body of `POST /dossiers`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDossier {
    pub titre: String,
    #[serde(default)]
    pub description: String,
}

/// List filter for `GET /dossiers`.
#[derive(Debug, Clone, Default)]
pub struct DossierFilter {
    pub statut: Option<DossierStatus>,
    /// Restrict to one depositor's dossiers.
    pub deposant_id: Option<i64>,
}
