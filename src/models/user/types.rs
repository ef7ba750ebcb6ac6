use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission codes checked by handlers and the workflow controller.
pub mod perm {
    pub const USER_MANAGE: &str = "user.manage";
    pub const DOSSIER_CREATE: &str = "dossier.create";
    pub const DOSSIER_VIEW_ALL: &str = "dossier.view_all";
    /// Completeness check: SOUMIS -> COMPLET / INCOMPLET.
    pub const DOSSIER_CHECK: &str = "dossier.check";
    /// Review start and final decision: COMPLET -> EN_COURS, EN_COURS -> APPROUVE / REJETE.
    pub const DOSSIER_DECIDE: &str = "dossier.decide";
    pub const PHASE_MANAGE: &str = "phase.manage";
    pub const JUDGMENT_SUBMIT: &str = "judgment.submit";
    pub const STATS_VIEW: &str = "stats.view";
    pub const EXCELLENCE_VIEW: &str = "excellence.view";
    pub const COMMENT_WRITE: &str = "comment.write";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Coordinateur,
    Receptionniste,
    MembreComite,
    Deposant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Coordinateur => "COORDINATEUR",
            Role::Receptionniste => "RECEPTIONNISTE",
            Role::MembreComite => "MEMBRE_COMITE",
            Role::Deposant => "DEPOSANT",
        }
    }

    pub fn permissions(self) -> &'static [&'static str] {
        use perm::*;
        match self {
            Role::Admin => &[
                USER_MANAGE,
                DOSSIER_CREATE,
                DOSSIER_VIEW_ALL,
                STATS_VIEW,
                EXCELLENCE_VIEW,
                COMMENT_WRITE,
            ],
            Role::Coordinateur => &[
                DOSSIER_VIEW_ALL,
                DOSSIER_CHECK,
                DOSSIER_DECIDE,
                PHASE_MANAGE,
                JUDGMENT_SUBMIT,
                STATS_VIEW,
                EXCELLENCE_VIEW,
                COMMENT_WRITE,
            ],
            Role::Receptionniste => &[DOSSIER_VIEW_ALL, DOSSIER_CHECK, STATS_VIEW, COMMENT_WRITE],
            Role::MembreComite => &[DOSSIER_VIEW_ALL, JUDGMENT_SUBMIT, STATS_VIEW, COMMENT_WRITE],
            Role::Deposant => &[DOSSIER_CREATE],
        }
    }

    pub fn has(self, code: &str) -> bool {
        self.permissions().contains(&code)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "COORDINATEUR" => Ok(Role::Coordinateur),
            "RECEPTIONNISTE" => Ok(Role::Receptionniste),
            "MEMBRE_COMITE" => Ok(Role::MembreComite),
            "DEPOSANT" => Ok(Role::Deposant),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Full user row, including the password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub nom: String,
    pub email: String,
    pub role: Role,
}

/// User as exposed by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDisplay {
    pub id: i64,
    pub username: String,
    pub nom: String,
    pub email: String,
    pub role: Role,
    pub date_creation: DateTime<Utc>,
}

/// Insert payload; `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub nom: String,
    pub email: String,
    pub role: Role,
}
