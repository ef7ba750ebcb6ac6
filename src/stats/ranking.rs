//! Excellence view: filter and rank dossiers by their mean note.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::dossier::DossierStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tri {
    MoyenneAsc,
    MoyenneDesc,
    VotesAsc,
    VotesDesc,
    DateAsc,
    #[default]
    DateDesc,
}

/// A dossier enriched with its aggregated notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedDossier {
    pub dossier_id: i64,
    pub numero_dossier: String,
    pub titre: String,
    pub statut: DossierStatus,
    /// `None` while the dossier has no note.
    pub moyenne: Option<f64>,
    pub nombre_votes: i64,
    pub date_creation: DateTime<Utc>,
}

/// Query string of `GET /excellence`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingCriteria {
    pub seuil_min: Option<f64>,
    pub seuil_max: Option<f64>,
    pub min_votes: Option<i64>,
    pub top_n: Option<usize>,
    #[serde(default)]
    pub tri: Tri,
}

impl RankingCriteria {
    /// Thresholds must be finite and ordered.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [("seuil_min", self.seuil_min), ("seuil_max", self.seuil_max)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(AppError::Validation(format!("{name} must be a finite number")));
            }
        }
        if let (Some(min), Some(max)) = (self.seuil_min, self.seuil_max) {
            if min > max {
                return Err(AppError::Validation(format!(
                    "seuil_min ({min}) is greater than seuil_max ({max})"
                )));
            }
        }
        Ok(())
    }

    fn top_n(&self) -> Option<usize> {
        self.top_n.filter(|n| *n > 0)
    }

    fn uses_mean(&self) -> bool {
        self.seuil_min.is_some() || self.seuil_max.is_some() || self.top_n().is_some()
    }

    /// A positive top-N always ranks by descending mean, whatever `tri` says.
    pub fn effective_sort(&self) -> Tri {
        if self.top_n().is_some() {
            Tri::MoyenneDesc
        } else {
            self.tri
        }
    }

    fn accepts(&self, item: &RankedDossier) -> bool {
        if item.nombre_votes < self.min_votes.unwrap_or(0) {
            return false;
        }
        if !self.uses_mean() {
            return true;
        }
        let Some(moyenne) = item.moyenne else {
            return false;
        };
        self.seuil_min.is_none_or(|min| moyenne >= min) && self.seuil_max.is_none_or(|max| moyenne <= max)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub tri_effectif: Tri,
    pub items: Vec<RankedDossier>,
}

/// Missing means sort after every present mean, in both directions.
fn cmp_mean(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if descending => y.total_cmp(&x),
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(tri: Tri, a: &RankedDossier, b: &RankedDossier) -> Ordering {
    let primary = match tri {
        Tri::MoyenneAsc => cmp_mean(a.moyenne, b.moyenne, false),
        Tri::MoyenneDesc => cmp_mean(a.moyenne, b.moyenne, true),
        Tri::VotesAsc => a.nombre_votes.cmp(&b.nombre_votes),
        Tri::VotesDesc => b.nombre_votes.cmp(&a.nombre_votes),
        Tri::DateAsc => a.date_creation.cmp(&b.date_creation),
        Tri::DateDesc => b.date_creation.cmp(&a.date_creation),
    };
    primary.then(a.dossier_id.cmp(&b.dossier_id))
}

pub fn rank(items: Vec<RankedDossier>, criteria: &RankingCriteria) -> Ranking {
    let tri = criteria.effective_sort();
    let mut selected: Vec<RankedDossier> = items.into_iter().filter(|d| criteria.accepts(d)).collect();
    selected.sort_by(|a, b| compare(tri, a, b));
    if let Some(n) = criteria.top_n() {
        selected.truncate(n);
    }
    Ranking { tri_effectif: tri, items: selected }
}
