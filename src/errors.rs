use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::fmt;

use crate::models::dossier::DossierStatus;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Migrate(sqlx::migrate::MigrateError),
    Hash(String),
    Session(String),
    Internal(String),
    Unauthorized,
    PermissionDenied(String),
    NotFound,
    Validation(String),
    IllegalTransition { from: DossierStatus, to: DossierStatus },
    PhaseAlreadyActive(i64),
    PhaseClosed(i64),
}

/// JSON error body returned by every failing API call.
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Db(_)
            | AppError::Migrate(_)
            | AppError::Hash(_)
            | AppError::Session(_)
            | AppError::Internal(_) => "InternalError",
            AppError::Unauthorized => "Unauthorized",
            AppError::PermissionDenied(_) => "Forbidden",
            AppError::NotFound => "NotFound",
            AppError::Validation(_) => "ValidationError",
            AppError::IllegalTransition { .. } => "IllegalTransition",
            AppError::PhaseAlreadyActive(_) => "PhaseAlreadyActive",
            AppError::PhaseClosed(_) => "PhaseClosed",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Migrate(e) => write!(f, "Migration error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::Internal(e) => write!(f, "Internal error: {e}"),
            AppError::Unauthorized => write!(f, "Authentication required"),
            AppError::PermissionDenied(what) => write!(f, "Permission denied: {what}"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::Validation(msg) => write!(f, "Validation failed: {msg}"),
            AppError::IllegalTransition { from, to } => {
                write!(f, "Illegal status transition: {from} -> {to}")
            }
            AppError::PhaseAlreadyActive(dossier_id) => {
                write!(f, "Dossier #{dossier_id} already has an active phase")
            }
            AppError::PhaseClosed(phase_id) => write!(f, "Phase #{phase_id} is closed"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::IllegalTransition { .. }
            | AppError::PhaseAlreadyActive(_)
            | AppError::PhaseClosed(_) => StatusCode::CONFLICT,
            AppError::Db(_)
            | AppError::Migrate(_)
            | AppError::Hash(_)
            | AppError::Session(_)
            | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let details = if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{self}");
            None
        } else {
            Some(self.to_string())
        };
        HttpResponse::build(status).json(ApiErrorResponse {
            error: self.code().to_string(),
            details,
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::Db(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Migrate(e)
    }
}

/// True when a database error is a unique-constraint violation on `constraint`.
pub fn is_unique_violation(e: &sqlx::Error, constraint: &str) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint().is_some_and(|c| c == constraint)
        }
        _ => false,
    }
}
