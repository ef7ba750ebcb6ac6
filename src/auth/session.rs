use std::future::{Ready, ready};

use actix_session::{Session, SessionExt};
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::user::Role;

const KEY_USER_ID: &str = "user_id";
const KEY_USERNAME: &str = "username";
const KEY_ROLE: &str = "role";

/// The authenticated caller, rebuilt from the session on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn has(&self, code: &str) -> bool {
        self.role.has(code)
    }

    /// Check permission; returns Err(AppError) if denied.
    pub fn require_permission(&self, code: &str) -> Result<(), AppError> {
        if self.has(code) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(code.to_string()))
        }
    }

    pub fn require_any(&self, codes: &[&str]) -> Result<(), AppError> {
        if codes.iter().any(|c| self.has(c)) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(codes.join(" | ")))
        }
    }
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(KEY_USER_ID).unwrap_or(None)
}

/// Read the actor stored by [`store_actor`]. `Unauthorized` when absent.
pub fn get_actor(session: &Session) -> Result<Actor, AppError> {
    let user_id = get_user_id(session).ok_or(AppError::Unauthorized)?;
    let username = session
        .get::<String>(KEY_USERNAME)
        .map_err(|e| AppError::Session(e.to_string()))?
        .ok_or(AppError::Unauthorized)?;
    let role = session
        .get::<String>(KEY_ROLE)
        .map_err(|e| AppError::Session(e.to_string()))?
        .ok_or(AppError::Unauthorized)?
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized)?;
    Ok(Actor { user_id, username, role })
}

pub fn store_actor(session: &Session, actor: &Actor) -> Result<(), AppError> {
    session.renew();
    session
        .insert(KEY_USER_ID, actor.user_id)
        .and_then(|_| session.insert(KEY_USERNAME, &actor.username))
        .and_then(|_| session.insert(KEY_ROLE, actor.role.as_str()))
        .map_err(|e| AppError::Session(e.to_string()))
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(get_actor(&req.get_session()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::perm;

    fn actor(role: Role) -> Actor {
        Actor { user_id: 7, username: "u".into(), role }
    }

    #[test]
    fn permission_denied_names_the_code() {
        match actor(Role::MembreComite).require_permission(perm::DOSSIER_DECIDE) {
            Err(AppError::PermissionDenied(code)) => assert_eq!(code, "dossier.decide"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(actor(Role::Coordinateur).require_permission(perm::DOSSIER_DECIDE).is_ok());
    }

    #[test]
    fn require_any_accepts_one_match() {
        let a = actor(Role::Receptionniste);
        assert!(a.require_any(&[perm::DOSSIER_DECIDE, perm::DOSSIER_CHECK]).is_ok());
        assert!(a.require_any(&[perm::PHASE_MANAGE, perm::USER_MANAGE]).is_err());
    }
}
