//! Session-backed request context for private routes.

use super::Actor;
use crate::db::Record;
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session key holding the signed-in user.
pub const SESSION_KEY: &str = "usuario";

/// Fields never returned by `/me` or login.
const PRIVATE_PROFILE_FIELDS: [&str; 3] = ["rol_id", "activo", "id"];

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// What the session stores for a signed-in user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub actor: Actor,
    /// User row without credentials.
    pub profile: Record,
    /// Unix seconds of the last authenticated request.
    pub last_activity: i64,
}

impl SessionUser {
    pub fn new(actor: Actor, profile: Record) -> Self {
        SessionUser {
            actor,
            profile,
            last_activity: now_secs(),
        }
    }

    pub fn is_expired(&self, now: i64, timeout_secs: i64) -> bool {
        now - self.last_activity > timeout_secs
    }

    /// Profile as shown to its owner.
    pub fn public_profile(&self) -> Record {
        let mut out = self.profile.clone();
        for field in PRIVATE_PROFILE_FIELDS {
            out.remove(field);
        }
        out
    }
}

/// Authenticated actor for the current request. Extracting it rejects with 401 when no one
/// is signed in and 440 when the session went idle too long; otherwise it refreshes the
/// activity timestamp.
pub struct RequestContext {
    pub actor: Actor,
    pub user: SessionUser,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Session(msg.to_string()))?;
        let Some(mut user) = session.get::<SessionUser>(SESSION_KEY).await? else {
            return Err(AppError::Unauthorized("sign in required".into()));
        };
        let now = now_secs();
        if user.is_expired(now, state.config.session_timeout_secs) {
            tracing::info!(user = user.actor.id, "session expired");
            session.flush().await?;
            return Err(AppError::SessionExpired);
        }
        user.last_activity = now;
        session.insert(SESSION_KEY, &user).await?;
        Ok(RequestContext {
            actor: user.actor,
            user,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::testing::record;
    use serde_json::json;

    fn user() -> SessionUser {
        SessionUser {
            actor: Actor {
                id: 3,
                role: Role::Editor,
                client_id: None,
            },
            profile: record(json!({"id": 3, "nombre": "Ana", "rol_id": 2, "activo": 1, "email": "ana@tienda.cl"})),
            last_activity: 1_000,
        }
    }

    #[test]
    fn expiry_is_strictly_after_timeout() {
        let u = user();
        assert!(!u.is_expired(2_800, 1_800));
        assert!(u.is_expired(2_801, 1_800));
    }

    #[test]
    fn public_profile_hides_identity_columns() {
        let p = user().public_profile();
        assert_eq!(p.len(), 2);
        assert!(p.contains_key("email") && p.contains_key("nombre"));
    }
}
