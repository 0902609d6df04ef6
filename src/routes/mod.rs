//! Router assembly: route groups plus the session, body-limit and tracing layers.

mod auth;
mod common;
mod entity;

pub use auth::auth_routes;
pub use common::common_routes;
pub use entity::entity_routes;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::AppState;
use axum::Router;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

const MAX_BODY_BYTES: usize = 1024 * 1024;
const SESSION_COOKIE: &str = "storefront_session";

fn session_layer(config: &AppConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Strict)
        .with_secure(config.cookie_secure)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            config.session_timeout_secs,
        )))
}

async fn not_found() -> AppError {
    AppError::NotFound("route".into())
}

/// The complete application.
pub fn app(state: AppState) -> Router {
    let sessions = session_layer(&state.config);
    Router::new()
        .merge(common_routes())
        .merge(auth_routes())
        .merge(entity_routes())
        .fallback(not_found)
        .layer(sessions)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
