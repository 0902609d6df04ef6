//! Authentication routes and the API document.

use crate::handlers::{auth, docs};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/public/login", post(auth::login))
        .route("/public/register", post(auth::register))
        .route("/private/logout", post(auth::logout))
        .route("/private/me", get(auth::me))
        .route("/private/usuarios/me/unsubscribe", patch(auth::unsubscribe))
        .route("/api-docs.json", get(docs::openapi))
}
