//! Resource CRUD routes under `/private`.
//!
//! Each resource gets its own static prefix with the descriptor attached as an extension;
//! a single `/:resource` pattern would collide with the nested stock routes.

use crate::handlers::{entity, stock};
use crate::resources::{Resource, RESOURCES};
use crate::state::AppState;
use axum::{routing::get, Extension, Router};

fn resource_routes(resource: &'static Resource) -> Router<AppState> {
    Router::new()
        .route(
            &format!("/private/{}", resource.path),
            get(entity::list).post(entity::create),
        )
        .route(
            &format!("/private/{}/:id", resource.path),
            get(entity::read)
                .put(entity::update)
                .patch(entity::update)
                .delete(entity::delete),
        )
        .layer(Extension(resource))
}

pub fn entity_routes() -> Router<AppState> {
    RESOURCES
        .iter()
        .copied()
        .fold(Router::new(), |router, resource| router.merge(resource_routes(resource)))
        .route("/private/producto/:id/stock", get(stock::list).post(stock::create))
        .route(
            "/private/producto/:id/stock/:talla_id",
            get(stock::read)
                .put(stock::update)
                .patch(stock::update)
                .delete(stock::delete),
        )
}
