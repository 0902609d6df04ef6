//! Storefront API: session-authenticated REST backend over a schema-introspected MySQL catalog.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod resources;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AppConfig;
pub use db::{Database, MySqlDatabase, Record};
pub use error::{AppError, ConfigError, SchemaError};
pub use resources::Resource;
pub use response::{error_body, success_many, success_one};
pub use routes::app;
pub use schema::{SchemaIntrospector, SchemaPolicy};
pub use service::{GenericRepository, RecordKey, UpdateOutcome};
pub use state::AppState;
