//! Shared application state for all routes. Schema metadata is loaded once and never reloaded.

use crate::config::AppConfig;
use crate::db::Database;
use crate::schema::{SchemaIntrospector, SchemaPolicy};
use crate::service::GenericRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub repo: Arc<GenericRepository>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, config: AppConfig, policy: SchemaPolicy) -> Self {
        let schema = Arc::new(SchemaIntrospector::new(db.clone(), config.catalog.clone(), policy));
        AppState {
            repo: Arc::new(GenericRepository::new(db.clone(), schema)),
            db,
            config: Arc::new(config),
        }
    }
}
