//! Loads table metadata from `information_schema` and caches it for the life of the process.

use crate::db::Database;
use crate::error::{AppError, SchemaError};
use crate::schema::classify::{classify, ColumnClassification};
use crate::schema::metadata::TableMetadata;
use crate::schema::policy::SchemaPolicy;
use crate::sql::QueryBuf;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Column list joined with FK usage and a per-table primary-key column count.
pub(crate) const COLUMN_QUERY: &str = "\
SELECT \
c.column_name AS column_name, \
CAST(c.ordinal_position AS SIGNED) AS ordinal_position, \
c.column_default AS column_default, \
c.is_nullable AS is_nullable, \
c.data_type AS data_type, \
c.column_type AS column_type, \
CAST(c.character_maximum_length AS SIGNED) AS character_maximum_length, \
c.column_key AS column_key, \
c.extra AS extra, \
CAST(pk.pk_column_count AS SIGNED) AS pk_column_count, \
cu.referenced_table_name AS referenced_table_name, \
cu.referenced_column_name AS referenced_column_name \
FROM information_schema.columns c \
LEFT JOIN information_schema.key_column_usage cu \
ON c.table_schema = cu.table_schema \
AND c.table_name = cu.table_name \
AND c.column_name = cu.column_name \
AND cu.referenced_table_name IS NOT NULL \
LEFT JOIN (\
SELECT table_schema, table_name, COUNT(*) AS pk_column_count \
FROM information_schema.columns \
WHERE column_key = 'PRI' \
GROUP BY table_schema, table_name\
) pk \
ON c.table_schema = pk.table_schema \
AND c.table_name = pk.table_name \
WHERE c.table_schema = ? AND c.table_name = ? \
ORDER BY c.ordinal_position";

/// Metadata plus its derived column sets. Shared read-only behind an `Arc`.
#[derive(Debug)]
pub struct TableSchema {
    pub meta: TableMetadata,
    pub columns: ColumnClassification,
}

pub struct SchemaIntrospector {
    db: Arc<dyn Database>,
    catalog: String,
    policy: SchemaPolicy,
    /// No invalidation: a schema change needs a restart.
    cache: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl SchemaIntrospector {
    pub fn new(db: Arc<dyn Database>, catalog: impl Into<String>, policy: SchemaPolicy) -> Self {
        SchemaIntrospector {
            db,
            catalog: catalog.into(),
            policy,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn policy(&self) -> &SchemaPolicy {
        &self.policy
    }

    /// Cached schema for `table`, loading it on first use.
    pub async fn table(&self, table: &str) -> Result<Arc<TableSchema>, AppError> {
        if let Some(hit) = self.cached(table) {
            return Ok(hit);
        }
        tracing::debug!(table = %table, catalog = %self.catalog, "schema cache miss");
        let loaded = Arc::new(self.load(table).await?);
        // Two concurrent misses load the same thing; whichever lands first wins.
        let mut guard = self.cache.write().unwrap_or_else(|p| p.into_inner());
        Ok(guard.entry(table.to_string()).or_insert(loaded).clone())
    }

    /// Uncached load. Fails with `SchemaError::TableNotFound` when the catalog has no columns for `table`.
    pub async fn load(&self, table: &str) -> Result<TableSchema, AppError> {
        let q = QueryBuf {
            sql: COLUMN_QUERY.to_string(),
            params: vec![Value::String(self.catalog.clone()), Value::String(table.to_string())],
        };
        let rows = self.db.fetch_all(&q).await?;
        if rows.is_empty() {
            return Err(SchemaError::TableNotFound {
                table: table.to_string(),
                catalog: self.catalog.clone(),
            }
            .into());
        }
        let meta = TableMetadata::from_catalog_rows(table, &rows)?;
        let columns = classify(&meta, &self.policy);
        Ok(TableSchema { meta, columns })
    }

    /// Loads every table up front so a missing table aborts startup instead of a request.
    pub async fn preload(&self, tables: &[&str]) -> Result<(), AppError> {
        for table in tables {
            let schema = self.table(table).await?;
            tracing::info!(
                table = %table,
                columns = schema.meta.columns.len(),
                foreign_keys = schema.columns.foreign_keys.len(),
                "schema loaded"
            );
        }
        Ok(())
    }

    fn cached(&self, table: &str) -> Option<Arc<TableSchema>> {
        let guard = self.cache.read().unwrap_or_else(|p| p.into_inner());
        guard.get(table).cloned()
    }
}
