//! Database collaborator: the narrow interface the data-access core executes through,
//! and its MySQL implementation.

use crate::error::AppError;
use crate::sql::{bind_all, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlPool, MySqlRow};

/// One result row, column name → JSON value.
pub type Record = serde_json::Map<String, Value>;

#[async_trait]
pub trait Database: Send + Sync {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Record>, AppError>;

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Record>, AppError> {
        Ok(self.fetch_all(q).await?.into_iter().next())
    }

    /// Rows affected.
    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError>;

    /// Runs an INSERT inside its own transaction and returns the generated identity
    /// (0 when the table has none). Nothing is committed on failure.
    async fn insert_atomic(&self, q: &QueryBuf) -> Result<u64, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MySqlDatabase {
    pool: MySqlPool,
}

impl MySqlDatabase {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlDatabase { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl Database for MySqlDatabase {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let done = bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(done.rows_affected())
    }

    async fn insert_atomic(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "insert (tx)");
        let mut tx = self.pool.begin().await?;
        match bind_all(sqlx::query(&q.sql), &q.params).execute(&mut *tx).await {
            Ok(done) => {
                let id = done.last_insert_id();
                tx.commit().await?;
                Ok(id)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(map_db_error(e))
            }
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Constraint violations become domain errors; everything else stays a persistence error.
pub fn map_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            tracing::debug!(detail = %db.message(), "unique violation");
            return AppError::Conflict("record already exists".into());
        }
        if db.is_foreign_key_violation() {
            tracing::debug!(detail = %db.message(), "foreign key violation");
            return AppError::BadRequest("referenced record does not exist or is still referenced".into());
        }
    }
    AppError::Db(e)
}

fn row_to_record(row: &MySqlRow) -> Record {
    use sqlx::{Column, Row};
    let mut map = Record::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

/// Decimals come back as strings so no precision is lost on the way to JSON.
fn cell_to_value(row: &MySqlRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<u64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(d)) = row.try_get::<Option<rust_decimal::Decimal>, _>(name) {
        return Value::String(d.to_string());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(t)) = row.try_get::<Option<chrono::NaiveTime>, _>(name) {
        return Value::String(t.format("%H:%M:%S").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    // Catalog columns sometimes arrive as binary strings.
    if let Ok(Some(b)) = row.try_get::<Option<Vec<u8>>, _>(name) {
        return Value::String(String::from_utf8_lossy(&b).into_owned());
    }
    Value::Null
}
