//! Generic data access over any introspected table.

use crate::db::{Database, Record};
use crate::error::{AppError, SchemaError};
use crate::schema::{SchemaIntrospector, TableMetadata, TableSchema, UpdateGrant};
use crate::sql::{self, Filter, QueryBuf};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies one row: a single primary-key value or every column of a composite key.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordKey {
    Id(Value),
    Composite(Vec<(String, Value)>),
}

impl RecordKey {
    /// Key value as JSON: the bare id, or an object of key columns.
    pub fn to_value(&self) -> Value {
        match self {
            RecordKey::Id(v) => v.clone(),
            RecordKey::Composite(parts) => Value::Object(parts.iter().cloned().collect()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// False when the input held nothing writable and no statement ran.
    pub success: bool,
    pub not_updated: Vec<String>,
}

pub struct GenericRepository {
    db: Arc<dyn Database>,
    schema: Arc<SchemaIntrospector>,
}

impl GenericRepository {
    pub fn new(db: Arc<dyn Database>, schema: Arc<SchemaIntrospector>) -> Self {
        GenericRepository { db, schema }
    }

    pub fn schema(&self) -> &SchemaIntrospector {
        &self.schema
    }

    /// Metadata and column classification, for validation ahead of create/update.
    pub async fn table(&self, table: &str) -> Result<Arc<TableSchema>, AppError> {
        self.schema.table(table).await
    }

    pub async fn all(&self, table: &str) -> Result<Vec<Record>, AppError> {
        self.all_where(table, &[]).await
    }

    /// Every row matching all `filters`, foreign keys joined to their labels.
    pub async fn all_where(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>, AppError> {
        let ts = self.schema.table(table).await?;
        let q = self.joined_select(&ts, filters, None).await?;
        self.db.fetch_all(&q).await
    }

    /// `Ok(None)` when no row has this key.
    pub async fn find(&self, table: &str, key: &RecordKey) -> Result<Option<Record>, AppError> {
        let ts = self.schema.table(table).await?;
        let filters: Vec<Filter> = key_filters(&ts.meta, key)?
            .into_iter()
            .map(|(c, v)| Filter::Eq(c, v))
            .collect();
        let q = self.joined_select(&ts, &filters, Some(1)).await?;
        self.db.fetch_optional(&q).await
    }

    /// First row whose `column` equals `value`, with the same labels as `find`.
    pub async fn find_by(
        &self,
        table: &str,
        column: &str,
        value: Value,
    ) -> Result<Option<Record>, AppError> {
        let ts = self.schema.table(table).await?;
        let filters = [Filter::Eq(column.to_string(), value)];
        let q = self.joined_select(&ts, &filters, Some(1)).await?;
        self.db.fetch_optional(&q).await
    }

    /// Inserts the fillable subset of `data` atomically and returns the new row's key.
    pub async fn create(&self, table: &str, data: &Record) -> Result<RecordKey, AppError> {
        let ts = self.schema.table(table).await?;
        let q = sql::insert(&ts.meta, &ts.columns.fillable, data)?;
        let inserted = self.db.insert_atomic(&q).await?;
        let pk = ts.meta.primary_key();
        let key = match pk.as_slice() {
            [] => RecordKey::Id(Value::from(inserted)),
            [only] if only.is_auto_increment() => RecordKey::Id(Value::from(inserted)),
            [only] => RecordKey::Id(data.get(&only.name).cloned().unwrap_or(Value::Null)),
            many => RecordKey::Composite(
                many.iter()
                    .map(|c| (c.name.clone(), data.get(&c.name).cloned().unwrap_or(Value::Null)))
                    .collect(),
            ),
        };
        tracing::info!(table = %table, key = %key.to_value(), "created");
        Ok(key)
    }

    /// Writes the writable subset of `data`; everything else is reported back, not rejected.
    pub async fn update(
        &self,
        table: &str,
        key: &RecordKey,
        data: &Record,
        grant: &UpdateGrant,
    ) -> Result<UpdateOutcome, AppError> {
        let ts = self.schema.table(table).await?;
        let key = key_filters(&ts.meta, key)?;
        let writable = ts.columns.writable(grant);
        let plan = sql::update(&ts.meta, &writable, &key, data)?;
        let Some(q) = plan.query else {
            tracing::debug!(table = %table, ignored = ?plan.not_updated, "nothing writable in update");
            return Ok(UpdateOutcome {
                success: false,
                not_updated: plan.not_updated,
            });
        };
        self.db.execute(&q).await?;
        Ok(UpdateOutcome {
            success: true,
            not_updated: plan.not_updated,
        })
    }

    /// True when a row was removed.
    pub async fn delete(&self, table: &str, key: &RecordKey) -> Result<bool, AppError> {
        let ts = self.schema.table(table).await?;
        let q = sql::delete(&ts.meta, &key_filters(&ts.meta, key)?)?;
        Ok(self.db.execute(&q).await? > 0)
    }

    async fn joined_select(
        &self,
        ts: &TableSchema,
        filters: &[Filter],
        limit: Option<u32>,
    ) -> Result<QueryBuf, AppError> {
        let mut targets = Vec::with_capacity(ts.columns.foreign_keys.len());
        for fk in ts.columns.foreign_keys.values() {
            targets.push(self.schema.table(&fk.table).await?);
        }
        let referenced: HashMap<&str, &TableMetadata> = targets
            .iter()
            .map(|t| (t.meta.name.as_str(), &t.meta))
            .collect();
        let joins = sql::plan_joins(
            &ts.columns.all,
            &ts.columns.foreign_keys,
            self.schema.policy(),
            &referenced,
        );
        Ok(sql::select(&ts.meta, &ts.columns.all, &joins, filters, limit)?)
    }
}

/// Key columns and values in primary-key order. The key must name exactly the primary key.
pub fn key_filters(meta: &TableMetadata, key: &RecordKey) -> Result<Vec<(String, Value)>, AppError> {
    let pk = meta.primary_key();
    if pk.is_empty() {
        return Err(SchemaError::MissingPrimaryKey(meta.name.clone()).into());
    }
    match key {
        RecordKey::Id(v) if pk.len() == 1 => Ok(vec![(pk[0].name.clone(), v.clone())]),
        RecordKey::Id(_) => Err(AppError::BadRequest(format!(
            "{} is keyed by {} columns",
            meta.name,
            pk.len()
        ))),
        RecordKey::Composite(parts) => {
            if parts.len() != pk.len() {
                return Err(AppError::BadRequest(format!("incomplete key for {}", meta.name)));
            }
            pk.iter()
                .map(|c| {
                    parts
                        .iter()
                        .find(|(name, _)| *name == c.name)
                        .map(|(name, v)| (name.clone(), v.clone()))
                        .ok_or_else(|| AppError::BadRequest(format!("missing key column {}", c.name)))
                })
                .collect()
        }
    }
}
