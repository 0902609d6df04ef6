//! Generic CRUD handlers. The resource descriptor arrives as a route extension.

use crate::auth::{Action, Actor, RequestContext};
use crate::db::Record;
use crate::error::AppError;
use crate::resources::{ReadPath, Resource};
use crate::response::{message_only, success_many, success_one, success_one_ok};
use crate::schema::{TableMetadata, TypeClass};
use crate::service::{Mode, RecordKey, RequestValidator, UpdateOutcome};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::Value;
use std::collections::HashMap;

/// Request body as a JSON object; malformed JSON is a 400 in the envelope.
pub(crate) fn body_record(body: Result<Json<Value>, JsonRejection>) -> Result<Record, AppError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(Json(_)) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// Typed value for a key column given as a path segment.
pub(crate) fn key_value(meta: &TableMetadata, column: &str, raw: &str) -> Result<Value, AppError> {
    let col = meta.require_column(column)?;
    match col.type_class() {
        TypeClass::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| AppError::BadRequest(format!("invalid {}", column))),
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn simple_key(meta: &TableMetadata, raw: &str) -> Result<RecordKey, AppError> {
    match meta.primary_key().as_slice() {
        [only] => Ok(RecordKey::Id(key_value(meta, &only.name, raw)?)),
        _ => Err(AppError::BadRequest(format!("{} has no single-column key", meta.name))),
    }
}

/// Prices and hides columns on rows about to be returned.
pub(crate) async fn present(
    state: &AppState,
    resource: &Resource,
    actor: &Actor,
    rows: &mut [Record],
) -> Result<(), AppError> {
    if let ReadPath::Priced(rule) = resource.read {
        let pct = rule.discount_for(&state.repo, Some(actor)).await?;
        for row in rows.iter_mut() {
            rule.apply(row, pct);
        }
    }
    for row in rows.iter_mut() {
        resource.strip_hidden(row);
    }
    Ok(())
}

pub(crate) fn update_message(outcome: &UpdateOutcome) -> String {
    if outcome.not_updated.is_empty() {
        "Record updated successfully".to_string()
    } else {
        format!(
            "Record updated with errors. These fields cannot be updated: {}",
            outcome.not_updated.join(", ")
        )
    }
}

/// Validates, hashes, inserts and re-reads. Shared with registration.
pub(crate) async fn create_record(
    state: &AppState,
    resource: &Resource,
    mut data: Record,
) -> Result<(RecordKey, Record), AppError> {
    let schema = state.repo.table(resource.table).await?;
    RequestValidator::validate(&data, resource.rules, &schema, Mode::Create)?;
    resource.hash_secrets(&mut data).await?;
    let key = state.repo.create(resource.table, &data).await?;
    let row = state
        .repo
        .find(resource.table, &key)
        .await?
        .ok_or_else(|| AppError::Internal(format!("created {} row not readable", resource.table)))?;
    Ok((key, row))
}

/// Writes what the actor may write, then re-reads. 404 before any write when the row is absent.
pub(crate) async fn update_record(
    state: &AppState,
    resource: &Resource,
    actor: &Actor,
    key: &RecordKey,
    mut data: Record,
) -> Result<(Record, UpdateOutcome), AppError> {
    let schema = state.repo.table(resource.table).await?;
    RequestValidator::validate(&data, resource.rules, &schema, Mode::Update)?;
    if state.repo.find(resource.table, key).await?.is_none() {
        return Err(AppError::NotFound(format!("{} {}", resource.path, key.to_value())));
    }
    resource.hash_secrets(&mut data).await?;
    let outcome = state
        .repo
        .update(resource.table, key, &data, &resource.update_grant(actor))
        .await?;
    if !outcome.success {
        return Err(AppError::BadRequest(format!(
            "nothing to update; these fields cannot be updated: {}",
            outcome.not_updated.join(", ")
        )));
    }
    let row = state
        .repo
        .find(resource.table, key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", resource.path, key.to_value())))?;
    Ok((row, outcome))
}

pub(crate) async fn delete_record(
    state: &AppState,
    resource: &Resource,
    key: &RecordKey,
) -> Result<(), AppError> {
    let missing = || AppError::NotFound(format!("{} {}", resource.path, key.to_value()));
    if state.repo.find(resource.table, key).await?.is_none() {
        return Err(missing());
    }
    if !state.repo.delete(resource.table, key).await? {
        return Err(missing());
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    ctx: RequestContext,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    resource.access.check(Action::List, &ctx.actor, None)?;
    let filters = resource.filters_from_query(&params);
    let mut rows = state.repo.all_where(resource.table, &filters).await?;
    present(&state, resource, &ctx.actor, &mut rows).await?;
    Ok(success_many(rows))
}

pub async fn read(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let schema = state.repo.table(resource.table).await?;
    let key = simple_key(&schema.meta, &id)?;
    resource
        .access
        .check(Action::Show, &ctx.actor, key.to_value().as_i64())?;
    let row = state
        .repo
        .find(resource.table, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", resource.path, id)))?;
    let mut rows = [row];
    present(&state, resource, &ctx.actor, &mut rows).await?;
    let [row] = rows;
    Ok(success_one_ok(row, None))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    ctx: RequestContext,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    resource.access.check(Action::Create, &ctx.actor, None)?;
    let data = body_record(body)?;
    let (_, row) = create_record(&state, resource, data).await?;
    let mut rows = [row];
    present(&state, resource, &ctx.actor, &mut rows).await?;
    let [row] = rows;
    Ok(success_one(row, "Record created successfully"))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let schema = state.repo.table(resource.table).await?;
    let key = simple_key(&schema.meta, &id)?;
    resource
        .access
        .check(Action::Update, &ctx.actor, key.to_value().as_i64())?;
    let data = body_record(body)?;
    let (row, outcome) = update_record(&state, resource, &ctx.actor, &key, data).await?;
    let mut rows = [row];
    present(&state, resource, &ctx.actor, &mut rows).await?;
    let [row] = rows;
    Ok(success_one_ok(row, Some(update_message(&outcome))))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let schema = state.repo.table(resource.table).await?;
    let key = simple_key(&schema.meta, &id)?;
    resource
        .access
        .check(Action::Delete, &ctx.actor, key.to_value().as_i64())?;
    delete_record(&state, resource, &key).await?;
    Ok(message_only("Record deleted successfully"))
}
