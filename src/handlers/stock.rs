//! Stock per size, nested under a product. Rows are keyed by (producto_id, talla_id).

use super::entity::{body_record, create_record, delete_record, key_value, present, update_message, update_record};
use crate::auth::{Action, RequestContext};
use crate::error::AppError;
use crate::resources::STOCK;
use crate::response::{message_only, success_many, success_one, success_one_ok};
use crate::schema::TableMetadata;
use crate::service::RecordKey;
use crate::sql::Filter;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

const PRODUCT_COLUMN: &str = "producto_id";
const SIZE_COLUMN: &str = "talla_id";

fn stock_key(meta: &TableMetadata, product: &str, size: &str) -> Result<RecordKey, AppError> {
    Ok(RecordKey::Composite(vec![
        (PRODUCT_COLUMN.to_string(), key_value(meta, PRODUCT_COLUMN, product)?),
        (SIZE_COLUMN.to_string(), key_value(meta, SIZE_COLUMN, size)?),
    ]))
}

pub async fn list(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    STOCK.access.check(Action::List, &ctx.actor, None)?;
    let schema = state.repo.table(STOCK.table).await?;
    let product = key_value(&schema.meta, PRODUCT_COLUMN, &id)?;
    let mut rows = state
        .repo
        .all_where(STOCK.table, &[Filter::Eq(PRODUCT_COLUMN.to_string(), product)])
        .await?;
    present(&state, &STOCK, &ctx.actor, &mut rows).await?;
    Ok(success_many(rows))
}

pub async fn read(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((id, talla_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    STOCK.access.check(Action::Show, &ctx.actor, None)?;
    let schema = state.repo.table(STOCK.table).await?;
    let key = stock_key(&schema.meta, &id, &talla_id)?;
    let row = state
        .repo
        .find(STOCK.table, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("stock {}", key.to_value())))?;
    let mut rows = [row];
    present(&state, &STOCK, &ctx.actor, &mut rows).await?;
    let [row] = rows;
    Ok(success_one_ok(row, None))
}

/// The product comes from the path; a `producto_id` in the body is overridden.
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    STOCK.access.check(Action::Create, &ctx.actor, None)?;
    let schema = state.repo.table(STOCK.table).await?;
    let product = key_value(&schema.meta, PRODUCT_COLUMN, &id)?;
    let mut data = body_record(body)?;
    data.insert(PRODUCT_COLUMN.to_string(), product);
    let (_, row) = create_record(&state, &STOCK, data).await?;
    let mut rows = [row];
    present(&state, &STOCK, &ctx.actor, &mut rows).await?;
    let [row] = rows;
    Ok(success_one(row, "Stock created successfully"))
}

pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((id, talla_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    STOCK.access.check(Action::Update, &ctx.actor, None)?;
    let schema = state.repo.table(STOCK.table).await?;
    let key = stock_key(&schema.meta, &id, &talla_id)?;
    let data = body_record(body)?;
    let (row, outcome) = update_record(&state, &STOCK, &ctx.actor, &key, data).await?;
    let mut rows = [row];
    present(&state, &STOCK, &ctx.actor, &mut rows).await?;
    let [row] = rows;
    Ok(success_one_ok(row, Some(update_message(&outcome))))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((id, talla_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    STOCK.access.check(Action::Delete, &ctx.actor, None)?;
    let schema = state.repo.table(STOCK.table).await?;
    let key = stock_key(&schema.meta, &id, &talla_id)?;
    delete_record(&state, &STOCK, &key).await?;
    Ok(message_only("Stock deleted successfully"))
}
