//! Sign-in, sign-out, profile, registration and self-deactivation.

use super::entity::{body_record, create_record};
use crate::auth::{verify_password, Actor, RequestContext, Role, SessionUser, SESSION_KEY};
use crate::db::Record;
use crate::error::{AppError, FieldErrors};
use crate::resources::USERS;
use crate::response::{message_only, success_one, success_one_ok};
use crate::schema::UpdateGrant;
use crate::service::RecordKey;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tower_sessions::Session;

/// Columns never copied into the session.
const UNSTORED_COLUMNS: [&str; 2] = ["contrasena", "fecha_registro"];

/// Columns a public sign-up may not set for itself.
const ADMIN_ASSIGNED_COLUMNS: [&str; 1] = ["cliente_id"];

fn required_text(data: &Record, field: &str, errors: &mut FieldErrors) -> String {
    match data.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => {
            errors.insert(field.to_string(), format!("{} is required", field));
            String::new()
        }
    }
}

fn is_active(row: &Record) -> bool {
    match row.get("activo") {
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim() == "1",
        _ => false,
    }
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let data = body_record(body)?;
    let mut errors = FieldErrors::new();
    let email = required_text(&data, "email", &mut errors);
    let password = required_text(&data, "contrasena", &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let invalid = || AppError::Unauthorized("invalid credentials".into());
    let mut row = state
        .repo
        .find_by(USERS.table, "email", Value::String(email))
        .await?
        .ok_or_else(invalid)?;
    let hash = row
        .get("contrasena")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !verify_password(password, hash).await? {
        return Err(invalid());
    }
    if !is_active(&row) {
        return Err(AppError::Forbidden("account is inactive".into()));
    }
    let actor = Actor::from_user_row(&row)
        .ok_or_else(|| AppError::Internal("user row lacks id or rol_id".into()))?;
    for col in UNSTORED_COLUMNS {
        row.remove(col);
    }

    let user = SessionUser::new(actor, row);
    session.cycle_id().await?;
    session.insert(SESSION_KEY, &user).await?;
    tracing::info!(user = actor.id, role = actor.role.id(), "signed in");
    Ok(success_one_ok(
        user.public_profile(),
        Some("Login successful".to_string()),
    ))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    let Some(user) = session.get::<SessionUser>(SESSION_KEY).await? else {
        return Err(AppError::BadRequest("no active session".into()));
    };
    session.flush().await?;
    tracing::info!(user = user.actor.id, "signed out");
    Ok(message_only("Logged out successfully"))
}

pub async fn me(ctx: RequestContext) -> impl IntoResponse {
    success_one_ok(ctx.user.public_profile(), None)
}

/// Public sign-up. New accounts are always clients.
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut data = body_record(body)?;
    for col in ADMIN_ASSIGNED_COLUMNS {
        data.remove(col);
    }
    data.insert("rol_id".to_string(), Value::from(Role::Client.id()));
    let (key, mut row) = create_record(&state, &USERS, data).await?;
    USERS.strip_hidden(&mut row);
    tracing::info!(user = %key.to_value(), "registered");
    Ok(success_one(row, "User registered successfully"))
}

/// Deactivates the caller's own account and ends the session.
pub async fn unsubscribe(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let mut data = Record::new();
    data.insert("activo".to_string(), Value::from(0));
    let outcome = state
        .repo
        .update(
            USERS.table,
            &RecordKey::Id(Value::from(ctx.actor.id)),
            &data,
            &UpdateGrant::extra(["activo"]),
        )
        .await?;
    if !outcome.success {
        return Err(AppError::Internal("account could not be deactivated".into()));
    }
    ctx.session.flush().await?;
    tracing::info!(user = ctx.actor.id, "account deactivated");
    Ok(message_only("Account deactivated"))
}
