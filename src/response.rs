//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

/// `{ success, data, message, error }`, used for every response body.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<Value>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

pub fn success_one<T: Serialize>(data: T, message: &str) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, Json(Envelope::ok(data).with_message(message)))
}

pub fn success_one_ok<T: Serialize>(
    data: T,
    message: Option<String>,
) -> (StatusCode, Json<Envelope<T>>) {
    let mut body = Envelope::ok(data);
    body.message = message;
    (StatusCode::OK, Json(body))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<Envelope<Vec<T>>>) {
    (StatusCode::OK, Json(Envelope::ok(data)))
}

/// Success without a payload (logout, delete).
pub fn message_only(message: &str) -> (StatusCode, Json<Envelope<Value>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data: None,
            message: Some(message.to_string()),
            error: None,
        }),
    )
}

pub fn error_body(error: Value) -> Envelope<Value> {
    Envelope {
        success: false,
        data: None,
        message: None,
        error: Some(error),
    }
}
