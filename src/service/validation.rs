//! Request validation from introspected column types plus per-resource field rules.

use crate::db::Record;
use crate::error::{AppError, FieldErrors};
use crate::schema::{TableSchema, TypeClass};
use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    /// `YYYY-MM-DD`
    Date,
}

/// Whether missing fields are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// Business rule for one input field, declared alongside the resource.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub field: &'static str,
    /// Must be present and non-empty on create.
    pub required: bool,
    pub max_length: Option<usize>,
    pub pattern: Option<&'static str>,
    /// Compared against the value's text, so `1` and `"1"` both match `"1"`.
    pub allowed: &'static [&'static str],
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub max_decimals: Option<usize>,
    pub format: Option<Format>,
}

impl FieldRule {
    pub const fn new(field: &'static str) -> Self {
        FieldRule {
            field,
            required: false,
            max_length: None,
            pattern: None,
            allowed: &[],
            minimum: None,
            maximum: None,
            max_decimals: None,
            format: None,
        }
    }

    pub const fn required(self) -> Self {
        FieldRule { required: true, ..self }
    }

    pub const fn max_length(self, n: usize) -> Self {
        FieldRule { max_length: Some(n), ..self }
    }

    pub const fn pattern(self, p: &'static str) -> Self {
        FieldRule { pattern: Some(p), ..self }
    }

    pub const fn allowed(self, values: &'static [&'static str]) -> Self {
        FieldRule { allowed: values, ..self }
    }

    pub const fn range(self, min: f64, max: f64) -> Self {
        FieldRule {
            minimum: Some(min),
            maximum: Some(max),
            ..self
        }
    }

    pub const fn minimum(self, min: f64) -> Self {
        FieldRule { minimum: Some(min), ..self }
    }

    pub const fn max_decimals(self, n: usize) -> Self {
        FieldRule { max_decimals: Some(n), ..self }
    }

    pub const fn format(self, f: Format) -> Self {
        FieldRule { format: Some(f), ..self }
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Checks `data` against the table's columns and `rules`, reporting every failing field.
    pub fn validate(
        data: &Record,
        rules: &[FieldRule],
        schema: &TableSchema,
        mode: Mode,
    ) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        let mut fail = |field: &str, msg: String| {
            errors.entry(field.to_string()).or_insert(msg);
        };

        if mode == Mode::Create {
            for col in &schema.columns.mandatory {
                if is_blank(data.get(col)) {
                    fail(col.as_str(), format!("{} is required", col));
                }
            }
            for rule in rules.iter().filter(|r| r.required) {
                if is_blank(data.get(rule.field)) {
                    fail(rule.field, format!("{} is required", rule.field));
                }
            }
        }

        for (field, v) in data {
            if v.is_null() {
                continue;
            }
            if let Err(msg) = check_column(schema, field, v) {
                fail(field.as_str(), msg);
                continue;
            }
            for rule in rules.iter().filter(|r| r.field == field) {
                if let Err(msg) = check_rule(rule, v) {
                    fail(field.as_str(), msg);
                    break;
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Type checks derived from the column's catalog type. Unknown fields pass; the
/// repository ignores them.
fn check_column(schema: &TableSchema, field: &str, v: &Value) -> Result<(), String> {
    let Some(col) = schema.meta.column(field) else {
        return Ok(());
    };
    match col.type_class() {
        TypeClass::Integer if as_integer(v).is_none() => Err(format!("{} must be an integer", field)),
        TypeClass::Boolean if !matches!(as_integer(v), Some(0 | 1)) && !v.is_boolean() => {
            Err(format!("{} must be 0 or 1", field))
        }
        TypeClass::Decimal | TypeClass::Float if as_number(v).is_none() => {
            Err(format!("{} must be numeric", field))
        }
        TypeClass::Enum => {
            let values = col.enum_values();
            match v.as_str() {
                Some(s) if values.iter().any(|e| e == s) => Ok(()),
                _ => Err(format!("{} must be one of: {}", field, values.join(", "))),
            }
        }
        TypeClass::Text => match (v.as_str(), col.max_length) {
            (None, _) => Err(format!("{} must be a string", field)),
            (Some(s), Some(max)) if s.chars().count() as u64 > max => {
                Err(format!("{} must be at most {} characters", field, max))
            }
            _ => Ok(()),
        },
        TypeClass::Date if !is_date(v) => Err(format!("{} must be a date (YYYY-MM-DD)", field)),
        _ => Ok(()),
    }
}

fn check_rule(rule: &FieldRule, v: &Value) -> Result<(), String> {
    let col = rule.field;
    let text = value_text(v);
    if let Some(max) = rule.max_length {
        if text.chars().count() > max {
            return Err(format!("{} must be at most {} characters", col, max));
        }
    }
    if let Some(pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| format!("invalid pattern for {}", col))?;
        if !re.is_match(&text) {
            return Err(format!("{} has an invalid format", col));
        }
    }
    if !rule.allowed.is_empty() && !rule.allowed.iter().any(|a| *a == text) {
        return Err(format!("{} must be one of: {}", col, rule.allowed.join(", ")));
    }
    if rule.minimum.is_some() || rule.maximum.is_some() || rule.max_decimals.is_some() {
        let n = as_number(v).ok_or_else(|| format!("{} must be numeric", col))?;
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(format!("{} must be at least {}", col, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(format!("{} must be at most {}", col, max));
            }
        }
        if let Some(places) = rule.max_decimals {
            let decimals = text.split_once('.').map(|(_, f)| f.len()).unwrap_or(0);
            if decimals > places {
                return Err(format!("{} allows at most {} decimals", col, places));
            }
        }
    }
    match rule.format {
        Some(Format::Email) => {
            let re = Regex::new(EMAIL_PATTERN).map_err(|_| format!("invalid pattern for {}", col))?;
            if !re.is_match(&text) {
                return Err(format!("{} must be a valid email", col));
            }
        }
        Some(Format::Date) if !is_date(v) => {
            return Err(format!("{} must be a date (YYYY-MM-DD)", col));
        }
        _ => {}
    }
    Ok(())
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_date(v: &Value) -> bool {
    v.as_str()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
        .unwrap_or(false)
}
