//! Shape checks for reservation payloads.
//!
//! Runs before any time semantics: a payload that fails here never reaches the
//! normalizer or the conflict check. All violations are collected in one pass.

use serde_json::{Map, Value};

use crate::model::ResourceId;

use super::error::{EngineError, FieldViolation};

/// Raw datetimes must at least hold a calendar date (`YYYY-MM-DD`).
pub const MIN_DATETIME_LEN: usize = 10;

/// Recognised fields in reporting order.
const FIELD_ORDER: &[&str] = &[
    "equipment_id",
    "user_id",
    "title",
    "description",
    "start_time",
    "end_time",
    "color",
];

const REQUIRED_ON_CREATE: &[&str] = &["equipment_id", "user_id", "title", "start_time", "end_time"];

/// A validated partial payload. Absent fields are `None`; for nullable fields
/// `Some(None)` is an explicit null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPatch {
    pub resource_id: Option<ResourceId>,
    pub owner_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub color: Option<Option<String>>,
}

/// A validated payload carrying everything a new reservation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub resource_id: ResourceId,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub color: Option<String>,
}

/// Validate a partial payload (update semantics: every field optional).
pub fn validate(payload: &Value) -> Result<ReservationPatch, EngineError> {
    let (patch, violations) = collect(payload)?;
    if violations.is_empty() {
        Ok(patch)
    } else {
        Err(EngineError::Validation(violations))
    }
}

/// Validate a create payload: same rules, plus the required fields must be present.
pub fn validate_new(payload: &Value) -> Result<NewReservation, EngineError> {
    let (patch, mut violations) = collect(payload)?;
    if let Some(fields) = payload.as_object() {
        for &name in REQUIRED_ON_CREATE {
            if !fields.contains_key(name) {
                violations.push(FieldViolation::new(name, "is required"));
            }
        }
    }
    violations.sort_by_key(|v| field_position(v.field));

    match patch {
        ReservationPatch {
            resource_id: Some(resource_id),
            owner_id: Some(owner_id),
            title: Some(title),
            description,
            start_time: Some(start_time),
            end_time: Some(end_time),
            color,
        } if violations.is_empty() => Ok(NewReservation {
            resource_id,
            owner_id,
            title,
            description: description.flatten(),
            start_time,
            end_time,
            color: color.flatten(),
        }),
        _ => Err(EngineError::Validation(violations)),
    }
}

fn field_position(field: &str) -> usize {
    FIELD_ORDER
        .iter()
        .position(|f| *f == field)
        .unwrap_or(FIELD_ORDER.len())
}

fn collect(payload: &Value) -> Result<(ReservationPatch, Vec<FieldViolation>), EngineError> {
    let Some(fields) = payload.as_object() else {
        return Err(EngineError::Validation(vec![FieldViolation::new(
            "payload",
            "must be a JSON object",
        )]));
    };

    let mut violations = Vec::new();
    let patch = ReservationPatch {
        resource_id: take(fields, "equipment_id", positive_id, &mut violations).map(ResourceId),
        owner_id: take(fields, "user_id", positive_id, &mut violations),
        title: take(fields, "title", |v| text(v, 1), &mut violations),
        description: take(fields, "description", nullable_text, &mut violations),
        start_time: take(fields, "start_time", |v| text(v, MIN_DATETIME_LEN), &mut violations),
        end_time: take(fields, "end_time", |v| text(v, MIN_DATETIME_LEN), &mut violations),
        color: take(fields, "color", nullable_text, &mut violations),
    };
    Ok((patch, violations))
}

fn take<T>(
    fields: &Map<String, Value>,
    name: &'static str,
    rule: impl Fn(&Value) -> Result<T, String>,
    violations: &mut Vec<FieldViolation>,
) -> Option<T> {
    let value = fields.get(name)?;
    match rule(value) {
        Ok(v) => Some(v),
        Err(reason) => {
            violations.push(FieldViolation::new(name, reason));
            None
        }
    }
}

fn positive_id(value: &Value) -> Result<i64, String> {
    match value.as_i64() {
        Some(n) if n > 0 => Ok(n),
        _ => Err("must be a positive integer".to_string()),
    }
}

fn text(value: &Value, min_len: usize) -> Result<String, String> {
    let Some(s) = value.as_str() else {
        return Err("must be a string".to_string());
    };
    if s.chars().count() < min_len {
        return Err(format!("must be at least {min_len} characters"));
    }
    Ok(s.to_string())
}

fn nullable_text(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err("must be a string or null".to_string()),
    }
}
