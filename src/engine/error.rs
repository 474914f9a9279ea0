use std::fmt;

use crate::model::{Reservation, ReservationId};

/// One payload field that broke its constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Every violated field, in catalogue order.
    Validation(Vec<FieldViolation>),
    InvalidRange(String),
    InvalidOffset(String),
    /// Admission rejected; carries the colliding reservations.
    Conflict(Vec<Reservation>),
    NotFound(ReservationId),
    Store(String),
}

impl EngineError {
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            EngineError::Validation(violations) => violations.iter().map(|v| v.field).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(violations) => {
                write!(f, "validation failed: ")?;
                for (i, v) in violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            EngineError::InvalidRange(msg) => write!(f, "invalid range: {msg}"),
            EngineError::InvalidOffset(raw) => {
                write!(f, "invalid offset {raw:?}: expected ±HH:MM")
            }
            EngineError::Conflict(conflicts) => {
                let ids: Vec<String> = conflicts.iter().map(|r| r.id.to_string()).collect();
                write!(f, "conflict with reservations: {}", ids.join(", "))
            }
            EngineError::NotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
