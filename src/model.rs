use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::time::{self, Offset};

/// Absolute point in time. Built only through [`time::parse_instant`].
pub type Instant = DateTime<Utc>;

/// The bookable entity (equipment, room, staff member).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub i64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open interval `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr")]
pub struct TimeRange {
    start: Instant,
    end: Instant,
}

#[derive(Deserialize)]
struct RangeRepr {
    start: Instant,
    end: Instant,
}

impl TryFrom<RangeRepr> for TimeRange {
    type Error = EngineError;

    fn try_from(repr: RangeRepr) -> Result<Self, Self::Error> {
        Self::new(repr.start, repr.end)
    }
}

impl TimeRange {
    /// Zero-length and inverted ranges are rejected.
    pub fn new(start: Instant, end: Instant) -> Result<Self, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidRange(format!(
                "start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Normalize both bounds with `default_offset`, parse, and build the range.
    pub fn parse(start_raw: &str, end_raw: &str, default_offset: &Offset) -> Result<Self, EngineError> {
        let start = time::to_instant(start_raw, default_offset)?;
        let end = time::to_instant(end_raw, default_offset)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Touching ranges do not overlap: `[9,10)` and `[10,11)` coexist.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Metadata carried with a reservation. Never inspected by conflict logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_id: ResourceId,
    pub range: TimeRange,
    #[serde(default)]
    pub meta: ReservationMeta,
}

impl Reservation {
    pub fn new(id: ReservationId, resource_id: ResourceId, range: TimeRange) -> Self {
        Self {
            id,
            resource_id,
            range,
            meta: ReservationMeta::default(),
        }
    }

    pub fn as_candidate(&self) -> Candidate {
        Candidate::new(self.resource_id, self.range)
    }
}

/// A proposed booking that has not been assigned an id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub resource_id: ResourceId,
    pub range: TimeRange,
}

impl Candidate {
    pub fn new(resource_id: ResourceId, range: TimeRange) -> Self {
        Self { resource_id, range }
    }
}

/// Admission decision. `Rejected` keeps the scanned input's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "conflicts", rename_all = "snake_case")]
pub enum ConflictReport {
    Admitted,
    Rejected(Vec<Reservation>),
}

impl ConflictReport {
    pub fn is_admitted(&self) -> bool {
        matches!(self, ConflictReport::Admitted)
    }

    pub fn conflicting_ids(&self) -> Vec<ReservationId> {
        match self {
            ConflictReport::Admitted => Vec::new(),
            ConflictReport::Rejected(conflicts) => conflicts.iter().map(|r| r.id).collect(),
        }
    }
}

/// Two stored reservations on the same resource whose ranges overlap.
/// `first` precedes `second` in the audited input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPair {
    pub resource_id: ResourceId,
    pub first: Reservation,
    pub second: Reservation,
}

/// A reservation row as persisted by the surrounding application.
/// Datetimes are raw strings and may lack a zone designator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReservationRow {
    pub id: i64,
    pub equipment_id: i64,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl ReservationRow {
    pub fn into_reservation(self, default_offset: &Offset) -> Result<Reservation, EngineError> {
        let range = TimeRange::parse(&self.start_time, &self.end_time, default_offset)?;
        Ok(Reservation {
            id: ReservationId(self.id),
            resource_id: ResourceId(self.equipment_id),
            range,
            meta: ReservationMeta {
                title: self.title,
                description: self.description,
                owner_id: self.user_id,
                color: self.color,
            },
        })
    }
}
