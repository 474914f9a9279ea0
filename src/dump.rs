//! Offline audit of a dump of stored reservation rows.
//!
//! Rows are audited exactly as given: nothing is merged by id and input order
//! is kept, so duplicated or out-of-order data is reported rather than hidden.

use std::io::Write;

use tracing::{info, warn};

use crate::engine::{EngineError, audit_all};
use crate::model::{ConflictPair, ReservationRow};
use crate::observability;
use crate::time::Offset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpAudit {
    /// Rows read from the dump, including skipped ones.
    pub rows: usize,
    /// Row id and the reason it could not become a reservation.
    pub skipped: Vec<(i64, EngineError)>,
    pub pairs: Vec<ConflictPair>,
}

impl DumpAudit {
    pub fn has_conflicts(&self) -> bool {
        !self.pairs.is_empty()
    }
}

/// Parse a JSON array of rows and run [`audit_all`] over them in input order.
/// Only a malformed document is an error; rows with bad ranges are skipped.
pub fn audit_dump(raw: &str, default_offset: &Offset) -> Result<DumpAudit, serde_json::Error> {
    let rows: Vec<ReservationRow> = serde_json::from_str(raw)?;
    let total = rows.len();

    let mut reservations = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for row in rows {
        let id = row.id;
        match row.into_reservation(default_offset) {
            Ok(reservation) => reservations.push(reservation),
            Err(e) => {
                warn!("row {id} skipped: {e}");
                skipped.push((id, e));
            }
        }
    }

    let pairs = audit_all(&reservations);
    metrics::counter!(observability::AUDIT_CONFLICTS_TOTAL).increment(pairs.len() as u64);
    if pairs.is_empty() {
        info!("audit: {} rows, {} skipped, no conflicts", total, skipped.len());
    } else {
        warn!(
            "audit: {} rows, {} skipped, {} conflicting pairs",
            total,
            skipped.len(),
            pairs.len()
        );
    }

    Ok(DumpAudit {
        rows: total,
        skipped,
        pairs,
    })
}

/// One JSON object per line.
pub fn write_pairs(pairs: &[ConflictPair], out: &mut impl Write) -> std::io::Result<()> {
    for pair in pairs {
        serde_json::to_writer(&mut *out, pair)?;
        writeln!(out)?;
    }
    Ok(())
}
