mod audit;
mod conflict;
mod error;
mod store;
mod validate;

pub use audit::audit_all;
pub use conflict::{check, overlaps};
pub use error::{EngineError, FieldViolation};
pub use store::{InMemoryStore, ReservationStore};
pub use validate::{MIN_DATETIME_LEN, NewReservation, ReservationPatch, validate, validate_new};

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::model::*;
use crate::observability;
use crate::time::{self, Offset};

pub type AdmissionLock = Arc<Mutex<()>>;

/// Write path around a [`ReservationStore`].
///
/// Every create/update runs validate → normalize → check → write while holding
/// the admission lock of each resource it touches, so two overlapping requests
/// for the same resource can never both be admitted through one engine. Writers
/// that bypass the engine must provide their own serialization.
pub struct Engine<S> {
    store: S,
    default_offset: Offset,
    admission_locks: DashMap<ResourceId, AdmissionLock>,
}

impl Engine<InMemoryStore> {
    pub fn in_memory(default_offset: Offset) -> Self {
        Self::new(InMemoryStore::new(), default_offset)
    }
}

impl<S: ReservationStore> Engine<S> {
    pub fn new(store: S, default_offset: Offset) -> Self {
        Self {
            store,
            default_offset,
            admission_locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn default_offset(&self) -> &Offset {
        &self.default_offset
    }

    fn admission_lock(&self, resource_id: ResourceId) -> AdmissionLock {
        self.admission_locks.entry(resource_id).or_default().value().clone()
    }

    /// Acquire the admission locks of `resources` in ascending id order.
    /// Duplicates are locked once.
    async fn lock_resources<const N: usize>(
        &self,
        mut resources: [ResourceId; N],
    ) -> Vec<OwnedMutexGuard<()>> {
        resources.sort();
        let mut guards = Vec::with_capacity(N);
        let mut last = None;
        for resource_id in resources {
            if last == Some(resource_id) {
                continue;
            }
            last = Some(resource_id);
            guards.push(self.admission_lock(resource_id).lock_owned().await);
        }
        guards
    }

    /// Dry-run admission: would `[start_raw, end_raw)` fit on `resource_id`?
    /// Nothing is written and no lock is taken, so the answer may be stale by
    /// the time the caller acts on it.
    pub async fn preview(
        &self,
        resource_id: ResourceId,
        start_raw: &str,
        end_raw: &str,
        exclude_id: Option<ReservationId>,
    ) -> Result<ConflictReport, EngineError> {
        let range = TimeRange::parse(start_raw, end_raw, &self.default_offset)?;
        let existing = self.store.load_for_resource(resource_id, &range).await?;
        Ok(check(&Candidate::new(resource_id, range), &existing, exclude_id))
    }

    pub async fn create(&self, payload: &Value) -> Result<Reservation, EngineError> {
        let draft = validate_new(payload).inspect_err(count_validation_failure)?;
        let range = TimeRange::parse(&draft.start_time, &draft.end_time, &self.default_offset)?;
        let candidate = Candidate::new(draft.resource_id, range);
        let meta = ReservationMeta {
            title: Some(draft.title),
            description: draft.description,
            owner_id: Some(draft.owner_id),
            color: draft.color,
        };

        let lock = self.admission_lock(candidate.resource_id);
        let _admission = lock.lock().await;
        let started = std::time::Instant::now();

        let result = match self.decide(&candidate, None).await? {
            ConflictReport::Admitted => {
                let reservation = self.store.insert(candidate.resource_id, range, meta).await?;
                info!(
                    "reservation {} admitted on resource {}",
                    reservation.id, reservation.resource_id
                );
                Ok(reservation)
            }
            ConflictReport::Rejected(conflicts) => Err(EngineError::Conflict(conflicts)),
        };

        metrics::histogram!(observability::ADMISSION_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    /// Apply a partial payload to an existing reservation. The record's own id
    /// is excluded from the conflict scan.
    ///
    /// Both the source and the target resource are locked, in ascending id
    /// order, so a concurrent write on either side cannot interleave.
    pub async fn update(&self, id: ReservationId, payload: &Value) -> Result<Reservation, EngineError> {
        let patch = validate(payload).inspect_err(count_validation_failure)?;

        loop {
            let seen = self.store.get(id).await?.ok_or(EngineError::NotFound(id))?;
            let source = seen.resource_id;
            let target = patch.resource_id.unwrap_or(source);
            let _held = self.lock_resources([source, target]).await;

            // Re-read under the locks; a concurrent update may have moved it.
            let current = self.store.get(id).await?.ok_or(EngineError::NotFound(id))?;
            if current.resource_id != source {
                debug!("reservation {id} moved while waiting for lock, retrying");
                continue;
            }

            let started = std::time::Instant::now();
            let updated = apply_patch(current, &patch, &self.default_offset)?;

            let result = match self.decide(&updated.as_candidate(), Some(id)).await? {
                ConflictReport::Admitted => {
                    self.store.replace(updated.clone()).await?;
                    info!("reservation {id} updated on resource {}", updated.resource_id);
                    Ok(updated)
                }
                ConflictReport::Rejected(conflicts) => Err(EngineError::Conflict(conflicts)),
            };

            metrics::histogram!(observability::ADMISSION_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
            return result;
        }
    }

    pub async fn delete(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        loop {
            let seen = self.store.get(id).await?.ok_or(EngineError::NotFound(id))?;
            let _held = self.lock_resources([seen.resource_id]).await;
            match self.store.get(id).await? {
                Some(current) if current.resource_id == seen.resource_id => {}
                Some(_) => continue,
                None => return Err(EngineError::NotFound(id)),
            }
            let removed = self.store.remove(id).await?;
            info!("reservation {id} deleted from resource {}", removed.resource_id);
            return Ok(removed);
        }
    }

    /// Audit every stored reservation for pre-existing overlaps.
    pub async fn audit(&self) -> Result<Vec<ConflictPair>, EngineError> {
        let all = self.store.load_all().await?;
        let pairs = audit_all(&all);
        metrics::counter!(observability::AUDIT_CONFLICTS_TOTAL).increment(pairs.len() as u64);
        if pairs.is_empty() {
            info!("audit: {} reservations, no conflicts", all.len());
        } else {
            warn!("audit: {} reservations, {} conflicting pairs", all.len(), pairs.len());
        }
        Ok(pairs)
    }

    /// Load the snapshot and run the pure check. Caller holds the admission lock.
    async fn decide(
        &self,
        candidate: &Candidate,
        exclude_id: Option<ReservationId>,
    ) -> Result<ConflictReport, EngineError> {
        let existing = self
            .store
            .load_for_resource(candidate.resource_id, &candidate.range)
            .await?;
        let report = check(candidate, &existing, exclude_id);

        metrics::counter!(observability::ADMISSIONS_TOTAL, "outcome" => observability::outcome_label(&report))
            .increment(1);
        match &report {
            ConflictReport::Admitted => debug!(
                "admitted on resource {} ({} scanned)",
                candidate.resource_id,
                existing.len()
            ),
            ConflictReport::Rejected(conflicts) => warn!(
                "rejected on resource {}: overlaps {} existing",
                candidate.resource_id,
                conflicts.len()
            ),
        }
        Ok(report)
    }
}

fn count_validation_failure(_: &EngineError) {
    metrics::counter!(observability::VALIDATION_FAILURES_TOTAL).increment(1);
}

/// Merge a validated patch over the stored record. Absent fields keep their
/// stored value; datetimes are normalized before parsing.
fn apply_patch(
    current: Reservation,
    patch: &ReservationPatch,
    default_offset: &Offset,
) -> Result<Reservation, EngineError> {
    let start = match &patch.start_time {
        Some(raw) => time::to_instant(raw, default_offset)?,
        None => current.range.start(),
    };
    let end = match &patch.end_time {
        Some(raw) => time::to_instant(raw, default_offset)?,
        None => current.range.end(),
    };
    let range = TimeRange::new(start, end)?;

    let mut meta = current.meta;
    if let Some(title) = &patch.title {
        meta.title = Some(title.clone());
    }
    if let Some(description) = &patch.description {
        meta.description = description.clone();
    }
    if let Some(owner_id) = patch.owner_id {
        meta.owner_id = Some(owner_id);
    }
    if let Some(color) = &patch.color {
        meta.color = color.clone();
    }

    Ok(Reservation {
        id: current.id,
        resource_id: patch.resource_id.unwrap_or(current.resource_id),
        range,
        meta,
    })
}
