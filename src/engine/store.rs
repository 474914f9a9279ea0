use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::*;

use super::{EngineError, FieldViolation};

/// Read/write interface the engine needs from persistence.
///
/// Implementations return reservations in insertion order. `load_for_resource`
/// may narrow by `window`, but must not drop anything that overlaps it.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, EngineError>;

    async fn load_for_resource(
        &self,
        resource_id: ResourceId,
        window: &TimeRange,
    ) -> Result<Vec<Reservation>, EngineError>;

    async fn load_all(&self) -> Result<Vec<Reservation>, EngineError>;

    /// Persist a new reservation and return it with its assigned id.
    async fn insert(
        &self,
        resource_id: ResourceId,
        range: TimeRange,
        meta: ReservationMeta,
    ) -> Result<Reservation, EngineError>;

    async fn replace(&self, reservation: Reservation) -> Result<(), EngineError>;

    async fn remove(&self, id: ReservationId) -> Result<Reservation, EngineError>;
}

/// Reservations of one resource, in insertion order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Schedule {
    pub reservations: Vec<Reservation>,
}

impl Schedule {
    /// Entries whose range overlaps `window`.
    pub fn overlapping<'a>(&'a self, window: &'a TimeRange) -> impl Iterator<Item = &'a Reservation> {
        self.reservations.iter().filter(move |r| r.range.overlaps(window))
    }

    pub fn remove(&mut self, id: ReservationId) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }
}

pub(crate) type SharedSchedule = Arc<RwLock<Schedule>>;

pub struct InMemoryStore {
    resources: DashMap<ResourceId, SharedSchedule>,
    /// Reverse lookup: reservation id → resource id
    entity_to_resource: DashMap<ReservationId, ResourceId>,
    next_id: AtomicI64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            resources: DashMap::new(),
            entity_to_resource: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn reservation_count(&self) -> usize {
        self.entity_to_resource.len()
    }

    fn schedule(&self, resource_id: ResourceId) -> SharedSchedule {
        self.resources.entry(resource_id).or_default().value().clone()
    }

    fn existing_schedule(&self, resource_id: &ResourceId) -> Option<SharedSchedule> {
        self.resources.get(resource_id).map(|e| e.value().clone())
    }

    /// Load an already-persisted reservation as-is, skipping admission.
    /// Used for backfills of existing data; an existing record with the same
    /// id is replaced. Ids must be positive.
    pub async fn import(&self, reservation: Reservation) -> Result<(), EngineError> {
        let id = reservation.id;
        if id.0 <= 0 {
            return Err(EngineError::Validation(vec![FieldViolation::new(
                "id",
                "must be a positive integer",
            )]));
        }
        self.next_id.fetch_max(id.0.saturating_add(1), Ordering::SeqCst);
        if let Some(old_resource) = self.entity_to_resource.get(&id).map(|e| *e.value())
            && let Some(old) = self.existing_schedule(&old_resource)
        {
            old.write().await.remove(id);
        }
        self.entity_to_resource.insert(id, reservation.resource_id);
        let schedule = self.schedule(reservation.resource_id);
        schedule.write().await.reservations.push(reservation);
        Ok(())
    }

    fn allocate_id(&self) -> Result<ReservationId, EngineError> {
        self.next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map(ReservationId)
            .map_err(|_| EngineError::Store("reservation id space exhausted".into()))
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>, EngineError> {
        let Some(resource_id) = self.entity_to_resource.get(&id).map(|e| *e.value()) else {
            return Ok(None);
        };
        let Some(schedule) = self.existing_schedule(&resource_id) else {
            return Ok(None);
        };
        let guard = schedule.read().await;
        Ok(guard.reservations.iter().find(|r| r.id == id).cloned())
    }

    async fn load_for_resource(
        &self,
        resource_id: ResourceId,
        window: &TimeRange,
    ) -> Result<Vec<Reservation>, EngineError> {
        let Some(schedule) = self.existing_schedule(&resource_id) else {
            return Ok(Vec::new());
        };
        let guard = schedule.read().await;
        Ok(guard.overlapping(window).cloned().collect())
    }

    /// Ordered by id, which is insertion order for engine-assigned ids.
    async fn load_all(&self) -> Result<Vec<Reservation>, EngineError> {
        let schedules: Vec<SharedSchedule> = self.resources.iter().map(|e| e.value().clone()).collect();
        let mut all = Vec::new();
        for schedule in schedules {
            all.extend(schedule.read().await.reservations.iter().cloned());
        }
        all.sort_by_key(|r| r.id);
        Ok(all)
    }

    async fn insert(
        &self,
        resource_id: ResourceId,
        range: TimeRange,
        meta: ReservationMeta,
    ) -> Result<Reservation, EngineError> {
        let id = self.allocate_id()?;
        let reservation = Reservation {
            id,
            resource_id,
            range,
            meta,
        };
        let schedule = self.schedule(resource_id);
        schedule.write().await.reservations.push(reservation.clone());
        self.entity_to_resource.insert(id, resource_id);
        Ok(reservation)
    }

    async fn replace(&self, reservation: Reservation) -> Result<(), EngineError> {
        let id = reservation.id;
        let old_resource = self
            .entity_to_resource
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(id))?;

        if old_resource == reservation.resource_id {
            let schedule = self.schedule(old_resource);
            let mut guard = schedule.write().await;
            let slot = guard
                .reservations
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(EngineError::NotFound(id))?;
            *slot = reservation;
            return Ok(());
        }

        if let Some(old) = self.existing_schedule(&old_resource) {
            old.write().await.remove(id);
        }
        self.entity_to_resource.insert(id, reservation.resource_id);
        let schedule = self.schedule(reservation.resource_id);
        schedule.write().await.reservations.push(reservation);
        Ok(())
    }

    async fn remove(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        let (_, resource_id) = self
            .entity_to_resource
            .remove(&id)
            .ok_or(EngineError::NotFound(id))?;
        let schedule = self
            .existing_schedule(&resource_id)
            .ok_or(EngineError::NotFound(id))?;
        let mut guard = schedule.write().await;
        guard.remove(id).ok_or(EngineError::NotFound(id))
    }
}
