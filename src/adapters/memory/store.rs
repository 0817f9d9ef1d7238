//! In-memory stay store
//!
//! Transactions hold the store's mutex for their whole lifetime and work on a
//! private copy of the state, which replaces the shared state on commit.

use crate::adapters::store::traits::{StayStore, StoreTransaction};
use crate::domain::errors::StoreError;
use crate::domain::ids::{LocationId, MovementId, PatientId, VisitId};
use crate::domain::models::{
    Discharge, Location, LocationKind, NewLocation, NewStay, Patient, Sex, Stay, Visit,
};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    patients: HashMap<PatientId, Patient>,
    visits: HashMap<VisitId, Visit>,
    locations: HashMap<(LocationKind, LocationId), Location>,
    stays: BTreeMap<i64, Stay>,
    discharges: BTreeMap<i64, Discharge>,
    last_stay_id: i64,
    last_discharge_id: i64,
}

/// Stay store kept in process memory
///
/// Used for dry runs, tests and `database_target = "memory"`. Contents are
/// lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored stays across all visits
    pub async fn stay_count(&self) -> usize {
        self.state.lock().await.stays.len()
    }

    /// Looks up a stored location
    pub async fn location(&self, kind: LocationKind, id: &LocationId) -> Option<Location> {
        self.state
            .lock()
            .await
            .locations
            .get(&(kind, id.clone()))
            .cloned()
    }
}

#[async_trait]
impl StayStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTransaction {
    fn stays_of(&self, visit_id: VisitId) -> impl Iterator<Item = &Stay> {
        self.working
            .stays
            .values()
            .filter(move |s| s.visit_id == visit_id)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get_or_create_patient(&mut self, patient: &Patient) -> Result<(Patient, bool)> {
        if let Some(existing) = self.working.patients.get(&patient.patient_id) {
            return Ok((existing.clone(), false));
        }
        self.working
            .patients
            .insert(patient.patient_id, patient.clone());
        Ok((patient.clone(), true))
    }

    async fn find_patient(&mut self, patient_id: PatientId) -> Result<Option<Patient>> {
        Ok(self.working.patients.get(&patient_id).cloned())
    }

    async fn update_patient_demographics(
        &mut self,
        patient_id: PatientId,
        date_of_birth: NaiveDate,
        sex: Sex,
    ) -> Result<bool> {
        match self.working.patients.get_mut(&patient_id) {
            Some(patient) => {
                patient.date_of_birth = date_of_birth;
                patient.sex = sex;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_or_create_visit(&mut self, visit: &Visit) -> Result<(Visit, bool)> {
        if let Some(existing) = self.working.visits.get(&visit.visit_id) {
            return Ok((existing.clone(), false));
        }
        if !self.working.patients.contains_key(&visit.patient_id) {
            return Err(StoreError::NotFound(format!(
                "patient {} for visit {}",
                visit.patient_id, visit.visit_id
            ))
            .into());
        }
        self.working.visits.insert(visit.visit_id, visit.clone());
        Ok((visit.clone(), true))
    }

    async fn find_visit(&mut self, visit_id: VisitId) -> Result<Option<Visit>> {
        Ok(self.working.visits.get(&visit_id).cloned())
    }

    async fn set_visit_discharge_date(
        &mut self,
        visit_id: VisitId,
        discharge_date: Option<NaiveDateTime>,
    ) -> Result<bool> {
        match self.working.visits.get_mut(&visit_id) {
            Some(visit) => {
                visit.discharge_date = discharge_date;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_or_create_location(
        &mut self,
        location: &NewLocation,
    ) -> Result<(Location, bool)> {
        let key = (location.kind, location.id.clone());
        if let Some(existing) = self.working.locations.get(&key) {
            if existing.parent_id != location.parent_id {
                return Err(StoreError::Conflict(format!(
                    "{} {} exists under {:?}, not {:?}",
                    location.kind, location.id, existing.parent_id, location.parent_id
                ))
                .into());
            }
            return Ok((existing.clone(), false));
        }

        let created = location.clone().into_location();
        self.working.locations.insert(key, created.clone());
        Ok((created, true))
    }

    async fn create_stay(&mut self, stay: NewStay) -> Result<Stay> {
        if !self.working.visits.contains_key(&stay.visit_id) {
            return Err(StoreError::NotFound(format!("visit {}", stay.visit_id)).into());
        }
        self.working.last_stay_id += 1;
        let stay = stay.into_stay(self.working.last_stay_id);
        self.working.stays.insert(stay.id, stay.clone());
        Ok(stay)
    }

    async fn latest_open_stay(&mut self, visit_id: VisitId) -> Result<Option<Stay>> {
        Ok(self
            .stays_of(visit_id)
            .filter(|s| s.is_open())
            .last()
            .cloned())
    }

    async fn find_stay_by_movement(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Stay>> {
        Ok(self
            .stays_of(visit_id)
            .filter(|s| s.movement_id == movement_id)
            .last()
            .cloned())
    }

    async fn previous_stay(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Stay>> {
        Ok(self
            .stays_of(visit_id)
            .filter(|s| s.movement_id < movement_id)
            .max_by_key(|s| (s.movement_id, s.id))
            .cloned())
    }

    async fn set_stay_end_date(
        &mut self,
        stay_id: i64,
        end_date: Option<NaiveDateTime>,
    ) -> Result<()> {
        let stay = self
            .working
            .stays
            .get_mut(&stay_id)
            .ok_or_else(|| StoreError::NotFound(format!("stay {stay_id}")))?;
        stay.end_date = end_date;
        Ok(())
    }

    async fn delete_stay(&mut self, stay_id: i64) -> Result<()> {
        self.working.stays.remove(&stay_id);
        self.working.discharges.retain(|_, d| d.stay_id != stay_id);
        Ok(())
    }

    async fn stays_for_visit(&mut self, visit_id: VisitId) -> Result<Vec<Stay>> {
        Ok(self.stays_of(visit_id).cloned().collect())
    }

    async fn create_discharge(
        &mut self,
        stay_id: i64,
        movement_id: MovementId,
    ) -> Result<Discharge> {
        if !self.working.stays.contains_key(&stay_id) {
            return Err(StoreError::NotFound(format!("stay {stay_id}")).into());
        }
        self.working.last_discharge_id += 1;
        let discharge = Discharge {
            id: self.working.last_discharge_id,
            stay_id,
            movement_id,
        };
        self.working
            .discharges
            .insert(discharge.id, discharge.clone());
        Ok(discharge)
    }

    async fn find_discharge(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Discharge>> {
        let stays = &self.working.stays;
        Ok(self
            .working
            .discharges
            .values()
            .filter(|d| d.movement_id == movement_id)
            .filter(|d| {
                stays
                    .get(&d.stay_id)
                    .is_some_and(|s| s.visit_id == visit_id)
            })
            .last()
            .cloned())
    }

    async fn delete_discharge(&mut self, discharge_id: i64) -> Result<()> {
        self.working.discharges.remove(&discharge_id);
        Ok(())
    }

    async fn discharges_for_visit(&mut self, visit_id: VisitId) -> Result<Vec<Discharge>> {
        let stays = &self.working.stays;
        Ok(self
            .working
            .discharges
            .values()
            .filter(|d| {
                stays
                    .get(&d.stay_id)
                    .is_some_and(|s| s.visit_id == visit_id)
            })
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
