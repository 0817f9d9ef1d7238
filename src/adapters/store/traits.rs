//! Storage port traits
//!
//! This module defines the traits that stay store adapters must implement
//! to work with Wardsync. All mutations happen inside a [`StoreTransaction`];
//! the reconciliation engine opens one per message.

use crate::domain::ids::{MovementId, PatientId, VisitId};
use crate::domain::models::{
    Discharge, Location, NewLocation, NewStay, Patient, Sex, Stay, Visit,
};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

/// Everything stored about one visit, for inspection
#[derive(Debug, Clone)]
pub struct VisitHistory {
    pub visit: Visit,
    pub patient: Option<Patient>,

    /// Ordered by id
    pub stays: Vec<Stay>,

    /// Ordered by id
    pub discharges: Vec<Discharge>,
}

impl VisitHistory {
    /// Stays with no end date
    pub fn open_stays(&self) -> impl Iterator<Item = &Stay> {
        self.stays.iter().filter(|s| s.is_open())
    }
}

/// Stay store trait
///
/// Entry point of a storage backend: connection checks, schema setup and
/// transactions.
#[async_trait]
pub trait StayStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Test the store connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Ensure tables and indexes exist
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    async fn ensure_schema(&self) -> Result<()>;

    /// Begin a transaction
    ///
    /// The returned transaction must be finished with
    /// [`StoreTransaction::commit`] or [`StoreTransaction::rollback`].
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Load a visit with its patient, stays and discharges
    ///
    /// Runs in its own transaction, which is always rolled back.
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the visit is unknown.
    async fn visit_history(&self, visit_id: VisitId) -> Result<Option<VisitHistory>> {
        let mut tx = self.begin().await?;
        let history = read_visit_history(tx.as_mut(), visit_id).await;
        tx.rollback().await?;
        history
    }
}

async fn read_visit_history(
    tx: &mut dyn StoreTransaction,
    visit_id: VisitId,
) -> Result<Option<VisitHistory>> {
    let Some(visit) = tx.find_visit(visit_id).await? else {
        return Ok(None);
    };

    let patient = tx.find_patient(visit.patient_id).await?;
    let stays = tx.stays_for_visit(visit_id).await?;
    let discharges = tx.discharges_for_visit(visit_id).await?;

    Ok(Some(VisitHistory {
        visit,
        patient,
        stays,
        discharges,
    }))
}

/// One unit of work against the store
///
/// `get_or_create_*` methods insert the given values only when the row is
/// absent and report whether they did; existing rows are never modified by
/// them.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Get or create a patient by id
    async fn get_or_create_patient(&mut self, patient: &Patient) -> Result<(Patient, bool)>;

    async fn find_patient(&mut self, patient_id: PatientId) -> Result<Option<Patient>>;

    /// Overwrite sex and date of birth
    ///
    /// # Returns
    ///
    /// Returns `false` if the patient does not exist.
    async fn update_patient_demographics(
        &mut self,
        patient_id: PatientId,
        date_of_birth: NaiveDate,
        sex: Sex,
    ) -> Result<bool>;

    /// Get or create a visit by id
    async fn get_or_create_visit(&mut self, visit: &Visit) -> Result<(Visit, bool)>;

    async fn find_visit(&mut self, visit_id: VisitId) -> Result<Option<Visit>>;

    /// Set or clear the discharge date
    ///
    /// # Returns
    ///
    /// Returns `false` if the visit does not exist.
    async fn set_visit_discharge_date(
        &mut self,
        visit_id: VisitId,
        discharge_date: Option<NaiveDateTime>,
    ) -> Result<bool>;

    /// Get or create a ward, room or bed by kind and id
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the location exists under a
    /// different parent.
    async fn get_or_create_location(&mut self, location: &NewLocation)
        -> Result<(Location, bool)>;

    /// Insert an open stay
    async fn create_stay(&mut self, stay: NewStay) -> Result<Stay>;

    /// The open stay with the greatest id
    async fn latest_open_stay(&mut self, visit_id: VisitId) -> Result<Option<Stay>>;

    /// The stay created by a movement, greatest id first
    async fn find_stay_by_movement(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Stay>>;

    /// The stay with the greatest movement id below `movement_id`, ties by id
    async fn previous_stay(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Stay>>;

    /// Set or clear a stay's end date
    async fn set_stay_end_date(&mut self, stay_id: i64, end_date: Option<NaiveDateTime>)
        -> Result<()>;

    /// Delete a stay and its discharges
    async fn delete_stay(&mut self, stay_id: i64) -> Result<()>;

    /// All stays of a visit ordered by id
    async fn stays_for_visit(&mut self, visit_id: VisitId) -> Result<Vec<Stay>>;

    async fn create_discharge(&mut self, stay_id: i64, movement_id: MovementId)
        -> Result<Discharge>;

    /// The discharge with this movement id on a stay of the visit, greatest id first
    async fn find_discharge(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Discharge>>;

    async fn delete_discharge(&mut self, discharge_id: i64) -> Result<()>;

    /// All discharges on stays of a visit ordered by id
    async fn discharges_for_visit(&mut self, visit_id: VisitId) -> Result<Vec<Discharge>>;

    /// Commit all changes
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard all changes
    async fn rollback(self: Box<Self>) -> Result<()>;
}
