//! Entity resolution for incoming movements
//!
//! Get-or-create of patients, visits and the ward/room/bed chain. Values from
//! the message are used only when a row is created; existing rows are left as
//! they are.

use crate::adapters::store::traits::StoreTransaction;
use crate::core::classify::{LocationRef, PatientDemographics, VisitRef};
use crate::domain::ids::{LocationId, PatientId};
use crate::domain::models::{Location, LocationKind, NewLocation, Patient, Visit};
use crate::domain::Result;
use chrono::{Duration, NaiveDateTime};

/// Default validity window of a location created from the feed
pub const DEFAULT_LOCATION_VALIDITY_DAYS: u32 = 7;

/// The location chain a stay points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub ward: Location,
    pub room: Location,
    pub bed: Location,
}

/// Resolves message references to stored entities
#[derive(Debug, Clone, Copy)]
pub struct LocationResolver {
    validity: Duration,
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION_VALIDITY_DAYS)
    }
}

impl LocationResolver {
    /// Creates a resolver whose new locations are valid for `validity_days`
    pub fn new(validity_days: u32) -> Self {
        Self {
            validity: Duration::days(i64::from(validity_days)),
        }
    }

    /// Get or create the patient of a message
    pub async fn resolve_patient(
        &self,
        tx: &mut dyn StoreTransaction,
        demographics: &PatientDemographics,
    ) -> Result<Patient> {
        let candidate = Patient {
            patient_id: demographics.patient_id,
            date_of_birth: demographics.date_of_birth,
            sex: demographics.sex,
        };

        let (patient, created) = tx.get_or_create_patient(&candidate).await?;
        if created {
            tracing::debug!(patient_id = %patient.patient_id, "Created patient");
        }
        Ok(patient)
    }

    /// Get or create the visit of a message for an already resolved patient
    pub async fn resolve_visit(
        &self,
        tx: &mut dyn StoreTransaction,
        visit: &VisitRef,
        patient_id: PatientId,
    ) -> Result<Visit> {
        let candidate = Visit {
            visit_id: visit.visit_id,
            patient_id,
            admission_date: visit.admission_date,
            discharge_date: None,
        };

        let (visit, created) = tx.get_or_create_visit(&candidate).await?;
        if created {
            tracing::debug!(
                visit_id = %visit.visit_id,
                patient_id = %patient_id,
                "Created visit"
            );
        }
        Ok(visit)
    }

    /// Get or create ward, room and bed
    ///
    /// Returns `None` without touching the store when the message names no
    /// bed. A blank ward or room component is replaced by a fresh surrogate
    /// id, so such a location is never shared with another message.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the room or bed already exists under
    /// a different parent.
    pub async fn resolve_location(
        &self,
        tx: &mut dyn StoreTransaction,
        location: &LocationRef,
        at: NaiveDateTime,
    ) -> Result<Option<ResolvedLocation>> {
        let Some(bed_id) = location.bed.clone() else {
            return Ok(None);
        };

        let ward_id = location.ward.clone().unwrap_or_else(|| {
            let id = LocationId::surrogate();
            tracing::warn!(ward_id = %id, "Empty ward component, using surrogate id");
            id
        });
        let room_id = location.room.clone().unwrap_or_else(|| {
            let id = LocationId::surrogate();
            tracing::warn!(room_id = %id, "Empty room component, using surrogate id");
            id
        });

        let ward = self
            .get_or_create(tx, LocationKind::Ward, ward_id, None, at)
            .await?;
        let room = self
            .get_or_create(tx, LocationKind::Room, room_id, Some(ward.id.clone()), at)
            .await?;
        let bed = self
            .get_or_create(tx, LocationKind::Bed, bed_id, Some(room.id.clone()), at)
            .await?;

        Ok(Some(ResolvedLocation { ward, room, bed }))
    }

    async fn get_or_create(
        &self,
        tx: &mut dyn StoreTransaction,
        kind: LocationKind,
        id: LocationId,
        parent_id: Option<LocationId>,
        at: NaiveDateTime,
    ) -> Result<Location> {
        let candidate = NewLocation {
            id,
            kind,
            parent_id,
            date_of_activation: at,
            date_of_expiry: at + self.validity,
        };

        let (location, created) = tx.get_or_create_location(&candidate).await?;
        if created {
            tracing::info!(
                kind = %kind,
                location_id = %location.id,
                valid_until = %location.date_of_expiry,
                "Created location from feed"
            );
        }
        Ok(location)
    }
}
