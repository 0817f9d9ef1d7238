//! Stay reconciliation engine
//!
//! Applies one [`MessageCommand`] per store transaction. Per visit the engine
//! tracks a single piece of state, whether the visit currently has an open
//! stay, and every intent is a transition on it:
//!
//! | Intent | Effect |
//! |---|---|
//! | Admission | open a stay in the named bed; no bed, no-op |
//! | Transfer | close the open stay at the movement start, open one in the new bed |
//! | Discharge | record the discharge date, close the open stay with a discharge row |
//! | Update | refresh demographics; treated as a transfer when no stay is open |
//! | CancelAdmission | delete the stay the admission created |
//! | CancelTransfer | delete the transfer's stay and reopen the one before it |
//! | CancelDischarge | delete the discharge, reopen its stay, clear the discharge date |
//!
//! Cancellation assumes movement ids increase over a visit's lifetime: the
//! stay reopened by a cancelled transfer is the one with the greatest
//! movement id below the cancelled movement.

use super::outcome::{ApplyOutcome, Effect, NoOpReason};
use super::resolver::LocationResolver;
use crate::adapters::store::traits::{StayStore, StoreTransaction};
use crate::core::classify::{
    AdmissionEvent, CancellationEvent, DischargeEvent, Intent, MessageCommand, MovementEvent,
    UpdateEvent,
};
use crate::domain::models::NewStay;
use crate::domain::{Result, WardsyncError};
use std::sync::Arc;

/// Applies classified commands to a stay store
pub struct ReconciliationEngine {
    store: Arc<dyn StayStore>,
    resolver: LocationResolver,
}

impl ReconciliationEngine {
    /// Create a new engine
    ///
    /// # Arguments
    ///
    /// * `store` - Store the commands mutate
    /// * `resolver` - Get-or-create policy for patients, visits and locations
    pub fn new(store: Arc<dyn StayStore>, resolver: LocationResolver) -> Self {
        Self { store, resolver }
    }

    pub fn store(&self) -> &Arc<dyn StayStore> {
        &self.store
    }

    /// Apply one command in its own transaction
    ///
    /// The transaction is committed when the command succeeds and rolled back
    /// when any step fails, so a failed command leaves no partial effects.
    ///
    /// # Errors
    ///
    /// Returns the store error of the failing step.
    pub async fn apply(&self, command: &MessageCommand) -> Result<ApplyOutcome> {
        let mut tx = self.store.begin().await?;

        match self.apply_in(tx.as_mut(), command).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        visit_id = ?command.visit_id().map(|v| v.get()),
                        error = %rollback_err,
                        "Rollback failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn apply_in(
        &self,
        tx: &mut dyn StoreTransaction,
        command: &MessageCommand,
    ) -> Result<ApplyOutcome> {
        tracing::debug!(
            intent = %command.intent(),
            visit_id = ?command.visit_id().map(|v| v.get()),
            movement_id = ?command.movement_id().map(|m| m.get()),
            "Applying command"
        );

        match command {
            MessageCommand::Admission(event) => self.admit(tx, event).await,
            MessageCommand::Transfer(event) => {
                let effects = self.transfer(tx, event).await?;
                Ok(ApplyOutcome::from_effects(
                    Intent::Transfer,
                    effects,
                    NoOpReason::NothingToTransfer,
                ))
            }
            MessageCommand::Discharge(event) => self.discharge(tx, event).await,
            MessageCommand::Update(event) => self.update(tx, event).await,
            MessageCommand::CancelAdmission(event) => self.cancel_admission(tx, event).await,
            MessageCommand::CancelTransfer(event) => self.cancel_transfer(tx, event).await,
            MessageCommand::CancelDischarge(event) => self.cancel_discharge(tx, event).await,
        }
    }

    async fn admit(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &AdmissionEvent,
    ) -> Result<ApplyOutcome> {
        let AdmissionEvent::Placed(event) = event else {
            return Ok(ApplyOutcome::NoOp {
                intent: Intent::Admission,
                reason: NoOpReason::NoBed,
            });
        };

        let patient = self.resolver.resolve_patient(tx, &event.patient).await?;
        self.resolver
            .resolve_visit(tx, &event.visit, patient.patient_id)
            .await?;

        let effects = self.open_stay(tx, event).await?.into_iter().collect();
        Ok(ApplyOutcome::from_effects(
            Intent::Admission,
            effects,
            NoOpReason::NoBed,
        ))
    }

    async fn transfer(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &MovementEvent,
    ) -> Result<Vec<Effect>> {
        let patient = self.resolver.resolve_patient(tx, &event.patient).await?;
        let visit = self
            .resolver
            .resolve_visit(tx, &event.visit, patient.patient_id)
            .await?;

        let mut effects = Vec::new();

        // Absent when the feed was joined after the admission
        if let Some(stay) = tx.latest_open_stay(visit.visit_id).await? {
            tx.set_stay_end_date(stay.id, Some(event.started_at)).await?;
            effects.push(Effect::StayClosed {
                stay_id: stay.id,
                end_date: event.started_at,
            });
        }

        effects.extend(self.open_stay(tx, event).await?);
        Ok(effects)
    }

    async fn open_stay(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &MovementEvent,
    ) -> Result<Option<Effect>> {
        let Some(location) = self
            .resolver
            .resolve_location(tx, &event.location, event.started_at)
            .await?
        else {
            return Ok(None);
        };

        let stay = tx
            .create_stay(NewStay {
                visit_id: event.visit.visit_id,
                movement_id: event.movement_id,
                ward_id: location.ward.id,
                room_id: location.room.id,
                bed_id: location.bed.id,
                department: event.location.department.clone(),
                start_date: event.started_at,
            })
            .await?;

        Ok(Some(Effect::StayOpened {
            stay_id: stay.id,
            bed_id: stay.bed_id,
        }))
    }

    async fn discharge(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &DischargeEvent,
    ) -> Result<ApplyOutcome> {
        let mut effects = Vec::new();

        if tx
            .set_visit_discharge_date(event.visit_id, Some(event.discharged_at))
            .await?
        {
            effects.push(Effect::VisitDischarged {
                discharge_date: event.discharged_at,
            });
        }

        if let Some(stay) = tx.latest_open_stay(event.visit_id).await? {
            let discharge = tx.create_discharge(stay.id, event.movement_id).await?;
            tx.set_stay_end_date(stay.id, Some(event.started_at)).await?;
            effects.push(Effect::DischargeRecorded {
                discharge_id: discharge.id,
                stay_id: stay.id,
            });
            effects.push(Effect::StayClosed {
                stay_id: stay.id,
                end_date: event.started_at,
            });
        }

        Ok(ApplyOutcome::from_effects(
            Intent::Discharge,
            effects,
            NoOpReason::UnknownVisit,
        ))
    }

    async fn update(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &UpdateEvent,
    ) -> Result<ApplyOutcome> {
        let has_open_stay = tx.latest_open_stay(event.visit_id).await?.is_some();
        let intent = Intent::Update.resolve_update(has_open_stay);

        let mut effects = Vec::new();
        if intent == Intent::Transfer {
            tracing::debug!(
                visit_id = %event.visit_id,
                "No open stay, treating update as transfer"
            );
            let placement = event
                .placement
                .as_ref()
                .map_err(|e| WardsyncError::Hl7(e.clone()))?;
            effects.extend(self.transfer(tx, placement).await?);
        }

        let demographics = &event.patient;
        if tx
            .update_patient_demographics(
                demographics.patient_id,
                demographics.date_of_birth,
                demographics.sex,
            )
            .await?
        {
            effects.push(Effect::DemographicsUpdated {
                patient_id: demographics.patient_id,
            });
        }

        Ok(ApplyOutcome::from_effects(
            intent,
            effects,
            NoOpReason::UnknownPatient,
        ))
    }

    async fn cancel_admission(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &CancellationEvent,
    ) -> Result<ApplyOutcome> {
        let mut effects = Vec::new();

        // Absent when the feed was joined after the admission
        if let Some(stay) = tx
            .find_stay_by_movement(event.visit_id, event.movement_id)
            .await?
        {
            tx.delete_stay(stay.id).await?;
            effects.push(Effect::StayDeleted { stay_id: stay.id });
        }

        Ok(ApplyOutcome::from_effects(
            Intent::CancelAdmission,
            effects,
            NoOpReason::NothingToCancel,
        ))
    }

    async fn cancel_transfer(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &CancellationEvent,
    ) -> Result<ApplyOutcome> {
        let mut effects = Vec::new();

        if let Some(cancelled) = tx
            .find_stay_by_movement(event.visit_id, event.movement_id)
            .await?
        {
            tx.delete_stay(cancelled.id).await?;
            effects.push(Effect::StayDeleted {
                stay_id: cancelled.id,
            });

            if let Some(previous) = tx.previous_stay(event.visit_id, event.movement_id).await? {
                tx.set_stay_end_date(previous.id, None).await?;
                effects.push(Effect::StayReopened {
                    stay_id: previous.id,
                });
            }
        }

        Ok(ApplyOutcome::from_effects(
            Intent::CancelTransfer,
            effects,
            NoOpReason::NothingToCancel,
        ))
    }

    async fn cancel_discharge(
        &self,
        tx: &mut dyn StoreTransaction,
        event: &CancellationEvent,
    ) -> Result<ApplyOutcome> {
        let mut effects = Vec::new();

        if let Some(discharge) = tx.find_discharge(event.visit_id, event.movement_id).await? {
            tx.delete_discharge(discharge.id).await?;
            effects.push(Effect::DischargeDeleted {
                discharge_id: discharge.id,
            });

            tx.set_stay_end_date(discharge.stay_id, None).await?;
            effects.push(Effect::StayReopened {
                stay_id: discharge.stay_id,
            });

            if tx.set_visit_discharge_date(event.visit_id, None).await? {
                effects.push(Effect::VisitDischargeCleared);
            }
        }

        Ok(ApplyOutcome::from_effects(
            Intent::CancelDischarge,
            effects,
            NoOpReason::NothingToCancel,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::core::classify::{LocationRef, PatientDemographics, VisitRef};
    use crate::domain::errors::{Hl7Error, StoreError};
    use crate::domain::ids::{LocationId, MovementId, PatientId, VisitId};
    use crate::domain::models::{LocationKind, Sex};
    use chrono::{NaiveDate, NaiveDateTime};

    const VISIT: i64 = 4_223_045_829;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn movement(movement_id: i64, bed: &str, started_at: NaiveDateTime) -> MovementEvent {
        MovementEvent {
            patient: PatientDemographics {
                patient_id: PatientId::new(1_441_645),
                date_of_birth: NaiveDate::from_ymd_opt(1970, 3, 4).unwrap(),
                sex: Sex::Female,
            },
            visit: VisitRef {
                visit_id: VisitId::new(VISIT),
                admission_date: at(1, 8),
            },
            location: LocationRef {
                ward: LocationId::new("KAR1").ok(),
                room: LocationId::new(format!("R-{bed}")).ok(),
                bed: LocationId::new(bed).ok(),
                department: None,
            },
            movement_id: MovementId::new(movement_id),
            started_at,
        }
    }

    fn admission(event: MovementEvent) -> MessageCommand {
        if event.location.has_bed() {
            MessageCommand::Admission(AdmissionEvent::Placed(event))
        } else {
            MessageCommand::Admission(AdmissionEvent::Unplaced {
                visit_id: Some(event.visit.visit_id),
                location: event.location,
            })
        }
    }

    fn update(event: MovementEvent) -> MessageCommand {
        MessageCommand::Update(UpdateEvent {
            patient: event.patient.clone(),
            visit_id: event.visit.visit_id,
            placement: Ok(event),
        })
    }

    fn cancellation(movement_id: i64) -> CancellationEvent {
        CancellationEvent {
            visit_id: VisitId::new(VISIT),
            movement_id: MovementId::new(movement_id),
        }
    }

    fn discharge(movement_id: i64, at: NaiveDateTime) -> DischargeEvent {
        DischargeEvent {
            visit_id: VisitId::new(VISIT),
            movement_id: MovementId::new(movement_id),
            started_at: at,
            discharged_at: at,
        }
    }

    fn engine() -> (ReconciliationEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = ReconciliationEngine::new(store.clone(), LocationResolver::default());
        (engine, store)
    }

    async fn open_stay_count(store: &MemoryStore) -> usize {
        store
            .visit_history(VisitId::new(VISIT))
            .await
            .unwrap()
            .map(|h| h.open_stays().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_admission_opens_stay() {
        let (engine, store) = engine();

        let outcome = engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        let history = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(history.stays.len(), 1);
        assert_eq!(history.stays[0].start_date, at(1, 8));
        assert!(history.stays[0].is_open());
        assert_eq!(history.visit.admission_date, at(1, 8));
    }

    #[tokio::test]
    async fn test_admission_without_bed_is_noop() {
        let (engine, store) = engine();

        let outcome = engine
            .apply(&admission(movement(1, "", at(1, 8))))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::NoOp {
                intent: Intent::Admission,
                reason: NoOpReason::NoBed,
            }
        );
        assert!(store.visit_history(VisitId::new(VISIT)).await.unwrap().is_none());
        assert_eq!(store.stay_count().await, 0);
    }

    #[tokio::test]
    async fn test_transfer_closes_at_new_movement_start() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();
        engine
            .apply(&MessageCommand::Transfer(movement(2, "B2", at(2, 10))))
            .await
            .unwrap();

        let history = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(history.stays.len(), 2);
        assert_eq!(history.stays[0].end_date, Some(at(2, 10)));
        assert_eq!(history.stays[1].start_date, at(2, 10));
        assert_eq!(history.stays[1].bed_id.as_str(), "B2");
        assert_eq!(history.open_stays().count(), 1);
    }

    #[tokio::test]
    async fn test_transfer_without_bed_only_closes() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();
        let outcome = engine
            .apply(&MessageCommand::Transfer(movement(2, "", at(2, 10))))
            .await
            .unwrap();

        assert_eq!(outcome.effects().len(), 1);
        assert_eq!(open_stay_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_transfer_without_prior_stay_opens_one() {
        let (engine, store) = engine();
        engine
            .apply(&MessageCommand::Transfer(movement(2, "B2", at(2, 10))))
            .await
            .unwrap();
        assert_eq!(open_stay_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_discharge_then_cancel_restores_same_stay() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();
        engine
            .apply(&MessageCommand::Discharge(discharge(2, at(3, 9))))
            .await
            .unwrap();

        let discharged = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(discharged.visit.discharge_date, Some(at(3, 9)));
        assert_eq!(discharged.discharges.len(), 1);
        assert_eq!(discharged.open_stays().count(), 0);
        let stay_id = discharged.stays[0].id;

        let outcome = engine
            .apply(&MessageCommand::CancelDischarge(cancellation(2)))
            .await
            .unwrap();
        assert!(outcome
            .effects()
            .contains(&Effect::StayReopened { stay_id }));

        let restored = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(restored.visit.discharge_date, None);
        assert!(restored.discharges.is_empty());
        assert_eq!(restored.stays.len(), 1);
        assert_eq!(restored.stays[0].id, stay_id);
        assert!(restored.stays[0].is_open());
    }

    #[tokio::test]
    async fn test_discharge_of_unknown_visit_is_noop() {
        let (engine, _store) = engine();
        let outcome = engine
            .apply(&MessageCommand::Discharge(discharge(2, at(3, 9))))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::NoOp {
                intent: Intent::Discharge,
                reason: NoOpReason::UnknownVisit,
            }
        );
    }

    #[tokio::test]
    async fn test_discharge_without_open_stay_only_sets_date() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();
        engine
            .apply(&MessageCommand::Transfer(movement(2, "", at(2, 10))))
            .await
            .unwrap();
        assert_eq!(open_stay_count(&store).await, 0);

        let outcome = engine
            .apply(&MessageCommand::Discharge(discharge(3, at(3, 9))))
            .await
            .unwrap();
        assert_eq!(
            outcome.effects(),
            &[Effect::VisitDischarged {
                discharge_date: at(3, 9)
            }]
        );

        let history = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(history.visit.discharge_date, Some(at(3, 9)));
        assert!(history.discharges.is_empty());
        assert_eq!(history.stays.len(), 1);
        assert_eq!(history.stays[0].end_date, Some(at(2, 10)));
    }

    #[tokio::test]
    async fn test_cancel_admission_of_unknown_movement_is_idempotent() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();

        for _ in 0..2 {
            let outcome = engine
                .apply(&MessageCommand::CancelAdmission(cancellation(9)))
                .await
                .unwrap();
            assert!(!outcome.is_applied());
        }
        assert_eq!(store.stay_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancel_admission_deletes_stay() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();
        engine
            .apply(&MessageCommand::CancelAdmission(cancellation(1)))
            .await
            .unwrap();
        assert_eq!(store.stay_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_transfer_reopens_previous_stay() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();
        engine
            .apply(&MessageCommand::Transfer(movement(2, "B2", at(2, 10))))
            .await
            .unwrap();
        engine
            .apply(&MessageCommand::CancelTransfer(cancellation(2)))
            .await
            .unwrap();

        let history = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(history.stays.len(), 1);
        assert_eq!(history.stays[0].movement_id, MovementId::new(1));
        assert!(history.stays[0].is_open());
    }

    #[tokio::test]
    async fn test_update_with_open_stay_only_touches_demographics() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();

        let mut event = movement(3, "B9", at(2, 10));
        event.patient.sex = Sex::Male;
        event.patient.date_of_birth = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();

        let outcome = engine.apply(&update(event)).await.unwrap();
        assert_eq!(outcome.intent(), Intent::Update);
        assert_eq!(
            outcome.effects(),
            &[Effect::DemographicsUpdated {
                patient_id: PatientId::new(1_441_645)
            }]
        );

        let history = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(history.stays.len(), 1);
        let patient = history.patient.unwrap();
        assert_eq!(patient.sex, Sex::Male);
        assert_eq!(
            patient.date_of_birth,
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn test_update_without_open_stay_acts_as_transfer() {
        let (engine, store) = engine();

        let outcome = engine
            .apply(&update(movement(3, "B9", at(2, 10))))
            .await
            .unwrap();

        assert_eq!(outcome.intent(), Intent::Transfer);
        let history = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(history.stays.len(), 1);
        assert_eq!(history.stays[0].bed_id.as_str(), "B9");
        assert_eq!(history.stays[0].movement_id, MovementId::new(3));
    }

    #[tokio::test]
    async fn test_update_for_unknown_patient_with_open_stay_is_noop() {
        let (engine, _store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();

        let mut event = movement(3, "B9", at(2, 10));
        event.patient.patient_id = PatientId::new(42);
        let outcome = engine.apply(&update(event)).await.unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::NoOp {
                intent: Intent::Update,
                reason: NoOpReason::UnknownPatient,
            }
        );
    }

    #[tokio::test]
    async fn test_update_with_open_stay_skips_unreadable_placement() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();

        let mut event = movement(3, "B9", at(2, 10));
        event.patient.sex = Sex::Male;
        let command = MessageCommand::Update(UpdateEvent {
            patient: event.patient,
            visit_id: VisitId::new(VISIT),
            placement: Err(Hl7Error::field("ZBE-2", "", "YYYYMMDDHHMMSS")),
        });

        let outcome = engine.apply(&command).await.unwrap();
        assert_eq!(outcome.intent(), Intent::Update);
        assert!(outcome.is_applied());

        let history = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(history.patient.unwrap().sex, Sex::Male);
        assert_eq!(history.stays.len(), 1);
    }

    #[tokio::test]
    async fn test_update_as_transfer_fails_on_unreadable_placement() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();
        engine
            .apply(&MessageCommand::Discharge(discharge(2, at(2, 8))))
            .await
            .unwrap();

        let mut event = movement(3, "B9", at(3, 10));
        event.patient.sex = Sex::Male;
        let command = MessageCommand::Update(UpdateEvent {
            patient: event.patient,
            visit_id: VisitId::new(VISIT),
            placement: Err(Hl7Error::field("ZBE-2", "", "YYYYMMDDHHMMSS")),
        });

        let err = engine.apply(&command).await.unwrap_err();
        assert!(matches!(err, WardsyncError::Hl7(_)));

        let history = store.visit_history(VisitId::new(VISIT)).await.unwrap().unwrap();
        assert_eq!(history.patient.unwrap().sex, Sex::Female);
        assert_eq!(history.stays.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_command_rolls_back() {
        let (engine, store) = engine();
        engine
            .apply(&admission(movement(1, "B1", at(1, 8))))
            .await
            .unwrap();

        // Same bed id under a different room
        let mut conflicting = movement(2, "B1", at(2, 10));
        conflicting.location.ward = LocationId::new("NEW").ok();
        conflicting.location.room = LocationId::new("R-other").ok();

        let err = engine
            .apply(&MessageCommand::Transfer(conflicting))
            .await
            .unwrap_err();
        assert!(matches!(err, WardsyncError::Store(StoreError::Conflict(_))));

        let ward = LocationId::new("NEW").unwrap();
        assert!(store.location(LocationKind::Ward, &ward).await.is_none());
        assert_eq!(open_stay_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_at_most_one_open_stay_through_lifecycle() {
        let (engine, store) = engine();
        let commands = vec![
            admission(movement(1, "B1", at(1, 8))),
            MessageCommand::Transfer(movement(2, "B2", at(2, 8))),
            MessageCommand::Transfer(movement(3, "B3", at(3, 8))),
            MessageCommand::CancelTransfer(cancellation(3)),
            update(movement(4, "B4", at(3, 12))),
            MessageCommand::Discharge(discharge(5, at(4, 8))),
            MessageCommand::CancelDischarge(cancellation(5)),
            MessageCommand::Discharge(discharge(6, at(5, 8))),
        ];

        for command in &commands {
            engine.apply(command).await.unwrap();
            assert!(open_stay_count(&store).await <= 1);
        }
        assert_eq!(open_stay_count(&store).await, 0);
    }
}
