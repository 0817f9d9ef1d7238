//! Typed commands built from classified messages
//!
//! Every field an intent always needs is extracted and type-checked here.
//! Fields that only matter for some visit states are not: a bed-less
//! admission reads nothing past PV1-3, and an update keeps its placement
//! fields as a parse result that is consulted only when no stay is open.

use super::Intent;
use crate::domain::errors::Hl7Error;
use crate::domain::ids::{LocationId, MovementId, PatientId, VisitId};
use crate::domain::models::Sex;
use crate::hl7::AdtMessage;
use chrono::{NaiveDate, NaiveDateTime};

/// PID demographics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDemographics {
    pub patient_id: PatientId,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
}

/// PV1 visit identity and first-sight admission date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRef {
    pub visit_id: VisitId,
    pub admission_date: NaiveDateTime,
}

/// PV1-3 with blank components as `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRef {
    pub ward: Option<LocationId>,
    pub room: Option<LocationId>,
    pub bed: Option<LocationId>,
    pub department: Option<String>,
}

impl LocationRef {
    /// Whether the message names a bed
    pub fn has_bed(&self) -> bool {
        self.bed.is_some()
    }
}

/// Payload of admissions, transfers and demographic updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementEvent {
    pub patient: PatientDemographics,
    pub visit: VisitRef,
    pub location: LocationRef,
    pub movement_id: MovementId,
    pub started_at: NaiveDateTime,
}

/// Payload of admissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionEvent {
    /// PV1-3 names a bed
    Placed(MovementEvent),

    /// No bed; the admission is ignored
    Unplaced {
        location: LocationRef,
        visit_id: Option<VisitId>,
    },
}

/// Payload of demographic updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub patient: PatientDemographics,
    pub visit_id: VisitId,

    /// Visit, location and movement fields, needed when the visit has no
    /// open stay and the update is applied as a transfer
    pub placement: Result<MovementEvent, Hl7Error>,
}

/// Payload of discharges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DischargeEvent {
    pub visit_id: VisitId,
    pub movement_id: MovementId,
    pub started_at: NaiveDateTime,
    pub discharged_at: NaiveDateTime,
}

/// Payload of the three cancellation intents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationEvent {
    pub visit_id: VisitId,
    pub movement_id: MovementId,
}

/// One applicable state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageCommand {
    Admission(AdmissionEvent),
    Transfer(MovementEvent),
    Discharge(DischargeEvent),
    Update(UpdateEvent),
    CancelAdmission(CancellationEvent),
    CancelTransfer(CancellationEvent),
    CancelDischarge(CancellationEvent),
}

impl MessageCommand {
    /// Builds the command for an already classified message
    ///
    /// # Errors
    ///
    /// Returns `MissingSegment` when PID, PV1 or ZBE is absent and
    /// `MalformedField` for the first required field that does not parse.
    pub fn from_message(intent: Intent, message: &AdtMessage) -> Result<Self, Hl7Error> {
        message.require_segments()?;

        let command = match intent {
            Intent::Admission => {
                let location = location_ref(message)?;
                let event = if location.has_bed() {
                    AdmissionEvent::Placed(movement_event(message)?)
                } else {
                    AdmissionEvent::Unplaced {
                        location,
                        visit_id: message.visit_id().ok(),
                    }
                };
                MessageCommand::Admission(event)
            }
            Intent::Transfer => MessageCommand::Transfer(movement_event(message)?),
            Intent::Update => MessageCommand::Update(UpdateEvent {
                patient: demographics(message)?,
                visit_id: message.visit_id()?,
                placement: movement_event(message),
            }),
            Intent::Discharge => MessageCommand::Discharge(DischargeEvent {
                visit_id: message.visit_id()?,
                movement_id: message.movement_id()?,
                started_at: message.movement_start()?,
                discharged_at: message.discharge_date()?,
            }),
            Intent::CancelAdmission => MessageCommand::CancelAdmission(cancellation(message)?),
            Intent::CancelTransfer => MessageCommand::CancelTransfer(cancellation(message)?),
            Intent::CancelDischarge => MessageCommand::CancelDischarge(cancellation(message)?),
        };

        Ok(command)
    }

    pub fn intent(&self) -> Intent {
        match self {
            MessageCommand::Admission(_) => Intent::Admission,
            MessageCommand::Transfer(_) => Intent::Transfer,
            MessageCommand::Discharge(_) => Intent::Discharge,
            MessageCommand::Update(_) => Intent::Update,
            MessageCommand::CancelAdmission(_) => Intent::CancelAdmission,
            MessageCommand::CancelTransfer(_) => Intent::CancelTransfer,
            MessageCommand::CancelDischarge(_) => Intent::CancelDischarge,
        }
    }

    /// PV1-19, absent only for an admission without bed whose visit id
    /// does not parse
    pub fn visit_id(&self) -> Option<VisitId> {
        match self {
            MessageCommand::Admission(AdmissionEvent::Placed(e)) | MessageCommand::Transfer(e) => {
                Some(e.visit.visit_id)
            }
            MessageCommand::Admission(AdmissionEvent::Unplaced { visit_id, .. }) => *visit_id,
            MessageCommand::Update(e) => Some(e.visit_id),
            MessageCommand::Discharge(e) => Some(e.visit_id),
            MessageCommand::CancelAdmission(e)
            | MessageCommand::CancelTransfer(e)
            | MessageCommand::CancelDischarge(e) => Some(e.visit_id),
        }
    }

    /// ZBE-1, when it was read
    pub fn movement_id(&self) -> Option<MovementId> {
        match self {
            MessageCommand::Admission(AdmissionEvent::Placed(e)) | MessageCommand::Transfer(e) => {
                Some(e.movement_id)
            }
            MessageCommand::Admission(AdmissionEvent::Unplaced { .. }) => None,
            MessageCommand::Update(e) => e.placement.as_ref().ok().map(|p| p.movement_id),
            MessageCommand::Discharge(e) => Some(e.movement_id),
            MessageCommand::CancelAdmission(e)
            | MessageCommand::CancelTransfer(e)
            | MessageCommand::CancelDischarge(e) => Some(e.movement_id),
        }
    }
}

fn demographics(message: &AdtMessage) -> Result<PatientDemographics, Hl7Error> {
    Ok(PatientDemographics {
        patient_id: message.patient_id()?,
        date_of_birth: message.date_of_birth()?,
        sex: message.sex()?,
    })
}

fn location_ref(message: &AdtMessage) -> Result<LocationRef, Hl7Error> {
    let location = message.location()?;

    Ok(LocationRef {
        ward: LocationId::new(location.ward).ok(),
        room: LocationId::new(location.room).ok(),
        bed: LocationId::new(location.bed).ok(),
        department: Some(location.department)
            .filter(|d| !d.trim().is_empty())
            .map(str::to_string),
    })
}

fn movement_event(message: &AdtMessage) -> Result<MovementEvent, Hl7Error> {
    Ok(MovementEvent {
        patient: demographics(message)?,
        visit: VisitRef {
            visit_id: message.visit_id()?,
            admission_date: message.admission_date()?,
        },
        location: location_ref(message)?,
        movement_id: message.movement_id()?,
        started_at: message.movement_start()?,
    })
}

fn cancellation(message: &AdtMessage) -> Result<CancellationEvent, Hl7Error> {
    Ok(CancellationEvent {
        visit_id: message.visit_id()?,
        movement_id: message.movement_id()?,
    })
}
