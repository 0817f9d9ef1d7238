//! Result of applying one command

use crate::core::classify::Intent;
use crate::domain::ids::{LocationId, PatientId};
use chrono::NaiveDateTime;
use std::fmt;

/// One observable state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StayOpened { stay_id: i64, bed_id: LocationId },
    StayClosed { stay_id: i64, end_date: NaiveDateTime },
    StayReopened { stay_id: i64 },
    StayDeleted { stay_id: i64 },
    DischargeRecorded { discharge_id: i64, stay_id: i64 },
    DischargeDeleted { discharge_id: i64 },
    VisitDischarged { discharge_date: NaiveDateTime },
    VisitDischargeCleared,
    DemographicsUpdated { patient_id: PatientId },
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::StayOpened { stay_id, bed_id } => {
                write!(f, "opened stay {stay_id} in bed {bed_id}")
            }
            Effect::StayClosed { stay_id, end_date } => {
                write!(f, "closed stay {stay_id} at {end_date}")
            }
            Effect::StayReopened { stay_id } => write!(f, "reopened stay {stay_id}"),
            Effect::StayDeleted { stay_id } => write!(f, "deleted stay {stay_id}"),
            Effect::DischargeRecorded {
                discharge_id,
                stay_id,
            } => write!(f, "recorded discharge {discharge_id} for stay {stay_id}"),
            Effect::DischargeDeleted { discharge_id } => {
                write!(f, "deleted discharge {discharge_id}")
            }
            Effect::VisitDischarged { discharge_date } => {
                write!(f, "set visit discharge date {discharge_date}")
            }
            Effect::VisitDischargeCleared => write!(f, "cleared visit discharge date"),
            Effect::DemographicsUpdated { patient_id } => {
                write!(f, "updated demographics of patient {patient_id}")
            }
        }
    }
}

/// Why a command changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Admission without a bed component
    NoBed,
    /// Transfer that found no open stay and names no bed
    NothingToTransfer,
    /// Discharge for a visit that is unknown and has no open stay
    UnknownVisit,
    /// Demographic update for a patient that is not stored
    UnknownPatient,
    /// Cancellation whose target row does not exist
    NothingToCancel,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NoOpReason::NoBed => "no bed assigned",
            NoOpReason::NothingToTransfer => "no open stay and no bed assigned",
            NoOpReason::UnknownVisit => "visit not found",
            NoOpReason::UnknownPatient => "patient not found",
            NoOpReason::NothingToCancel => "nothing to cancel",
        };
        f.write_str(text)
    }
}

/// Outcome of [`ReconciliationEngine::apply`](super::ReconciliationEngine::apply)
///
/// `intent` is the intent actually applied, which differs from the
/// classified one when an update was treated as a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { intent: Intent, effects: Vec<Effect> },
    NoOp { intent: Intent, reason: NoOpReason },
}

impl ApplyOutcome {
    pub fn intent(&self) -> Intent {
        match self {
            ApplyOutcome::Applied { intent, .. } | ApplyOutcome::NoOp { intent, .. } => *intent,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }

    pub fn effects(&self) -> &[Effect] {
        match self {
            ApplyOutcome::Applied { effects, .. } => effects,
            ApplyOutcome::NoOp { .. } => &[],
        }
    }

    pub(crate) fn from_effects(intent: Intent, effects: Vec<Effect>, reason: NoOpReason) -> Self {
        if effects.is_empty() {
            ApplyOutcome::NoOp { intent, reason }
        } else {
            ApplyOutcome::Applied { intent, effects }
        }
    }
}
