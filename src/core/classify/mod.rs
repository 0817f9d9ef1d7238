//! Message classification
//!
//! Maps the MSH-9 message type and trigger event to an [`Intent`] and builds
//! the typed [`MessageCommand`] the reconciliation engine applies.

pub mod command;

pub use command::{
    AdmissionEvent, CancellationEvent, DischargeEvent, LocationRef, MessageCommand,
    MovementEvent, PatientDemographics, UpdateEvent, VisitRef,
};

use crate::domain::errors::Hl7Error;
use crate::hl7::AdtMessage;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a supported ADT message asks the engine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Admission,
    Transfer,
    Discharge,
    Update,
    CancelAdmission,
    CancelTransfer,
    CancelDischarge,
}

impl Intent {
    /// Final intent of an update once the visit's state is known
    ///
    /// An update for a visit without an open stay is treated as a transfer:
    /// the feed was joined after the admission and the update is the first
    /// location the system learns about. Every other intent is unchanged.
    pub fn resolve_update(self, visit_has_open_stay: bool) -> Intent {
        match self {
            Intent::Update if !visit_has_open_stay => Intent::Transfer,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Admission => "admission",
            Intent::Transfer => "transfer",
            Intent::Discharge => "discharge",
            Intent::Update => "update",
            Intent::CancelAdmission => "cancel_admission",
            Intent::CancelTransfer => "cancel_transfer",
            Intent::CancelDischarge => "cancel_discharge",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a message by MSH-9.1 and MSH-9.2
///
/// Returns `None` for every combination the engine does not handle.
///
/// # Examples
///
/// ```
/// use wardsync::core::classify::{classify, Intent};
///
/// assert_eq!(classify("ADT", "A07"), Some(Intent::Discharge));
/// assert_eq!(classify("ADT", "A40"), None);
/// assert_eq!(classify("ORU", "R01"), None);
/// ```
pub fn classify(message_type: &str, trigger_event: &str) -> Option<Intent> {
    if message_type != "ADT" {
        return None;
    }

    match trigger_event {
        "A01" => Some(Intent::Admission),
        "A02" => Some(Intent::Transfer),
        "A03" | "A07" => Some(Intent::Discharge),
        "A08" => Some(Intent::Update),
        "A11" => Some(Intent::CancelAdmission),
        "A12" => Some(Intent::CancelTransfer),
        "A13" => Some(Intent::CancelDischarge),
        _ => None,
    }
}

/// A supported message ready to be ordered and applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedMessage {
    /// MSH-7, the ordering key
    pub created_at: NaiveDateTime,
    pub command: MessageCommand,
}

/// Outcome of decoding one message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Supported(ClassifiedMessage),

    /// Parsed, but of a type the engine ignores
    Unsupported {
        message_type: String,
        trigger_event: String,
    },
}

/// Parses, classifies and builds the command for one message text
///
/// # Errors
///
/// Returns the parse or field error of a supported message. Unsupported
/// messages are not inspected beyond MSH-9.
pub fn decode_message(text: &str) -> Result<Decoded, Hl7Error> {
    let message = AdtMessage::parse(text)?;

    let Some(intent) = classify(message.message_type(), message.trigger_event()) else {
        return Ok(Decoded::Unsupported {
            message_type: message.message_type().to_string(),
            trigger_event: message.trigger_event().to_string(),
        });
    };

    let created_at = message.created_at()?;
    let command = MessageCommand::from_message(intent, &message)?;

    Ok(Decoded::Supported(ClassifiedMessage {
        created_at,
        command,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{LocationId, MovementId, VisitId};
    use test_case::test_case;

    fn adt(trigger: &str, location: &str, discharge: &str) -> String {
        format!(
            "MSH|^~\\&|HIS|KH|RCV|KH|20230101120000||ADT^{trigger}|1|P|2.5\r\
             PID|1|1441645|||||20000101|F\r\
             PV1|1|I|{location}{}|4223045829{}|20230101080000|{discharge}\r\
             ZBE|3|20230101120000",
            "|".repeat(15),
            "|".repeat(24)
        )
    }

    #[test_case("A01", Some(Intent::Admission); "admission")]
    #[test_case("A02", Some(Intent::Transfer); "transfer")]
    #[test_case("A03", Some(Intent::Discharge); "discharge")]
    #[test_case("A07", Some(Intent::Discharge); "change to outpatient")]
    #[test_case("A08", Some(Intent::Update); "update")]
    #[test_case("A11", Some(Intent::CancelAdmission); "cancel admission")]
    #[test_case("A12", Some(Intent::CancelTransfer); "cancel transfer")]
    #[test_case("A13", Some(Intent::CancelDischarge); "cancel discharge")]
    #[test_case("A04", None; "outpatient admission")]
    #[test_case("A06", None; "change to inpatient")]
    #[test_case("A40", None; "merge")]
    #[test_case("", None; "empty trigger")]
    fn test_classify_adt(trigger: &str, expected: Option<Intent>) {
        assert_eq!(classify("ADT", trigger), expected);
    }

    #[test]
    fn test_classify_non_adt() {
        assert_eq!(classify("ORU", "A01"), None);
        assert_eq!(classify("adt", "A01"), None);
    }

    #[test_case(Intent::Update, false, Intent::Transfer; "update without open stay")]
    #[test_case(Intent::Update, true, Intent::Update; "update with open stay")]
    #[test_case(Intent::Admission, false, Intent::Admission; "admission untouched")]
    #[test_case(Intent::Discharge, true, Intent::Discharge; "discharge untouched")]
    fn test_resolve_update(intent: Intent, open: bool, expected: Intent) {
        assert_eq!(intent.resolve_update(open), expected);
    }

    #[test]
    fn test_decode_admission() {
        let text = adt("A01", "KAR1^R101^B1^CHIR", "");
        let Decoded::Supported(classified) = decode_message(&text).unwrap() else {
            panic!("expected a supported message");
        };

        assert_eq!(classified.created_at.to_string(), "2023-01-01 12:00:00");
        let MessageCommand::Admission(AdmissionEvent::Placed(event)) = classified.command else {
            panic!("expected a placed admission");
        };
        assert_eq!(event.visit.visit_id, VisitId::new(4_223_045_829));
        assert_eq!(event.movement_id, MovementId::new(3));
        assert_eq!(event.location.bed, Some(LocationId::new("B1").unwrap()));
        assert_eq!(event.location.department.as_deref(), Some("CHIR"));
    }

    #[test]
    fn test_decode_admission_without_bed() {
        let text = adt("A01", "KAR1^R101", "");
        let Decoded::Supported(classified) = decode_message(&text).unwrap() else {
            panic!("expected a supported message");
        };
        let MessageCommand::Admission(AdmissionEvent::Unplaced { location, visit_id }) =
            classified.command
        else {
            panic!("expected an admission without bed");
        };
        assert!(!location.has_bed());
        assert!(location.department.is_none());
        assert_eq!(visit_id, Some(VisitId::new(4_223_045_829)));
    }

    #[test]
    fn test_admission_without_bed_ignores_movement_fields() {
        // Blank admission date and movement start
        let text = adt("A01", "KAR1^R1", "")
            .replace("|20230101080000|", "||")
            .replace("ZBE|3|20230101120000", "ZBE||");
        let Decoded::Supported(classified) = decode_message(&text).unwrap() else {
            panic!("expected a supported message");
        };
        assert!(matches!(
            classified.command,
            MessageCommand::Admission(AdmissionEvent::Unplaced { .. })
        ));
        assert_eq!(classified.command.movement_id(), None);
    }

    #[test]
    fn test_admission_with_bed_requires_movement_fields() {
        let text = adt("A01", "KAR1^R1^B1", "").replace("|20230101080000|", "||");
        match decode_message(&text).unwrap_err() {
            Hl7Error::MalformedField { field, .. } => assert_eq!(field, "PV1-44"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_update_defers_placement_fields() {
        let text = adt("A08", "KAR1^R1^B1", "").replace("ZBE|3|20230101120000", "ZBE|3|");
        let Decoded::Supported(classified) = decode_message(&text).unwrap() else {
            panic!("expected a supported message");
        };
        let MessageCommand::Update(event) = classified.command else {
            panic!("expected an update");
        };
        assert_eq!(event.visit_id, VisitId::new(4_223_045_829));
        assert_eq!(event.patient.patient_id.get(), 1_441_645);
        match event.placement {
            Err(Hl7Error::MalformedField { field, .. }) => assert_eq!(field, "ZBE-2"),
            other => panic!("unexpected placement: {other:?}"),
        }
    }

    #[test]
    fn test_update_requires_demographics() {
        let text = adt("A08", "KAR1^R1^B1", "").replace("|20000101|", "|2000|");
        match decode_message(&text).unwrap_err() {
            Hl7Error::MalformedField { field, .. } => assert_eq!(field, "PID-7"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_discharge_requires_discharge_date() {
        let text = adt("A03", "KAR1^R101^B1", "");
        match decode_message(&text).unwrap_err() {
            Hl7Error::MalformedField { field, .. } => assert_eq!(field, "PV1-45"),
            other => panic!("unexpected error: {other:?}"),
        }

        let text = adt("A03", "KAR1^R101^B1", "20230105100000");
        let Decoded::Supported(classified) = decode_message(&text).unwrap() else {
            panic!("expected a supported message");
        };
        assert_eq!(classified.command.intent(), Intent::Discharge);
    }

    #[test]
    fn test_decode_unsupported_skips_field_checks() {
        let text = "MSH|^~\\&|HIS|KH|RCV|KH|not-a-date||ADT^A40|1|P|2.5";
        assert_eq!(
            decode_message(text).unwrap(),
            Decoded::Unsupported {
                message_type: "ADT".to_string(),
                trigger_event: "A40".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_cancel_requires_zbe() {
        let text = "MSH|^~\\&|HIS|KH|RCV|KH|20230101120000||ADT^A11|1|P|2.5\rPID|1|1\rPV1|1";
        assert_eq!(
            decode_message(text).unwrap_err(),
            Hl7Error::MissingSegment("ZBE")
        );
    }

    #[test]
    fn test_command_accessors() {
        let text = adt("A12", "KAR1^R101^B1", "");
        let Decoded::Supported(classified) = decode_message(&text).unwrap() else {
            panic!("expected a supported message");
        };
        assert_eq!(classified.command.intent(), Intent::CancelTransfer);
        assert_eq!(classified.command.visit_id(), Some(VisitId::new(4_223_045_829)));
        assert_eq!(classified.command.movement_id(), Some(MovementId::new(3)));
    }
}
