//! Typed accessors for the ADT fields the engine consumes
//!
//! Field positions are fixed by the hospital's interface and must not change.

use super::parser::{RawMessage, Segment};
use crate::domain::errors::Hl7Error;
use crate::domain::ids::{MovementId, PatientId, VisitId};
use crate::domain::models::Sex;
use chrono::{NaiveDate, NaiveDateTime};

pub const HL7_DATE_FORMAT: &str = "%Y%m%d";
pub const HL7_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const DATE_EXPECTED: &str = "YYYYMMDD";
const TIMESTAMP_EXPECTED: &str = "YYYYMMDDHHMMSS";

pub const MSH_CREATED_AT_FIELD: usize = 7;
pub const MSH_MESSAGE_TYPE_FIELD: usize = 9;
pub const MESSAGE_TYPE_COMPONENT: usize = 1;
pub const TRIGGER_EVENT_COMPONENT: usize = 2;

pub const PID_PATIENT_ID_FIELD: usize = 2;
pub const PID_DATE_OF_BIRTH_FIELD: usize = 7;
pub const PID_SEX_FIELD: usize = 8;

pub const PV1_LOCATION_FIELD: usize = 3;
pub const LOCATION_WARD_COMPONENT: usize = 1;
pub const LOCATION_ROOM_COMPONENT: usize = 2;
pub const LOCATION_BED_COMPONENT: usize = 3;
pub const LOCATION_DEPARTMENT_COMPONENT: usize = 4;
pub const PV1_VISIT_ID_FIELD: usize = 19;
pub const PV1_ADMISSION_FIELD: usize = 44;
pub const PV1_DISCHARGE_FIELD: usize = 45;

pub const ZBE_MOVEMENT_ID_FIELD: usize = 1;
pub const ZBE_MOVEMENT_START_FIELD: usize = 2;

/// Segments every supported ADT message must carry
pub const REQUIRED_SEGMENTS: [&str; 4] = ["MSH", "PID", "PV1", "ZBE"];

/// Raw PV1-3 components; empty strings when absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientLocation<'a> {
    pub ward: &'a str,
    pub room: &'a str,
    pub bed: &'a str,
    pub department: &'a str,
}

/// An ADT message with typed field access
#[derive(Debug, Clone)]
pub struct AdtMessage {
    raw: RawMessage,
}

impl AdtMessage {
    /// Parses one message text
    ///
    /// Only the MSH header is required here. The remaining segments are
    /// checked by [`AdtMessage::require_segments`] once the message is known
    /// to be of a supported type.
    pub fn parse(text: &str) -> Result<Self, Hl7Error> {
        let raw = RawMessage::parse(text)?;
        raw.require("MSH")?;
        Ok(Self { raw })
    }

    pub fn raw(&self) -> &RawMessage {
        &self.raw
    }

    /// Fails with `MissingSegment` for the first absent required segment
    pub fn require_segments(&self) -> Result<(), Hl7Error> {
        for id in REQUIRED_SEGMENTS {
            self.raw.require(id)?;
        }
        Ok(())
    }

    fn msh(&self) -> Result<&Segment, Hl7Error> {
        self.raw.require("MSH")
    }

    fn pid(&self) -> Result<&Segment, Hl7Error> {
        self.raw.require("PID")
    }

    fn pv1(&self) -> Result<&Segment, Hl7Error> {
        self.raw.require("PV1")
    }

    fn zbe(&self) -> Result<&Segment, Hl7Error> {
        self.raw.require("ZBE")
    }

    /// MSH-7 message creation timestamp
    pub fn created_at(&self) -> Result<NaiveDateTime, Hl7Error> {
        parse_timestamp("MSH-7", self.msh()?.field(MSH_CREATED_AT_FIELD))
    }

    /// MSH-9.1, e.g. `ADT`
    pub fn message_type(&self) -> &str {
        self.raw
            .segment("MSH")
            .map(|s| s.component(MSH_MESSAGE_TYPE_FIELD, MESSAGE_TYPE_COMPONENT))
            .unwrap_or("")
    }

    /// MSH-9.2, e.g. `A01`
    pub fn trigger_event(&self) -> &str {
        self.raw
            .segment("MSH")
            .map(|s| s.component(MSH_MESSAGE_TYPE_FIELD, TRIGGER_EVENT_COMPONENT))
            .unwrap_or("")
    }

    /// PID-2
    pub fn patient_id(&self) -> Result<PatientId, Hl7Error> {
        let value = self.pid()?.field(PID_PATIENT_ID_FIELD);
        value
            .parse()
            .map_err(|_| Hl7Error::field("PID-2", value, "numeric patient id"))
    }

    /// PID-7
    pub fn date_of_birth(&self) -> Result<NaiveDate, Hl7Error> {
        parse_date("PID-7", self.pid()?.field(PID_DATE_OF_BIRTH_FIELD))
    }

    /// PID-8
    pub fn sex(&self) -> Result<Sex, Hl7Error> {
        let value = self.pid()?.field(PID_SEX_FIELD);
        value
            .parse()
            .map_err(|_| Hl7Error::field("PID-8", value, "one of M, F, D"))
    }

    /// PV1-19
    pub fn visit_id(&self) -> Result<VisitId, Hl7Error> {
        let value = self.pv1()?.field(PV1_VISIT_ID_FIELD);
        value
            .parse()
            .map_err(|_| Hl7Error::field("PV1-19", value, "numeric visit id"))
    }

    /// PV1-44
    pub fn admission_date(&self) -> Result<NaiveDateTime, Hl7Error> {
        parse_timestamp("PV1-44", self.pv1()?.field(PV1_ADMISSION_FIELD))
    }

    /// PV1-45
    pub fn discharge_date(&self) -> Result<NaiveDateTime, Hl7Error> {
        parse_timestamp("PV1-45", self.pv1()?.field(PV1_DISCHARGE_FIELD))
    }

    /// PV1-3 components
    pub fn location(&self) -> Result<PatientLocation<'_>, Hl7Error> {
        let pv1 = self.pv1()?;
        Ok(PatientLocation {
            ward: pv1.component(PV1_LOCATION_FIELD, LOCATION_WARD_COMPONENT),
            room: pv1.component(PV1_LOCATION_FIELD, LOCATION_ROOM_COMPONENT),
            bed: pv1.component(PV1_LOCATION_FIELD, LOCATION_BED_COMPONENT),
            department: pv1.component(PV1_LOCATION_FIELD, LOCATION_DEPARTMENT_COMPONENT),
        })
    }

    /// ZBE-1
    pub fn movement_id(&self) -> Result<MovementId, Hl7Error> {
        let value = self.zbe()?.field(ZBE_MOVEMENT_ID_FIELD);
        value
            .parse()
            .map_err(|_| Hl7Error::field("ZBE-1", value, "numeric movement id"))
    }

    /// ZBE-2
    pub fn movement_start(&self) -> Result<NaiveDateTime, Hl7Error> {
        parse_timestamp("ZBE-2", self.zbe()?.field(ZBE_MOVEMENT_START_FIELD))
    }
}

/// Parses a `YYYYMMDD` value
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, Hl7Error> {
    if value.len() != DATE_EXPECTED.len() {
        return Err(Hl7Error::field(field, value, DATE_EXPECTED));
    }
    NaiveDate::parse_from_str(value, HL7_DATE_FORMAT)
        .map_err(|_| Hl7Error::field(field, value, DATE_EXPECTED))
}

/// Parses a `YYYYMMDDHHMMSS` value
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<NaiveDateTime, Hl7Error> {
    if value.len() != TIMESTAMP_EXPECTED.len() {
        return Err(Hl7Error::field(field, value, TIMESTAMP_EXPECTED));
    }
    NaiveDateTime::parse_from_str(value, HL7_TIMESTAMP_FORMAT)
        .map_err(|_| Hl7Error::field(field, value, TIMESTAMP_EXPECTED))
}
