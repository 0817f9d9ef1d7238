//! Persisted entities of the occupancy model
//!
//! Patient owns visits, a visit owns stays and a stay optionally owns one
//! discharge. Wards, rooms and beds are referenced by stays, never owned.

use super::ids::{LocationId, MovementId, PatientId, VisitId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative sex of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Diverse,
}

impl Sex {
    /// Single-letter code stored in the database
    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Diverse => "D",
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    /// Parses an HL7 administrative sex value
    ///
    /// `M` and `F` map directly. `D` and the HL7 table 0001 codes for other,
    /// ambiguous, non-binary and unknown (`O`, `A`, `N`, `X`, `U`) collapse to
    /// [`Sex::Diverse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Sex::Male),
            "F" => Ok(Sex::Female),
            "D" | "O" | "A" | "N" | "X" | "U" => Ok(Sex::Diverse),
            other => Err(format!("unknown administrative sex '{other}'")),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A patient, stable across visits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: PatientId,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
}

/// One hospital case of a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub visit_id: VisitId,
    pub patient_id: PatientId,
    pub admission_date: NaiveDateTime,

    /// Set by a discharge, cleared by its cancellation
    pub discharge_date: Option<NaiveDateTime>,
}

/// Level of a location in the ward/room/bed hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Ward,
    Room,
    Bed,
}

impl LocationKind {
    /// Name of the backing table
    pub fn table(self) -> &'static str {
        match self {
            LocationKind::Ward => "wards",
            LocationKind::Room => "rooms",
            LocationKind::Bed => "beds",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocationKind::Ward => "ward",
            LocationKind::Room => "room",
            LocationKind::Bed => "bed",
        };
        f.write_str(name)
    }
}

/// A ward, room or bed row
///
/// `parent_id` is `None` for wards, the ward for rooms and the room for beds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub kind: LocationKind,
    pub parent_id: Option<LocationId>,
    pub name: String,
    pub date_of_activation: NaiveDateTime,
    pub date_of_expiry: NaiveDateTime,
}

/// Insert-only defaults for a location seen for the first time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocation {
    pub id: LocationId,
    pub kind: LocationKind,
    pub parent_id: Option<LocationId>,
    pub date_of_activation: NaiveDateTime,
    pub date_of_expiry: NaiveDateTime,
}

impl NewLocation {
    /// Materialises the row with `name = id`
    pub fn into_location(self) -> Location {
        Location {
            name: self.id.as_str().to_string(),
            id: self.id,
            kind: self.kind,
            parent_id: self.parent_id,
            date_of_activation: self.date_of_activation,
            date_of_expiry: self.date_of_expiry,
        }
    }
}

/// One contiguous occupancy of a bed by a visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    /// Store-assigned, increasing in creation order
    pub id: i64,
    pub visit_id: VisitId,
    pub movement_id: MovementId,
    pub ward_id: LocationId,
    pub room_id: LocationId,
    pub bed_id: LocationId,
    pub department: Option<String>,
    pub start_date: NaiveDateTime,

    /// `None` while the stay is open
    pub end_date: Option<NaiveDateTime>,
}

impl Stay {
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

/// Values for a stay about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStay {
    pub visit_id: VisitId,
    pub movement_id: MovementId,
    pub ward_id: LocationId,
    pub room_id: LocationId,
    pub bed_id: LocationId,
    pub department: Option<String>,
    pub start_date: NaiveDateTime,
}

impl NewStay {
    /// Materialises an open stay with the given store id
    pub fn into_stay(self, id: i64) -> Stay {
        Stay {
            id,
            visit_id: self.visit_id,
            movement_id: self.movement_id,
            ward_id: self.ward_id,
            room_id: self.room_id,
            bed_id: self.bed_id,
            department: self.department,
            start_date: self.start_date,
            end_date: None,
        }
    }
}

/// Record of the discharge that closed a stay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discharge {
    pub id: i64,
    pub stay_id: i64,
    pub movement_id: MovementId,
}
