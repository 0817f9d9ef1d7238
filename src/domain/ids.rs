//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers carried by the HL7 feed. The numeric
//! identifiers (patient, visit, movement) come from the hospital information
//! system; location identifiers are the external keys of wards, rooms and beds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier value
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw identifier value
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(format!("{} cannot be empty", $label));
                }
                trimmed
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| format!("{} must be numeric, got '{}'", $label, s))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Patient identifier (PID-2), stable across visits
    PatientId,
    "Patient ID"
);

numeric_id!(
    /// Visit (case) identifier (PV1-19)
    ///
    /// # Examples
    ///
    /// ```
    /// use wardsync::domain::ids::VisitId;
    ///
    /// let visit_id: VisitId = "5223045829".parse().unwrap();
    /// assert_eq!(visit_id.get(), 5223045829);
    /// ```
    VisitId,
    "Visit ID"
);

numeric_id!(
    /// Movement identifier (ZBE-1)
    ///
    /// Sequence number of one physical relocation event. Cancellations are
    /// matched against the movement that created the row.
    MovementId,
    "Movement ID"
);

/// Location identifier newtype wrapper
///
/// External key of a ward, room or bed, taken from a PV1-3 component or
/// generated as a surrogate when the component is empty.
///
/// # Examples
///
/// ```
/// use wardsync::domain::ids::LocationId;
/// use std::str::FromStr;
///
/// let ward = LocationId::from_str("KAR1").unwrap();
/// assert_eq!(ward.as_str(), "KAR1");
/// assert!(!ward.is_surrogate());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(String);

/// Prefix of generated location identifiers
pub const SURROGATE_PREFIX: &str = "surrogate-";

impl LocationId {
    /// Creates a new LocationId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(LocationId)` if the ID is not blank, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Location ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Generates a fresh surrogate identifier
    ///
    /// Used when a message carries an empty location component. The value is
    /// unique per call and can never equal a feed-supplied identifier of the
    /// hospital's naming scheme.
    pub fn surrogate() -> Self {
        Self(format!("{}{}", SURROGATE_PREFIX, uuid::Uuid::new_v4()))
    }

    /// Whether this identifier was generated rather than received
    pub fn is_surrogate(&self) -> bool {
        self.0.starts_with(SURROGATE_PREFIX)
    }

    /// Returns the location ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for LocationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
