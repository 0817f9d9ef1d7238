//! Domain models and types for Wardsync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`PatientId`], [`VisitId`], [`MovementId`], [`LocationId`])
//! - **Persisted entities** ([`Patient`], [`Visit`], [`Location`], [`Stay`], [`Discharge`])
//! - **Error types** ([`WardsyncError`], [`Hl7Error`], [`StoreError`], [`IngestError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers are newtypes so a visit id can never be passed where a movement
//! id is expected:
//!
//! ```rust
//! use wardsync::domain::{MovementId, VisitId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let visit_id: VisitId = "4223045829".parse()?;
//! let movement_id = MovementId::new(2);
//!
//! // This won't compile
//! // let wrong: VisitId = movement_id;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod models;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{Hl7Error, IngestError, MessageErrorDetail, StoreError, WardsyncError};
pub use ids::{LocationId, MovementId, PatientId, VisitId};
pub use models::{
    Discharge, Location, LocationKind, NewLocation, NewStay, Patient, Sex, Stay, Visit,
};
pub use result::Result;
