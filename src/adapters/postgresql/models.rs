//! PostgreSQL row mapping
//!
//! Column lists and conversions from `tokio_postgres::Row` to domain models.
//! Every read goes through `try_get` so a schema mismatch surfaces as a
//! query error instead of a panic.

use crate::domain::errors::StoreError;
use crate::domain::ids::{LocationId, MovementId, PatientId, VisitId};
use crate::domain::models::{Discharge, Location, LocationKind, Patient, Sex, Stay, Visit};
use crate::domain::Result;
use chrono::{NaiveDate, NaiveDateTime};
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;

pub const PATIENT_COLUMNS: &str = "patient_id, date_of_birth, sex";

pub const VISIT_COLUMNS: &str = "visit_id, patient_id, admission_date, discharge_date";

pub const STAY_COLUMNS: &str =
    "id, visit_id, movement_id, ward_id, room_id, bed_id, department, start_date, end_date";

pub const DISCHARGE_COLUMNS: &str = "d.id, d.stay_id, d.movement_id";

/// Column holding the parent of a location kind
pub fn parent_column(kind: LocationKind) -> Option<&'static str> {
    match kind {
        LocationKind::Ward => None,
        LocationKind::Room => Some("ward_id"),
        LocationKind::Bed => Some("room_id"),
    }
}

/// Select list of a location table, with the parent aliased to `parent_id`
pub fn location_columns(kind: LocationKind) -> String {
    let parent = parent_column(kind).unwrap_or("NULL::varchar");
    format!("id, name, date_of_activation, date_of_expiry, {parent} AS parent_id")
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, column: &str) -> Result<T> {
    row.try_get(column).map_err(|e| {
        StoreError::QueryFailed(format!("Failed to read column '{column}': {e}")).into()
    })
}

fn location_id(value: String) -> Result<LocationId> {
    LocationId::new(value).map_err(|e| StoreError::QueryFailed(e).into())
}

pub fn patient_from_row(row: &Row) -> Result<Patient> {
    let sex: String = get(row, "sex")?;
    Ok(Patient {
        patient_id: PatientId::new(get(row, "patient_id")?),
        date_of_birth: get::<NaiveDate>(row, "date_of_birth")?,
        sex: sex
            .parse::<Sex>()
            .map_err(StoreError::QueryFailed)?,
    })
}

pub fn visit_from_row(row: &Row) -> Result<Visit> {
    Ok(Visit {
        visit_id: VisitId::new(get(row, "visit_id")?),
        patient_id: PatientId::new(get(row, "patient_id")?),
        admission_date: get::<NaiveDateTime>(row, "admission_date")?,
        discharge_date: get::<Option<NaiveDateTime>>(row, "discharge_date")?,
    })
}

pub fn location_from_row(row: &Row, kind: LocationKind) -> Result<Location> {
    let parent_id = get::<Option<String>>(row, "parent_id")?
        .map(location_id)
        .transpose()?;

    Ok(Location {
        id: location_id(get(row, "id")?)?,
        kind,
        parent_id,
        name: get(row, "name")?,
        date_of_activation: get(row, "date_of_activation")?,
        date_of_expiry: get(row, "date_of_expiry")?,
    })
}

pub fn stay_from_row(row: &Row) -> Result<Stay> {
    Ok(Stay {
        id: get(row, "id")?,
        visit_id: VisitId::new(get(row, "visit_id")?),
        movement_id: MovementId::new(get(row, "movement_id")?),
        ward_id: location_id(get(row, "ward_id")?)?,
        room_id: location_id(get(row, "room_id")?)?,
        bed_id: location_id(get(row, "bed_id")?)?,
        department: get(row, "department")?,
        start_date: get(row, "start_date")?,
        end_date: get(row, "end_date")?,
    })
}

pub fn discharge_from_row(row: &Row) -> Result<Discharge> {
    Ok(Discharge {
        id: get(row, "id")?,
        stay_id: get(row, "stay_id")?,
        movement_id: MovementId::new(get(row, "movement_id")?),
    })
}
