//! PostgreSQL adapter implementing the stay store traits
//!
//! Each transaction pins one pooled connection and drives it with explicit
//! `BEGIN` / `COMMIT` / `ROLLBACK`. A transaction dropped without finishing
//! detaches its connection from the pool, which closes the session and makes
//! the server abort the transaction.

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    discharge_from_row, location_columns, location_from_row, parent_column, patient_from_row,
    stay_from_row, visit_from_row, DISCHARGE_COLUMNS, PATIENT_COLUMNS, STAY_COLUMNS,
    VISIT_COLUMNS,
};
use crate::adapters::store::traits::{StayStore, StoreTransaction};
use crate::domain::errors::StoreError;
use crate::domain::ids::{MovementId, PatientId, VisitId};
use crate::domain::models::{Discharge, Location, NewLocation, NewStay, Patient, Sex, Stay, Visit};
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use deadpool_postgres::Object;
use std::sync::Arc;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

type Params<'a> = &'a [&'a (dyn ToSql + Sync)];

/// PostgreSQL implementation of the stay store
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a new PostgreSQL adapter with an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl StayStore for PostgreSQLAdapter {
    fn backend(&self) -> &'static str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await?;
        let status = self.client.pool_status();
        tracing::debug!(
            max_size = status.max_size,
            size = status.size,
            available = status.available,
            "PostgreSQL pool status"
        );
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let conn = self.client.get_connection().await?;
        conn.batch_execute("BEGIN").await.map_err(|e| {
            StoreError::TransactionFailed(format!("Failed to begin transaction: {e}"))
        })?;
        Ok(Box::new(PostgreSQLTransaction { conn: Some(conn) }))
    }
}

/// A transaction on one pinned connection
pub struct PostgreSQLTransaction {
    conn: Option<Object>,
}

impl PostgreSQLTransaction {
    fn conn(&self) -> Result<&Object> {
        self.conn.as_ref().ok_or_else(|| {
            StoreError::TransactionFailed("Transaction already finished".to_string()).into()
        })
    }

    async fn query(&self, sql: &str, params: Params<'_>) -> Result<Vec<Row>> {
        self.conn()?
            .query(sql, params)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {e}")).into())
    }

    async fn query_opt(&self, sql: &str, params: Params<'_>) -> Result<Option<Row>> {
        self.conn()?
            .query_opt(sql, params)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {e}")).into())
    }

    async fn execute(&self, sql: &str, params: Params<'_>) -> Result<u64> {
        self.conn()?
            .execute(sql, params)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Statement execution failed: {e}")).into())
    }

    async fn finish(mut self: Box<Self>, statement: &str) -> Result<()> {
        let conn = self.conn.take().ok_or_else(|| {
            StoreError::TransactionFailed("Transaction already finished".to_string())
        })?;
        conn.batch_execute(statement)
            .await
            .map_err(|e| StoreError::TransactionFailed(format!("{statement} failed: {e}")).into())
    }

    async fn find_location(&self, location: &NewLocation) -> Result<Option<Location>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            location_columns(location.kind),
            location.kind.table()
        );
        self.query_opt(&sql, &[&location.id.as_str()])
            .await?
            .map(|row| location_from_row(&row, location.kind))
            .transpose()
    }

    async fn insert_location(&self, location: &NewLocation) -> Result<Option<Location>> {
        let kind = location.kind;
        let returning = location_columns(kind);
        let row = match (parent_column(kind), &location.parent_id) {
            (None, _) => {
                let sql = format!(
                    "INSERT INTO {} (id, name, date_of_activation, date_of_expiry) \
                     VALUES ($1, $1, $2, $3) ON CONFLICT (id) DO NOTHING RETURNING {returning}",
                    kind.table()
                );
                self.query_opt(
                    &sql,
                    &[
                        &location.id.as_str(),
                        &location.date_of_activation,
                        &location.date_of_expiry,
                    ],
                )
                .await?
            }
            (Some(parent), Some(parent_id)) => {
                let sql = format!(
                    "INSERT INTO {} (id, name, date_of_activation, date_of_expiry, {parent}) \
                     VALUES ($1, $1, $2, $3, $4) ON CONFLICT (id) DO NOTHING RETURNING {returning}",
                    kind.table()
                );
                self.query_opt(
                    &sql,
                    &[
                        &location.id.as_str(),
                        &location.date_of_activation,
                        &location.date_of_expiry,
                        &parent_id.as_str(),
                    ],
                )
                .await?
            }
            (Some(_), None) => {
                return Err(StoreError::Conflict(format!(
                    "{} {} requires a parent",
                    kind, location.id
                ))
                .into());
            }
        };

        row.map(|row| location_from_row(&row, kind)).transpose()
    }
}

impl Drop for PostgreSQLTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Transaction dropped without commit or rollback, discarding connection");
            drop(Object::take(conn));
        }
    }
}

#[async_trait]
impl StoreTransaction for PostgreSQLTransaction {
    async fn get_or_create_patient(&mut self, patient: &Patient) -> Result<(Patient, bool)> {
        let insert = format!(
            "INSERT INTO patients ({PATIENT_COLUMNS}) VALUES ($1, $2, $3) \
             ON CONFLICT (patient_id) DO NOTHING RETURNING {PATIENT_COLUMNS}"
        );
        let patient_id = patient.patient_id.get();
        if let Some(row) = self
            .query_opt(
                &insert,
                &[&patient_id, &patient.date_of_birth, &patient.sex.code()],
            )
            .await?
        {
            return Ok((patient_from_row(&row)?, true));
        }

        let existing = self.find_patient(patient.patient_id).await?.ok_or_else(|| {
            StoreError::NotFound(format!("patient {} vanished", patient.patient_id))
        })?;
        Ok((existing, false))
    }

    async fn find_patient(&mut self, patient_id: PatientId) -> Result<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = $1");
        self.query_opt(&sql, &[&patient_id.get()])
            .await?
            .map(|row| patient_from_row(&row))
            .transpose()
    }

    async fn update_patient_demographics(
        &mut self,
        patient_id: PatientId,
        date_of_birth: NaiveDate,
        sex: Sex,
    ) -> Result<bool> {
        let updated = self
            .execute(
                "UPDATE patients SET date_of_birth = $2, sex = $3 WHERE patient_id = $1",
                &[&patient_id.get(), &date_of_birth, &sex.code()],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn get_or_create_visit(&mut self, visit: &Visit) -> Result<(Visit, bool)> {
        let insert = format!(
            "INSERT INTO visits ({VISIT_COLUMNS}) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (visit_id) DO NOTHING RETURNING {VISIT_COLUMNS}"
        );
        if let Some(row) = self
            .query_opt(
                &insert,
                &[
                    &visit.visit_id.get(),
                    &visit.patient_id.get(),
                    &visit.admission_date,
                    &visit.discharge_date,
                ],
            )
            .await?
        {
            return Ok((visit_from_row(&row)?, true));
        }

        let existing = self
            .find_visit(visit.visit_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("visit {} vanished", visit.visit_id)))?;
        Ok((existing, false))
    }

    async fn find_visit(&mut self, visit_id: VisitId) -> Result<Option<Visit>> {
        let sql = format!("SELECT {VISIT_COLUMNS} FROM visits WHERE visit_id = $1");
        self.query_opt(&sql, &[&visit_id.get()])
            .await?
            .map(|row| visit_from_row(&row))
            .transpose()
    }

    async fn set_visit_discharge_date(
        &mut self,
        visit_id: VisitId,
        discharge_date: Option<NaiveDateTime>,
    ) -> Result<bool> {
        let updated = self
            .execute(
                "UPDATE visits SET discharge_date = $2 WHERE visit_id = $1",
                &[&visit_id.get(), &discharge_date],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn get_or_create_location(
        &mut self,
        location: &NewLocation,
    ) -> Result<(Location, bool)> {
        if let Some(created) = self.insert_location(location).await? {
            return Ok((created, true));
        }

        let existing = self.find_location(location).await?.ok_or_else(|| {
            StoreError::NotFound(format!("{} {} vanished", location.kind, location.id))
        })?;

        if existing.parent_id != location.parent_id {
            return Err(StoreError::Conflict(format!(
                "{} {} exists under {:?}, not {:?}",
                location.kind, location.id, existing.parent_id, location.parent_id
            ))
            .into());
        }
        Ok((existing, false))
    }

    async fn create_stay(&mut self, stay: NewStay) -> Result<Stay> {
        let sql = format!(
            "INSERT INTO stays (visit_id, movement_id, ward_id, room_id, bed_id, department, start_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {STAY_COLUMNS}"
        );
        let rows = self
            .query(
                &sql,
                &[
                    &stay.visit_id.get(),
                    &stay.movement_id.get(),
                    &stay.ward_id.as_str(),
                    &stay.room_id.as_str(),
                    &stay.bed_id.as_str(),
                    &stay.department,
                    &stay.start_date,
                ],
            )
            .await?;

        let row = rows
            .first()
            .ok_or_else(|| StoreError::QueryFailed("Stay insert returned no row".to_string()))?;
        stay_from_row(row)
    }

    async fn latest_open_stay(&mut self, visit_id: VisitId) -> Result<Option<Stay>> {
        let sql = format!(
            "SELECT {STAY_COLUMNS} FROM stays WHERE visit_id = $1 AND end_date IS NULL \
             ORDER BY id DESC LIMIT 1"
        );
        self.query_opt(&sql, &[&visit_id.get()])
            .await?
            .map(|row| stay_from_row(&row))
            .transpose()
    }

    async fn find_stay_by_movement(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Stay>> {
        let sql = format!(
            "SELECT {STAY_COLUMNS} FROM stays WHERE visit_id = $1 AND movement_id = $2 \
             ORDER BY id DESC LIMIT 1"
        );
        self.query_opt(&sql, &[&visit_id.get(), &movement_id.get()])
            .await?
            .map(|row| stay_from_row(&row))
            .transpose()
    }

    async fn previous_stay(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Stay>> {
        let sql = format!(
            "SELECT {STAY_COLUMNS} FROM stays WHERE visit_id = $1 AND movement_id < $2 \
             ORDER BY movement_id DESC, id DESC LIMIT 1"
        );
        self.query_opt(&sql, &[&visit_id.get(), &movement_id.get()])
            .await?
            .map(|row| stay_from_row(&row))
            .transpose()
    }

    async fn set_stay_end_date(
        &mut self,
        stay_id: i64,
        end_date: Option<NaiveDateTime>,
    ) -> Result<()> {
        let updated = self
            .execute(
                "UPDATE stays SET end_date = $2 WHERE id = $1",
                &[&stay_id, &end_date],
            )
            .await?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("stay {stay_id}")).into());
        }
        Ok(())
    }

    async fn delete_stay(&mut self, stay_id: i64) -> Result<()> {
        self.execute("DELETE FROM stays WHERE id = $1", &[&stay_id])
            .await?;
        Ok(())
    }

    async fn stays_for_visit(&mut self, visit_id: VisitId) -> Result<Vec<Stay>> {
        let sql = format!("SELECT {STAY_COLUMNS} FROM stays WHERE visit_id = $1 ORDER BY id");
        self.query(&sql, &[&visit_id.get()])
            .await?
            .iter()
            .map(stay_from_row)
            .collect()
    }

    async fn create_discharge(
        &mut self,
        stay_id: i64,
        movement_id: MovementId,
    ) -> Result<Discharge> {
        let rows = self
            .query(
                "INSERT INTO discharges (stay_id, movement_id) VALUES ($1, $2) \
                 RETURNING id, stay_id, movement_id",
                &[&stay_id, &movement_id.get()],
            )
            .await?;

        let row = rows.first().ok_or_else(|| {
            StoreError::QueryFailed("Discharge insert returned no row".to_string())
        })?;
        discharge_from_row(row)
    }

    async fn find_discharge(
        &mut self,
        visit_id: VisitId,
        movement_id: MovementId,
    ) -> Result<Option<Discharge>> {
        let sql = format!(
            "SELECT {DISCHARGE_COLUMNS} FROM discharges d JOIN stays s ON s.id = d.stay_id \
             WHERE s.visit_id = $1 AND d.movement_id = $2 ORDER BY d.id DESC LIMIT 1"
        );
        self.query_opt(&sql, &[&visit_id.get(), &movement_id.get()])
            .await?
            .map(|row| discharge_from_row(&row))
            .transpose()
    }

    async fn delete_discharge(&mut self, discharge_id: i64) -> Result<()> {
        self.execute("DELETE FROM discharges WHERE id = $1", &[&discharge_id])
            .await?;
        Ok(())
    }

    async fn discharges_for_visit(&mut self, visit_id: VisitId) -> Result<Vec<Discharge>> {
        let sql = format!(
            "SELECT {DISCHARGE_COLUMNS} FROM discharges d JOIN stays s ON s.id = d.stay_id \
             WHERE s.visit_id = $1 ORDER BY d.id"
        );
        self.query(&sql, &[&visit_id.get()])
            .await?
            .iter()
            .map(discharge_from_row)
            .collect()
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK").await
    }
}
