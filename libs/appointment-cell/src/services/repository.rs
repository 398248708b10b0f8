use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, Patient};

/// Partial unique index over non-cancelled `(hospital_id, doctor_id, appointment_date, appointment_time)`.
pub const ACTIVE_SLOT_CONSTRAINT: &str = "appointments_active_slot_key";

/// Appointment persistence.
///
/// Implementations must reject a write that would leave two non-cancelled
/// appointments on the same `(hospital, doctor, date, time)` with
/// `DbError::UniqueViolation` naming [`ACTIVE_SLOT_CONSTRAINT`].
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Next value of the hospital's appointment number sequence.
    async fn next_appointment_number(&self, hospital_id: Uuid) -> Result<u64, DbError>;

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, DbError>;

    /// Overwrite the row if its stored status is still `expected_status`.
    /// `None` means another writer got there first.
    async fn update(
        &self,
        appointment: Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<Option<Appointment>, DbError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, DbError>;

    async fn list(&self, hospital_id: Uuid, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DbError>;
}

#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, DbError>;
}

pub struct SupabaseAppointmentRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn list_path(hospital_id: Uuid, filter: &AppointmentFilter) -> String {
        let mut query_parts = vec![format!("hospital_id=eq.{}", hospital_id)];

        if let Some(date) = filter.date {
            query_parts.push(format!("appointment_date=eq.{}", date));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if !filter.statuses.is_empty() {
            let statuses: Vec<String> = filter.statuses.iter().map(|s| s.to_string()).collect();
            query_parts.push(format!("status=in.({})", statuses.join(",")));
        }
        query_parts.push("order=appointment_date.asc,appointment_time.asc,created_at.asc".to_string());

        format!("/rest/v1/appointments?{}", query_parts.join("&"))
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn next_appointment_number(&self, hospital_id: Uuid) -> Result<u64, DbError> {
        self.supabase
            .rpc("next_appointment_number", None, json!({ "p_hospital_id": hospital_id }))
            .await
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, DbError> {
        debug!("Inserting appointment {}", appointment.appointment_number);

        let rows: Vec<Appointment> = self.supabase
            .request_returning(Method::POST, "/rest/v1/appointments", None, serde_json::to_value(&appointment)?)
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::Other("Insert returned no appointment row".to_string()))
    }

    async fn update(
        &self,
        appointment: Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<Option<Appointment>, DbError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment.id, expected_status
        );

        let rows: Vec<Appointment> = self.supabase
            .request_returning(Method::PATCH, &path, None, serde_json::to_value(&appointment)?)
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, DbError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        result
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(DbError::from)
    }

    async fn list(&self, hospital_id: Uuid, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DbError> {
        let path = Self::list_path(hospital_id, filter);
        self.supabase.request(Method::GET, &path, None, None).await
    }
}

pub struct SupabasePatientDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabasePatientDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl PatientDirectory for SupabasePatientDirectory {
    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, DbError> {
        let path = format!(
            "/rest/v1/patients?select=id,hospital_id,first_name,last_name&id=eq.{}",
            patient_id
        );
        let result: Vec<Patient> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(result.into_iter().next())
    }
}
