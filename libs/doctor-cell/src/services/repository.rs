use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};

use crate::models::{BookedSlot, Doctor, DoctorLeave};

/// Read-side lookups the availability calculator depends on.
#[async_trait]
pub trait DoctorRepository: Send + Sync {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, DbError>;

    /// Approved leave rows for the doctor on `date`.
    async fn approved_leaves(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<DoctorLeave>, DbError>;

    /// Non-cancelled appointments holding the doctor's slots on `date`.
    async fn booked_slots(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BookedSlot>, DbError>;
}

pub struct SupabaseDoctorRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl DoctorRepository for SupabaseDoctorRepository {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, DbError> {
        debug!("Fetching doctor {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        result
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(DbError::from)
    }

    async fn approved_leaves(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<DoctorLeave>, DbError> {
        let path = format!(
            "/rest/v1/doctor_leaves?doctor_id=eq.{}&leave_date=eq.{}&status=eq.approved",
            doctor_id, date
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    async fn booked_slots(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BookedSlot>, DbError> {
        let path = format!(
            "/rest/v1/appointments?select=id,appointment_time&hospital_id=eq.{}&doctor_id=eq.{}&appointment_date=eq.{}&status=neq.cancelled",
            hospital_id, doctor_id, date
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }
}
