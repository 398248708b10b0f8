use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentFilter, AppointmentResponse, AppointmentStatus};
use appointment_cell::services::BookingService;

use crate::error::QueueError;
use crate::models::{CheckInRequest, CheckInResponse, QueueItem, QueueSnapshot};

/// Token queue derived from appointment rows on every read.
///
/// There is no queue store: tokens are ranks within the current snapshot,
/// so a cancellation or no-show shifts everyone behind it up by one.
pub struct QueueService {
    booking: Arc<BookingService>,
}

impl QueueService {
    pub fn new(booking: Arc<BookingService>) -> Self {
        Self { booking }
    }

    /// Orders active appointments by time, then creation, then number, and numbers them from 1.
    pub fn rank(mut appointments: Vec<Appointment>) -> Vec<QueueItem> {
        appointments.retain(|appointment| appointment.status.is_active());
        appointments.sort_by(|a, b| {
            a.appointment_time
                .cmp(&b.appointment_time)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.appointment_number.cmp(&b.appointment_number))
        });

        appointments
            .into_iter()
            .zip(1..)
            .map(|(appointment, token)| QueueItem::new(token, appointment))
            .collect()
    }

    pub async fn get_queue(
        &self,
        hospital_id: Uuid,
        date: NaiveDate,
        doctor_id: Option<Uuid>,
    ) -> Result<QueueSnapshot, QueueError> {
        let filter = AppointmentFilter {
            date: Some(date),
            doctor_id,
            statuses: AppointmentStatus::ACTIVE.to_vec(),
        };
        let appointments = self.booking.list(hospital_id, &filter).await?;
        let items = Self::rank(appointments);

        let in_progress = items
            .iter()
            .filter(|item| item.appointment.status == AppointmentStatus::InProgress)
            .count();
        debug!("Queue for {} (doctor {:?}) has {} entries", date, doctor_id, items.len());

        Ok(QueueSnapshot {
            date,
            doctor_id,
            total: items.len(),
            waiting: items.len() - in_progress,
            in_progress,
            items,
            generated_at: Utc::now(),
        })
    }

    /// Check the patient in and report their token for that day.
    ///
    /// The position is ranked within the appointment's own doctor, not across
    /// the hospital.
    pub async fn check_in(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        request: CheckInRequest,
    ) -> Result<CheckInResponse, QueueError> {
        let AppointmentResponse { appointment, warnings } = self.booking
            .check_in(hospital_id, appointment_id, request.consume_package)
            .await?;

        let snapshot = self
            .get_queue(hospital_id, appointment.appointment_date, Some(appointment.doctor_id))
            .await?;
        let queue_position = snapshot
            .token_of(appointment.id)
            .ok_or(QueueError::NotQueued(appointment.id))?;

        info!(
            "Checked in {} with token {} for doctor {}",
            appointment.appointment_number, queue_position, appointment.doctor_id
        );

        Ok(CheckInResponse {
            appointment,
            queue_position,
            generated_at: snapshot.generated_at,
            warnings,
        })
    }

    pub async fn start(&self, hospital_id: Uuid, appointment_id: Uuid) -> Result<AppointmentResponse, QueueError> {
        Ok(self.booking.start(hospital_id, appointment_id).await?)
    }

    pub async fn complete(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        diagnosis: Option<String>,
    ) -> Result<AppointmentResponse, QueueError> {
        Ok(self.booking.complete(hospital_id, appointment_id, diagnosis).await?)
    }

    pub async fn mark_no_show(
        &self,
        hospital_id: Uuid,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<AppointmentResponse, QueueError> {
        Ok(self.booking.mark_no_show(hospital_id, appointment_id, reason).await?)
    }
}
