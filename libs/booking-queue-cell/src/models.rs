use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use appointment_cell::models::{Appointment, BookingWarning};

/// One ranked row of the token queue. Tokens are derived on every read and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub queue_token: u32,
    #[serde(flatten)]
    pub appointment: Appointment,
}

impl QueueItem {
    pub fn new(queue_token: u32, appointment: Appointment) -> Self {
        Self { queue_token, appointment }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub date: NaiveDate,
    pub doctor_id: Option<Uuid>,
    pub items: Vec<QueueItem>,
    pub total: usize,
    /// Scheduled, postponed or checked in, not yet with the doctor.
    pub waiting: usize,
    pub in_progress: usize,
    /// Tokens are only valid for the snapshot they came from.
    pub generated_at: DateTime<Utc>,
}

impl QueueSnapshot {
    pub fn token_of(&self, appointment_id: Uuid) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.appointment.id == appointment_id)
            .map(|item| item.queue_token)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueQuery {
    pub date: NaiveDate,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckInRequest {
    #[serde(default)]
    pub consume_package: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoShowRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub appointment: Appointment,
    /// The appointment's token in its doctor's queue at `generated_at`.
    pub queue_position: u32,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<BookingWarning>,
}
