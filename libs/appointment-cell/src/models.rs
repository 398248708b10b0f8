use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::time_format;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Postponed,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that hold a place in the day's token queue.
    pub const ACTIVE: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Postponed,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Postponed => write!(f, "postponed"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    FollowUp,
    Emergency,
    RoutineCheckup,
    LabTest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub appointment_number: String,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(with = "time_format")]
    pub appointment_time: NaiveTime,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub diagnosis: Option<String>,
    /// Reason given with the latest postpone, cancel or no-show.
    pub status_reason: Option<String>,
    pub fee: Option<f64>,
    pub is_paid: bool,
    pub package_assignment_id: Option<Uuid>,
    #[serde(default)]
    pub package_visit_consumed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn occupies(&self, doctor_id: Uuid, date: NaiveDate, time: NaiveTime) -> bool {
        self.status != AppointmentStatus::Cancelled
            && self.doctor_id == doctor_id
            && self.appointment_date == date
            && self.appointment_time == time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Per-call booking defaults supplied by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingPreferences {
    pub preferred_doctor_id: Option<Uuid>,
    #[serde(default)]
    pub smart_defaults: bool,
    #[serde(default)]
    pub default_type: AppointmentType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    #[serde(with = "time_format")]
    pub appointment_time: NaiveTime,
    pub appointment_type: Option<AppointmentType>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub fee: Option<f64>,
    #[serde(default)]
    pub is_paid: bool,
    pub package_assignment_id: Option<Uuid>,
    #[serde(default)]
    pub consume_package: bool,
}

/// HTTP body of `POST /appointments`: the booking plus the caller's preferences.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentBody {
    #[serde(flatten)]
    pub appointment: CreateAppointmentRequest,
    #[serde(default)]
    pub preferences: BookingPreferences,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub appointment_date: Option<NaiveDate>,
    #[serde(default, with = "time_format::option")]
    pub appointment_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub fee: Option<f64>,
    pub is_paid: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostponeAppointmentRequest {
    pub appointment_date: NaiveDate,
    #[serde(with = "time_format")]
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    /// Empty means every status.
    #[serde(default)]
    pub statuses: Vec<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.date.is_none_or(|date| appointment.appointment_date == date)
            && self.doctor_id.is_none_or(|doctor| appointment.doctor_id == doctor)
            && (self.statuses.is_empty() || self.statuses.contains(&appointment.status))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAppointmentsQuery {
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl From<ListAppointmentsQuery> for AppointmentFilter {
    fn from(query: ListAppointmentsQuery) -> Self {
        Self {
            date: query.date,
            doctor_id: query.doctor_id,
            statuses: query.status.into_iter().collect(),
        }
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    DoctorOnLeave,
    PackageNotConsumed,
    PackageNotRefunded,
}

/// Non-blocking note attached to a successful write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWarning {
    pub code: WarningCode,
    pub message: String,
}

impl BookingWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentResponse {
    pub appointment: Appointment,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<BookingWarning>,
}

impl AppointmentResponse {
    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|warning| warning.code == code)
    }
}
