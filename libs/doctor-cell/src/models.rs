use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{NaiveDate, NaiveTime, Weekday};

use shared_models::time_format;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: Option<String>,
    pub is_active: bool,
    /// Default fee for a booking that does not state one.
    pub consultation_fee: Option<f64>,
    #[serde(flatten)]
    pub availability: DoctorAvailability,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Weekly working calendar of a doctor. Read-only to the scheduling core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAvailability {
    pub available_days: Vec<Weekday>,
    #[serde(with = "time_format")]
    pub available_from: NaiveTime,
    #[serde(with = "time_format")]
    pub available_to: NaiveTime,
    /// Unset or zero means "use the configured default".
    #[serde(default)]
    pub slot_duration_minutes: Option<u32>,
}

impl DoctorAvailability {
    pub fn works_on(&self, weekday: Weekday) -> bool {
        self.available_days.contains(&weekday)
    }

    pub fn slot_minutes(&self, default_minutes: u32) -> u32 {
        match self.slot_duration_minutes {
            Some(minutes) if minutes > 0 => minutes,
            _ => default_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorLeave {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub leave_date: NaiveDate,
    pub is_full_day: bool,
    #[serde(default, with = "time_format::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "time_format::option")]
    pub end_time: Option<NaiveTime>,
    pub status: LeaveStatus,
    pub reason: Option<String>,
}

impl DoctorLeave {
    /// Whether this leave blocks a slot starting at `time` on `date`.
    ///
    /// A partial-day row missing either bound is treated as full-day.
    pub fn covers(&self, date: NaiveDate, time: NaiveTime) -> bool {
        if self.status != LeaveStatus::Approved || self.leave_date != date {
            return false;
        }

        match (self.is_full_day, self.start_time, self.end_time) {
            (false, Some(start), Some(end)) => start <= time && time < end,
            _ => true,
        }
    }

    pub fn covers_whole_day(&self) -> bool {
        self.is_full_day || self.start_time.is_none() || self.end_time.is_none()
    }
}

/// A non-cancelled appointment occupying a doctor's slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlot {
    #[serde(rename = "id")]
    pub appointment_id: Uuid,
    #[serde(rename = "appointment_time", with = "time_format")]
    pub time: NaiveTime,
}

/// Why a slot is not bookable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotBlock {
    DayOff,
    Leave,
    Booked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    #[serde(with = "time_format")]
    pub time: NaiveTime,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<SlotBlock>,
}

impl Slot {
    pub fn is_blocked_by(&self, block: SlotBlock) -> bool {
        self.blocked_by.contains(&block)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveCheck {
    pub on_leave: bool,
    pub leave: Option<DoctorLeave>,
}
