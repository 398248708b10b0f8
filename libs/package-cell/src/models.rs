use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Active,
    Exhausted,
    Expired,
    Cancelled,
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageStatus::Active => write!(f, "active"),
            PackageStatus::Exhausted => write!(f, "exhausted"),
            PackageStatus::Expired => write!(f, "expired"),
            PackageStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Prepaid bundle of visit credits owned by a patient.
///
/// `0 <= used_visits <= total_visits` holds under concurrent consumption
/// because every change goes through a compare-and-swap on `used_visits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageAssignment {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub patient_id: Uuid,
    pub package_name: Option<String>,
    pub total_visits: u32,
    pub used_visits: u32,
    pub status: PackageStatus,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl PackageAssignment {
    pub fn remaining_visits(&self) -> u32 {
        self.total_visits.saturating_sub(self.used_visits)
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.status == PackageStatus::Expired
            || self.expiry_date.is_some_and(|expiry| expiry < today)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumeVisitRequest {
    pub appointment_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Audit row appended after each successful consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVisitUsage {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub notes: Option<String>,
    pub used_at: DateTime<Utc>,
}

/// Guarded write: applied only while the row still has `expected_used` / `expected_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSwap {
    pub expected_used: u32,
    pub expected_status: PackageStatus,
    pub new_used: u32,
    pub new_status: PackageStatus,
}
