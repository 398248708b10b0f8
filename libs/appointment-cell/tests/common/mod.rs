#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc, Weekday};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentType, BookingPreferences, CreateAppointmentRequest, Patient,
};
use appointment_cell::services::{BookingService, InMemoryClinicStore};
use doctor_cell::models::{Doctor, DoctorAvailability, DoctorLeave, LeaveStatus};
use doctor_cell::services::AvailabilityService;
use package_cell::models::{PackageAssignment, PackageStatus};
use package_cell::services::PackageLedger;
use shared_config::SchedulingConfig;
use shared_utils::clock::FixedClock;

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 2024-01-10, a Wednesday. The fixture clock reads this date.
pub fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

pub fn friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 12).unwrap()
}

pub fn saturday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 13).unwrap()
}

pub fn doctor(hospital_id: Uuid) -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        hospital_id,
        first_name: "Asha".to_string(),
        last_name: "Menon".to_string(),
        specialization: Some("General Medicine".to_string()),
        is_active: true,
        consultation_fee: Some(500.0),
        availability: DoctorAvailability {
            available_days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            available_from: t(9, 0),
            available_to: t(12, 0),
            slot_duration_minutes: Some(30),
        },
    }
}

pub fn patient(hospital_id: Uuid) -> Patient {
    Patient {
        id: Uuid::new_v4(),
        hospital_id,
        first_name: "Ravi".to_string(),
        last_name: "Kumar".to_string(),
    }
}

/// One hospital with one doctor and one patient over the in-memory store.
pub struct Clinic {
    pub store: Arc<InMemoryClinicStore>,
    pub booking: Arc<BookingService>,
    pub ledger: Arc<PackageLedger>,
    pub hospital_id: Uuid,
    pub doctor: Doctor,
    pub patient: Patient,
}

impl Clinic {
    pub async fn new() -> Self {
        Self::with_config(SchedulingConfig::default()).await
    }

    pub async fn with_config(config: SchedulingConfig) -> Self {
        let hospital_id = Uuid::new_v4();
        let doctor = doctor(hospital_id);
        let patient = patient(hospital_id);

        let store = Arc::new(InMemoryClinicStore::new());
        store.add_doctor(doctor.clone()).await;
        store.add_patient(patient.clone()).await;

        let clock = Arc::new(FixedClock::at_date(wednesday()));
        let availability = Arc::new(AvailabilityService::new(store.clone(), config.default_slot_minutes));
        let ledger = Arc::new(PackageLedger::new(store.clone(), clock.clone(), config.package_cas_retries));
        let booking = Arc::new(BookingService::new(
            store.clone(),
            store.clone(),
            availability,
            ledger.clone(),
            clock,
            config,
        ));

        Self {
            store,
            booking,
            ledger,
            hospital_id,
            doctor,
            patient,
        }
    }

    pub fn request(&self, date: NaiveDate, time: NaiveTime) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: self.patient.id,
            doctor_id: Some(self.doctor.id),
            appointment_date: Some(date),
            appointment_time: time,
            appointment_type: Some(AppointmentType::Consultation),
            notes: None,
            reason: Some("Fever".to_string()),
            fee: None,
            is_paid: false,
            package_assignment_id: None,
            consume_package: false,
        }
    }

    pub async fn book(&self, date: NaiveDate, time: NaiveTime) -> Appointment {
        self.booking
            .create(self.hospital_id, self.request(date, time), &BookingPreferences::default())
            .await
            .unwrap()
            .appointment
    }

    pub async fn add_package(&self, total: u32, used: u32) -> PackageAssignment {
        let package = PackageAssignment {
            id: Uuid::new_v4(),
            hospital_id: self.hospital_id,
            patient_id: self.patient.id,
            package_name: Some("Follow-up bundle".to_string()),
            total_visits: total,
            used_visits: used,
            status: if used >= total { PackageStatus::Exhausted } else { PackageStatus::Active },
            expiry_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            updated_at: Utc::now(),
        };
        self.store.add_package(package.clone()).await;
        package
    }

    pub async fn add_leave(&self, date: NaiveDate, window: Option<(NaiveTime, NaiveTime)>) {
        self.store
            .add_leave(DoctorLeave {
                id: Uuid::new_v4(),
                doctor_id: self.doctor.id,
                leave_date: date,
                is_full_day: window.is_none(),
                start_time: window.map(|(start, _)| start),
                end_time: window.map(|(_, end)| end),
                status: LeaveStatus::Approved,
                reason: Some("Conference".to_string()),
            })
            .await;
    }
}
