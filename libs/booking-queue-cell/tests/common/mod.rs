#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc, Weekday};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentType, BookingPreferences, CreateAppointmentRequest, Patient};
use appointment_cell::services::{BookingService, InMemoryClinicStore};
use booking_queue_cell::QueueService;
use doctor_cell::models::{Doctor, DoctorAvailability};
use doctor_cell::services::AvailabilityService;
use package_cell::models::{PackageAssignment, PackageStatus};
use package_cell::services::PackageLedger;
use shared_config::SchedulingConfig;
use shared_utils::clock::FixedClock;

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

pub struct Desk {
    pub store: Arc<InMemoryClinicStore>,
    pub booking: Arc<BookingService>,
    pub ledger: Arc<PackageLedger>,
    pub queue: Arc<QueueService>,
    pub hospital_id: Uuid,
    pub doctors: Vec<Doctor>,
    pub patient: Patient,
}

impl Desk {
    /// Hospital with two doctors working weekdays 09:00-12:00 in 30-minute slots.
    /// The clock reads 2024-01-10.
    pub async fn open() -> Self {
        let hospital_id = Uuid::new_v4();
        let store = Arc::new(InMemoryClinicStore::new());

        let mut doctors = Vec::new();
        for (first, last) in [("Asha", "Menon"), ("Vikram", "Rao")] {
            let doctor = Doctor {
                id: Uuid::new_v4(),
                hospital_id,
                first_name: first.to_string(),
                last_name: last.to_string(),
                specialization: None,
                is_active: true,
                consultation_fee: Some(400.0),
                availability: DoctorAvailability {
                    available_days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
                    available_from: t(9, 0),
                    available_to: t(12, 0),
                    slot_duration_minutes: Some(30),
                },
            };
            store.add_doctor(doctor.clone()).await;
            doctors.push(doctor);
        }

        let patient = Patient {
            id: Uuid::new_v4(),
            hospital_id,
            first_name: "Meera".to_string(),
            last_name: "Iyer".to_string(),
        };
        store.add_patient(patient.clone()).await;

        let config = SchedulingConfig::default();
        let clock = Arc::new(FixedClock::at_date(jan(10)));
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
        let queue = Arc::new(QueueService::new(booking.clone()));

        Self {
            store,
            booking,
            ledger,
            queue,
            hospital_id,
            doctors,
            patient,
        }
    }

    pub fn doctor_id(&self, index: usize) -> Uuid {
        self.doctors[index].id
    }

    pub fn request(&self, doctor: usize, date: NaiveDate, time: NaiveTime) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: self.patient.id,
            doctor_id: Some(self.doctor_id(doctor)),
            appointment_date: Some(date),
            appointment_time: time,
            appointment_type: Some(AppointmentType::Consultation),
            notes: None,
            reason: None,
            fee: None,
            is_paid: false,
            package_assignment_id: None,
            consume_package: false,
        }
    }

    pub async fn book(&self, doctor: usize, date: NaiveDate, time: NaiveTime) -> Appointment {
        self.booking
            .create(self.hospital_id, self.request(doctor, date, time), &BookingPreferences::default())
            .await
            .unwrap()
            .appointment
    }

    pub async fn add_package(&self, total: u32, used: u32) -> PackageAssignment {
        let package = PackageAssignment {
            id: Uuid::new_v4(),
            hospital_id: self.hospital_id,
            patient_id: self.patient.id,
            package_name: None,
            total_visits: total,
            used_visits: used,
            status: PackageStatus::Active,
            expiry_date: None,
            updated_at: Utc::now(),
        };
        self.store.add_package(package.clone()).await;
        package
    }
}
