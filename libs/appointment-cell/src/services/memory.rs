use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use doctor_cell::models::{BookedSlot, Doctor, DoctorLeave, LeaveStatus};
use doctor_cell::services::DoctorRepository;
use package_cell::models::{PackageAssignment, PackageVisitUsage, UsageSwap};
use package_cell::services::{InMemoryPackageRepository, PackageRepository};
use shared_database::DbError;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, Patient};
use crate::services::repository::{AppointmentRepository, PatientDirectory, ACTIVE_SLOT_CONSTRAINT};

/// Seed data for a process-local store.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClinicFixture {
    pub doctors: Vec<Doctor>,
    pub leaves: Vec<DoctorLeave>,
    pub patients: Vec<Patient>,
    pub packages: Vec<PackageAssignment>,
}

#[derive(Default)]
struct ClinicTables {
    doctors: HashMap<Uuid, Doctor>,
    leaves: Vec<DoctorLeave>,
    patients: HashMap<Uuid, Patient>,
    appointments: HashMap<Uuid, Appointment>,
    sequences: HashMap<Uuid, u64>,
}

impl ClinicTables {
    fn slot_taken_by_other(&self, candidate: &Appointment) -> bool {
        candidate.status != AppointmentStatus::Cancelled
            && self.appointments.values().any(|existing| {
                existing.id != candidate.id
                    && existing.hospital_id == candidate.hospital_id
                    && existing.occupies(candidate.doctor_id, candidate.appointment_date, candidate.appointment_time)
            })
    }
}

/// Every storage contract of the scheduling core, held in process memory.
///
/// All appointment writes run under one lock, so the active-slot uniqueness
/// check and the write are a single step, like a unique index.
#[derive(Default)]
pub struct InMemoryClinicStore {
    tables: Mutex<ClinicTables>,
    packages: InMemoryPackageRepository,
}

impl InMemoryClinicStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_fixture(fixture: ClinicFixture) -> Self {
        let store = Self::new();
        info!(
            "Seeding in-memory store: {} doctors, {} patients, {} packages",
            fixture.doctors.len(),
            fixture.patients.len(),
            fixture.packages.len()
        );

        for doctor in fixture.doctors {
            store.add_doctor(doctor).await;
        }
        for leave in fixture.leaves {
            store.add_leave(leave).await;
        }
        for patient in fixture.patients {
            store.add_patient(patient).await;
        }
        for package in fixture.packages {
            store.add_package(package).await;
        }

        store
    }

    pub async fn add_doctor(&self, doctor: Doctor) {
        self.tables.lock().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn add_leave(&self, leave: DoctorLeave) {
        self.tables.lock().await.leaves.push(leave);
    }

    pub async fn add_patient(&self, patient: Patient) {
        self.tables.lock().await.patients.insert(patient.id, patient);
    }

    pub async fn add_package(&self, package: PackageAssignment) {
        self.packages.insert(package).await;
    }

    pub async fn package_usages(&self, assignment_id: Uuid) -> Vec<PackageVisitUsage> {
        self.packages.usages_for(assignment_id).await
    }
}

#[async_trait]
impl DoctorRepository for InMemoryClinicStore {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, DbError> {
        Ok(self.tables.lock().await.doctors.get(&doctor_id).cloned())
    }

    async fn approved_leaves(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<DoctorLeave>, DbError> {
        Ok(self.tables.lock().await.leaves
            .iter()
            .filter(|l| l.doctor_id == doctor_id && l.leave_date == date && l.status == LeaveStatus::Approved)
            .cloned()
            .collect())
    }

    async fn booked_slots(
        &self,
        hospital_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BookedSlot>, DbError> {
        Ok(self.tables.lock().await.appointments
            .values()
            .filter(|a| a.hospital_id == hospital_id && a.doctor_id == doctor_id && a.appointment_date == date)
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .map(|a| BookedSlot {
                appointment_id: a.id,
                time: a.appointment_time,
            })
            .collect())
    }
}

#[async_trait]
impl PatientDirectory for InMemoryClinicStore {
    async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, DbError> {
        Ok(self.tables.lock().await.patients.get(&patient_id).cloned())
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryClinicStore {
    async fn next_appointment_number(&self, hospital_id: Uuid) -> Result<u64, DbError> {
        let mut tables = self.tables.lock().await;
        let sequence = tables.sequences.entry(hospital_id).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, DbError> {
        let mut tables = self.tables.lock().await;

        if tables.slot_taken_by_other(&appointment) {
            return Err(DbError::UniqueViolation(ACTIVE_SLOT_CONSTRAINT.to_string()));
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(
        &self,
        appointment: Appointment,
        expected_status: AppointmentStatus,
    ) -> Result<Option<Appointment>, DbError> {
        let mut tables = self.tables.lock().await;

        match tables.appointments.get(&appointment.id) {
            Some(stored) if stored.status == expected_status => {}
            _ => return Ok(None),
        }
        if tables.slot_taken_by_other(&appointment) {
            return Err(DbError::UniqueViolation(ACTIVE_SLOT_CONSTRAINT.to_string()));
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(Some(appointment))
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, DbError> {
        Ok(self.tables.lock().await.appointments.get(&appointment_id).cloned())
    }

    async fn list(&self, hospital_id: Uuid, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DbError> {
        let mut appointments: Vec<Appointment> = self.tables.lock().await.appointments
            .values()
            .filter(|a| a.hospital_id == hospital_id && filter.matches(a))
            .cloned()
            .collect();

        appointments.sort_by(|a, b| {
            (a.appointment_date, a.appointment_time, a.created_at)
                .cmp(&(b.appointment_date, b.appointment_time, b.created_at))
        });
        Ok(appointments)
    }
}

#[async_trait]
impl PackageRepository for InMemoryClinicStore {
    async fn get_assignment(&self, assignment_id: Uuid) -> Result<Option<PackageAssignment>, DbError> {
        self.packages.get_assignment(assignment_id).await
    }

    async fn swap_usage(
        &self,
        assignment_id: Uuid,
        swap: UsageSwap,
    ) -> Result<Option<PackageAssignment>, DbError> {
        self.packages.swap_usage(assignment_id, swap).await
    }

    async fn record_usage(&self, usage: PackageVisitUsage) -> Result<(), DbError> {
        self.packages.record_usage(usage).await
    }
}
