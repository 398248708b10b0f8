use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::AvailabilityError;
use package_cell::PackageError;
use shared_database::DbError;
use shared_models::error::AppError;

use crate::models::AppointmentStatus;

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Patient {0} not found")]
    PatientNotFound(Uuid),

    #[error("Doctor {0} not found")]
    DoctorNotFound(Uuid),

    #[error("{0} belongs to a different hospital")]
    CrossHospitalReference(String),

    #[error("{0}")]
    Validation(String),

    #[error("Doctor {doctor_id} is already booked on {date} at {time}")]
    SlotConflict {
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    },

    #[error("Cannot move appointment from {from} to {to}")]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Doctor {doctor_id} already has {limit} consultation(s) in progress")]
    InProgressLimitReached { doctor_id: Uuid, limit: u32 },

    #[error("Appointment {0} was modified concurrently, reload and retry")]
    ConcurrentModification(Uuid),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<AvailabilityError> for AppointmentError {
    fn from(e: AvailabilityError) -> Self {
        match e {
            AvailabilityError::DoctorNotFound(id) => AppointmentError::DoctorNotFound(id),
            AvailabilityError::Storage(db) => AppointmentError::Storage(db),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound(_)
            | AppointmentError::PatientNotFound(_)
            | AppointmentError::DoctorNotFound(_) => AppError::NotFound(e.to_string()),
            AppointmentError::CrossHospitalReference(_) => AppError::Forbidden(e.to_string()),
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::SlotConflict { .. }
            | AppointmentError::InProgressLimitReached { .. }
            | AppointmentError::ConcurrentModification(_) => AppError::Conflict(e.to_string()),
            AppointmentError::IllegalTransition { .. } => AppError::Unprocessable(e.to_string()),
            AppointmentError::Package(package) => package.into(),
            AppointmentError::Storage(db) => AppError::Database(db.to_string()),
        }
    }
}
