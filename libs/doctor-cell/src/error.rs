use thiserror::Error;
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Doctor {0} not found")]
    DoctorNotFound(Uuid),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<AvailabilityError> for AppError {
    fn from(e: AvailabilityError) -> Self {
        match e {
            AvailabilityError::DoctorNotFound(_) => AppError::NotFound(e.to_string()),
            AvailabilityError::Storage(db) => AppError::Database(db.to_string()),
        }
    }
}
