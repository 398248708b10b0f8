use thiserror::Error;
use uuid::Uuid;

use appointment_cell::AppointmentError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Appointment {0} is not in the queue for its date")]
    NotQueued(Uuid),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::NotQueued(_) => AppError::Unprocessable(e.to_string()),
            QueueError::Appointment(inner) => inner.into(),
        }
    }
}
