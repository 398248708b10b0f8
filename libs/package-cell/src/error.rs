use thiserror::Error;
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

use crate::models::PackageStatus;

/// Rejections of a ledger call. They never affect the booking a visit was tagged to.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Package assignment {0} not found")]
    NotFound(Uuid),

    #[error("Package assignment {0} has no visits left")]
    Exhausted(Uuid),

    #[error("Package assignment {0} has expired")]
    Expired(Uuid),

    #[error("Package assignment {id} is {status}, not active")]
    NotActive { id: Uuid, status: PackageStatus },

    #[error("Package assignment {0} has no consumed visits to refund")]
    NothingToRefund(Uuid),

    #[error("Package assignment {0} kept changing under concurrent updates")]
    Contention(Uuid),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl PackageError {
    /// Stable machine code for API clients and warnings.
    pub fn code(&self) -> &'static str {
        match self {
            PackageError::NotFound(_) => "package_not_found",
            PackageError::Exhausted(_) => "package_exhausted",
            PackageError::Expired(_) => "package_expired",
            PackageError::NotActive { .. } => "package_not_active",
            PackageError::NothingToRefund(_) => "package_nothing_to_refund",
            PackageError::Contention(_) => "package_contention",
            PackageError::Storage(_) => "storage_failure",
        }
    }
}

impl From<PackageError> for AppError {
    fn from(e: PackageError) -> Self {
        match e {
            PackageError::NotFound(_) => AppError::NotFound(e.to_string()),
            PackageError::Exhausted(_)
            | PackageError::Expired(_)
            | PackageError::NotActive { .. }
            | PackageError::NothingToRefund(_) => AppError::Unprocessable(e.to_string()),
            PackageError::Contention(_) => AppError::Conflict(e.to_string()),
            PackageError::Storage(db) => AppError::Database(db.to_string()),
        }
    }
}
