use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus};

const DEFAULT_POSTPONE_REASON: &str = "Rescheduled";

/// A requested status change together with the data it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    CheckIn,
    Postpone {
        date: NaiveDate,
        time: NaiveTime,
        reason: Option<String>,
    },
    Cancel { reason: String },
    NoShow { reason: Option<String> },
    Start,
    Complete { diagnosis: Option<String> },
}

impl Transition {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Transition::CheckIn => AppointmentStatus::Confirmed,
            Transition::Postpone { .. } => AppointmentStatus::Postponed,
            Transition::Cancel { .. } => AppointmentStatus::Cancelled,
            Transition::NoShow { .. } => AppointmentStatus::NoShow,
            Transition::Start => AppointmentStatus::InProgress,
            Transition::Complete { .. } => AppointmentStatus::Completed,
        }
    }

    /// Transition for a bare target status. `None` for targets that need more
    /// than a reason or diagnosis (postponed) or that nothing moves into (scheduled).
    pub fn towards(
        target: AppointmentStatus,
        reason: Option<String>,
        diagnosis: Option<String>,
    ) -> Option<Transition> {
        match target {
            AppointmentStatus::Confirmed => Some(Transition::CheckIn),
            AppointmentStatus::Cancelled => Some(Transition::Cancel {
                reason: reason.unwrap_or_default(),
            }),
            AppointmentStatus::NoShow => Some(Transition::NoShow { reason }),
            AppointmentStatus::InProgress => Some(Transition::Start),
            AppointmentStatus::Completed => Some(Transition::Complete { diagnosis }),
            AppointmentStatus::Scheduled | AppointmentStatus::Postponed => None,
        }
    }
}

pub struct StatusStateMachine;

impl StatusStateMachine {
    pub fn allowed_targets(from: AppointmentStatus) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;

        match from {
            Scheduled => &[Confirmed, Postponed, Cancelled, NoShow],
            Postponed => &[Confirmed, Postponed, Cancelled, NoShow],
            Confirmed => &[Postponed, Cancelled, NoShow, InProgress],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled | NoShow => &[],
        }
    }

    pub fn is_terminal(status: AppointmentStatus) -> bool {
        Self::allowed_targets(status).is_empty()
    }

    pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
        Self::allowed_targets(from).contains(&to)
    }

    pub fn ensure_legal(from: AppointmentStatus, to: AppointmentStatus) -> Result<(), AppointmentError> {
        if Self::can_transition(from, to) {
            debug!("Status transition {} -> {} is legal", from, to);
            Ok(())
        } else {
            warn!("Rejected status transition {} -> {}", from, to);
            Err(AppointmentError::IllegalTransition { from, to })
        }
    }

    /// Returns the appointment as it looks after `transition`. Nothing is persisted.
    pub fn apply(appointment: &Appointment, transition: Transition) -> Result<Appointment, AppointmentError> {
        Self::ensure_legal(appointment.status, transition.target())?;

        let mut next = appointment.clone();
        next.status = transition.target();

        match transition {
            Transition::CheckIn | Transition::Start => {}
            Transition::Postpone { date, time, reason } => {
                next.appointment_date = date;
                next.appointment_time = time;
                next.status_reason = Some(
                    non_blank(reason).unwrap_or_else(|| DEFAULT_POSTPONE_REASON.to_string()),
                );
            }
            Transition::Cancel { reason } => {
                let reason = non_blank(Some(reason)).ok_or_else(|| {
                    AppointmentError::Validation("A cancellation reason is required".to_string())
                })?;
                next.status_reason = Some(reason);
            }
            Transition::NoShow { reason } => {
                next.status_reason = non_blank(reason);
            }
            Transition::Complete { diagnosis } => {
                if let Some(diagnosis) = non_blank(diagnosis) {
                    next.diagnosis = Some(diagnosis);
                }
            }
        }

        Ok(next)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
