use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::error::PackageError;
use crate::models::{ConsumeVisitRequest, PackageAssignment, PackageStatus, PackageVisitUsage, UsageSwap};
use crate::services::repository::PackageRepository;

/// Visit-credit accounting on package assignments.
///
/// Consume and refund are optimistic: read the row, validate, then swap
/// `used_visits` only if nobody else changed it in between. A lost swap means
/// another writer made progress, so the loop re-reads and re-validates.
pub struct PackageLedger {
    repository: Arc<dyn PackageRepository>,
    clock: Arc<dyn Clock>,
    retry_slack: u32,
}

impl PackageLedger {
    pub fn new(repository: Arc<dyn PackageRepository>, clock: Arc<dyn Clock>, retry_slack: u32) -> Self {
        Self {
            repository,
            clock,
            retry_slack,
        }
    }

    /// Unscoped read, used when validating cross-hospital references.
    pub async fn lookup(&self, assignment_id: Uuid) -> Result<Option<PackageAssignment>, PackageError> {
        Ok(self.repository.get_assignment(assignment_id).await?)
    }

    pub async fn get(&self, hospital_id: Uuid, assignment_id: Uuid) -> Result<PackageAssignment, PackageError> {
        self.repository
            .get_assignment(assignment_id)
            .await?
            .filter(|assignment| assignment.hospital_id == hospital_id)
            .ok_or(PackageError::NotFound(assignment_id))
    }

    /// Use one visit. Exactly `min(callers, remaining)` concurrent calls succeed.
    pub async fn consume(
        &self,
        hospital_id: Uuid,
        assignment_id: Uuid,
        request: ConsumeVisitRequest,
    ) -> Result<PackageAssignment, PackageError> {
        let today = self.clock.today();
        let mut current = self.get(hospital_id, assignment_id).await?;
        let attempts = self.max_attempts(&current);

        for attempt in 1..=attempts {
            Self::ensure_consumable(&current, today)?;

            let new_used = current.used_visits + 1;
            let swap = UsageSwap {
                expected_used: current.used_visits,
                expected_status: current.status,
                new_used,
                new_status: if new_used >= current.total_visits {
                    PackageStatus::Exhausted
                } else {
                    PackageStatus::Active
                },
            };

            if let Some(updated) = self.repository.swap_usage(assignment_id, swap).await? {
                info!(
                    "Consumed visit on package {} ({}/{})",
                    assignment_id, updated.used_visits, updated.total_visits
                );
                self.record_usage(assignment_id, request).await;
                return Ok(updated);
            }

            debug!("Package {} changed during consume (attempt {})", assignment_id, attempt);
            current = self.get(hospital_id, assignment_id).await?;
        }

        warn!("Gave up consuming package {} after {} attempts", assignment_id, attempts);
        Err(PackageError::Contention(assignment_id))
    }

    /// Give back one visit. An exhausted package becomes active again unless it has expired.
    pub async fn refund(&self, hospital_id: Uuid, assignment_id: Uuid) -> Result<PackageAssignment, PackageError> {
        let today = self.clock.today();
        let mut current = self.get(hospital_id, assignment_id).await?;
        let attempts = self.max_attempts(&current);

        for attempt in 1..=attempts {
            if current.status == PackageStatus::Cancelled {
                return Err(PackageError::NotActive {
                    id: assignment_id,
                    status: current.status,
                });
            }
            if current.used_visits == 0 {
                return Err(PackageError::NothingToRefund(assignment_id));
            }

            let new_status = match current.status {
                PackageStatus::Exhausted if current.is_expired_on(today) => PackageStatus::Expired,
                PackageStatus::Exhausted => PackageStatus::Active,
                other => other,
            };
            let swap = UsageSwap {
                expected_used: current.used_visits,
                expected_status: current.status,
                new_used: current.used_visits - 1,
                new_status,
            };

            if let Some(updated) = self.repository.swap_usage(assignment_id, swap).await? {
                info!(
                    "Refunded visit on package {} ({}/{})",
                    assignment_id, updated.used_visits, updated.total_visits
                );
                return Ok(updated);
            }

            debug!("Package {} changed during refund (attempt {})", assignment_id, attempt);
            current = self.get(hospital_id, assignment_id).await?;
        }

        warn!("Gave up refunding package {} after {} attempts", assignment_id, attempts);
        Err(PackageError::Contention(assignment_id))
    }

    /// Expiry is checked before exhaustion, then the lifecycle status.
    fn ensure_consumable(assignment: &PackageAssignment, today: NaiveDate) -> Result<(), PackageError> {
        if assignment.is_expired_on(today) {
            return Err(PackageError::Expired(assignment.id));
        }
        if assignment.status == PackageStatus::Exhausted || assignment.used_visits >= assignment.total_visits {
            return Err(PackageError::Exhausted(assignment.id));
        }
        if assignment.status != PackageStatus::Active {
            return Err(PackageError::NotActive {
                id: assignment.id,
                status: assignment.status,
            });
        }
        Ok(())
    }

    // A lost swap means another write landed, and consumes per package are bounded by its size.
    fn max_attempts(&self, assignment: &PackageAssignment) -> u32 {
        assignment.total_visits.saturating_add(self.retry_slack).max(1)
    }

    async fn record_usage(&self, assignment_id: Uuid, request: ConsumeVisitRequest) {
        let usage = PackageVisitUsage {
            id: Uuid::new_v4(),
            assignment_id,
            appointment_id: request.appointment_id,
            notes: request.notes,
            used_at: Utc::now(),
        };

        // The credit is already spent; a missing audit row is logged, not surfaced.
        if let Err(e) = self.repository.record_usage(usage).await {
            warn!("Failed to record usage for package {}: {}", assignment_id, e);
        }
    }
}
