use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use shared_database::DbError;

use crate::models::{PackageAssignment, PackageVisitUsage, UsageSwap};
use crate::services::repository::PackageRepository;

/// Process-local package table. The mutex makes each swap a single atomic step.
#[derive(Default)]
pub struct InMemoryPackageRepository {
    assignments: Mutex<HashMap<Uuid, PackageAssignment>>,
    usages: Mutex<Vec<PackageVisitUsage>>,
}

impl InMemoryPackageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, assignment: PackageAssignment) {
        self.assignments.lock().await.insert(assignment.id, assignment);
    }

    pub async fn usages_for(&self, assignment_id: Uuid) -> Vec<PackageVisitUsage> {
        self.usages
            .lock()
            .await
            .iter()
            .filter(|usage| usage.assignment_id == assignment_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PackageRepository for InMemoryPackageRepository {
    async fn get_assignment(&self, assignment_id: Uuid) -> Result<Option<PackageAssignment>, DbError> {
        Ok(self.assignments.lock().await.get(&assignment_id).cloned())
    }

    async fn swap_usage(
        &self,
        assignment_id: Uuid,
        swap: UsageSwap,
    ) -> Result<Option<PackageAssignment>, DbError> {
        let mut assignments = self.assignments.lock().await;

        match assignments.get_mut(&assignment_id) {
            Some(row) if row.used_visits == swap.expected_used && row.status == swap.expected_status => {
                row.used_visits = swap.new_used;
                row.status = swap.new_status;
                row.updated_at = Utc::now();
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn record_usage(&self, usage: PackageVisitUsage) -> Result<(), DbError> {
        self.usages.lock().await.push(usage);
        Ok(())
    }
}
