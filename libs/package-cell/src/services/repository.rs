use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};

use crate::models::{PackageAssignment, PackageVisitUsage, UsageSwap};

#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn get_assignment(&self, assignment_id: Uuid) -> Result<Option<PackageAssignment>, DbError>;

    /// Conditional write of `used_visits`/`status`. Returns `None` when the row
    /// no longer matches the expected values, leaving it untouched.
    async fn swap_usage(
        &self,
        assignment_id: Uuid,
        swap: UsageSwap,
    ) -> Result<Option<PackageAssignment>, DbError>;

    async fn record_usage(&self, usage: PackageVisitUsage) -> Result<(), DbError>;
}

pub struct SupabasePackageRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabasePackageRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl PackageRepository for SupabasePackageRepository {
    async fn get_assignment(&self, assignment_id: Uuid) -> Result<Option<PackageAssignment>, DbError> {
        let path = format!("/rest/v1/package_assignments?id=eq.{}", assignment_id);
        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        result
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(DbError::from)
    }

    async fn swap_usage(
        &self,
        assignment_id: Uuid,
        swap: UsageSwap,
    ) -> Result<Option<PackageAssignment>, DbError> {
        debug!(
            "Swapping usage on package {}: {} -> {}",
            assignment_id, swap.expected_used, swap.new_used
        );

        // The filter carries the expected state, so a stale writer matches zero rows.
        let path = format!(
            "/rest/v1/package_assignments?id=eq.{}&used_visits=eq.{}&status=eq.{}",
            assignment_id, swap.expected_used, swap.expected_status
        );
        let body = json!({
            "used_visits": swap.new_used,
            "status": swap.new_status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<PackageAssignment> = self.supabase
            .request_returning(Method::PATCH, &path, None, body)
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn record_usage(&self, usage: PackageVisitUsage) -> Result<(), DbError> {
        let _: Vec<Value> = self.supabase
            .request_returning(
                Method::POST,
                "/rest/v1/package_visit_usages",
                None,
                serde_json::to_value(&usage)?,
            )
            .await?;

        Ok(())
    }
}
