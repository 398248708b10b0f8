use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Tenant the caller acts for, carried as `app_metadata.hospital_id`.
    pub fn hospital_id(&self) -> Option<Uuid> {
        self.app_metadata
            .as_ref()?
            .get("hospital_id")?
            .as_str()?
            .parse()
            .ok()
    }
}

/// Authenticated caller with its resolved hospital scope.
///
/// Scope enforcement happens upstream; the scheduling cells only read
/// `hospital_id` to stamp and filter the rows they touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub hospital_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}
