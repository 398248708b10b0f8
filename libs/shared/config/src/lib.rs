use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which storage implementation the API wires its services to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Supabase,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "memory" | "in_memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Scheduling policy knobs shared by the booking and queue cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Slot length used when a doctor's calendar has none (or zero) configured.
    pub default_slot_minutes: u32,
    /// `None` leaves concurrent consultations per doctor and date uncapped.
    pub max_in_progress_per_doctor: Option<u32>,
    pub refund_package_on_cancel: bool,
    pub allow_past_dates: bool,
    /// Attempts made by the package ledger when its compare-and-swap loses a race.
    pub package_cas_retries: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_slot_minutes: 30,
            max_in_progress_per_doctor: None,
            refund_package_on_cancel: true,
            allow_past_dates: false,
            package_cas_retries: 5,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            default_slot_minutes: parse_env("DEFAULT_SLOT_MINUTES")
                .filter(|minutes| *minutes > 0)
                .unwrap_or(defaults.default_slot_minutes),
            max_in_progress_per_doctor: parse_env("MAX_IN_PROGRESS_PER_DOCTOR"),
            refund_package_on_cancel: parse_env("REFUND_PACKAGE_ON_CANCEL")
                .unwrap_or(defaults.refund_package_on_cancel),
            allow_past_dates: parse_env("ALLOW_PAST_DATES")
                .unwrap_or(defaults.allow_past_dates),
            package_cas_retries: parse_env("PACKAGE_CAS_RETRIES")
                .filter(|retries| *retries > 0)
                .unwrap_or(defaults.package_cas_retries),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    /// Bearer token the server uses for its own PostgREST calls.
    pub supabase_service_role_key: Option<String>,
    pub storage_backend: StorageBackend,
    /// JSON fixture loaded into the in-memory store at startup.
    pub seed_file: Option<String>,
    pub port: u16,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = env::var("SUPABASE_URL")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            });
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });
        let supabase_jwt_secret = env::var("SUPABASE_JWT_SECRET")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_JWT_SECRET not set, using empty value");
                String::new()
            });

        let supabase_service_role_key = env::var("SUPABASE_SERVICE_ROLE_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let supabase_ready = !supabase_url.is_empty() && !supabase_anon_key.is_empty();
        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                warn!("{}, falling back to in-memory storage", e);
                StorageBackend::Memory
            }),
            Err(_) if supabase_ready => StorageBackend::Supabase,
            Err(_) => {
                warn!("STORAGE_BACKEND not set and Supabase not configured, using in-memory storage");
                StorageBackend::Memory
            }
        };

        let config = Self {
            supabase_url,
            supabase_anon_key,
            supabase_jwt_secret,
            supabase_service_role_key,
            storage_backend,
            seed_file: env::var("CLINIC_SEED_FILE").ok().filter(|path| !path.trim().is_empty()),
            port: parse_env("PORT").unwrap_or(3000),
            scheduling: SchedulingConfig::from_env(),
        };

        if config.storage_backend == StorageBackend::Supabase && config.supabase_service_role_key.is_none() {
            warn!("SUPABASE_SERVICE_ROLE_KEY not set, PostgREST calls will run as the anon role");
        }

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        let storage_ready = match self.storage_backend {
            StorageBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
            }
            StorageBackend::Memory => true,
        };

        storage_ready && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{} has an invalid value '{}', ignoring it", key, raw);
            None
        }
    }
}
