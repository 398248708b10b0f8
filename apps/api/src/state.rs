use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use appointment_cell::services::{
    AppointmentRepository, BookingService, ClinicFixture, InMemoryClinicStore, PatientDirectory,
    SupabaseAppointmentRepository, SupabasePatientDirectory,
};
use booking_queue_cell::QueueService;
use doctor_cell::services::{AvailabilityService, DoctorRepository, SupabaseDoctorRepository};
use package_cell::services::{PackageLedger, PackageRepository, SupabasePackageRepository};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_utils::clock::{Clock, SystemClock};

/// Services handed to the cell routers.
#[derive(Clone)]
pub struct AppServices {
    pub availability: Arc<AvailabilityService>,
    pub ledger: Arc<PackageLedger>,
    pub booking: Arc<BookingService>,
    pub queue: Arc<QueueService>,
}

struct Repositories {
    doctors: Arc<dyn DoctorRepository>,
    patients: Arc<dyn PatientDirectory>,
    appointments: Arc<dyn AppointmentRepository>,
    packages: Arc<dyn PackageRepository>,
}

impl AppServices {
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let repositories = match config.storage_backend {
            StorageBackend::Supabase => supabase_repositories(config),
            StorageBackend::Memory => memory_repositories(config).await?,
        };

        Ok(Self::assemble(config, repositories))
    }

    #[cfg(test)]
    pub fn in_memory(config: &AppConfig, store: Arc<InMemoryClinicStore>) -> Self {
        Self::assemble(config, Repositories::sharing(store))
    }

    fn assemble(config: &AppConfig, repositories: Repositories) -> Self {
        let scheduling = config.scheduling.clone();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let availability = Arc::new(AvailabilityService::new(
            repositories.doctors,
            scheduling.default_slot_minutes,
        ));
        let ledger = Arc::new(PackageLedger::new(
            repositories.packages,
            clock.clone(),
            scheduling.package_cas_retries,
        ));
        let booking = Arc::new(BookingService::new(
            repositories.appointments,
            repositories.patients,
            availability.clone(),
            ledger.clone(),
            clock,
            scheduling,
        ));
        let queue = Arc::new(QueueService::new(booking.clone()));

        Self {
            availability,
            ledger,
            booking,
            queue,
        }
    }
}

impl Repositories {
    fn sharing(store: Arc<InMemoryClinicStore>) -> Self {
        Self {
            doctors: store.clone(),
            patients: store.clone(),
            appointments: store.clone(),
            packages: store,
        }
    }
}

fn supabase_repositories(config: &AppConfig) -> Repositories {
    info!("Using Supabase storage at {}", config.supabase_url);
    let supabase = Arc::new(supabase_client(config));

    Repositories {
        doctors: Arc::new(SupabaseDoctorRepository::new(supabase.clone())),
        patients: Arc::new(SupabasePatientDirectory::new(supabase.clone())),
        appointments: Arc::new(SupabaseAppointmentRepository::new(supabase.clone())),
        packages: Arc::new(SupabasePackageRepository::new(supabase)),
    }
}

fn supabase_client(config: &AppConfig) -> SupabaseClient {
    let client = SupabaseClient::new(config);
    match &config.supabase_service_role_key {
        Some(key) => client.with_service_token(key.clone()),
        None => client,
    }
}

async fn memory_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    let store = match &config.seed_file {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading seed file {}", path))?;
            let fixture: ClinicFixture =
                serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path))?;
            InMemoryClinicStore::from_fixture(fixture).await
        }
        None => {
            info!("Using empty in-memory storage");
            InMemoryClinicStore::new()
        }
    };

    Ok(Repositories::sharing(Arc::new(store)))
}
