pub mod ledger;
pub mod memory;
pub mod repository;

pub use ledger::PackageLedger;
pub use memory::InMemoryPackageRepository;
pub use repository::{PackageRepository, SupabasePackageRepository};
