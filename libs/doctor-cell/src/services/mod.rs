pub mod availability;
pub mod repository;

pub use availability::{AvailabilityCalculator, AvailabilityService};
pub use repository::{DoctorRepository, SupabaseDoctorRepository};
