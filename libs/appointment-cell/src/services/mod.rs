pub mod booking;
pub mod lifecycle;
pub mod memory;
pub mod repository;

pub use booking::BookingService;
pub use lifecycle::{StatusStateMachine, Transition};
pub use memory::{ClinicFixture, InMemoryClinicStore};
pub use repository::{AppointmentRepository, PatientDirectory, SupabaseAppointmentRepository, SupabasePatientDirectory};
