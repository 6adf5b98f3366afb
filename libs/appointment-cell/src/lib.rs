pub mod models;
pub mod services;

pub use models::{BookAppointmentRequest, TransitionPolicy};
pub use services::booking::AppointmentBookingService;
pub use services::conflict::ConflictDetectionService;
pub use services::lifecycle::AppointmentLifecycleService;
