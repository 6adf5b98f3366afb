pub mod collaborators;
pub mod error;
pub mod scheduling;

pub use error::SchedulingError;
pub use scheduling::{
    Appointment, AppointmentStatus, AvailabilityTemplate, BlockedInterval, RescheduleRequest,
    RescheduleStatus, Slot, SlotView, SlotViewStatus,
};
