pub mod contracts;
pub mod locks;
pub mod memory;

pub use contracts::{
    AppointmentStore, BlockedIntervalStore, RescheduleRequestStore, SlotStore, TemplateStore,
};
pub use locks::TimelineLocks;
pub use memory::{
    InMemoryAppointmentStore, InMemoryBlockedIntervalStore, InMemoryRescheduleRequestStore,
    InMemorySlotStore, InMemoryTemplateStore,
};
