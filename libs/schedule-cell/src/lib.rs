pub mod models;
pub mod services;

pub use services::availability::AvailabilityTemplateService;
pub use services::blocked::BlockedIntervalService;
pub use services::calendar::SlotCalendarService;
pub use services::generator::{generate, SlotGenerationService};
