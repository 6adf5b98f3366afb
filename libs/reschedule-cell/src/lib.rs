pub mod models;
pub mod services;

pub use models::{CreateRescheduleRequest, RescheduleDecision};
pub use services::negotiation::RescheduleNegotiationService;
pub use services::reconcile::{BestEffortReconciler, ReserveAction, SlotReconciler, SwapPlan};
