// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::{AppointmentStatus, SchedulingError};

use crate::models::TransitionPolicy;

/// Drives the appointment status state machine according to the configured
/// transition policy.
pub struct AppointmentLifecycleService {
    policy: TransitionPolicy,
}

impl AppointmentLifecycleService {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    pub fn unrestricted() -> Self {
        Self::new(TransitionPolicy::Unrestricted)
    }

    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        debug!("Validating status transition {} -> {}", current, next);

        match self.policy {
            TransitionPolicy::Unrestricted => Ok(()),
            TransitionPolicy::Strict => {
                if self.valid_transitions(current).contains(&next) {
                    Ok(())
                } else {
                    warn!("Invalid status transition attempted: {} -> {}", current, next);
                    Err(SchedulingError::invalid_state(format!(
                        "Appointment cannot move from {current} to {next}"
                    )))
                }
            }
        }
    }

    /// Strict-policy table. Pending is the initial state; Cancelled,
    /// Completed, and NoShow are terminal.
    pub fn valid_transitions(&self, current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Cancelled
            | AppointmentStatus::Completed
            | AppointmentStatus::NoShow => vec![],
        }
    }
}
