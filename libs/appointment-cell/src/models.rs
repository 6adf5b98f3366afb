// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub service_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Business rule for which status transitions `update_status` accepts.
///
/// `Unrestricted` matches the reference behavior: any status may follow any
/// status, and there are no enforced terminal states. `Strict` enforces a
/// conventional lifecycle table for deployments that want Cancelled,
/// Completed, and NoShow to be terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    Unrestricted,
    Strict,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        TransitionPolicy::Unrestricted
    }
}
