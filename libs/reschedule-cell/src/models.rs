use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRescheduleRequest {
    pub appointment_id: Uuid,
    pub requested_start: DateTime<Utc>,
    pub requested_end: DateTime<Utc>,
    pub patient_reason: Option<String>,
}

/// The doctor's verdict on a pending reschedule request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RescheduleDecision {
    Approved,
    Rejected,
}
