// libs/shared/models/src/scheduling.rs
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A doctor's recurring weekly working-hours rule for one day of the week.
/// At most one template exists per (doctor, weekday); setting a new one for
/// an existing day replaces it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityTemplate {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: u32,
}

/// One concrete, dated unit of bookable (or reserved) calendar time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub available: bool,
    pub appointment_id: Option<Uuid>,
}

impl Slot {
    pub fn new(doctor_id: Uuid, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            start_time,
            end_time,
            available: true,
            appointment_id: None,
        }
    }

    /// Exact-boundary match, the common case in slot reconciliation.
    pub fn matches_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time == start && self.end_time == end
    }
}

/// A doctor-declared time range withdrawn from presentation as free,
/// independent of bookings. Purely additive metadata over the calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedInterval {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that hold a claim on the doctor's timeline.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "PENDING"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
            AppointmentStatus::Completed => write!(f, "COMPLETED"),
            AppointmentStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

/// A committed booking between a patient and a doctor over a time range.
/// Cancellation is a status, not a deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub service_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RescheduleStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for RescheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RescheduleStatus::Pending => write!(f, "PENDING"),
            RescheduleStatus::Approved => write!(f, "APPROVED"),
            RescheduleStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A patient-initiated proposal to move an existing appointment, subject to
/// doctor approval. Mutated exactly once (Pending -> Approved | Rejected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub original_start: DateTime<Utc>,
    pub requested_start: DateTime<Utc>,
    pub requested_end: DateTime<Utc>,
    pub status: RescheduleStatus,
    pub patient_reason: Option<String>,
    pub doctor_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotViewStatus {
    Free,
    Booked,
    Blocked,
}

/// Status-annotated projection of a slot for calendar rendering. A blocked
/// interval wins over a booking, which wins over free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub available: bool,
    pub status: SlotViewStatus,
    pub blocked_reason: Option<String>,
    pub appointment_id: Option<Uuid>,
}
