// libs/shared/utils/src/test_support.rs
//
// Fixtures shared by the cells' integration tests.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use shared_models::{Appointment, AppointmentStatus, BlockedInterval, Slot};

/// Shorthand UTC timestamp builder for tests.
pub fn dt(y: i32, mo: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, min, 0).unwrap()
}

pub fn slot(doctor_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Slot {
    Slot::new(doctor_id, start, end)
}

pub fn booked_slot(doctor_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Slot {
    let mut slot = Slot::new(doctor_id, start, end);
    slot.available = false;
    slot
}

pub fn appointment(
    patient_id: Uuid,
    doctor_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    status: AppointmentStatus,
) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id,
        service_id: None,
        start_time: start,
        end_time: end,
        status,
        notes: None,
        cancellation_reason: None,
        created_at: start - chrono::Duration::days(1),
    }
}

pub fn blocked_interval(
    doctor_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    reason: &str,
) -> BlockedInterval {
    BlockedInterval {
        id: Uuid::new_v4(),
        doctor_id,
        start_time: start,
        end_time: end,
        reason: reason.to_string(),
    }
}
