use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Injected time source. Service code never calls `Utc::now()` directly;
/// it asks its clock, so the reschedule tolerance window and the "upcoming"
/// queries are unit-testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock pinned to an explicit instant.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().unwrap();
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Half-open overlap test over `[start, end)` ranges: touching boundaries
/// do not overlap.
pub fn ranges_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// User-facing timestamp for notification texts.
/// Example: "Monday, September 25, 2024 at 14:30".
pub fn format_for_notification(at: DateTime<Utc>) -> String {
    at.format("%A, %B %-d, %Y at %H:%M").to_string()
}
