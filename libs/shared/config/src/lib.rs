use std::env;
use tracing::warn;

/// Scheduling knobs, loaded from the environment with warn-and-default
/// behavior. The binary loads `.env` before calling `from_env`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Duration assumed by the direct (non-negotiated) reschedule path.
    pub default_appointment_duration_minutes: i64,
    /// Clock-skew allowance when validating a requested reschedule time
    /// against "now". Absorbs request latency and client clock drift.
    pub reschedule_tolerance_minutes: i64,
    /// How far ahead slot generation is expected to run by default.
    pub generation_horizon_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            default_appointment_duration_minutes: read_i64(
                "SCHEDULING_DEFAULT_DURATION_MINUTES",
                60,
            ),
            reschedule_tolerance_minutes: read_i64("SCHEDULING_RESCHEDULE_TOLERANCE_MINUTES", 5),
            generation_horizon_days: read_i64("SCHEDULING_GENERATION_HORIZON_DAYS", 30),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_appointment_duration_minutes: 60,
            reschedule_tolerance_minutes: 5,
            generation_horizon_days: 30,
        }
    }
}

fn read_i64(var: &str, default: i64) -> i64 {
    match env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a number ({:?}), using default {}", var, raw, default);
            default
        }),
        Err(_) => default,
    }
}
