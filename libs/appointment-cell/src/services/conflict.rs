use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::{Appointment, SchedulingError};
use shared_store::AppointmentStore;

/// Time-based conflict detection against the doctor's committed bookings.
///
/// The test is purely appointment-based: any stored appointment whose
/// `[start, end)` range overlaps the probe blocks it, regardless of status.
/// Slots and blocked intervals are deliberately not consulted here — they
/// describe advertised availability, while appointments are the committed
/// claims on the doctor's time.
pub struct ConflictDetectionService {
    appointments: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { appointments }
    }

    pub async fn is_slot_available(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, SchedulingError> {
        let conflicts = self.conflicting_appointments(doctor_id, start, end, None).await?;
        Ok(conflicts.is_empty())
    }

    /// Availability test for the negotiated reschedule path: the
    /// appointment being moved must not conflict with itself.
    pub async fn is_slot_available_excluding(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Uuid,
    ) -> Result<bool, SchedulingError> {
        let conflicts = self
            .conflicting_appointments(doctor_id, start, end, Some(exclude_appointment_id))
            .await?;
        Ok(conflicts.is_empty())
    }

    pub async fn conflicting_appointments(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!("Checking conflicts for doctor {} from {} to {}", doctor_id, start, end);

        let mut conflicting = self.appointments.list_overlapping(doctor_id, start, end).await?;
        if let Some(excluded) = exclude_appointment_id {
            conflicting.retain(|a| a.id != excluded);
        }

        if !conflicting.is_empty() {
            warn!(
                "Conflict detected for doctor {} - {} overlapping appointments",
                doctor_id,
                conflicting.len()
            );
        }
        Ok(conflicting)
    }
}
