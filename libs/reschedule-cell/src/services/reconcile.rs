// libs/reschedule-cell/src/services/reconcile.rs
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_models::{SchedulingError, Slot};

/// How the new range gets reserved once the old one is freed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveAction {
    /// An existing slot covers the range; mark it unavailable.
    MarkUnavailable(Uuid),
    /// No slot exists for the range; synthesize an unavailable one.
    CreateSlot {
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// The full calendar mutation an approval will apply: slots to free, then
/// one reservation. Computed before anything is written, so the swap plus
/// the appointment time update can be applied as a unit under the doctor's
/// timeline lock.
#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub free_slot_ids: Vec<Uuid>,
    pub reserve: ReserveAction,
}

/// Policy seam for the slot swap. The default implementation reconciles
/// best-effort when slot boundaries have drifted from appointment
/// boundaries; a stricter implementation can reject instead, without
/// touching the negotiation state machine.
pub trait SlotReconciler: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn plan(
        &self,
        doctor_id: Uuid,
        old_overlapping: &[Slot],
        new_overlapping: &[Slot],
        old_start: DateTime<Utc>,
        old_end: DateTime<Utc>,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<SwapPlan, SchedulingError>;
}

/// Exact-boundary matches are the common case; the overlap-based branches
/// are fallbacks for calendars whose slot granularity does not line up with
/// the booked appointment range.
pub struct BestEffortReconciler;

impl SlotReconciler for BestEffortReconciler {
    #[allow(clippy::too_many_arguments)]
    fn plan(
        &self,
        doctor_id: Uuid,
        old_overlapping: &[Slot],
        new_overlapping: &[Slot],
        old_start: DateTime<Utc>,
        old_end: DateTime<Utc>,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<SwapPlan, SchedulingError> {
        // Free the original range: the exact match alone if there is one,
        // otherwise every unavailable overlapping slot.
        let free_slot_ids: Vec<Uuid> = match old_overlapping
            .iter()
            .find(|s| s.matches_range(old_start, old_end))
        {
            Some(exact) => vec![exact.id],
            None => old_overlapping
                .iter()
                .filter(|s| !s.available)
                .map(|s| s.id)
                .collect(),
        };

        // Reserve the new range. The reservation scan sees the free step as
        // already applied: a slot freed above counts as available here.
        let reserve = if let Some(exact) = new_overlapping
            .iter()
            .find(|s| s.matches_range(new_start, new_end))
        {
            ReserveAction::MarkUnavailable(exact.id)
        } else if let Some(open) = new_overlapping
            .iter()
            .find(|s| s.available || free_slot_ids.contains(&s.id))
        {
            ReserveAction::MarkUnavailable(open.id)
        } else {
            ReserveAction::CreateSlot { doctor_id, start: new_start, end: new_end }
        };

        Ok(SwapPlan { free_slot_ids, reserve })
    }
}
