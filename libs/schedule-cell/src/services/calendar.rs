// libs/schedule-cell/src/services/calendar.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::collaborators::{require_doctor, Directory};
use shared_models::{SchedulingError, Slot, SlotView, SlotViewStatus};
use shared_store::{AppointmentStore, BlockedIntervalStore, SlotStore};
use shared_utils::ranges_overlap;

use crate::models::{CreateSlotRequest, UpdateSlotRequest};

/// The authoritative set of concrete, dated slots per doctor.
///
/// Appointments are read here only to guard deletion and to annotate the
/// calendar view; booking itself never consults slots (advertised
/// availability and committed bookings are intentionally separate).
pub struct SlotCalendarService {
    slots: Arc<dyn SlotStore>,
    blocked: Arc<dyn BlockedIntervalStore>,
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn Directory>,
}

impl SlotCalendarService {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        blocked: Arc<dyn BlockedIntervalStore>,
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self { slots, blocked, appointments, directory }
    }

    pub async fn create_slot(&self, request: CreateSlotRequest) -> Result<Slot, SchedulingError> {
        require_doctor(self.directory.as_ref(), request.doctor_id).await?;
        if request.start_time >= request.end_time {
            return Err(SchedulingError::validation("Start time must be before end time"));
        }

        let slot = Slot::new(request.doctor_id, request.start_time, request.end_time);
        self.slots.insert(slot.clone()).await?;
        debug!("Created slot {} for doctor {}", slot.id, slot.doctor_id);
        Ok(slot)
    }

    pub async fn update_slot(
        &self,
        slot_id: Uuid,
        request: UpdateSlotRequest,
    ) -> Result<Slot, SchedulingError> {
        let mut slot = self.require_slot(slot_id).await?;
        if request.start_time >= request.end_time {
            return Err(SchedulingError::validation("Start time must be before end time"));
        }

        slot.start_time = request.start_time;
        slot.end_time = request.end_time;
        slot.available = request.available;
        self.slots.update(slot.clone()).await?;
        Ok(slot)
    }

    pub async fn delete_slot(&self, slot_id: Uuid) -> Result<(), SchedulingError> {
        if !self.slots.delete(slot_id).await? {
            return Err(SchedulingError::not_found(format!("slot {slot_id}")));
        }
        Ok(())
    }

    /// All-or-nothing batch deletion. Any slot in the batch whose range
    /// overlaps an existing appointment aborts the whole batch, naming the
    /// blocking slot; nothing is deleted in that case. Ids that resolve to
    /// no slot are ignored.
    pub async fn delete_slots(&self, slot_ids: &[Uuid]) -> Result<(), SchedulingError> {
        if slot_ids.is_empty() {
            return Ok(());
        }

        let slots = self.slots.get_many(slot_ids).await?;
        for slot in &slots {
            let conflicting = self
                .appointments
                .list_overlapping(slot.doctor_id, slot.start_time, slot.end_time)
                .await?;
            if !conflicting.is_empty() {
                warn!(
                    "Refusing to delete slot batch: slot {} has {} overlapping appointments",
                    slot.id,
                    conflicting.len()
                );
                return Err(SchedulingError::conflict(format!(
                    "Cannot delete slot {} because it has existing appointments. \
                     Please cancel the appointments first.",
                    slot.id
                )));
            }
        }

        let ids: Vec<Uuid> = slots.iter().map(|s| s.id).collect();
        self.slots.delete_many(&ids).await?;
        info!("Deleted {} slots", ids.len());
        Ok(())
    }

    pub async fn doctor_schedule(&self, doctor_id: Uuid) -> Result<Vec<Slot>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        self.slots.list_for_doctor(doctor_id).await
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        self.slots.list_available_in(doctor_id, from, to).await
    }

    /// Status-annotated calendar view over `[from, to)`. A blocked interval
    /// wins over a booking, which wins over free; the reported availability
    /// follows the derived status, not the raw flag.
    pub async fn schedule_with_status(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SlotView>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;

        let slots = self.slots.list_overlapping(doctor_id, from, to).await?;
        let blocked = self.blocked.list_overlapping(doctor_id, from, to).await?;
        let appointments = self.appointments.list_overlapping(doctor_id, from, to).await?;

        let views = slots
            .into_iter()
            .map(|slot| {
                let blocking = blocked.iter().find(|b| {
                    ranges_overlap(slot.start_time, slot.end_time, b.start_time, b.end_time)
                });
                if let Some(interval) = blocking {
                    return SlotView {
                        id: slot.id,
                        doctor_id: slot.doctor_id,
                        start_time: slot.start_time,
                        end_time: slot.end_time,
                        available: false,
                        status: SlotViewStatus::Blocked,
                        blocked_reason: Some(interval.reason.clone()),
                        appointment_id: slot.appointment_id,
                    };
                }

                let booking = appointments.iter().find(|a| {
                    ranges_overlap(slot.start_time, slot.end_time, a.start_time, a.end_time)
                });
                match booking {
                    Some(appointment) => SlotView {
                        id: slot.id,
                        doctor_id: slot.doctor_id,
                        start_time: slot.start_time,
                        end_time: slot.end_time,
                        available: false,
                        status: SlotViewStatus::Booked,
                        blocked_reason: None,
                        appointment_id: Some(appointment.id),
                    },
                    None => SlotView {
                        id: slot.id,
                        doctor_id: slot.doctor_id,
                        start_time: slot.start_time,
                        end_time: slot.end_time,
                        available: true,
                        status: SlotViewStatus::Free,
                        blocked_reason: None,
                        appointment_id: None,
                    },
                }
            })
            .collect();

        Ok(views)
    }

    pub async fn mark_unavailable(&self, slot_id: Uuid) -> Result<(), SchedulingError> {
        let mut slot = self.require_slot(slot_id).await?;
        slot.available = false;
        self.slots.update(slot).await
    }

    pub async fn mark_available(&self, slot_id: Uuid) -> Result<(), SchedulingError> {
        let mut slot = self.require_slot(slot_id).await?;
        slot.available = true;
        self.slots.update(slot).await
    }

    async fn require_slot(&self, slot_id: Uuid) -> Result<Slot, SchedulingError> {
        self.slots
            .get(slot_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("slot {slot_id}")))
    }
}
