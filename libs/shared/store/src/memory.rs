// libs/shared/store/src/memory.rs
//
// In-memory reference stores: one RwLock'd id -> entity arena per
// collection, with query ordering applied on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::{
    Appointment, AvailabilityTemplate, BlockedInterval, RescheduleRequest, RescheduleStatus, Slot,
    SchedulingError,
};
use shared_utils::ranges_overlap;

use crate::contracts::{
    AppointmentStore, BlockedIntervalStore, RescheduleRequestStore, SlotStore, TemplateStore,
};

#[derive(Default)]
pub struct InMemoryTemplateStore {
    entries: RwLock<HashMap<Uuid, AvailabilityTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn insert(&self, template: AvailabilityTemplate) -> Result<(), SchedulingError> {
        self.entries.write().await.insert(template.id, template);
        Ok(())
    }

    async fn update(&self, template: AvailabilityTemplate) -> Result<(), SchedulingError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&template.id) {
            return Err(SchedulingError::not_found(format!(
                "availability template {}",
                template.id
            )));
        }
        entries.insert(template.id, template);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AvailabilityTemplate>, SchedulingError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn find_for_day(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Result<Option<AvailabilityTemplate>, SchedulingError> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .find(|t| t.doctor_id == doctor_id && t.day_of_week == day)
            .cloned())
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<AvailabilityTemplate>, SchedulingError> {
        let mut templates: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|t| t.doctor_id == doctor_id)
            .cloned()
            .collect();
        templates.sort_by_key(|t| t.day_of_week.num_days_from_monday());
        Ok(templates)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, SchedulingError> {
        Ok(self.entries.write().await.remove(&id).is_some())
    }

    async fn delete_for_day(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Result<bool, SchedulingError> {
        let mut entries = self.entries.write().await;
        let id = entries
            .values()
            .find(|t| t.doctor_id == doctor_id && t.day_of_week == day)
            .map(|t| t.id);
        Ok(match id {
            Some(id) => entries.remove(&id).is_some(),
            None => false,
        })
    }
}

#[derive(Default)]
pub struct InMemorySlotStore {
    entries: RwLock<HashMap<Uuid, Slot>>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for InMemorySlotStore {
    async fn insert(&self, slot: Slot) -> Result<(), SchedulingError> {
        self.entries.write().await.insert(slot.id, slot);
        Ok(())
    }

    async fn insert_many(&self, slots: Vec<Slot>) -> Result<(), SchedulingError> {
        let mut entries = self.entries.write().await;
        for slot in slots {
            entries.insert(slot.id, slot);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Slot>, SchedulingError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Slot>, SchedulingError> {
        let entries = self.entries.read().await;
        Ok(ids.iter().filter_map(|id| entries.get(id).cloned()).collect())
    }

    async fn update(&self, slot: Slot) -> Result<(), SchedulingError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&slot.id) {
            return Err(SchedulingError::not_found(format!("slot {}", slot.id)));
        }
        entries.insert(slot.id, slot);
        Ok(())
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Slot>, SchedulingError> {
        let mut slots: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|s| s.doctor_id == doctor_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn list_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Slot>, SchedulingError> {
        let mut slots: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|s| {
                s.doctor_id == doctor_id
                    && ranges_overlap(s.start_time, s.end_time, start, end)
            })
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn list_available_in(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, SchedulingError> {
        let mut slots: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|s| {
                s.doctor_id == doctor_id
                    && s.available
                    && s.start_time >= from
                    && s.start_time <= to
            })
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, SchedulingError> {
        Ok(self.entries.write().await.remove(&id).is_some())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<(), SchedulingError> {
        let mut entries = self.entries.write().await;
        for id in ids {
            entries.remove(id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBlockedIntervalStore {
    entries: RwLock<HashMap<Uuid, BlockedInterval>>,
}

impl InMemoryBlockedIntervalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockedIntervalStore for InMemoryBlockedIntervalStore {
    async fn insert(&self, interval: BlockedInterval) -> Result<(), SchedulingError> {
        self.entries.write().await.insert(interval.id, interval);
        Ok(())
    }

    async fn update(&self, interval: BlockedInterval) -> Result<(), SchedulingError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&interval.id) {
            return Err(SchedulingError::not_found(format!(
                "blocked interval {}",
                interval.id
            )));
        }
        entries.insert(interval.id, interval);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<BlockedInterval>, SchedulingError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<BlockedInterval>, SchedulingError> {
        let mut intervals: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|b| b.doctor_id == doctor_id)
            .cloned()
            .collect();
        intervals.sort_by_key(|b| b.start_time);
        Ok(intervals)
    }

    async fn list_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BlockedInterval>, SchedulingError> {
        let mut intervals: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|b| {
                b.doctor_id == doctor_id
                    && ranges_overlap(b.start_time, b.end_time, start, end)
            })
            .cloned()
            .collect();
        intervals.sort_by_key(|b| b.start_time);
        Ok(intervals)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, SchedulingError> {
        Ok(self.entries.write().await.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    entries: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<(), SchedulingError> {
        self.entries.write().await.insert(appointment.id, appointment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn update(&self, appointment: Appointment) -> Result<(), SchedulingError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&appointment.id) {
            return Err(SchedulingError::not_found(format!(
                "appointment {}",
                appointment.id
            )));
        }
        entries.insert(appointment.id, appointment);
        Ok(())
    }

    async fn list_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut appointments: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| std::cmp::Reverse(a.start_time));
        Ok(appointments)
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, SchedulingError> {
        let mut appointments: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| std::cmp::Reverse(a.start_time));
        Ok(appointments)
    }

    async fn list_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut appointments: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|a| {
                a.doctor_id == doctor_id
                    && ranges_overlap(a.start_time, a.end_time, start, end)
            })
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.start_time);
        Ok(appointments)
    }
}

#[derive(Default)]
pub struct InMemoryRescheduleRequestStore {
    entries: RwLock<HashMap<Uuid, RescheduleRequest>>,
}

impl InMemoryRescheduleRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RescheduleRequestStore for InMemoryRescheduleRequestStore {
    async fn insert(&self, request: RescheduleRequest) -> Result<(), SchedulingError> {
        self.entries.write().await.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<RescheduleRequest>, SchedulingError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn update(&self, request: RescheduleRequest) -> Result<(), SchedulingError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&request.id) {
            return Err(SchedulingError::not_found(format!(
                "reschedule request {}",
                request.id
            )));
        }
        entries.insert(request.id, request);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, SchedulingError> {
        Ok(self.entries.write().await.remove(&id).is_some())
    }

    async fn find_pending_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<RescheduleRequest>, SchedulingError> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .find(|r| r.appointment_id == appointment_id && r.status == RescheduleStatus::Pending)
            .cloned())
    }

    async fn list_for_appointments(
        &self,
        appointment_ids: &[Uuid],
    ) -> Result<Vec<RescheduleRequest>, SchedulingError> {
        let mut requests: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|r| appointment_ids.contains(&r.appointment_id))
            .cloned()
            .collect();
        requests.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        Ok(requests)
    }

    async fn list_for_appointments_with_status(
        &self,
        appointment_ids: &[Uuid],
        status: RescheduleStatus,
    ) -> Result<Vec<RescheduleRequest>, SchedulingError> {
        let mut requests: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .filter(|r| r.status == status && appointment_ids.contains(&r.appointment_id))
            .cloned()
            .collect();
        requests.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        Ok(requests)
    }
}
