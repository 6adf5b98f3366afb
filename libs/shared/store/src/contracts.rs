// libs/shared/store/src/contracts.rs
//
// Storage contracts for the five persisted collections. The core is written
// against these traits; the in-memory stores in this crate are the reference
// implementation and any backend satisfying the same query semantics can be
// substituted. Range queries use half-open `[start, end)` overlap.

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use uuid::Uuid;

use shared_models::{
    Appointment, AvailabilityTemplate, BlockedInterval, RescheduleRequest, RescheduleStatus, Slot,
    SchedulingError,
};

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn insert(&self, template: AvailabilityTemplate) -> Result<(), SchedulingError>;
    /// Replaces the stored template with the same id. `NotFound` if absent.
    async fn update(&self, template: AvailabilityTemplate) -> Result<(), SchedulingError>;
    async fn get(&self, id: Uuid) -> Result<Option<AvailabilityTemplate>, SchedulingError>;
    async fn find_for_day(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Result<Option<AvailabilityTemplate>, SchedulingError>;
    /// All templates for the doctor, ordered by weekday (Monday first).
    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<AvailabilityTemplate>, SchedulingError>;
    async fn delete(&self, id: Uuid) -> Result<bool, SchedulingError>;
    async fn delete_for_day(&self, doctor_id: Uuid, day: Weekday)
        -> Result<bool, SchedulingError>;
}

#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn insert(&self, slot: Slot) -> Result<(), SchedulingError>;
    async fn insert_many(&self, slots: Vec<Slot>) -> Result<(), SchedulingError>;
    async fn get(&self, id: Uuid) -> Result<Option<Slot>, SchedulingError>;
    /// Slots for the given ids; missing ids are simply absent from the result.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Slot>, SchedulingError>;
    async fn update(&self, slot: Slot) -> Result<(), SchedulingError>;
    /// All slots for the doctor, ordered by start time.
    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Slot>, SchedulingError>;
    /// Slots overlapping `[start, end)`, ordered by start time.
    async fn list_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Slot>, SchedulingError>;
    /// Available slots starting within `[from, to]`, ordered by start time.
    async fn list_available_in(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, SchedulingError>;
    async fn delete(&self, id: Uuid) -> Result<bool, SchedulingError>;
    async fn delete_many(&self, ids: &[Uuid]) -> Result<(), SchedulingError>;
}

#[async_trait]
pub trait BlockedIntervalStore: Send + Sync {
    async fn insert(&self, interval: BlockedInterval) -> Result<(), SchedulingError>;
    async fn update(&self, interval: BlockedInterval) -> Result<(), SchedulingError>;
    async fn get(&self, id: Uuid) -> Result<Option<BlockedInterval>, SchedulingError>;
    /// All intervals for the doctor, ordered by start time.
    async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<BlockedInterval>, SchedulingError>;
    /// Intervals overlapping `[start, end)`, ordered by start time.
    async fn list_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BlockedInterval>, SchedulingError>;
    async fn delete(&self, id: Uuid) -> Result<bool, SchedulingError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<(), SchedulingError>;
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError>;
    async fn update(&self, appointment: Appointment) -> Result<(), SchedulingError>;
    /// All appointments for the patient, most recent start first.
    async fn list_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError>;
    /// All appointments for the doctor, most recent start first.
    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, SchedulingError>;
    /// Appointments overlapping `[start, end)`, ordered by start time.
    /// Status is deliberately NOT filtered here; callers decide.
    async fn list_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError>;
}

#[async_trait]
pub trait RescheduleRequestStore: Send + Sync {
    async fn insert(&self, request: RescheduleRequest) -> Result<(), SchedulingError>;
    async fn get(&self, id: Uuid) -> Result<Option<RescheduleRequest>, SchedulingError>;
    async fn update(&self, request: RescheduleRequest) -> Result<(), SchedulingError>;
    async fn delete(&self, id: Uuid) -> Result<bool, SchedulingError>;
    /// The at-most-one request with status Pending for this appointment.
    async fn find_pending_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<RescheduleRequest>, SchedulingError>;
    /// Requests belonging to any of the given appointments, newest first.
    async fn list_for_appointments(
        &self,
        appointment_ids: &[Uuid],
    ) -> Result<Vec<RescheduleRequest>, SchedulingError>;
    /// Requests with the given status across the given appointments, newest first.
    async fn list_for_appointments_with_status(
        &self,
        appointment_ids: &[Uuid],
        status: RescheduleStatus,
    ) -> Result<Vec<RescheduleRequest>, SchedulingError>;
}
