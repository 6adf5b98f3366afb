// libs/reschedule-cell/src/services/negotiation.rs
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::AppointmentBookingService;
use shared_config::AppConfig;
use shared_models::collaborators::{
    require_doctor, require_patient, Directory, NotificationCategory, NotificationRequest,
    Notifier,
};
use shared_models::{
    Appointment, RescheduleRequest, RescheduleStatus, SchedulingError, Slot,
};
use shared_store::{AppointmentStore, RescheduleRequestStore, SlotStore, TimelineLocks};
use shared_utils::{format_for_notification, Clock};

use crate::models::{CreateRescheduleRequest, RescheduleDecision};
use crate::services::reconcile::{ReserveAction, SlotReconciler, SwapPlan};

/// Orchestrates the patient-proposes / doctor-responds reschedule workflow.
///
/// Per appointment at most one request may be pending; a request is mutated
/// exactly once, to Approved or Rejected. Approval performs the slot swap
/// and the appointment time update as one unit under the doctor's timeline
/// lock: the plan is computed only after every validation has passed, and
/// nothing is written before that point.
pub struct RescheduleNegotiationService {
    requests: Arc<dyn RescheduleRequestStore>,
    appointments: Arc<dyn AppointmentStore>,
    slots: Arc<dyn SlotStore>,
    booking: Arc<AppointmentBookingService>,
    reconciler: Arc<dyn SlotReconciler>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn Notifier>,
    locks: Arc<TimelineLocks>,
    clock: Arc<dyn Clock>,
    config: AppConfig,
}

impl RescheduleNegotiationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        requests: Arc<dyn RescheduleRequestStore>,
        appointments: Arc<dyn AppointmentStore>,
        slots: Arc<dyn SlotStore>,
        booking: Arc<AppointmentBookingService>,
        reconciler: Arc<dyn SlotReconciler>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
        locks: Arc<TimelineLocks>,
        clock: Arc<dyn Clock>,
        config: AppConfig,
    ) -> Self {
        Self {
            requests,
            appointments,
            slots,
            booking,
            reconciler,
            directory,
            notifier,
            locks,
            clock,
            config,
        }
    }

    pub async fn create_request(
        &self,
        request: CreateRescheduleRequest,
    ) -> Result<RescheduleRequest, SchedulingError> {
        debug!(
            "Creating reschedule request for appointment {} to {}",
            request.appointment_id, request.requested_start
        );

        let appointment = self.booking.get_appointment(request.appointment_id).await?;

        if request.requested_start >= request.requested_end {
            return Err(SchedulingError::validation("Start time must be before end time"));
        }

        if self
            .requests
            .find_pending_for_appointment(appointment.id)
            .await?
            .is_some()
        {
            return Err(SchedulingError::invalid_state(
                "There is already a pending reschedule request for this appointment",
            ));
        }

        // Tolerance absorbs request latency and client clock drift; it is
        // not a rule about how far ahead bookings must be made.
        let now = self.clock.now();
        let earliest_accepted = now - Duration::minutes(self.config.reschedule_tolerance_minutes);
        if request.requested_start < earliest_accepted {
            return Err(SchedulingError::validation(format!(
                "Requested time must be in the future. Current: {}, Requested: {}",
                now, request.requested_start
            )));
        }

        let available = self
            .booking
            .conflict_service()
            .is_slot_available_excluding(
                appointment.doctor_id,
                request.requested_start,
                request.requested_end,
                appointment.id,
            )
            .await?;
        if !available {
            return Err(SchedulingError::conflict("The requested time slot is not available"));
        }

        let reschedule = RescheduleRequest {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            original_start: appointment.start_time,
            requested_start: request.requested_start,
            requested_end: request.requested_end,
            status: RescheduleStatus::Pending,
            patient_reason: request.patient_reason,
            doctor_response: None,
            created_at: now,
            responded_at: None,
        };
        self.requests.insert(reschedule.clone()).await?;

        let patient = require_patient(self.directory.as_ref(), appointment.patient_id).await?;
        self.notify_quiet(NotificationRequest {
            user_id: appointment.doctor_id,
            title: "New Reschedule Request".to_string(),
            message: format!(
                "You have a new reschedule request from {} for the appointment on {}. \
                 They want to reschedule to {}.",
                patient.full_name,
                format_for_notification(appointment.start_time),
                format_for_notification(reschedule.requested_start)
            ),
            category: NotificationCategory::SystemNotification,
        })
        .await;

        info!(
            "Reschedule request {} created for appointment {}",
            reschedule.id, appointment.id
        );
        Ok(reschedule)
    }

    pub async fn respond(
        &self,
        request_id: Uuid,
        decision: RescheduleDecision,
        doctor_response: Option<String>,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let mut request = self.get_request(request_id).await?;

        if request.status != RescheduleStatus::Pending {
            return Err(SchedulingError::invalid_state(
                "This reschedule request has already been responded to",
            ));
        }

        let appointment = self.booking.get_appointment(request.appointment_id).await?;

        match decision {
            RescheduleDecision::Approved => {
                self.approve(&mut request, appointment, doctor_response).await?
            }
            RescheduleDecision::Rejected => {
                self.reject(&mut request, &appointment, doctor_response).await?
            }
        }

        Ok(request)
    }

    /// Patient withdraws a request before the doctor responds. Resolved
    /// requests are immutable history and cannot be cancelled.
    pub async fn cancel_request(&self, request_id: Uuid) -> Result<(), SchedulingError> {
        let request = self.get_request(request_id).await?;
        if request.status != RescheduleStatus::Pending {
            return Err(SchedulingError::invalid_state(
                "Only pending reschedule requests can be cancelled",
            ));
        }
        self.requests.delete(request_id).await?;
        info!("Reschedule request {} cancelled by patient", request_id);
        Ok(())
    }

    pub async fn get_request(
        &self,
        request_id: Uuid,
    ) -> Result<RescheduleRequest, SchedulingError> {
        self.requests
            .get(request_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("reschedule request {request_id}")))
    }

    pub async fn requests_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<RescheduleRequest>, SchedulingError> {
        require_patient(self.directory.as_ref(), patient_id).await?;
        let ids = self.appointment_ids(self.appointments.list_for_patient(patient_id).await?);
        self.requests.list_for_appointments(&ids).await
    }

    pub async fn requests_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<RescheduleRequest>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        let ids = self.appointment_ids(self.appointments.list_for_doctor(doctor_id).await?);
        self.requests.list_for_appointments(&ids).await
    }

    pub async fn pending_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<RescheduleRequest>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        let ids = self.appointment_ids(self.appointments.list_for_doctor(doctor_id).await?);
        self.requests
            .list_for_appointments_with_status(&ids, RescheduleStatus::Pending)
            .await
    }

    pub async fn count_pending_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<usize, SchedulingError> {
        Ok(self.pending_for_doctor(doctor_id).await?.len())
    }

    async fn approve(
        &self,
        request: &mut RescheduleRequest,
        mut appointment: Appointment,
        doctor_response: Option<String>,
    ) -> Result<(), SchedulingError> {
        let _guard = self.locks.acquire(appointment.doctor_id).await;

        // Re-validate: another booking may have taken the range between
        // request creation and the doctor's response.
        let still_available = self
            .booking
            .conflict_service()
            .is_slot_available_excluding(
                appointment.doctor_id,
                request.requested_start,
                request.requested_end,
                appointment.id,
            )
            .await?;
        if !still_available {
            warn!(
                "Approval of reschedule request {} rejected: slot raced away",
                request.id
            );
            return Err(SchedulingError::invalid_state(
                "The requested time slot is no longer available",
            ));
        }

        let old_start = appointment.start_time;
        let old_end = appointment.end_time;

        let old_overlapping = self
            .slots
            .list_overlapping(appointment.doctor_id, old_start, old_end)
            .await?;
        let new_overlapping = self
            .slots
            .list_overlapping(appointment.doctor_id, request.requested_start, request.requested_end)
            .await?;

        let plan = self.reconciler.plan(
            appointment.doctor_id,
            &old_overlapping,
            &new_overlapping,
            old_start,
            old_end,
            request.requested_start,
            request.requested_end,
        )?;

        // All validation has passed; apply the swap and the appointment
        // update as one unit while still holding the timeline lock.
        self.apply_swap(&old_overlapping, &new_overlapping, &plan, appointment.id).await?;

        appointment.start_time = request.requested_start;
        appointment.end_time = request.requested_end;
        self.appointments.update(appointment.clone()).await?;

        request.status = RescheduleStatus::Approved;
        request.doctor_response = doctor_response.clone();
        request.responded_at = Some(self.clock.now());
        self.requests.update(request.clone()).await?;

        info!(
            "Appointment {} rescheduled from {} to {}",
            appointment.id, old_start, request.requested_start
        );

        let note = doctor_response
            .map(|r| format!(". Doctor's note: {r}"))
            .unwrap_or_else(|| ".".to_string());
        self.notify_quiet(NotificationRequest {
            user_id: appointment.patient_id,
            title: "Reschedule Request Approved".to_string(),
            message: format!(
                "Your reschedule request has been approved! Your appointment has been moved to {}{}",
                format_for_notification(request.requested_start),
                note
            ),
            category: NotificationCategory::AppointmentRescheduled,
        })
        .await;

        Ok(())
    }

    async fn reject(
        &self,
        request: &mut RescheduleRequest,
        appointment: &Appointment,
        doctor_response: Option<String>,
    ) -> Result<(), SchedulingError> {
        request.status = RescheduleStatus::Rejected;
        request.doctor_response = doctor_response.clone();
        request.responded_at = Some(self.clock.now());
        self.requests.update(request.clone()).await?;

        let reason = doctor_response
            .map(|r| format!(" Reason: {r}"))
            .unwrap_or_default();
        self.notify_quiet(NotificationRequest {
            user_id: appointment.patient_id,
            title: "Reschedule Request Rejected".to_string(),
            message: format!(
                "Your reschedule request has been rejected. Your original appointment on {} \
                 remains scheduled.{}",
                format_for_notification(appointment.start_time),
                reason
            ),
            category: NotificationCategory::SystemNotification,
        })
        .await;

        Ok(())
    }

    async fn apply_swap(
        &self,
        old_overlapping: &[Slot],
        new_overlapping: &[Slot],
        plan: &SwapPlan,
        appointment_id: Uuid,
    ) -> Result<(), SchedulingError> {
        for slot_id in &plan.free_slot_ids {
            if let Some(slot) = find_slot(old_overlapping, *slot_id) {
                let mut freed = slot.clone();
                freed.available = true;
                freed.appointment_id = None;
                self.slots.update(freed).await?;
                debug!("Freed slot {}", slot_id);
            }
        }

        match &plan.reserve {
            ReserveAction::MarkUnavailable(slot_id) => {
                let slot = find_slot(new_overlapping, *slot_id)
                    .or_else(|| find_slot(old_overlapping, *slot_id))
                    .ok_or_else(|| SchedulingError::not_found(format!("slot {slot_id}")))?;
                let mut reserved = slot.clone();
                reserved.available = false;
                reserved.appointment_id = Some(appointment_id);
                self.slots.update(reserved).await?;
                debug!("Reserved slot {}", slot_id);
            }
            ReserveAction::CreateSlot { doctor_id, start, end } => {
                let mut slot = Slot::new(*doctor_id, *start, *end);
                slot.available = false;
                slot.appointment_id = Some(appointment_id);
                debug!("Created reserved slot {} for {} - {}", slot.id, start, end);
                self.slots.insert(slot).await?;
            }
        }

        Ok(())
    }

    fn appointment_ids(&self, appointments: Vec<Appointment>) -> Vec<Uuid> {
        appointments.into_iter().map(|a| a.id).collect()
    }

    async fn notify_quiet(&self, request: NotificationRequest) {
        if let Err(err) = self.notifier.notify(request).await {
            warn!("Notification delivery failed, continuing: {err:#}");
        }
    }
}

fn find_slot(slots: &[Slot], id: Uuid) -> Option<&Slot> {
    slots.iter().find(|s| s.id == id)
}
