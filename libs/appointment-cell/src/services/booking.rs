// libs/appointment-cell/src/services/booking.rs
use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::collaborators::{
    require_doctor, require_patient, Directory, NotificationCategory, NotificationRequest,
    Notifier, ServiceCatalog,
};
use shared_models::{Appointment, AppointmentStatus, SchedulingError};
use shared_store::{AppointmentStore, TimelineLocks};
use shared_utils::{format_for_notification, Clock};

use crate::models::{BookAppointmentRequest, TransitionPolicy};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

/// Creates, reads, and cancels appointments, and drives the status state
/// machine. The check-then-insert sequence of booking runs under the owning
/// doctor's timeline lock so two concurrent bookings cannot both pass the
/// availability check for the same range.
pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentStore>,
    conflict: ConflictDetectionService,
    lifecycle: AppointmentLifecycleService,
    directory: Arc<dyn Directory>,
    catalog: Arc<dyn ServiceCatalog>,
    notifier: Arc<dyn Notifier>,
    locks: Arc<TimelineLocks>,
    clock: Arc<dyn Clock>,
    config: AppConfig,
}

impl AppointmentBookingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn Directory>,
        catalog: Arc<dyn ServiceCatalog>,
        notifier: Arc<dyn Notifier>,
        locks: Arc<TimelineLocks>,
        clock: Arc<dyn Clock>,
        config: AppConfig,
    ) -> Self {
        Self::with_policy(
            appointments,
            directory,
            catalog,
            notifier,
            locks,
            clock,
            config,
            TransitionPolicy::Unrestricted,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_policy(
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn Directory>,
        catalog: Arc<dyn ServiceCatalog>,
        notifier: Arc<dyn Notifier>,
        locks: Arc<TimelineLocks>,
        clock: Arc<dyn Clock>,
        config: AppConfig,
        policy: TransitionPolicy,
    ) -> Self {
        let conflict = ConflictDetectionService::new(Arc::clone(&appointments));
        Self {
            appointments,
            conflict,
            lifecycle: AppointmentLifecycleService::new(policy),
            directory,
            catalog,
            notifier,
            locks,
            clock,
            config,
        }
    }

    pub fn conflict_service(&self) -> &ConflictDetectionService {
        &self.conflict
    }

    pub async fn create_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking appointment for patient {} with doctor {}",
            request.patient_id, request.doctor_id
        );

        if request.start_time >= request.end_time {
            return Err(SchedulingError::validation("Start time must be before end time"));
        }

        let patient = require_patient(self.directory.as_ref(), request.patient_id).await?;
        let doctor = require_doctor(self.directory.as_ref(), request.doctor_id).await?;

        if let Some(service_id) = request.service_id {
            self.catalog
                .service(service_id)
                .await?
                .ok_or_else(|| SchedulingError::not_found(format!("service {service_id}")))?;
        }

        let appointment = {
            let _guard = self.locks.acquire(request.doctor_id).await;

            if !self
                .conflict
                .is_slot_available(request.doctor_id, request.start_time, request.end_time)
                .await?
            {
                return Err(SchedulingError::conflict("Time slot is not available"));
            }

            let appointment = Appointment {
                id: Uuid::new_v4(),
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                service_id: request.service_id,
                start_time: request.start_time,
                end_time: request.end_time,
                status: AppointmentStatus::Pending,
                notes: request.notes,
                cancellation_reason: None,
                created_at: self.clock.now(),
            };
            self.appointments.insert(appointment.clone()).await?;
            appointment
        };

        let when = format_for_notification(appointment.start_time);
        self.notify_quiet(NotificationRequest {
            user_id: patient.id,
            title: "Appointment Requested".to_string(),
            message: format!(
                "Your appointment request for {when} has been submitted and is pending confirmation."
            ),
            category: NotificationCategory::AppointmentConfirmation,
        })
        .await;
        self.notify_quiet(NotificationRequest {
            user_id: doctor.id,
            title: "New Appointment Request".to_string(),
            message: format!(
                "You have a new appointment request from {} for {when}",
                patient.full_name
            ),
            category: NotificationCategory::AppointmentConfirmation,
        })
        .await;

        info!("Appointment {} booked with doctor {}", appointment.id, appointment.doctor_id);
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.appointments
            .get(appointment_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("appointment {appointment_id}")))
    }

    pub async fn appointments_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        require_patient(self.directory.as_ref(), patient_id).await?;
        self.appointments.list_for_patient(patient_id).await
    }

    pub async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        self.appointments.list_for_doctor(doctor_id).await
    }

    /// Appointments starting strictly after now, earliest first.
    pub async fn upcoming_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let now = self.clock.now();
        let mut upcoming: Vec<_> = self
            .appointments_for_patient(patient_id)
            .await?
            .into_iter()
            .filter(|a| a.start_time > now)
            .collect();
        upcoming.sort_by_key(|a| a.start_time);
        Ok(upcoming)
    }

    pub async fn upcoming_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let now = self.clock.now();
        let mut upcoming: Vec<_> = self
            .appointments_for_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|a| a.start_time > now)
            .collect();
        upcoming.sort_by_key(|a| a.start_time);
        Ok(upcoming)
    }

    /// The patient's earliest upcoming confirmed appointment, if any.
    pub async fn next_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Option<Appointment>, SchedulingError> {
        Ok(self
            .upcoming_for_patient(patient_id)
            .await?
            .into_iter()
            .find(|a| a.status == AppointmentStatus::Confirmed))
    }

    pub async fn appointments_for_doctor_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut on_date: Vec<_> = self
            .appointments_for_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|a| a.start_time.date_naive() == date)
            .collect();
        on_date.sort_by_key(|a| a.start_time);
        Ok(on_date)
    }

    pub async fn count_for_doctor_by_status(
        &self,
        doctor_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<usize, SchedulingError> {
        Ok(self
            .appointments_for_doctor(doctor_id)
            .await?
            .iter()
            .filter(|a| a.status == status)
            .count())
    }

    pub async fn count_for_patient_by_status(
        &self,
        patient_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<usize, SchedulingError> {
        Ok(self
            .appointments_for_patient(patient_id)
            .await?
            .iter()
            .filter(|a| a.status == status)
            .count())
    }

    /// Applies a status transition subject to the configured policy. A
    /// cancellation reason is stored only when moving to Cancelled.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        reason: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Updating appointment {} status to {}", appointment_id, new_status);

        let mut appointment = self.get_appointment(appointment_id).await?;
        let old_status = appointment.status;
        self.lifecycle.validate_transition(old_status, new_status)?;

        appointment.status = new_status;
        if new_status == AppointmentStatus::Cancelled {
            appointment.cancellation_reason = reason.clone();
        }
        self.appointments.update(appointment.clone()).await?;

        let when = format_for_notification(appointment.start_time);
        if new_status == AppointmentStatus::Confirmed && old_status == AppointmentStatus::Pending {
            self.notify_quiet(NotificationRequest {
                user_id: appointment.patient_id,
                title: "Appointment Confirmed".to_string(),
                message: format!("Your appointment has been confirmed for {when}"),
                category: NotificationCategory::AppointmentConfirmation,
            })
            .await;
        } else if new_status == AppointmentStatus::Cancelled {
            let suffix = reason.map(|r| format!("Reason: {r}")).unwrap_or_default();
            self.notify_quiet(NotificationRequest {
                user_id: appointment.patient_id,
                title: "Appointment Cancelled".to_string(),
                message: format!(
                    "Your appointment scheduled for {when} has been cancelled. {suffix}"
                ),
                category: NotificationCategory::AppointmentCancellation,
            })
            .await;
        }

        Ok(appointment)
    }

    /// Direct (non-negotiated) reschedule. The new end is the configured
    /// default duration past the new start, and status drops back to Pending
    /// for re-confirmation.
    ///
    /// The availability check does not exclude the appointment's own current
    /// range, unlike the negotiated path; moving an appointment onto a range
    /// overlapping itself is therefore rejected. Preserved asymmetry.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_start: chrono::DateTime<chrono::Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointment = self.get_appointment(appointment_id).await?;
        let new_end = new_start + Duration::minutes(self.config.default_appointment_duration_minutes);

        {
            let _guard = self.locks.acquire(appointment.doctor_id).await;

            if !self
                .conflict
                .is_slot_available(appointment.doctor_id, new_start, new_end)
                .await?
            {
                warn!(
                    "Reschedule of appointment {} to {} rejected: range not available",
                    appointment_id, new_start
                );
                return Err(SchedulingError::conflict("New time slot is not available"));
            }

            appointment.start_time = new_start;
            appointment.end_time = new_end;
            appointment.status = AppointmentStatus::Pending;
            self.appointments.update(appointment.clone()).await?;
        }

        self.notify_quiet(NotificationRequest {
            user_id: appointment.patient_id,
            title: "Appointment Rescheduled".to_string(),
            message: format!(
                "Your appointment has been rescheduled to {}",
                format_for_notification(new_start)
            ),
            category: NotificationCategory::AppointmentRescheduled,
        })
        .await;

        Ok(appointment)
    }

    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, SchedulingError> {
        self.update_status(appointment_id, AppointmentStatus::Cancelled, reason).await
    }

    async fn notify_quiet(&self, request: NotificationRequest) {
        if let Err(err) = self.notifier.notify(request).await {
            warn!("Notification delivery failed, continuing: {err:#}");
        }
    }
}
