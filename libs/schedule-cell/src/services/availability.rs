use chrono::{NaiveTime, Weekday};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::collaborators::{require_doctor, Directory};
use shared_models::{AvailabilityTemplate, SchedulingError};
use shared_store::TemplateStore;

use crate::models::{SetAvailabilityRequest, UpdateAvailabilityRequest};

/// CRUD over a doctor's weekly recurring availability. At most one template
/// exists per (doctor, weekday); setting again replaces the window in place.
pub struct AvailabilityTemplateService {
    templates: Arc<dyn TemplateStore>,
    directory: Arc<dyn Directory>,
}

impl AvailabilityTemplateService {
    pub fn new(templates: Arc<dyn TemplateStore>, directory: Arc<dyn Directory>) -> Self {
        Self { templates, directory }
    }

    pub async fn set_availability(
        &self,
        request: SetAvailabilityRequest,
    ) -> Result<AvailabilityTemplate, SchedulingError> {
        debug!(
            "Setting availability for doctor {} on {:?}",
            request.doctor_id, request.day_of_week
        );

        require_doctor(self.directory.as_ref(), request.doctor_id).await?;
        validate_window(request.start_time, request.end_time, request.slot_duration_minutes)?;

        let template = match self
            .templates
            .find_for_day(request.doctor_id, request.day_of_week)
            .await?
        {
            Some(mut existing) => {
                existing.start_time = request.start_time;
                existing.end_time = request.end_time;
                existing.slot_duration_minutes = request.slot_duration_minutes;
                self.templates.update(existing.clone()).await?;
                existing
            }
            None => {
                let template = AvailabilityTemplate {
                    id: Uuid::new_v4(),
                    doctor_id: request.doctor_id,
                    day_of_week: request.day_of_week,
                    start_time: request.start_time,
                    end_time: request.end_time,
                    slot_duration_minutes: request.slot_duration_minutes,
                };
                self.templates.insert(template.clone()).await?;
                template
            }
        };

        info!(
            "Availability set for doctor {} on {:?}: {} - {} ({} min slots)",
            template.doctor_id,
            template.day_of_week,
            template.start_time,
            template.end_time,
            template.slot_duration_minutes
        );
        Ok(template)
    }

    pub async fn get_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<AvailabilityTemplate>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        self.templates.list_for_doctor(doctor_id).await
    }

    pub async fn get_for_day(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Result<Option<AvailabilityTemplate>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        self.templates.find_for_day(doctor_id, day).await
    }

    pub async fn update_template(
        &self,
        template_id: Uuid,
        request: UpdateAvailabilityRequest,
    ) -> Result<AvailabilityTemplate, SchedulingError> {
        let mut template = self
            .templates
            .get(template_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("availability template {template_id}")))?;

        validate_window(request.start_time, request.end_time, request.slot_duration_minutes)?;

        template.day_of_week = request.day_of_week;
        template.start_time = request.start_time;
        template.end_time = request.end_time;
        template.slot_duration_minutes = request.slot_duration_minutes;
        self.templates.update(template.clone()).await?;

        Ok(template)
    }

    pub async fn delete_template(&self, template_id: Uuid) -> Result<(), SchedulingError> {
        if !self.templates.delete(template_id).await? {
            return Err(SchedulingError::not_found(format!(
                "availability template {template_id}"
            )));
        }
        Ok(())
    }

    pub async fn delete_for_day(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Result<(), SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        self.templates.delete_for_day(doctor_id, day).await?;
        Ok(())
    }
}

fn validate_window(
    start: NaiveTime,
    end: NaiveTime,
    slot_duration_minutes: u32,
) -> Result<(), SchedulingError> {
    if start >= end {
        return Err(SchedulingError::validation("Start time must be before end time"));
    }
    if slot_duration_minutes == 0 {
        return Err(SchedulingError::validation("Slot duration must be positive"));
    }
    Ok(())
}
