use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_models::collaborators::{require_doctor, Directory};
use shared_models::{BlockedInterval, SchedulingError};
use shared_store::BlockedIntervalStore;

use crate::models::{CreateBlockedIntervalRequest, UpdateBlockedIntervalRequest};

/// CRUD over doctor-declared blackout ranges. Blocking is purely additive
/// metadata: it never deletes slots, it only changes how the calendar is
/// presented.
pub struct BlockedIntervalService {
    blocked: Arc<dyn BlockedIntervalStore>,
    directory: Arc<dyn Directory>,
}

impl BlockedIntervalService {
    pub fn new(blocked: Arc<dyn BlockedIntervalStore>, directory: Arc<dyn Directory>) -> Self {
        Self { blocked, directory }
    }

    pub async fn create(
        &self,
        request: CreateBlockedIntervalRequest,
    ) -> Result<BlockedInterval, SchedulingError> {
        require_doctor(self.directory.as_ref(), request.doctor_id).await?;
        validate_range(request.start_time, request.end_time)?;

        let interval = BlockedInterval {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            start_time: request.start_time,
            end_time: request.end_time,
            reason: request.reason,
        };
        self.blocked.insert(interval.clone()).await?;
        debug!(
            "Blocked {} - {} for doctor {}: {}",
            interval.start_time, interval.end_time, interval.doctor_id, interval.reason
        );
        Ok(interval)
    }

    pub async fn update(
        &self,
        interval_id: Uuid,
        request: UpdateBlockedIntervalRequest,
    ) -> Result<BlockedInterval, SchedulingError> {
        let mut interval = self
            .blocked
            .get(interval_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("blocked interval {interval_id}")))?;

        validate_range(request.start_time, request.end_time)?;

        interval.start_time = request.start_time;
        interval.end_time = request.end_time;
        interval.reason = request.reason;
        self.blocked.update(interval.clone()).await?;
        Ok(interval)
    }

    pub async fn delete(&self, interval_id: Uuid) -> Result<(), SchedulingError> {
        if !self.blocked.delete(interval_id).await? {
            return Err(SchedulingError::not_found(format!("blocked interval {interval_id}")));
        }
        Ok(())
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<BlockedInterval>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        self.blocked.list_for_doctor(doctor_id).await
    }

    pub async fn list_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BlockedInterval>, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        self.blocked.list_overlapping(doctor_id, start, end).await
    }

    /// True iff any stored interval for the doctor overlaps `[start, end)`.
    pub async fn is_blocked(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, SchedulingError> {
        require_doctor(self.directory.as_ref(), doctor_id).await?;
        let overlapping = self.blocked.list_overlapping(doctor_id, start, end).await?;
        Ok(!overlapping.is_empty())
    }
}

fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), SchedulingError> {
    if start >= end {
        return Err(SchedulingError::validation("Start time must be before end time"));
    }
    Ok(())
}
