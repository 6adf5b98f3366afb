// libs/shared/models/src/collaborators.rs
//
// Interfaces to the collaborators the scheduling core depends on but does
// not own: identity lookup, the notification sink, and the service catalog.
// In-memory implementations are provided so the core runs without choosing
// an identity provider or delivery channel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::SchedulingError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub full_name: String,
}

/// Resolves doctor and patient ids to existence plus display attributes.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn doctor(&self, id: Uuid) -> Result<Option<DirectoryEntry>, SchedulingError>;
    async fn patient(&self, id: Uuid) -> Result<Option<DirectoryEntry>, SchedulingError>;
}

pub async fn require_doctor(
    directory: &dyn Directory,
    id: Uuid,
) -> Result<DirectoryEntry, SchedulingError> {
    directory
        .doctor(id)
        .await?
        .ok_or_else(|| SchedulingError::not_found(format!("doctor {id}")))
}

pub async fn require_patient(
    directory: &dyn Directory,
    id: Uuid,
) -> Result<DirectoryEntry, SchedulingError> {
    directory
        .patient(id)
        .await?
        .ok_or_else(|| SchedulingError::not_found(format!("patient {id}")))
}

#[derive(Default)]
pub struct InMemoryDirectory {
    doctors: RwLock<HashMap<Uuid, DirectoryEntry>>,
    patients: RwLock<HashMap<Uuid, DirectoryEntry>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_doctor(&self, full_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.doctors.write().await.insert(
            id,
            DirectoryEntry { id, full_name: full_name.to_string() },
        );
        id
    }

    pub async fn add_patient(&self, full_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.patients.write().await.insert(
            id,
            DirectoryEntry { id, full_name: full_name.to_string() },
        );
        id
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn doctor(&self, id: Uuid) -> Result<Option<DirectoryEntry>, SchedulingError> {
        Ok(self.doctors.read().await.get(&id).cloned())
    }

    async fn patient(&self, id: Uuid) -> Result<Option<DirectoryEntry>, SchedulingError> {
        Ok(self.patients.read().await.get(&id).cloned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    AppointmentConfirmation,
    AppointmentCancellation,
    AppointmentRescheduled,
    SystemNotification,
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationCategory::AppointmentConfirmation => write!(f, "APPOINTMENT_CONFIRMATION"),
            NotificationCategory::AppointmentCancellation => write!(f, "APPOINTMENT_CANCELLATION"),
            NotificationCategory::AppointmentRescheduled => write!(f, "APPOINTMENT_RESCHEDULED"),
            NotificationCategory::SystemNotification => write!(f, "SYSTEM_NOTIFICATION"),
        }
    }
}

/// One notification request emitted by the core. Delivery is someone
/// else's problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
}

/// Fire-and-forget notification sink. A failing sink must never fail the
/// operation that emitted the notification; callers log and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, request: NotificationRequest) -> anyhow::Result<()>;
}

/// Default sink: logs the request instead of delivering it.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, request: NotificationRequest) -> anyhow::Result<()> {
        tracing::info!(
            user_id = %request.user_id,
            category = %request.category,
            "notification: {} - {}",
            request.title,
            request.message
        );
        Ok(())
    }
}

/// Test double that records every request it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotificationRequest>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, request: NotificationRequest) -> anyhow::Result<()> {
        self.sent.lock().await.push(request);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogService {
    pub id: Uuid,
    pub name: String,
    pub price: Option<f64>,
}

/// Optional billable-service catalog. An appointment without a service id
/// is valid; a service id that does not resolve is not.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn service(&self, id: Uuid) -> Result<Option<CatalogService>, SchedulingError>;
}

#[derive(Default)]
pub struct StaticCatalog {
    services: RwLock<HashMap<Uuid, CatalogService>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_service(&self, name: &str, price: Option<f64>) -> Uuid {
        let id = Uuid::new_v4();
        self.services.write().await.insert(
            id,
            CatalogService { id, name: name.to_string(), price },
        );
        id
    }
}

#[async_trait]
impl ServiceCatalog for StaticCatalog {
    async fn service(&self, id: Uuid) -> Result<Option<CatalogService>, SchedulingError> {
        Ok(self.services.read().await.get(&id).cloned())
    }
}
