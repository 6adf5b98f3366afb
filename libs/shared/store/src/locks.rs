// libs/shared/store/src/locks.rs

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Per-doctor timeline locks.
///
/// The per-doctor slot/appointment timeline is the only meaningfully shared
/// mutable resource in the system, so this is the whole of the concurrency
/// control: booking, approval slot-swaps, and slot generation each hold the
/// owning doctor's lock across their read-check-write window.
#[derive(Default)]
pub struct TimelineLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl TimelineLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one doctor's timeline, creating it on first use.
    pub async fn acquire(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(doctor_id).or_default())
        };
        debug!("acquiring timeline lock for doctor {}", doctor_id);
        lock.lock_owned().await
    }
}
