use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::position::{PositionSample, VehicleId};
use crate::queue::{PendingCount, SharedQueue};
use crate::storage::KeyValueStore;
use crate::tracker::{SessionStats, SharedSession, TrackerState, LAST_POSITION_KEY};

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StatusSnapshot {
    pub is_tracking: bool,
    pub state: TrackerState,
    pub vehicle_id: Option<VehicleId>,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    /// False when running foreground-only.
    pub background_active: bool,
    pub pending_count: usize,
    pub stats: Option<SessionStats>,
    pub last_checked_at: DateTime<Utc>,
}

/// Read-only view over the session and the pending queue. Cheap to clone and poll.
#[derive(Clone)]
pub struct StatusReporter {
    shared: SharedSession,
    queue: SharedQueue,
    pending: PendingCount,
    store: Arc<dyn KeyValueStore>,
}

impl StatusReporter {
    pub(crate) fn new(
        shared: SharedSession,
        queue: SharedQueue,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let pending = queue.lock().unwrap().pending_count();
        Self {
            shared,
            queue,
            pending,
            store,
        }
    }

    /// Last accepted sample as persisted, possibly from a previous run.
    pub fn last_position(&self) -> Option<PositionSample> {
        match self.store.get(LAST_POSITION_KEY) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes)
                .map_err(|e| warn!("Ignoring unreadable last position: {}", e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                error!("Failed to read last position: {}", e);
                None
            }
        }
    }

    /// Timestamps of the oldest and newest pending samples.
    pub fn pending_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let queue = self.queue.lock().unwrap();
        let mut samples = queue.samples();
        let oldest = samples.next()?.timestamp;
        let newest = samples.last().map_or(oldest, |s| s.timestamp);
        Some((oldest, newest))
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let pending_count = self.pending.get();
        let shared = self.shared.lock().unwrap();
        let session = shared.session.as_ref();

        StatusSnapshot {
            is_tracking: shared.state == TrackerState::Tracking,
            state: shared.state,
            vehicle_id: session.map(|s| s.vehicle_id.clone()),
            session_id: session.map(|s| s.id),
            started_at: session.map(|s| s.started_at),
            background_active: session.is_some_and(|s| s.background_live),
            pending_count,
            stats: session.map(|s| s.stats),
            last_checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::DurableQueue;
    use crate::storage::MemoryStore;
    use crate::testing::numbered_sample;
    use crate::tracker::TrackingSession;
    use std::sync::Mutex;

    #[test]
    fn test_idle_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let queue = DurableQueue::new(store.clone(), 10).into_shared();
        let reporter = StatusReporter::new(crate::tracker::new_shared(), queue, store);

        let status = reporter.snapshot();
        assert!(!status.is_tracking);
        assert_eq!(status.state, TrackerState::Idle);
        assert_eq!(status.vehicle_id, None);
        assert_eq!(status.pending_count, 0);
        assert!(reporter.last_position().is_none());
        assert!(reporter.pending_span().is_none());
    }

    #[test]
    fn test_unreadable_last_position_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store.set(LAST_POSITION_KEY, b"not json").unwrap();
        let queue = DurableQueue::new(store.clone(), 10).into_shared();
        let reporter = StatusReporter::new(crate::tracker::new_shared(), queue, store);

        assert!(reporter.last_position().is_none());
    }

    #[test]
    fn test_snapshot_reflects_session_and_queue() {
        let store = Arc::new(MemoryStore::new());
        let mut queue = DurableQueue::new(store.clone(), 10);
        queue.append(numbered_sample(1)).unwrap();
        queue.append(numbered_sample(2)).unwrap();

        let shared = crate::tracker::new_shared();
        {
            let mut locked = shared.lock().unwrap();
            let mut session = TrackingSession::new("bus-5".into());
            session.background_live = true;
            locked.session = Some(session);
            locked.state = TrackerState::Tracking;
        }
        let oldest = numbered_sample(1).timestamp;
        let newest = numbered_sample(2).timestamp;
        let reporter = StatusReporter::new(shared, Arc::new(Mutex::new(queue)), store);
        assert_eq!(reporter.pending_span(), Some((oldest, newest)));

        let status = reporter.snapshot();
        assert!(status.is_tracking);
        assert!(status.background_active);
        assert_eq!(status.vehicle_id, Some(VehicleId::new("bus-5")));
        assert_eq!(status.pending_count, 2);

        let held = reporter.queue.lock().unwrap();
        assert_eq!(reporter.snapshot().pending_count, 2);
        drop(held);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "tracking");
        assert_eq!(json["vehicle_id"], "bus-5");
    }
}
