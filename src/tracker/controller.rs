use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::TrackerError;
use super::session::{new_shared, SharedSession, TrackerState, TrackingSession};
use super::worker::{run_capture_loop, CaptureContext};
use crate::capture::{CaptureHints, CaptureMode, CaptureSource, Subscription};
use crate::delivery::{DeliveryClient, DEFAULT_SEND_TIMEOUT};
use crate::position::{PositionSample, PositionValidator, ValidationConfig, VehicleId};
use crate::queue::{DurableQueue, SharedQueue, DEFAULT_CAPACITY};
use crate::status::StatusReporter;
use crate::storage::KeyValueStore;
use crate::sync::{FlushOutcome, SyncEngine, DEFAULT_BATCH_SIZE};

pub const LAST_POSITION_KEY: &str = "last_position";

const FIX_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub validation: ValidationConfig,
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub send_timeout: Duration,
    pub foreground: CaptureHints,
    pub background: CaptureHints,
    pub registration_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            validation: ValidationConfig::default(),
            queue_capacity: DEFAULT_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            foreground: CaptureHints {
                interval: Duration::from_secs(10),
                min_distance_m: 10.0,
            },
            background: CaptureHints {
                interval: Duration::from_secs(15),
                min_distance_m: 10.0,
            },
            registration_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct WorkerHandle {
    stop: CancellationToken,
    join: Option<JoinHandle<()>>,
    subscriptions: Vec<Subscription>,
}

impl WorkerHandle {
    /// Unregisters capture, then waits for the worker to finish the fixes it already has.
    async fn shutdown(mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.remove();
        }
        self.stop.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                error!("Capture worker ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Owns the tracking lifecycle: capture subscriptions, the session, the pending queue and the
/// sync engine draining it.
///
/// `start_tracking` and `stop_tracking` take `&mut self`; callers sharing a controller keep it
/// behind an async mutex. Fixes are processed by a single worker task per session.
pub struct TrackingController<C, D> {
    capture: Arc<C>,
    delivery: Arc<D>,
    store: Arc<dyn KeyValueStore>,
    validator: PositionValidator,
    config: TrackerConfig,
    shared: SharedSession,
    queue: SharedQueue,
    sync: Arc<SyncEngine<D>>,
    worker: Option<WorkerHandle>,
}

impl<C: CaptureSource, D: DeliveryClient> TrackingController<C, D> {
    /// Builds a controller and restores whatever was left in the pending queue.
    pub fn new(
        capture: Arc<C>,
        delivery: Arc<D>,
        store: Arc<dyn KeyValueStore>,
        config: TrackerConfig,
    ) -> Self {
        let mut queue = DurableQueue::new(store.clone(), config.queue_capacity);
        if let Err(e) = queue.load_from_storage() {
            error!("Failed to load pending queue, starting empty: {}", e);
        }
        let queue = queue.into_shared();

        let sync = Arc::new(SyncEngine::new(
            delivery.clone(),
            queue.clone(),
            config.batch_size,
            config.send_timeout,
        ));

        Self {
            capture,
            delivery,
            store,
            validator: PositionValidator::new(config.validation),
            config,
            shared: new_shared(),
            queue,
            sync,
            worker: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.shared.lock().unwrap().state
    }

    pub fn active_vehicle(&self) -> Option<VehicleId> {
        let shared = self.shared.lock().unwrap();
        match shared.state {
            TrackerState::Tracking => shared.session.as_ref().map(|s| s.vehicle_id.clone()),
            _ => None,
        }
    }

    pub fn reporter(&self) -> StatusReporter {
        StatusReporter::new(self.shared.clone(), self.queue.clone(), self.store.clone())
    }

    pub fn sync_engine(&self) -> Arc<SyncEngine<D>> {
        self.sync.clone()
    }

    pub async fn flush(&self) -> FlushOutcome {
        self.sync.flush().await
    }

    pub fn last_known_position(&self) -> Option<PositionSample> {
        self.reporter().last_position()
    }

    pub async fn start_tracking(&mut self, vehicle_id: VehicleId) -> Result<(), TrackerError> {
        if vehicle_id.as_str().trim().is_empty() {
            return Err(TrackerError::EmptyVehicleId);
        }

        if self.worker.is_some() {
            if self.active_vehicle().as_ref() == Some(&vehicle_id) {
                debug!("Already tracking {}", vehicle_id);
                return Ok(());
            }
            info!("Switching tracking to {}", vehicle_id);
            self.stop_tracking().await;
        }

        let session = TrackingSession::new(vehicle_id.clone());
        let session_id = session.id;
        self.set_state(TrackerState::Starting, Some(session));

        let (tx, rx) = mpsc::channel(FIX_CHANNEL_CAPACITY);

        let foreground = match self
            .capture
            .subscribe(CaptureMode::Foreground, self.config.foreground, tx.clone())
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("Failed to start tracking {}: {}", vehicle_id, e);
                self.set_state(TrackerState::Idle, None);
                return Err(e.into());
            }
        };

        let background = match tokio::time::timeout(
            self.config.registration_timeout,
            self.capture
                .subscribe(CaptureMode::Background, self.config.background, tx),
        )
        .await
        {
            Ok(Ok(subscription)) => Some(subscription),
            Ok(Err(e)) => {
                warn!("Background capture unavailable, tracking in foreground only: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    "Background capture registration timed out after {:?}, tracking in foreground only",
                    self.config.registration_timeout
                );
                None
            }
        };

        {
            let mut shared = self.shared.lock().unwrap();
            if let Some(session) = shared.session.as_mut() {
                session.subscriptions_live = true;
                session.background_live = background.is_some();
            }
            shared.state = TrackerState::Tracking;
        }

        let ctx = CaptureContext {
            vehicle_id: vehicle_id.clone(),
            shared: self.shared.clone(),
            queue: self.queue.clone(),
            delivery: self.delivery.clone(),
            store: self.store.clone(),
            validator: self.validator,
            send_timeout: self.config.send_timeout,
        };
        let stop = CancellationToken::new();
        let join = tokio::spawn(run_capture_loop(ctx, rx, stop.clone()));

        let mut subscriptions = vec![foreground];
        subscriptions.extend(background);
        self.worker = Some(WorkerHandle {
            stop,
            join: Some(join),
            subscriptions,
        });

        info!("Tracking {} (session {})", vehicle_id, session_id);
        Ok(())
    }

    /// Stops capture and runs a final flush. Returns `None` when nothing was being tracked.
    pub async fn stop_tracking(&mut self) -> Option<FlushOutcome> {
        let Some(worker) = self.worker.take() else {
            debug!("Stop requested while idle");
            return None;
        };

        self.set_state_only(TrackerState::Stopping);
        worker.shutdown().await;

        let vehicle_id = {
            let mut shared = self.shared.lock().unwrap();
            shared.session.as_mut().map(|session| {
                session.subscriptions_live = false;
                session.background_live = false;
                session.vehicle_id.clone()
            })
        };

        let outcome = self.sync.flush().await;
        if !outcome.is_complete() {
            warn!("Final flush incomplete ({:?}), samples stay queued", outcome);
        }

        self.set_state(TrackerState::Idle, None);
        if let Some(vehicle_id) = vehicle_id {
            info!("Tracking stopped for {}", vehicle_id);
        }
        Some(outcome)
    }

    fn set_state(&self, state: TrackerState, session: Option<TrackingSession>) {
        let mut shared = self.shared.lock().unwrap();
        shared.state = state;
        shared.session = session;
    }

    fn set_state_only(&self, state: TrackerState) {
        self.shared.lock().unwrap().state = state;
    }
}
