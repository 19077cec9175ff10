use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::controller::LAST_POSITION_KEY;
use super::session::{SessionStats, SharedSession};
use crate::delivery::{bounded, DeliveryClient};
use crate::position::{PositionSample, PositionValidator, RawFix, VehicleId};
use crate::queue::SharedQueue;
use crate::storage::{KeyValueStore, StorageError};

/// Everything the capture worker needs to turn fixes into delivered or queued samples.
pub(super) struct CaptureContext<D> {
    pub vehicle_id: VehicleId,
    pub shared: SharedSession,
    pub queue: SharedQueue,
    pub delivery: Arc<D>,
    pub store: Arc<dyn KeyValueStore>,
    pub validator: PositionValidator,
    pub send_timeout: Duration,
}

/// Handles fixes one at a time until `stop` fires and the channel has been drained.
pub(super) async fn run_capture_loop<D: DeliveryClient>(
    ctx: CaptureContext<D>,
    mut fixes: mpsc::Receiver<RawFix>,
    stop: CancellationToken,
) {
    loop {
        let fix = tokio::select! {
            biased;
            fix = fixes.recv() => fix,
            _ = stop.cancelled() => None,
        };

        match fix {
            Some(fix) => ctx.handle_fix(fix).await,
            None => break,
        }
    }
    debug!("Capture worker for {} finished", ctx.vehicle_id);
}

impl<D: DeliveryClient> CaptureContext<D> {
    async fn handle_fix(&self, fix: RawFix) {
        let sample = PositionSample::from_fix(self.vehicle_id.clone(), &fix);
        if !self.accept(&sample) {
            return;
        }

        self.remember(&sample);

        match bounded(self.send_timeout, self.delivery.send_one(&sample)).await {
            Ok(()) => {
                debug!("Position for {} sent", self.vehicle_id);
                self.bump(|stats| stats.sent += 1);
            }
            Err(e) => {
                warn!("Failed to send position, queueing for retry: {}", e);
                let appended = self.queue.lock().unwrap().append(sample);
                if let Err(e) = appended {
                    error!("Failed to persist pending queue: {}", e);
                }
                self.bump(|stats| stats.queued += 1);
            }
        }
    }

    /// Validates against the session reference and moves the reference on success.
    fn accept(&self, sample: &PositionSample) -> bool {
        let mut shared = self.shared.lock().unwrap();
        let Some(session) = shared.session.as_mut() else {
            return false;
        };

        match self.validator.validate(sample, session.reference.as_ref()) {
            Ok(()) => {
                session.reference = Some(sample.clone());
                session.stats.accepted += 1;
                true
            }
            Err(reason) => {
                debug!(
                    "Discarding fix for {} at ({}, {}): {}",
                    self.vehicle_id, sample.latitude, sample.longitude, reason
                );
                session.stats.rejected += 1;
                false
            }
        }
    }

    fn remember(&self, sample: &PositionSample) {
        let result = serde_json::to_vec(sample)
            .map_err(StorageError::from)
            .and_then(|bytes| self.store.set(LAST_POSITION_KEY, &bytes));
        if let Err(e) = result {
            error!("Failed to persist last position: {}", e);
        }
    }

    fn bump(&self, update: impl FnOnce(&mut SessionStats)) {
        if let Some(session) = self.shared.lock().unwrap().session.as_mut() {
            update(&mut session.stats);
        }
    }
}
