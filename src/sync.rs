use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::delivery::{bounded, DeliveryClient};
use crate::queue::SharedQueue;

pub const DEFAULT_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Every sample queued when the flush started was delivered.
    Completed { delivered: usize },
    /// A batch failed; it and everything after it are still queued.
    Interrupted { delivered: usize, remaining: usize },
    /// Another flush was already running.
    Skipped,
}

impl FlushOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, FlushOutcome::Completed { .. })
    }
}

/// Drains the pending queue through [`DeliveryClient::send_batch`], oldest first.
pub struct SyncEngine<D> {
    delivery: Arc<D>,
    queue: SharedQueue,
    batch_size: usize,
    send_timeout: Duration,
    running: Mutex<()>,
}

impl<D: DeliveryClient> SyncEngine<D> {
    pub fn new(
        delivery: Arc<D>,
        queue: SharedQueue,
        batch_size: usize,
        send_timeout: Duration,
    ) -> Self {
        Self {
            delivery,
            queue,
            batch_size: batch_size.max(1),
            send_timeout,
            running: Mutex::new(()),
        }
    }

    /// Sends what is queued right now, batch by batch, stopping at the first failed batch.
    /// Samples appended while the flush runs wait for the next one.
    pub async fn flush(&self) -> FlushOutcome {
        let Ok(_guard) = self.running.try_lock() else {
            info!("Flush already in progress, skipping");
            return FlushOutcome::Skipped;
        };

        let snapshot_end = self.queue.lock().unwrap().tail_seq();
        let mut delivered = 0;

        loop {
            let batch = {
                let queue = self.queue.lock().unwrap();
                let mut batch = queue.drain_batch(self.batch_size);
                batch.truncate_before(snapshot_end);
                batch
            };
            if batch.is_empty() {
                break;
            }

            info!("Sending batch of {} pending samples", batch.len());
            if let Err(e) = bounded(self.send_timeout, self.delivery.send_batch(&batch.samples)).await
            {
                let remaining = self.remaining_before(snapshot_end);
                warn!(
                    "Batch delivery failed ({}), {} samples left for next flush",
                    e, remaining
                );
                return FlushOutcome::Interrupted {
                    delivered,
                    remaining,
                };
            }

            delivered += batch.len();
            let persisted = self.queue.lock().unwrap().acknowledge(&batch);
            if let Err(e) = persisted {
                error!("Failed to persist pending queue after delivery: {}", e);
            }
        }

        if delivered > 0 {
            info!("All {} pending samples delivered", delivered);
        }
        FlushOutcome::Completed { delivered }
    }

    fn remaining_before(&self, snapshot_end: u64) -> usize {
        let head = self.queue.lock().unwrap().head_seq();
        snapshot_end.saturating_sub(head) as usize
    }
}
