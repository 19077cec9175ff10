use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::delivery::DeliveryClient;
use crate::sync::{FlushOutcome, SyncEngine};

/// Flushes the pending queue every `interval` until the returned token is cancelled.
/// The first flush happens one full interval after the call.
pub fn spawn_periodic_flush<D: DeliveryClient>(
    sync: Arc<SyncEngine<D>>,
    interval: Duration,
) -> CancellationToken {
    let token = CancellationToken::new();
    let stop = token.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match sync.flush().await {
                FlushOutcome::Completed { delivered: 0 } => debug!("Periodic flush: nothing pending"),
                outcome => info!("Periodic flush: {:?}", outcome),
            }
        }
        debug!("Periodic flush stopped");
    });

    token
}
