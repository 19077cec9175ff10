//! Shared test doubles.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use crate::delivery::{DeliveryClient, DeliveryError};
use crate::position::{PositionSample, RawFix, VehicleId};

pub fn numbered_sample(i: u32) -> PositionSample {
    let ts = Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap();
    let fix = RawFix::new(43.6 + i as f64 * 1e-5, 1.44, ts);
    PositionSample::from_fix(VehicleId::new("bus-9"), &fix)
}

/// Delivery double that records what it accepted and fails on demand.
#[derive(Default)]
pub struct ScriptedDelivery {
    singles: Mutex<Vec<PositionSample>>,
    batches: Mutex<Vec<Vec<PositionSample>>>,
    failing_batch_attempts: Mutex<HashSet<usize>>,
    batch_attempts: AtomicUsize,
    single_attempts: AtomicUsize,
    fail_singles: AtomicBool,
    fail_batches: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedDelivery {
    /// Fails the `n`th batch send (1-based) counted over the lifetime of the double.
    pub fn fail_batch_attempt(&self, n: usize) {
        self.failing_batch_attempts.lock().unwrap().insert(n);
    }

    pub fn set_fail_singles(&self, fail: bool) {
        self.fail_singles.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn singles(&self) -> Vec<PositionSample> {
        self.singles.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Vec<PositionSample>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_attempts(&self) -> usize {
        self.batch_attempts.load(Ordering::SeqCst)
    }

    pub fn single_attempts(&self) -> usize {
        self.single_attempts.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl DeliveryClient for ScriptedDelivery {
    async fn send_one(&self, sample: &PositionSample) -> Result<(), DeliveryError> {
        self.single_attempts.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_singles.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("network unreachable".into()));
        }
        self.singles.lock().unwrap().push(sample.clone());
        Ok(())
    }

    async fn send_batch(&self, samples: &[PositionSample]) -> Result<(), DeliveryError> {
        let attempt = self.batch_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.wait().await;
        let scripted = self.failing_batch_attempts.lock().unwrap().contains(&attempt);
        if scripted || self.fail_batches.load(Ordering::SeqCst) {
            return Err(DeliveryError::Status(503));
        }
        self.batches.lock().unwrap().push(samples.to_vec());
        Ok(())
    }
}

/// Polls `condition` until it holds or a second of (possibly paused) time has passed.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
