//! Location capture seam.
//!
//! A [`CaptureSource`] pushes raw fixes into a channel handed over at subscription time. The
//! controller registers one foreground and one background subscription per session and drops
//! them when tracking stops.

mod error;
mod feed;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use error::CaptureError;
pub use feed::FixFeed;

use crate::position::RawFix;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaptureMode {
    /// High-frequency updates while the agent is in the foreground.
    Foreground,
    /// Power-saving updates.
    Background,
}

/// Sampling hints passed to the source. Sources may treat them as best effort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureHints {
    pub interval: Duration,
    pub min_distance_m: f64,
}

pub trait CaptureSource: Send + Sync + 'static {
    fn subscribe(
        &self,
        mode: CaptureMode,
        hints: CaptureHints,
        sink: mpsc::Sender<RawFix>,
    ) -> impl Future<Output = Result<Subscription, CaptureError>> + Send;
}

/// Live registration with a capture source. Unregisters when removed or dropped.
#[derive(Debug)]
pub struct Subscription {
    mode: CaptureMode,
    token: CancellationToken,
}

impl Subscription {
    pub fn new(mode: CaptureMode, token: CancellationToken) -> Self {
        Self { mode, token }
    }

    pub fn remove(self) {
        log::debug!("Removing {} capture subscription", self.mode);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
