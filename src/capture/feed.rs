use std::collections::HashMap;
use std::sync::Mutex;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::{CaptureError, CaptureHints, CaptureMode, CaptureSource, Subscription};
use crate::position::RawFix;

struct Registration {
    sink: mpsc::Sender<RawFix>,
    token: CancellationToken,
    hints: CaptureHints,
}

impl Registration {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.sink.is_closed()
    }
}

/// In-process capture source. Whatever produces fixes on the device (the platform location
/// provider, a replay tool) hands them to [`FixFeed::publish`].
pub struct FixFeed {
    registrations: Mutex<HashMap<CaptureMode, Registration>>,
    background_enabled: bool,
}

impl FixFeed {
    pub fn new(background_enabled: bool) -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
            background_enabled,
        }
    }

    pub fn publish(&self, mode: CaptureMode, fix: RawFix) -> Result<(), CaptureError> {
        let mut registrations = self.registrations.lock().unwrap();

        let Some(registration) = registrations.get(&mode) else {
            return Err(CaptureError::NotSubscribed(mode));
        };
        if !registration.is_live() {
            registrations.remove(&mode);
            return Err(CaptureError::NotSubscribed(mode));
        }

        match registration.sink.try_send(fix) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Dropping {} fix, subscriber channel full", mode);
                Err(CaptureError::Overloaded(mode))
            }
            Err(TrySendError::Closed(_)) => {
                registrations.remove(&mode);
                Err(CaptureError::NotSubscribed(mode))
            }
        }
    }

    /// Hints requested by the current live subscription for `mode`.
    pub fn hints(&self, mode: CaptureMode) -> Option<CaptureHints> {
        self.registrations
            .lock()
            .unwrap()
            .get(&mode)
            .filter(|r| r.is_live())
            .map(|r| r.hints)
    }

    pub fn is_subscribed(&self, mode: CaptureMode) -> bool {
        self.hints(mode).is_some()
    }
}

impl CaptureSource for FixFeed {
    async fn subscribe(
        &self,
        mode: CaptureMode,
        hints: CaptureHints,
        sink: mpsc::Sender<RawFix>,
    ) -> Result<Subscription, CaptureError> {
        if mode == CaptureMode::Background && !self.background_enabled {
            return Err(CaptureError::Unavailable(mode));
        }

        let token = CancellationToken::new();
        let previous = self.registrations.lock().unwrap().insert(
            mode,
            Registration {
                sink,
                token: token.clone(),
                hints,
            },
        );
        if let Some(previous) = previous {
            debug!("Replacing existing {} subscription", mode);
            previous.token.cancel();
        }

        info!(
            "{} capture registered (interval {:?}, min distance {} m)",
            mode, hints.interval, hints.min_distance_m
        );
        Ok(Subscription::new(mode, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn hints() -> CaptureHints {
        CaptureHints {
            interval: Duration::from_secs(10),
            min_distance_m: 10.0,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let feed = FixFeed::new(true);
        let (tx, mut rx) = mpsc::channel(4);
        let _sub = feed
            .subscribe(CaptureMode::Foreground, hints(), tx)
            .await
            .unwrap();

        let fix = RawFix::new(1.0, 2.0, Utc::now());
        feed.publish(CaptureMode::Foreground, fix.clone()).unwrap();
        assert_eq!(rx.recv().await, Some(fix));
    }

    #[tokio::test]
    async fn test_publish_without_subscriber() {
        let feed = FixFeed::new(true);
        let err = feed
            .publish(CaptureMode::Background, RawFix::new(1.0, 2.0, Utc::now()))
            .unwrap_err();
        assert!(matches!(err, CaptureError::NotSubscribed(CaptureMode::Background)));
    }

    #[tokio::test]
    async fn test_dropping_subscription_unregisters() {
        let feed = FixFeed::new(true);
        let (tx, _rx) = mpsc::channel(4);
        let sub = feed
            .subscribe(CaptureMode::Foreground, hints(), tx)
            .await
            .unwrap();
        assert!(feed.is_subscribed(CaptureMode::Foreground));
        assert_eq!(feed.hints(CaptureMode::Foreground), Some(hints()));

        sub.remove();
        assert!(!feed.is_subscribed(CaptureMode::Foreground));
        assert!(feed
            .publish(CaptureMode::Foreground, RawFix::new(1.0, 2.0, Utc::now()))
            .is_err());
    }

    #[tokio::test]
    async fn test_background_disabled() {
        let feed = FixFeed::new(false);
        let (tx, _rx) = mpsc::channel(4);
        let err = feed
            .subscribe(CaptureMode::Background, hints(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Unavailable(CaptureMode::Background)));
    }

    #[tokio::test]
    async fn test_full_channel_reports_overload() {
        let feed = FixFeed::new(true);
        let (tx, _rx) = mpsc::channel(1);
        let _sub = feed
            .subscribe(CaptureMode::Foreground, hints(), tx)
            .await
            .unwrap();

        feed.publish(CaptureMode::Foreground, RawFix::new(1.0, 2.0, Utc::now()))
            .unwrap();
        let err = feed
            .publish(CaptureMode::Foreground, RawFix::new(1.0, 2.0, Utc::now()))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Overloaded(CaptureMode::Foreground)));
    }
}
