use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::position::{PositionSample, VehicleId};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackerState {
    Idle,
    Starting,
    Tracking,
    Stopping,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct SessionStats {
    pub accepted: u64,
    pub rejected: u64,
    pub sent: u64,
    pub queued: u64,
}

#[derive(Debug, Clone)]
pub struct TrackingSession {
    pub id: Uuid,
    pub vehicle_id: VehicleId,
    pub started_at: DateTime<Utc>,
    /// Last accepted sample; jump checks are measured from here.
    pub reference: Option<PositionSample>,
    pub subscriptions_live: bool,
    pub background_live: bool,
    pub stats: SessionStats,
}

impl TrackingSession {
    pub fn new(vehicle_id: VehicleId) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            started_at: Utc::now(),
            reference: None,
            subscriptions_live: false,
            background_live: false,
            stats: SessionStats::default(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub state: TrackerState,
    pub session: Option<TrackingSession>,
}

pub(crate) type SharedSession = Arc<Mutex<Shared>>;

pub(crate) fn new_shared() -> SharedSession {
    Arc::new(Mutex::new(Shared {
        state: TrackerState::Idle,
        session: None,
    }))
}
