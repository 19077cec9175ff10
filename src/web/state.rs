use std::sync::Arc;

use log::warn;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::capture::FixFeed;
use crate::config::Config;
use crate::delivery::{DeliveryError, HttpDeliveryClient};
use crate::status::StatusReporter;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::sync::SyncEngine;
use crate::tracker::TrackingController;

pub type AgentController = TrackingController<FixFeed, HttpDeliveryClient>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("collector client: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<AgentController>>,
    pub reporter: StatusReporter,
    pub sync: Arc<SyncEngine<HttpDeliveryClient>>,
    pub feed: Arc<FixFeed>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let delivery = HttpDeliveryClient::new(
            &config.collector.base_url,
            config.collector.token.clone(),
            config.agent.send_timeout,
        )?;
        let feed = Arc::new(FixFeed::new(config.capture.background_enabled));
        let controller = TrackingController::new(
            feed.clone(),
            Arc::new(delivery),
            open_store(config),
            config.tracker_config(),
        );

        Ok(Self::new(controller, feed))
    }

    pub fn new(controller: AgentController, feed: Arc<FixFeed>) -> Self {
        Self {
            reporter: controller.reporter(),
            sync: controller.sync_engine(),
            controller: Arc::new(Mutex::new(controller)),
            feed,
        }
    }
}

pub fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
    match &config.storage.path {
        Some(path) => Arc::new(FileStore::new(path.clone())),
        None => {
            warn!("No storage path configured, pending positions will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    }
}
