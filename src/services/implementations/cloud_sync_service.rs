use crate::cloud::{downlink, uplink};
use crate::collector::CollectorHandle;
use crate::config::Config;
use crate::database::{Store, TypeId};
use crate::logger::{self, LogTag};
use crate::services::{Service, ServiceHealth};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Drives the two Cloud Sync Worker loops (§4.8): uplink drains the
/// Outbox, downlink refreshes cached cloud prices and history. Disabled
/// whenever the remote credentials are absent, regardless of the stored
/// toggle (`CloudConfig::has_remote`).
pub struct CloudSyncService {
    store: Arc<Store>,
    scope: Arc<RwLock<Option<String>>>,
    season: Arc<RwLock<Option<String>>>,
    base_currency_type_id: Option<TypeId>,
}

impl CloudSyncService {
    pub fn new(store: Arc<Store>, collector: &CollectorHandle) -> crate::errors::EngineResult<Self> {
        let base_currency_type_id = store.base_currency_type_id()?;
        Ok(Self {
            store,
            scope: collector.scope.clone(),
            season: collector.season.clone(),
            base_currency_type_id,
        })
    }
}

#[async_trait]
impl Service for CloudSyncService {
    fn name(&self) -> &'static str {
        "cloud_sync"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["collector"]
    }

    fn is_enabled(&self, config: &Config) -> bool {
        config.cloud.enabled && config.cloud.has_remote()
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let device_uuid = crate::cloud::load_or_create_device_uuid().map_err(|e| e.to_string())?;
        let config = crate::config::get_config_clone();
        logger::info(LogTag::Cloud, "cloud sync worker starting");

        let uplink_handle = tokio::spawn(uplink::run(
            self.store.clone(),
            shutdown.clone(),
            config.cloud.uplink_period_secs,
            config.cloud.base_url.clone(),
            config.cloud.anon_key.clone(),
            device_uuid,
            self.base_currency_type_id,
            config.cloud.request_timeout_secs,
        ));

        let downlink_handle = tokio::spawn(downlink::run(
            self.store.clone(),
            shutdown,
            config.cloud.downlink_period_secs,
            config.cloud.base_url.clone(),
            config.cloud.anon_key.clone(),
            self.scope.clone(),
            self.season.clone(),
            config.cloud.request_timeout_secs,
        ));

        Ok(vec![uplink_handle, downlink_handle])
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}
