use crate::collector::Collector;
use crate::services::{Service, ServiceHealth};
use crate::startup;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Wraps the Collector's long-lived ingest loop (§4.6). The caller must
/// obtain a `CollectorHandle` via `Collector::handle()` before constructing
/// this service — ownership of the `Collector` itself moves in here.
pub struct CollectorService {
    collector: Option<Collector>,
}

impl CollectorService {
    pub fn new(collector: Collector) -> Self {
        Self { collector: Some(collector) }
    }
}

#[async_trait]
impl Service for CollectorService {
    fn name(&self) -> &'static str {
        "collector"
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let collector = self.collector.take().ok_or("collector already started")?;
        startup::mark_service_start("collector");
        let handle = tokio::spawn(async move {
            collector.run(shutdown).await;
        });
        startup::mark_service_ready("collector");
        Ok(vec![handle])
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}
