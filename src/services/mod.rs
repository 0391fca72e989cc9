//! Service orchestration: a small `Service` trait plus a dependency- and
//! priority-ordered `ServiceManager` that starts/stops the engine's
//! long-lived background tasks (Collector, Cloud Sync Worker, HTTP
//! boundary) as a unit, with cooperative shutdown via `Arc<Notify>`.

mod health;
mod metrics;
pub mod implementations;

pub use health::ServiceHealth;
pub use metrics::{MetricsCollector, ServiceMetrics};

use crate::config::Config;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Core service trait that all long-lived engine components implement.
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique service identifier.
    fn name(&self) -> &'static str;

    /// Service priority (lower = starts earlier, stops later).
    fn priority(&self) -> i32 {
        100
    }

    /// Services this service depends on.
    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }

    /// Whether this service should run at all, given the loaded config.
    fn is_enabled(&self, _config: &Config) -> bool {
        true
    }

    /// Initialize the service.
    async fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Start the service; returns the task handle(s) it spawned.
    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String>;

    /// Stop the service (beyond signaling `shutdown`, which the manager
    /// does for every service up front).
    async fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Check service health.
    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}

pub struct ServiceManager {
    services: HashMap<&'static str, Box<dyn Service>>,
    handles: HashMap<&'static str, Vec<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
    config: Config,
    metrics_collector: MetricsCollector,
}

impl ServiceManager {
    pub fn new(config: Config) -> Self {
        Self {
            services: HashMap::new(),
            handles: HashMap::new(),
            shutdown: Arc::new(Notify::new()),
            config,
            metrics_collector: MetricsCollector::new(),
        }
    }

    /// Register a service.
    pub fn register(&mut self, service: Box<dyn Service>) {
        let name = service.name();
        self.services.insert(name, service);
    }

    /// Start all enabled services in dependency and priority order.
    pub async fn start_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::System, "starting all services");

        let enabled_services: Vec<&'static str> = self
            .services
            .iter()
            .filter(|(_, service)| service.is_enabled(&self.config))
            .map(|(name, _)| *name)
            .collect();

        let ordered = self.resolve_startup_order(&enabled_services)?;
        logger::info(LogTag::System, &format!("service startup order: {:?}", ordered));

        for service_name in ordered {
            if let Some(service) = self.services.get_mut(service_name) {
                service.initialize().await?;
                let handles = service.start(self.shutdown.clone()).await?;
                self.handles.insert(service_name, handles);
                self.metrics_collector.start_monitoring(service_name);
                logger::info(LogTag::System, &format!("service started: {service_name}"));
            }
        }

        Ok(())
    }

    /// Stop all running services in reverse startup order.
    pub async fn stop_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::System, "stopping all services");
        self.shutdown.notify_waiters();

        let running_services: Vec<&'static str> = self.handles.keys().copied().collect();
        let mut ordered = self.resolve_startup_order(&running_services)?;
        ordered.reverse();

        for service_name in ordered {
            if let Some(service) = self.services.get_mut(service_name) {
                if let Err(e) = service.stop().await {
                    logger::warning(LogTag::System, &format!("service stop error for {service_name}: {e}"));
                }
                if let Some(handles) = self.handles.remove(service_name) {
                    for handle in handles {
                        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), handle).await;
                    }
                }
                logger::info(LogTag::System, &format!("service stopped: {service_name}"));
            }
        }

        Ok(())
    }

    fn resolve_startup_order(&self, services: &[&'static str]) -> Result<Vec<&'static str>, String> {
        use std::collections::HashSet;

        let mut ordered = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();

        fn visit<'a>(
            name: &'static str,
            services: &'a HashMap<&'static str, Box<dyn Service>>,
            ordered: &mut Vec<&'static str>,
            visited: &mut HashSet<&'static str>,
            visiting: &mut HashSet<&'static str>,
        ) -> Result<(), String> {
            if visited.contains(name) {
                return Ok(());
            }
            if visiting.contains(name) {
                return Err(format!("circular dependency detected for service: {name}"));
            }
            visiting.insert(name);
            if let Some(service) = services.get(name) {
                for dep in service.dependencies() {
                    visit(dep, services, ordered, visited, visiting)?;
                }
            }
            visiting.remove(name);
            visited.insert(name);
            ordered.push(name);
            Ok(())
        }

        for &service_name in services {
            visit(service_name, &self.services, &mut ordered, &mut visited, &mut visiting)?;
        }

        ordered.sort_by_key(|name| self.services.get(name).map(|s| s.priority()).unwrap_or(100));
        Ok(ordered)
    }

    pub async fn get_health(&self) -> HashMap<&'static str, ServiceHealth> {
        let mut health = HashMap::new();
        for (name, service) in &self.services {
            health.insert(*name, service.health().await);
        }
        health
    }

    pub async fn get_metrics(&self) -> HashMap<&'static str, ServiceMetrics> {
        let names: Vec<&'static str> = self.services.keys().copied().collect();
        self.metrics_collector.collect_all(&names).await
    }
}
