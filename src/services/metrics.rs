//! Lightweight per-service metrics. No CPU/task-poll instrumentation here —
//! this engine has no trading-latency budget to watch; a service that wants
//! an operation counter increments it directly through [`MetricsCollector`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub uptime_seconds: u64,
    pub operations_total: u64,
    pub operations_per_second: f32,
    pub errors_total: u64,
    pub custom_metrics: HashMap<String, f64>,
}

impl ServiceMetrics {
    /// Ensure all numeric fields are finite before serialization.
    pub fn sanitize(&mut self) {
        if !self.operations_per_second.is_finite() {
            self.operations_per_second = 0.0;
        }
        self.custom_metrics.retain(|_, value| value.is_finite());
    }

    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }
}

struct ServiceCounters {
    start: Instant,
    operations_total: u64,
    errors_total: u64,
}

/// Tracks start time and simple counters per service name. Services call
/// [`MetricsCollector::record_operation`] / `record_error` as they work;
/// the `status` HTTP resource reads a snapshot back out.
pub struct MetricsCollector {
    services: Mutex<HashMap<&'static str, ServiceCounters>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            services: Mutex::new(HashMap::new()),
        }
    }

    pub fn start_monitoring(&self, service_name: &'static str) {
        let mut services = self.services.lock().unwrap();
        services.entry(service_name).or_insert_with(|| ServiceCounters {
            start: Instant::now(),
            operations_total: 0,
            errors_total: 0,
        });
    }

    pub fn record_operation(&self, service_name: &'static str) {
        if let Some(counters) = self.services.lock().unwrap().get_mut(service_name) {
            counters.operations_total += 1;
        }
    }

    pub fn record_error(&self, service_name: &'static str) {
        if let Some(counters) = self.services.lock().unwrap().get_mut(service_name) {
            counters.errors_total += 1;
        }
    }

    pub async fn collect_for_service(&self, name: &str) -> ServiceMetrics {
        let services = self.services.lock().unwrap();
        let Some(counters) = services.get(name) else {
            return ServiceMetrics::default();
        };
        let uptime_seconds = counters.start.elapsed().as_secs();
        let operations_per_second = if uptime_seconds > 0 {
            counters.operations_total as f32 / uptime_seconds as f32
        } else {
            0.0
        };
        ServiceMetrics {
            uptime_seconds,
            operations_total: counters.operations_total,
            operations_per_second,
            errors_total: counters.errors_total,
            custom_metrics: HashMap::new(),
        }
        .sanitized()
    }

    pub async fn collect_all(&self, service_names: &[&'static str]) -> HashMap<&'static str, ServiceMetrics> {
        let mut out = HashMap::new();
        for &name in service_names {
            out.insert(name, self.collect_for_service(name).await);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_non_finite_values() {
        let mut metrics = ServiceMetrics {
            uptime_seconds: 10,
            operations_total: 5,
            operations_per_second: f32::NAN,
            errors_total: 0,
            custom_metrics: HashMap::from([
                ("valid".to_string(), 1.0),
                ("nan".to_string(), f64::NAN),
                ("inf".to_string(), f64::INFINITY),
            ]),
        };

        metrics.sanitize();

        assert!(metrics.operations_per_second.is_finite());
        assert_eq!(metrics.custom_metrics.len(), 1);
        assert_eq!(metrics.custom_metrics.get("valid"), Some(&1.0));
    }

    #[tokio::test]
    async fn records_operations_and_uptime() {
        let collector = MetricsCollector::new();
        collector.start_monitoring("collector");
        collector.record_operation("collector");
        collector.record_operation("collector");
        let metrics = collector.collect_for_service("collector").await;
        assert_eq!(metrics.operations_total, 2);
    }
}
