//! Observability infrastructure for the hardware monitor
//!
//! Provides:
//! - Prometheus metrics (collection latency, sentinel samples, mission log size, last usage)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    GaugeVec, HistogramVec, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for collection latency (in seconds); CPU sampling sits near 1s
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 1.5, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    collection_latency_seconds: HistogramVec,
    collection_errors: IntCounterVec,
    unavailable_samples: IntCounterVec,
    resource_usage_percent: GaugeVec,
    mission_log_entries: IntGauge,
    error_reports: IntCounterVec,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            collection_latency_seconds: register_histogram_vec!(
                "hardware_monitor_collection_latency_seconds",
                "Time spent collecting one resource sample, retries included",
                &["resource"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),

            collection_errors: register_int_counter_vec!(
                "hardware_monitor_collection_errors_total",
                "Collections that failed after every retry",
                &["resource"]
            )
            .expect("Failed to register collection_errors"),

            unavailable_samples: register_int_counter_vec!(
                "hardware_monitor_unavailable_samples_total",
                "Samples returned with the unavailable sentinel",
                &["resource"]
            )
            .expect("Failed to register unavailable_samples"),

            resource_usage_percent: register_gauge_vec!(
                "hardware_monitor_resource_usage_percent",
                "Last observed usage percentage per resource",
                &["resource"]
            )
            .expect("Failed to register resource_usage_percent"),

            mission_log_entries: register_int_gauge!(
                "hardware_monitor_mission_log_entries",
                "Entries currently held in the mission log"
            )
            .expect("Failed to register mission_log_entries"),

            error_reports: register_int_counter_vec!(
                "hardware_monitor_error_reports_total",
                "Classified error reports by severity",
                &["severity"]
            )
            .expect("Failed to register error_reports"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MonitorMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorMetrics").finish()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    /// Record one collection, successful or not
    pub fn observe_collection(&self, resource: &str, duration_secs: f64) {
        self.inner()
            .collection_latency_seconds
            .with_label_values(&[resource])
            .observe(duration_secs);
    }

    pub fn inc_collection_errors(&self, resource: &str) {
        self.inner()
            .collection_errors
            .with_label_values(&[resource])
            .inc();
    }

    pub fn inc_unavailable_samples(&self, resource: &str) {
        self.inner()
            .unavailable_samples
            .with_label_values(&[resource])
            .inc();
    }

    pub fn set_resource_usage(&self, resource: &str, percent: f64) {
        self.inner()
            .resource_usage_percent
            .with_label_values(&[resource])
            .set(percent);
    }

    pub fn set_mission_log_entries(&self, entries: i64) {
        self.inner().mission_log_entries.set(entries);
    }

    pub fn inc_error_reports(&self, severity: &str) {
        self.inner()
            .error_reports
            .with_label_values(&[severity])
            .inc();
    }
}

/// Structured logger for monitor lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    host_name: String,
}

impl StructuredLogger {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }

    /// Log monitor startup
    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "monitor_started",
            host = %self.host_name,
            version = %version,
            addr = %addr,
            "Hardware monitor started"
        );
    }

    /// Log monitor shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            host = %self.host_name,
            reason = %reason,
            "Hardware monitor shutting down"
        );
    }

    /// Log an aggregate status transition
    pub fn log_mission_status(&self, status: &str, alert_level: &str, offline: usize, degraded: usize) {
        if offline > 0 || degraded > 0 {
            warn!(
                event = "mission_status",
                host = %self.host_name,
                status = %status,
                alert_level = %alert_level,
                offline = offline,
                degraded = degraded,
                "Mission status not fully operational"
            );
        } else {
            info!(
                event = "mission_status",
                host = %self.host_name,
                status = %status,
                alert_level = %alert_level,
                "Mission status operational"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_metrics_creation() {
        let metrics = MonitorMetrics::new();

        metrics.observe_collection("cpu", 1.001);
        metrics.inc_collection_errors("disk");
        metrics.inc_unavailable_samples("disk");
        metrics.set_resource_usage("ram", 42.0);
        metrics.set_mission_log_entries(3);
        metrics.inc_error_reports("data");

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "hardware_monitor_collection_latency_seconds"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-host");
        assert_eq!(logger.host_name, "test-host");
    }
}
