//! Health and mission status aggregation
//!
//! The [`Aggregator`] samples every resource on demand, compares the samples
//! against the configured thresholds and folds the per-resource results into
//! an overall status. Nothing is cached between calls.

use crate::classify::classify_error;
use crate::collector::{Collectors, INTERNAL_ERROR_MESSAGE};
use crate::error::{CollectError, MonitorError};
use crate::mission_log::{MissionLog, MissionLogEntry};
use crate::models::{
    unix_timestamp, CpuSample, DiskSample, MemorySample, NetworkSample, Sample, BYTES_PER_MB,
    UNAVAILABLE,
};
use crate::observability::StructuredLogger;
use crate::sanitize::Sanitize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Status of one resource, or of the whole host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Operational,
    Degraded,
    Offline,
}

impl CheckStatus {
    /// Alert label derived from the status
    pub fn alert_level(&self) -> &'static str {
        match self {
            CheckStatus::Operational => "DEFCON-5",
            CheckStatus::Degraded => "DEFCON-3",
            CheckStatus::Offline => "DEFCON-1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Operational => "OPERATIONAL",
            CheckStatus::Degraded => "DEGRADED",
            CheckStatus::Offline => "OFFLINE",
        }
    }

    /// Fold per-resource statuses: any offline wins, then any degraded
    pub fn overall<'a>(statuses: impl IntoIterator<Item = &'a CheckStatus>) -> CheckStatus {
        let mut has_degraded = false;

        for status in statuses {
            match status {
                CheckStatus::Offline => return CheckStatus::Offline,
                CheckStatus::Degraded => has_degraded = true,
                CheckStatus::Operational => {}
            }
        }

        if has_degraded {
            CheckStatus::Degraded
        } else {
            CheckStatus::Operational
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert thresholds in percent; a value at or above the threshold is degraded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: 90.0,
            memory: 90.0,
            disk: 90.0,
        }
    }
}

/// Outcome of checking one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_mb: Option<f64>,
}

impl HealthCheckResult {
    fn offline(error: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Offline,
            value: Some(UNAVAILABLE),
            threshold: None,
            error: Some(error.into()),
            sent_mb: None,
            received_mb: None,
        }
    }
}

/// Check a percentage sample against its threshold
///
/// A collector error or a sentinel sample is offline.
pub fn check_resource<S: Sample>(
    result: &Result<S, CollectError>,
    threshold: f64,
) -> HealthCheckResult {
    let sample = match result {
        Ok(sample) => sample,
        Err(_) => {
            return HealthCheckResult {
                threshold: Some(threshold),
                ..HealthCheckResult::offline(INTERNAL_ERROR_MESSAGE)
            }
        }
    };

    if sample.is_unavailable() {
        return HealthCheckResult {
            threshold: Some(threshold),
            ..HealthCheckResult::offline(sample.error().unwrap_or(INTERNAL_ERROR_MESSAGE))
        };
    }

    let usage = sample.usage();
    HealthCheckResult {
        status: if usage < threshold {
            CheckStatus::Operational
        } else {
            CheckStatus::Degraded
        },
        value: Some(usage),
        threshold: Some(threshold),
        error: None,
        sent_mb: None,
        received_mb: None,
    }
}

/// Network has no threshold; it is operational unless it could not be read
pub fn check_network(result: &Result<NetworkSample, CollectError>) -> HealthCheckResult {
    match result {
        Ok(sample) if !sample.is_unavailable() => HealthCheckResult {
            status: CheckStatus::Operational,
            value: None,
            threshold: None,
            error: None,
            sent_mb: Some(sample.sent_mb),
            received_mb: Some(sample.received_mb),
        },
        Ok(sample) => HealthCheckResult {
            value: None,
            ..HealthCheckResult::offline(sample.error().unwrap_or(INTERNAL_ERROR_MESSAGE))
        },
        Err(_) => HealthCheckResult {
            value: None,
            ..HealthCheckResult::offline(INTERNAL_ERROR_MESSAGE)
        },
    }
}

/// Count of checks per status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSummary {
    pub operational: usize,
    pub degraded: usize,
    pub offline: usize,
    pub total: usize,
}

impl StatusSummary {
    fn from_checks<'a>(checks: impl IntoIterator<Item = &'a HealthCheckResult>) -> Self {
        checks
            .into_iter()
            .fold(StatusSummary::default(), |mut summary, check| {
                match check.status {
                    CheckStatus::Operational => summary.operational += 1,
                    CheckStatus::Degraded => summary.degraded += 1,
                    CheckStatus::Offline => summary.offline += 1,
                }
                summary.total += 1;
                summary
            })
    }
}

/// Aggregate status of the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionStatus {
    pub mission_status: CheckStatus,
    /// Time since the aggregator was created, as `HH:MM:SS`
    pub mission_time: String,
    pub mission_elapsed_seconds: u64,
    pub mission_start: String,
    pub current_time: String,
    pub health_checks: BTreeMap<String, HealthCheckResult>,
    pub summary: StatusSummary,
    pub alert_level: String,
}

/// Format an elapsed duration as `HH:MM:SS`; hours are not wrapped
pub fn format_mission_time(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Overall state reported by the system health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSection {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub uptime_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_error: Option<String>,
}

/// Resource usage of the monitor process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSection {
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSection {
    pub bytes_sent_mb: f64,
    pub bytes_recv_mb: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthChecks {
    pub cpu_ok: bool,
    pub memory_ok: bool,
    pub disk_ok: bool,
    pub process_ok: bool,
}

impl HealthChecks {
    pub fn all_ok(&self) -> bool {
        self.cpu_ok && self.memory_ok && self.disk_ok && self.process_ok
    }
}

/// Detailed host and process health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthState,
    pub timestamp: f64,
    pub system: SystemSection,
    pub application: ApplicationSection,
    pub network: NetworkSection,
    pub checks: HealthChecks,
}

/// All four samples, sanitized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub cpu: CpuSample,
    pub ram: MemorySample,
    pub disk: DiskSample,
    pub network: NetworkSample,
    pub response_time_ms: f64,
}

/// `0 <= usage < threshold`
fn within(usage: f64, threshold: f64) -> bool {
    usage >= 0.0 && usage < threshold
}

fn usage_or_sentinel<S: Sample>(result: &Result<S, CollectError>) -> f64 {
    result.as_ref().map(Sample::usage).unwrap_or(UNAVAILABLE)
}

/// Combines the collectors, thresholds and mission log behind one handle
#[derive(Clone)]
pub struct Aggregator {
    collectors: Collectors,
    thresholds: Thresholds,
    mission_start: DateTime<Utc>,
    started: Instant,
    mission_log: MissionLog,
    logger: StructuredLogger,
}

impl Aggregator {
    pub fn new(collectors: Collectors, thresholds: Thresholds, logger: StructuredLogger) -> Self {
        Self {
            collectors,
            thresholds,
            mission_start: Utc::now(),
            started: Instant::now(),
            mission_log: MissionLog::new(),
            logger,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn mission_log(&self) -> &MissionLog {
        &self.mission_log
    }

    pub fn mission_start(&self) -> DateTime<Utc> {
        self.mission_start
    }

    pub async fn cpu(&self) -> Result<CpuSample, MonitorError> {
        self.collectors
            .cpu()
            .await
            .map(Sanitize::sanitized)
            .map_err(MonitorError::from)
    }

    pub async fn ram(&self) -> Result<MemorySample, MonitorError> {
        self.collectors
            .memory()
            .await
            .map(Sanitize::sanitized)
            .map_err(MonitorError::from)
    }

    pub async fn disk(&self) -> Result<DiskSample, MonitorError> {
        self.collectors
            .disk()
            .await
            .map(Sanitize::sanitized)
            .map_err(MonitorError::from)
    }

    pub async fn network(&self) -> Result<NetworkSample, MonitorError> {
        self.collectors
            .network()
            .await
            .map(Sanitize::sanitized)
            .map_err(MonitorError::from)
    }

    /// Every sample, collected concurrently
    ///
    /// Fails if any collector fails outside its own degrade handling; the
    /// caller is expected to classify the error.
    pub async fn stats(&self) -> Result<Stats, MonitorError> {
        let start = Instant::now();
        let (cpu, ram, disk, network) = tokio::join!(
            self.cpu(),
            self.ram(),
            self.disk(),
            self.network()
        );

        Ok(Stats {
            cpu: cpu?,
            ram: ram?,
            disk: disk?,
            network: network?,
            response_time_ms: (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0,
        })
    }

    /// Classify every resource and fold the results into a mission status
    pub async fn aggregate_health(&self, request_id: &str) -> MissionStatus {
        let (cpu, memory, disk, network) = tokio::join!(
            self.collectors.cpu(),
            self.collectors.memory(),
            self.collectors.disk(),
            self.collectors.network()
        );

        let mut health_checks = BTreeMap::new();
        health_checks.insert(
            "cpu".to_string(),
            self.check("cpu", cpu.map(Sanitize::sanitized), self.thresholds.cpu, request_id),
        );
        health_checks.insert(
            "memory".to_string(),
            self.check(
                "memory",
                memory.map(Sanitize::sanitized),
                self.thresholds.memory,
                request_id,
            ),
        );
        health_checks.insert(
            "disk".to_string(),
            self.check("disk", disk.map(Sanitize::sanitized), self.thresholds.disk, request_id),
        );
        let network = network.map(Sanitize::sanitized);
        if let Err(e) = &network {
            self.report(e.clone(), "network", request_id);
        }
        health_checks.insert("network".to_string(), check_network(&network));

        let status = CheckStatus::overall(health_checks.values().map(|c| &c.status));
        let summary = StatusSummary::from_checks(health_checks.values());
        let elapsed = self.started.elapsed();

        self.logger.log_mission_status(
            status.as_str(),
            status.alert_level(),
            summary.offline,
            summary.degraded,
        );

        MissionStatus {
            mission_status: status,
            mission_time: format_mission_time(elapsed),
            mission_elapsed_seconds: elapsed.as_secs(),
            mission_start: self.mission_start.to_rfc3339(),
            current_time: Utc::now().to_rfc3339(),
            health_checks,
            summary,
            alert_level: status.alert_level().to_string(),
        }
    }

    /// Healthy only when every resource is below its threshold and the process runs
    pub async fn system_health(&self, request_id: &str) -> SystemHealth {
        let (cpu, memory, disk, network, process) = tokio::join!(
            self.collectors.cpu(),
            self.collectors.memory(),
            self.collectors.disk(),
            self.collectors.network(),
            self.collectors.process()
        );

        let cpu_usage = usage_or_sentinel(&cpu);
        let memory_usage = usage_or_sentinel(&memory);
        let disk_usage = usage_or_sentinel(&disk);
        let disk_error = (disk_usage == UNAVAILABLE).then(|| INTERNAL_ERROR_MESSAGE.to_string());

        let process = match process {
            Ok(reading) => reading,
            Err(e) => {
                self.report(e, "process", request_id);
                Default::default()
            }
        };

        let network = match network {
            Ok(sample) if !sample.is_unavailable() => NetworkSection {
                bytes_sent_mb: sample.sent_mb,
                bytes_recv_mb: sample.received_mb,
                packets_sent: sample.packets_sent,
                packets_recv: sample.packets_recv,
            },
            _ => NetworkSection {
                bytes_sent_mb: UNAVAILABLE,
                bytes_recv_mb: UNAVAILABLE,
                packets_sent: 0,
                packets_recv: 0,
            },
        };

        let checks = HealthChecks {
            cpu_ok: within(cpu_usage, self.thresholds.cpu),
            memory_ok: within(memory_usage, self.thresholds.memory),
            disk_ok: within(disk_usage, self.thresholds.disk),
            process_ok: process.running,
        };

        SystemHealth {
            status: if checks.all_ok() {
                HealthState::Healthy
            } else {
                HealthState::Degraded
            },
            timestamp: unix_timestamp(),
            system: SystemSection {
                cpu_usage,
                memory_usage,
                disk_usage,
                uptime_seconds: process.host_uptime_secs,
                disk_error,
            },
            application: ApplicationSection {
                memory_mb: (process.memory_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0,
                cpu_percent: (process.cpu_percent * 10.0).round() / 10.0,
            },
            network,
            checks,
        }
    }

    pub async fn append_mission_log(
        &self,
        level: &str,
        message: impl Into<String>,
        request_id: &str,
    ) -> MissionLogEntry {
        self.mission_log.append(level, message, request_id).await
    }

    pub async fn mission_logs(&self) -> Vec<MissionLogEntry> {
        self.mission_log.snapshot().await
    }

    fn check<S: Sample>(
        &self,
        resource: &str,
        result: Result<S, CollectError>,
        threshold: f64,
        request_id: &str,
    ) -> HealthCheckResult {
        if let Err(e) = &result {
            self.report(e.clone(), resource, request_id);
        }
        check_resource(&result, threshold)
    }

    /// Log a failure as a classified report
    fn report(&self, err: impl Into<MonitorError>, resource: &str, request_id: &str) {
        let mut context = Map::new();
        context.insert("resource".into(), Value::String(resource.to_string()));
        classify_error(&err.into(), context, request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectorConfig, FixedProbe, Platform, Scripted};
    use crate::models::ProcessReading;
    use crate::retry::RetryPolicy;
    use std::io;
    use std::sync::Arc;

    fn aggregator(probe: Arc<FixedProbe>) -> Aggregator {
        let config = CollectorConfig {
            critical: RetryPolicy::critical(3, Duration::ZERO, true),
            normal: RetryPolicy::normal(2, Duration::ZERO),
            cpu_window: Duration::from_millis(1),
            platform: Platform::Posix,
        };
        Aggregator::new(
            Collectors::new(probe, config),
            Thresholds::default(),
            StructuredLogger::new("test-host"),
        )
    }

    #[test]
    fn test_overall_status_precedence() {
        use CheckStatus::*;
        assert_eq!(CheckStatus::overall(&[Operational, Operational]), Operational);
        assert_eq!(CheckStatus::overall(&[Operational, Degraded]), Degraded);
        assert_eq!(CheckStatus::overall(&[Degraded, Offline, Operational]), Offline);
        assert_eq!(CheckStatus::overall(std::iter::empty()), Operational);
    }

    #[test]
    fn test_alert_levels() {
        assert_eq!(CheckStatus::Operational.alert_level(), "DEFCON-5");
        assert_eq!(CheckStatus::Degraded.alert_level(), "DEFCON-3");
        assert_eq!(CheckStatus::Offline.alert_level(), "DEFCON-1");
    }

    #[test]
    fn test_check_resource_threshold_boundary() {
        let below: Result<CpuSample, CollectError> = Ok(CpuSample {
            usage: 89.9,
            cores: 4,
            timestamp: 0.0,
            error: None,
        });
        let at = below.clone().map(|s| CpuSample { usage: 90.0, ..s });

        assert_eq!(check_resource(&below, 90.0).status, CheckStatus::Operational);
        assert_eq!(check_resource(&at, 90.0).status, CheckStatus::Degraded);
    }

    #[test]
    fn test_collector_error_is_offline() {
        let failed: Result<CpuSample, CollectError> = Err(CollectError::Panicked {
            collector: "cpu",
            message: "boom".into(),
        });
        let check = check_resource(&failed, 90.0);

        assert_eq!(check.status, CheckStatus::Offline);
        assert_eq!(check.value, Some(-1.0));
        assert_eq!(check.error.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
    }

    #[test]
    fn test_format_mission_time() {
        assert_eq!(format_mission_time(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_mission_time(Duration::from_secs(3_725)), "01:02:05");
        assert_eq!(format_mission_time(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[tokio::test]
    async fn test_offline_takes_precedence_over_degraded() {
        let probe = Arc::new(FixedProbe::healthy());
        probe.set_cpu_usage(50.0);
        probe.set_memory_usage(95.0);
        probe.set_disk("/", Scripted::Fail(io::ErrorKind::Other, "io".into()));

        let status = aggregator(probe).aggregate_health("req-1").await;

        assert_eq!(status.mission_status, CheckStatus::Offline);
        assert_eq!(status.alert_level, "DEFCON-1");
        assert_eq!(status.health_checks["cpu"].status, CheckStatus::Operational);
        assert_eq!(status.health_checks["memory"].status, CheckStatus::Degraded);
        assert_eq!(status.health_checks["disk"].status, CheckStatus::Offline);
        assert_eq!(status.health_checks["disk"].value, Some(-1.0));
        assert_eq!(status.health_checks["network"].status, CheckStatus::Operational);
        assert_eq!(
            status.summary,
            StatusSummary {
                operational: 2,
                degraded: 1,
                offline: 1,
                total: 4
            }
        );
    }

    #[tokio::test]
    async fn test_all_below_threshold_is_operational() {
        let probe = Arc::new(FixedProbe::healthy());
        let status = aggregator(probe).aggregate_health("req-1").await;

        assert_eq!(status.mission_status, CheckStatus::Operational);
        assert_eq!(status.alert_level, "DEFCON-5");
        assert_eq!(status.summary.operational, 4);
        assert_eq!(status.health_checks["cpu"].threshold, Some(90.0));
        assert!(status.health_checks["network"].threshold.is_none());
    }

    #[tokio::test]
    async fn test_degraded_without_offline() {
        let probe = Arc::new(FixedProbe::healthy());
        probe.set_disk_usage(97.0);

        let status = aggregator(probe).aggregate_health("req-1").await;
        assert_eq!(status.mission_status, CheckStatus::Degraded);
        assert_eq!(status.alert_level, "DEFCON-3");
    }

    #[tokio::test]
    async fn test_panicking_collector_is_offline() {
        let probe = Arc::new(FixedProbe::healthy());
        probe.set_cpu(Scripted::Panic("collector bug".into()));

        let status = aggregator(probe).aggregate_health("req-1").await;
        assert_eq!(status.health_checks["cpu"].status, CheckStatus::Offline);
        assert_eq!(status.mission_status, CheckStatus::Offline);
    }

    #[tokio::test]
    async fn test_system_health() {
        let probe = Arc::new(FixedProbe::healthy());
        let health = aggregator(probe.clone()).system_health("req-1").await;

        assert_eq!(health.status, HealthState::Healthy);
        assert_eq!(health.system.uptime_seconds, 3_600);
        assert_eq!(health.application.memory_mb, 32.0);
        assert_eq!(health.network.bytes_sent_mb, 10.0);
        assert!(health.system.disk_error.is_none());

        probe.set_process(Scripted::Ok(ProcessReading::default()));
        probe.set_disk("/", Scripted::Fail(io::ErrorKind::Other, "io".into()));
        let health = aggregator(probe).system_health("req-2").await;

        assert_eq!(health.status, HealthState::Degraded);
        assert!(!health.checks.disk_ok);
        assert!(!health.checks.process_ok);
        assert!(health.checks.cpu_ok);
        assert_eq!(health.system.disk_error.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_stats_are_sanitized() {
        let probe = Arc::new(FixedProbe::healthy());
        probe.set_partitions(Scripted::Ok(vec![crate::models::Partition::new(
            "/var/lib/data",
            "ext4",
        )]));
        probe.set_disk(
            "/var/lib/data",
            Scripted::Ok(crate::models::DiskReading {
                total: 100,
                used: 10,
                free: 90,
            }),
        );

        let stats = aggregator(probe).stats().await.unwrap();
        assert_eq!(stats.disk.mountpoint.as_deref(), Some("/"));
        assert_eq!(stats.cpu.usage, 25.0);
        assert!(stats.response_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_stats_fail_when_a_collector_panics() {
        let probe = Arc::new(FixedProbe::healthy());
        probe.set_network(Scripted::Panic("broken".into()));

        let err = aggregator(probe).stats().await.unwrap_err();
        assert!(matches!(err, MonitorError::Collect(_)));
    }

    #[tokio::test]
    async fn test_mission_log_is_owned_by_aggregator() {
        let agg = aggregator(Arc::new(FixedProbe::healthy()));
        let other = agg.clone();

        agg.append_mission_log("info", "launch", "req-1").await;
        let logs = other.mission_logs().await;

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, "INFO");
    }
}
