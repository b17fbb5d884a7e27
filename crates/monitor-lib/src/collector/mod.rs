//! Host metrics collection
//!
//! This module provides the collectors for CPU, memory, disk and network
//! samples. OS access goes through the [`HostProbe`] trait; the sampling
//! functions turn probe failures into sentinel samples, and [`Collectors`]
//! runs them on the blocking pool behind a retry policy.

#[cfg(any(test, feature = "test-util"))]
mod fixed_probe;
mod last_good;
mod samplers;
mod sysinfo_probe;

#[cfg(test)]
mod tests;

#[cfg(any(test, feature = "test-util"))]
pub use fixed_probe::{FixedProbe, Scripted};
pub use last_good::LastKnownGoodProbe;
pub use samplers::{
    collect_cpu, collect_disk, collect_memory, collect_network, select_main_partition, Platform,
    INTERNAL_ERROR_MESSAGE, NO_PARTITION_MESSAGE,
};
pub use sysinfo_probe::SysinfoProbe;

use crate::error::{CollectError, ProbeError};
use crate::models::{
    CpuReading, CpuSample, DiskReading, DiskSample, MemoryReading, MemorySample, NetworkReading,
    NetworkSample, Partition, ProcessReading, Sample,
};
use crate::observability::MonitorMetrics;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of raw host readings
pub trait HostProbe: Send + Sync {
    /// Utilisation over a sampling window; blocks for the window
    fn cpu(&self, window: Duration) -> Result<CpuReading, ProbeError>;

    fn memory(&self) -> Result<MemoryReading, ProbeError>;

    /// Mounted filesystems in enumeration order
    fn partitions(&self) -> Result<Vec<Partition>, ProbeError>;

    fn disk_usage(&self, mountpoint: &str) -> Result<DiskReading, ProbeError>;

    /// Counters since the OS last reset them
    fn network(&self) -> Result<NetworkReading, ProbeError>;

    fn process(&self) -> Result<ProcessReading, ProbeError>;
}

/// Settings shared by every collector
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Policy for CPU, memory and disk
    pub critical: RetryPolicy,
    /// Policy for network
    pub normal: RetryPolicy,
    /// CPU sampling window
    pub cpu_window: Duration,
    pub platform: Platform,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            critical: RetryPolicy::critical(3, Duration::from_secs(1), true),
            normal: RetryPolicy::normal(2, Duration::from_secs(1)),
            cpu_window: Duration::from_secs(1),
            platform: Platform::current(),
        }
    }
}

/// Runs the sampling functions off the async workers, with retries
#[derive(Clone)]
pub struct Collectors {
    probe: Arc<dyn HostProbe>,
    config: CollectorConfig,
    metrics: MonitorMetrics,
}

impl Collectors {
    pub fn new(probe: Arc<dyn HostProbe>, config: CollectorConfig) -> Self {
        Self {
            probe,
            config,
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn probe(&self) -> &Arc<dyn HostProbe> {
        &self.probe
    }

    pub async fn cpu(&self) -> Result<CpuSample, CollectError> {
        let window = self.config.cpu_window;
        self.run(self.config.critical, "cpu", move |probe| {
            collect_cpu(probe, window)
        })
        .await
    }

    pub async fn memory(&self) -> Result<MemorySample, CollectError> {
        self.run(self.config.critical, "ram", collect_memory).await
    }

    pub async fn disk(&self) -> Result<DiskSample, CollectError> {
        let platform = self.config.platform;
        self.run(self.config.critical, "disk", move |probe| {
            collect_disk(probe, platform)
        })
        .await
    }

    pub async fn network(&self) -> Result<NetworkSample, CollectError> {
        self.run(self.config.normal, "network", collect_network).await
    }

    /// Reading for the monitor process itself; failures are passed through
    pub async fn process(&self) -> Result<ProcessReading, ProbeError> {
        let probe = self.probe.clone();
        match tokio::task::spawn_blocking(move || probe.process()).await {
            Ok(result) => result,
            Err(e) => Err(ProbeError::Unavailable(e.to_string())),
        }
    }

    async fn run<T, F>(
        &self,
        policy: RetryPolicy,
        resource: &'static str,
        collect: F,
    ) -> Result<T, CollectError>
    where
        T: Sample + Send + 'static,
        F: Fn(&dyn HostProbe) -> T + Clone + Send + 'static,
    {
        let start = Instant::now();
        let result = policy
            .run(resource, || {
                let probe = self.probe.clone();
                let collect = collect.clone();
                async move {
                    tokio::task::spawn_blocking(move || collect(probe.as_ref()))
                        .await
                        .map_err(|e| CollectError::from_join(resource, e))
                }
            })
            .await;

        self.metrics
            .observe_collection(resource, start.elapsed().as_secs_f64());
        match &result {
            Ok(sample) if sample.is_unavailable() => self.metrics.inc_unavailable_samples(resource),
            // network has no percentage to report
            Ok(_) if resource == "network" => {}
            Ok(sample) => self.metrics.set_resource_usage(resource, sample.usage()),
            Err(_) => self.metrics.inc_collection_errors(resource),
        }
        result
    }
}
