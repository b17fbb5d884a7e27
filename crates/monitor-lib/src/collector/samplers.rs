//! Per-resource sampling functions
//!
//! Each function performs its host queries through a [`HostProbe`] and
//! always returns a well-formed sample: a failed query degrades into the
//! sentinel sample instead of an error. Raw OS errors never reach the
//! sample; they are logged after secret redaction.

use super::HostProbe;
use crate::error::ProbeError;
use crate::models::{
    clamp_percent, unix_timestamp, CpuSample, DiskReading, DiskSample, MemorySample,
    NetworkSample, Partition, BYTES_PER_MB,
};
use crate::sanitize::redact_secrets;
use std::time::Duration;
use tracing::{error, warn};

/// Message placed in sentinel samples instead of the raw OS error
pub const INTERNAL_ERROR_MESSAGE: &str = "internal system error";

/// Message used when no filesystem could be enumerated
pub const NO_PARTITION_MESSAGE: &str = "no partition found";

/// Filesystem conventions used to pick the main partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// Conventional boot filesystem
    pub fn boot_path(&self) -> &'static str {
        match self {
            Platform::Posix => "/",
            Platform::Windows => "C:\\",
        }
    }
}

pub fn collect_cpu(probe: &dyn HostProbe, window: Duration) -> CpuSample {
    match probe.cpu(window) {
        Ok(reading) => CpuSample {
            usage: clamp_percent(reading.usage_percent),
            cores: reading.logical_cores,
            timestamp: unix_timestamp(),
            error: None,
        },
        Err(e) => {
            log_probe_failure("cpu", &e);
            CpuSample::unavailable(INTERNAL_ERROR_MESSAGE)
        }
    }
}

pub fn collect_memory(probe: &dyn HostProbe) -> MemorySample {
    match probe.memory() {
        Ok(reading) => {
            // Percent of memory not available to new allocations
            let usage = if reading.total > 0 {
                let unavailable = reading.total.saturating_sub(reading.available);
                unavailable as f64 / reading.total as f64 * 100.0
            } else {
                0.0
            };
            MemorySample {
                usage: clamp_percent(usage),
                total: reading.total,
                used: reading.used,
                free: reading.free,
                timestamp: unix_timestamp(),
                error: None,
            }
        }
        Err(e) => {
            log_probe_failure("memory", &e);
            MemorySample::unavailable(INTERNAL_ERROR_MESSAGE)
        }
    }
}

pub fn collect_disk(probe: &dyn HostProbe, platform: Platform) -> DiskSample {
    let partitions = match probe.partitions() {
        Ok(partitions) => partitions,
        Err(e) => {
            log_probe_failure("disk", &e);
            return DiskSample::unavailable(INTERNAL_ERROR_MESSAGE);
        }
    };

    let Some(main) = select_main_partition(&partitions, platform) else {
        error!(collector = "disk", "No disk partition found");
        return DiskSample::unavailable(NO_PARTITION_MESSAGE);
    };

    match probe.disk_usage(&main.mountpoint) {
        Ok(reading) => disk_sample(reading, &main.mountpoint),
        Err(e) if e.is_access_failure() && main.mountpoint != platform.boot_path() => {
            warn!(
                collector = "disk",
                mountpoint = %main.mountpoint,
                error = %redact_secrets(&e.to_string()),
                "Main partition not accessible, trying boot path"
            );
            let boot = platform.boot_path();
            match probe.disk_usage(boot) {
                Ok(reading) => disk_sample(reading, boot),
                Err(e) => {
                    log_probe_failure("disk", &e);
                    DiskSample::unavailable(INTERNAL_ERROR_MESSAGE)
                }
            }
        }
        Err(e) => {
            log_probe_failure("disk", &e);
            DiskSample::unavailable(INTERNAL_ERROR_MESSAGE)
        }
    }
}

pub fn collect_network(probe: &dyn HostProbe) -> NetworkSample {
    match probe.network() {
        Ok(reading) => NetworkSample {
            sent_mb: bytes_to_mb(reading.bytes_sent),
            received_mb: bytes_to_mb(reading.bytes_recv),
            packets_sent: reading.packets_sent,
            packets_recv: reading.packets_recv,
            timestamp: unix_timestamp(),
            error: None,
        },
        Err(e) => {
            log_probe_failure("network", &e);
            NetworkSample::unavailable(INTERNAL_ERROR_MESSAGE)
        }
    }
}

/// Pick the partition that best represents "the disk" of this host
///
/// The boot filesystem wins outright. Otherwise Windows prefers the first
/// drive-letter mount and POSIX the first enumerated one.
pub fn select_main_partition(partitions: &[Partition], platform: Platform) -> Option<&Partition> {
    let boot = platform.boot_path();
    if let Some(root) = partitions.iter().find(|p| p.mountpoint == boot) {
        return Some(root);
    }

    match platform {
        Platform::Windows => partitions
            .iter()
            .find(|p| p.mountpoint.contains(':'))
            .or_else(|| partitions.first()),
        Platform::Posix => partitions.first(),
    }
}

fn disk_sample(reading: DiskReading, mountpoint: &str) -> DiskSample {
    let usage = if reading.total > 0 {
        reading.used as f64 / reading.total as f64 * 100.0
    } else {
        0.0
    };
    DiskSample {
        usage: clamp_percent(usage),
        total: reading.total,
        used: reading.used,
        free: reading.free,
        mountpoint: Some(mountpoint.to_string()),
        timestamp: unix_timestamp(),
        error: None,
    }
}

fn bytes_to_mb(bytes: u64) -> f64 {
    let mb = (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0;
    mb.max(0.0)
}

fn log_probe_failure(collector: &'static str, err: &ProbeError) {
    error!(
        collector = collector,
        error = %redact_secrets(&err.to_string()),
        "Failed to read host metrics"
    );
}
