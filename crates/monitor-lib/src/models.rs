//! Core data models for the hardware monitor

use serde::{Deserialize, Serialize};

/// Usage value reported when a resource could not be read
pub const UNAVAILABLE: f64 = -1.0;

/// Bytes per megabyte used for network counters
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Current wall-clock time as fractional seconds since the Unix epoch
pub fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Clamp a percentage into `[0, 100]` and round it to one decimal
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    (value.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

/// CPU utilisation sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuSample {
    pub usage: f64,
    pub cores: usize,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CpuSample {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            usage: UNAVAILABLE,
            cores: 0,
            timestamp: unix_timestamp(),
            error: Some(error.into()),
        }
    }
}

/// Physical memory sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    pub usage: f64,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MemorySample {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            usage: UNAVAILABLE,
            total: 0,
            used: 0,
            free: 0,
            timestamp: unix_timestamp(),
            error: Some(error.into()),
        }
    }
}

/// Usage of the main mounted filesystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSample {
    pub usage: f64,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<String>,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiskSample {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            usage: UNAVAILABLE,
            total: 0,
            used: 0,
            free: 0,
            mountpoint: None,
            timestamp: unix_timestamp(),
            error: Some(error.into()),
        }
    }
}

/// Cumulative network counters since the OS last reset them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    pub sent_mb: f64,
    pub received_mb: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NetworkSample {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            sent_mb: UNAVAILABLE,
            received_mb: UNAVAILABLE,
            packets_sent: 0,
            packets_recv: 0,
            timestamp: unix_timestamp(),
            error: Some(error.into()),
        }
    }
}

/// Common view over the four sample kinds
pub trait Sample {
    /// Usage percentage, or `-1` for a sentinel sample
    fn usage(&self) -> f64;

    fn error(&self) -> Option<&str>;

    fn is_unavailable(&self) -> bool {
        self.usage() == UNAVAILABLE
    }
}

impl Sample for CpuSample {
    fn usage(&self) -> f64 {
        self.usage
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Sample for MemorySample {
    fn usage(&self) -> f64 {
        self.usage
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Sample for DiskSample {
    fn usage(&self) -> f64 {
        self.usage
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Sample for NetworkSample {
    /// Network has no percentage; sentinel samples report `-1`, healthy ones `0`
    fn usage(&self) -> f64 {
        if self.sent_mb == UNAVAILABLE {
            UNAVAILABLE
        } else {
            0.0
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Raw CPU reading from a host probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuReading {
    pub usage_percent: f64,
    pub logical_cores: usize,
}

/// Raw memory reading in bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryReading {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub available: u64,
}

/// A mounted filesystem as enumerated by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub mountpoint: String,
    pub fs_type: String,
}

impl Partition {
    pub fn new(mountpoint: impl Into<String>, fs_type: impl Into<String>) -> Self {
        Self {
            mountpoint: mountpoint.into(),
            fs_type: fs_type.into(),
        }
    }
}

/// Raw filesystem usage in bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskReading {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Raw cumulative network counters summed over every interface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetworkReading {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

/// Resource usage of the monitor process itself
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProcessReading {
    pub memory_bytes: u64,
    pub cpu_percent: f64,
    pub running: bool,
    pub host_uptime_secs: u64,
}
