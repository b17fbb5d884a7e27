//! Core library for the hardware monitor
//!
//! This crate provides the core functionality for:
//! - Host metric collection behind a probe seam, with retries
//! - Output sanitization and secret redaction
//! - Error classification into severity tiers
//! - Health and mission status aggregation with a bounded mission log
//! - Prometheus metrics and structured logging

pub mod classify;
pub mod collector;
pub mod error;
pub mod health;
pub mod mission_log;
pub mod models;
pub mod observability;
pub mod retry;
pub mod sanitize;

pub use classify::{classify_error, ErrorReport, Severity};
pub use collector::{
    CollectorConfig, Collectors, HostProbe, LastKnownGoodProbe, Platform, SysinfoProbe,
};
#[cfg(any(test, feature = "test-util"))]
pub use collector::{FixedProbe, Scripted};
pub use error::{CollectError, MonitorError, ProbeError};
pub use health::{
    Aggregator, CheckStatus, HealthCheckResult, HealthState, MissionStatus, Stats, SystemHealth,
    Thresholds,
};
pub use mission_log::{MissionLog, MissionLogEntry, MISSION_LOG_CAPACITY};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
pub use retry::RetryPolicy;
pub use sanitize::{redact_secrets, sanitize_fields, Sanitize};
