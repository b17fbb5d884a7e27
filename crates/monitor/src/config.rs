//! Monitor configuration

use anyhow::{Context, Result};
use monitor_lib::{CollectorConfig, Platform, RetryPolicy, Thresholds};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Monitor configuration, read once at startup from `HWMON_*` variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub host: String,
    pub port: u16,

    /// Attempts for CPU, memory and disk collection
    pub max_retries_critical: u32,
    /// Attempts for network collection
    pub max_retries_normal: u32,
    /// Base delay between attempts
    pub retry_delay_secs: u64,
    /// Double the delay after each failed critical attempt
    pub use_exponential_backoff: bool,

    pub cpu_alert_threshold: f64,
    pub memory_alert_threshold: f64,
    pub disk_alert_threshold: f64,

    /// CPU sampling window in milliseconds
    pub cpu_sample_window_ms: u64,

    /// Serve the last good reading when a host query fails
    pub fallback_to_last_good: bool,

    /// HMAC secret for access tokens; random per process when unset
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,

    pub admin_username: String,
    pub admin_password: String,

    /// Comma-separated list of allowed CORS origins
    pub cors_origins: String,

    /// Dashboard directory served for unmatched paths
    pub static_dir: Option<PathBuf>,

    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Also write JSON logs to this file
    pub log_file: Option<PathBuf>,
}

fn random_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_retries_critical: 3,
            max_retries_normal: 2,
            retry_delay_secs: 1,
            use_exponential_backoff: true,
            cpu_alert_threshold: 90.0,
            memory_alert_threshold: 90.0,
            disk_alert_threshold: 90.0,
            cpu_sample_window_ms: 1000,
            fallback_to_last_good: false,
            jwt_secret: random_secret(),
            jwt_expiration_secs: 3600,
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            cors_origins: "http://localhost:5000,http://127.0.0.1:5000".to_string(),
            static_dir: None,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix("HWMON"))
    }

    /// Values stay strings here; typed fields are converted on deserialize
    fn from_environment(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment)
            .build()
            .context("Failed to read HWMON_* environment")?;

        Self::from_config(config)
    }

    /// Deserialize from an already built source
    pub fn from_config(config: config::Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("Invalid monitor configuration")
    }

    /// True when no secret was configured and a random one is in use
    pub fn jwt_secret_is_ephemeral() -> bool {
        std::env::var("HWMON_JWT_SECRET").is_err()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn collector_config(&self) -> CollectorConfig {
        let delay = Duration::from_secs(self.retry_delay_secs);
        CollectorConfig {
            critical: RetryPolicy::critical(
                self.max_retries_critical,
                delay,
                self.use_exponential_backoff,
            ),
            normal: RetryPolicy::normal(self.max_retries_normal, delay),
            cpu_window: Duration::from_millis(self.cpu_sample_window_ms),
            platform: Platform::current(),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            cpu: self.cpu_alert_threshold,
            memory: self.memory_alert_threshold,
            disk: self.disk_alert_threshold,
        }
    }

    /// Allowed origins with blanks removed
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}
