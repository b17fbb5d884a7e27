//! API client for communicating with the hardware monitor

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the hardware monitor
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Use `token` as the bearer token for later requests
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.send(self.client.get(url)).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.send(self.client.post(url).json(body)).await
    }

    /// Exchange credentials for an access token
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let response: LoginResponse = self
            .post(
                "api/login",
                &LoginRequest {
                    username: username.to_string(),
                    password: password.to_string(),
                },
            )
            .await
            .context("Login failed")?;
        Ok(response.access_token)
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.get("api/stats").await
    }

    pub async fn health(&self) -> Result<SystemHealth> {
        self.get("api/health").await
    }

    pub async fn mission_status(&self) -> Result<MissionStatus> {
        self.get("api/mission-status").await
    }

    pub async fn mission_logs(&self) -> Result<MissionLogs> {
        self.get("api/mission-logs").await
    }

    pub async fn add_mission_log(&self, level: &str, message: &str) -> Result<AddLogResponse> {
        self.post(
            "api/mission-logs/add",
            &AddLogRequest {
                level: level.to_string(),
                message: message.to_string(),
            },
        )
        .await
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuStats {
    pub usage: f64,
    pub cores: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub usage: f64,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskStats {
    pub usage: f64,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mountpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStats {
    pub sent_mb: f64,
    pub received_mb: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub cpu: CpuStats,
    pub ram: MemoryStats,
    pub disk: DiskStats,
    pub network: NetworkStats,
    pub request_id: String,
    pub response_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSection {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSection {
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub cpu_ok: bool,
    pub memory_ok: bool,
    pub disk_ok: bool,
    pub process_ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: String,
    pub system: SystemSection,
    pub application: ApplicationSection,
    pub checks: HealthChecks,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSummary {
    pub operational: u32,
    pub degraded: u32,
    pub offline: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionStatus {
    pub mission_status: String,
    pub mission_time: String,
    pub alert_level: String,
    pub health_checks: BTreeMap<String, HealthCheck>,
    pub summary: StatusSummary,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionLogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionLogs {
    pub logs: Vec<MissionLogEntry>,
    pub total_logs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLogRequest {
    pub level: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLogResponse {
    pub log_added: MissionLogEntry,
    pub total_logs: usize,
}
