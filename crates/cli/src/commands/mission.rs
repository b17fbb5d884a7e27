//! Mission status and mission log commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, MissionLogEntry};
use crate::output::{
    color_level, color_status, format_usage, print_json, print_success, print_table, OutputFormat,
};

/// Row for the health check table
#[derive(Tabled)]
struct HealthCheckRow {
    #[tabled(rename = "Subsystem")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Error")]
    error: String,
}

/// Row for the mission log table
#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&MissionLogEntry> for LogRow {
    fn from(entry: &MissionLogEntry) -> Self {
        Self {
            timestamp: entry.timestamp.clone(),
            level: color_level(&entry.level),
            message: entry.message.clone(),
        }
    }
}

/// Show the overall mission status and each subsystem check
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.mission_status().await?;

    match format {
        OutputFormat::Table => {
            println!(
                "Mission: {}  Alert: {}  Elapsed: {}",
                color_status(&status.mission_status),
                color_status(&status.alert_level),
                status.mission_time
            );

            let rows: Vec<HealthCheckRow> = status
                .health_checks
                .iter()
                .map(|(name, check)| HealthCheckRow {
                    name: name.to_uppercase(),
                    status: color_status(&check.status),
                    value: check.value.map(format_usage).unwrap_or_else(|| "-".into()),
                    threshold: check
                        .threshold
                        .map(|t| format!("{:.0}%", t))
                        .unwrap_or_else(|| "-".into()),
                    error: check.error.clone().unwrap_or_default(),
                })
                .collect();
            print_table(&rows);

            println!(
                "{} operational, {} degraded, {} offline",
                status.summary.operational, status.summary.degraded, status.summary.offline
            );
        }
        OutputFormat::Json => print_json(&status),
    }

    Ok(())
}

/// Show the mission log, newest last
pub async fn show_logs(client: &ApiClient, tail: Option<usize>, format: OutputFormat) -> Result<()> {
    let mut logs = client.mission_logs().await?;

    if let Some(tail) = tail {
        let skip = logs.logs.len().saturating_sub(tail);
        logs.logs.drain(..skip);
    }

    match format {
        OutputFormat::Table => {
            let rows: Vec<LogRow> = logs.logs.iter().map(LogRow::from).collect();
            print_table(&rows);
            println!("{} entries on the server", logs.total_logs);
        }
        OutputFormat::Json => print_json(&logs),
    }

    Ok(())
}

/// Append an entry to the mission log
pub async fn add_log(
    client: &ApiClient,
    level: &str,
    message: &str,
    format: OutputFormat,
) -> Result<()> {
    let response = client.add_mission_log(level, message).await?;

    match format {
        OutputFormat::Table => print_success(&format!(
            "Logged [{}] {} ({} entries)",
            response.log_added.level, response.log_added.message, response.total_logs
        )),
        OutputFormat::Json => print_json(&response),
    }

    Ok(())
}
