//! Resource and health commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, Stats};
use crate::output::{
    color_status, format_bytes, format_usage, print_info, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for the resource table
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Usage")]
    usage: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Row for the health check table
#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Check")]
    check: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn resource_rows(stats: &Stats) -> Vec<ResourceRow> {
    let disk_details = match &stats.disk.mountpoint {
        Some(mount) => format!(
            "{} of {} used on {}",
            format_bytes(stats.disk.used),
            format_bytes(stats.disk.total),
            mount
        ),
        None => format!(
            "{} of {} used",
            format_bytes(stats.disk.used),
            format_bytes(stats.disk.total)
        ),
    };

    vec![
        ResourceRow {
            resource: "CPU".to_string(),
            usage: format_usage(stats.cpu.usage),
            details: format!("{} cores", stats.cpu.cores),
        },
        ResourceRow {
            resource: "Memory".to_string(),
            usage: format_usage(stats.ram.usage),
            details: format!(
                "{} of {} used",
                format_bytes(stats.ram.used),
                format_bytes(stats.ram.total)
            ),
        },
        ResourceRow {
            resource: "Disk".to_string(),
            usage: format_usage(stats.disk.usage),
            details: disk_details,
        },
        ResourceRow {
            resource: "Network".to_string(),
            usage: "-".to_string(),
            details: format!(
                "{:.2} MB sent, {:.2} MB received",
                stats.network.sent_mb, stats.network.received_mb
            ),
        },
    ]
}

/// Show a snapshot of every resource
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats = client.stats().await?;

    match format {
        OutputFormat::Table => {
            print_table(&resource_rows(&stats));

            let errors = [
                ("CPU", &stats.cpu.error),
                ("Memory", &stats.ram.error),
                ("Disk", &stats.disk.error),
                ("Network", &stats.network.error),
            ];
            for (name, error) in errors {
                if let Some(error) = error {
                    print_warning(&format!("{}: {}", name, error));
                }
            }
            print_info(&format!(
                "Collected in {:.1} ms (request {})",
                stats.response_time_ms, stats.request_id
            ));
        }
        OutputFormat::Json => print_json(&stats),
    }

    Ok(())
}

/// Show host and process health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Table => {
            println!("Status: {}", color_status(&health.status));
            println!(
                "Uptime: {}s  Process: {:.1} MB, {:.1}% CPU",
                health.system.uptime_seconds,
                health.application.memory_mb,
                health.application.cpu_percent
            );

            let ok = |passed: bool| if passed { "ok" } else { "critical" };
            let rows = vec![
                CheckRow {
                    check: format!("CPU ({})", format_usage(health.system.cpu_usage)),
                    status: color_status(ok(health.checks.cpu_ok)),
                },
                CheckRow {
                    check: format!("Memory ({})", format_usage(health.system.memory_usage)),
                    status: color_status(ok(health.checks.memory_ok)),
                },
                CheckRow {
                    check: format!("Disk ({})", format_usage(health.system.disk_usage)),
                    status: color_status(ok(health.checks.disk_ok)),
                },
                CheckRow {
                    check: "Process".to_string(),
                    status: color_status(ok(health.checks.process_ok)),
                },
            ];
            print_table(&rows);
        }
        OutputFormat::Json => print_json(&health),
    }

    Ok(())
}
