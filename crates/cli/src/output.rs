//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a usage percentage; negative values mean the reading failed
pub fn format_usage(usage: f64) -> String {
    if usage < 0.0 {
        return "n/a".red().to_string();
    }
    let formatted = format!("{:.1}%", usage);
    if usage >= 90.0 {
        formatted.red().to_string()
    } else if usage >= 70.0 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "operational" | "healthy" | "ok" | "defcon-5" => status.green().to_string(),
        "degraded" | "warning" | "defcon-3" => status.yellow().to_string(),
        "offline" | "error" | "critical" | "defcon-1" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a mission log level
pub fn color_level(level: &str) -> String {
    match level {
        "ERROR" | "CRITICAL" => level.red().to_string(),
        "WARNING" | "WARN" => level.yellow().to_string(),
        _ => level.blue().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.00Ki");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00Mi");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00Gi");
    }

    #[test]
    fn test_format_usage_marks_failed_reading() {
        colored::control::set_override(false);
        assert_eq!(format_usage(-1.0), "n/a");
        assert_eq!(format_usage(42.26), "42.3%");
    }
}
