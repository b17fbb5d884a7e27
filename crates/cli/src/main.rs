//! Hardware Monitor CLI
//!
//! A command-line tool for reading host statistics, health and the
//! mission log from a running hardware monitor.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{mission, session, stats};

const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Hardware Monitor CLI
#[derive(Parser)]
#[command(name = "hwmon")]
#[command(author, version, about = "CLI for the Hardware Monitor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (defaults to the saved login, then http://localhost:5000)
    #[arg(long, env = "HWMON_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token to use instead of the saved one
    #[arg(long, env = "HWMON_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username for login
    #[arg(long, short, env = "HWMON_USERNAME")]
    pub username: Option<String>,

    /// Password for login
    #[arg(long, short, env = "HWMON_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and save the access token
    Login {
        /// Print the token without saving it
        #[arg(long)]
        no_save: bool,
    },

    /// Show CPU, memory, disk and network usage
    Stats,

    /// Show host and process health
    Health,

    /// Mission status and mission log
    #[command(subcommand)]
    Mission(MissionCommands),
}

#[derive(Subcommand)]
pub enum MissionCommands {
    /// Show mission status and alert level
    Status,

    /// Show the mission log
    Logs {
        /// Only show the last N entries
        #[arg(long, short = 'n')]
        tail: Option<usize>,
    },

    /// Add an entry to the mission log
    Log {
        /// Log level (INFO, WARNING, ERROR)
        #[arg(long, short, default_value = "INFO")]
        level: String,

        /// Message to record
        #[arg(long, short)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let saved = match config::Config::load() {
        Ok(saved) => saved,
        Err(e) => {
            output::print_warning(&format!("Ignoring saved session: {:#}", e));
            config::Config::default()
        }
    };

    let api_url = cli
        .api_url
        .clone()
        .or_else(|| saved.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let mut client = client::ApiClient::new(&api_url)?;

    let username = cli.username.as_deref();
    let password = cli.password.as_deref();

    if let Commands::Login { no_save } = &cli.command {
        return session::login(&client, username, password, !no_save, cli.format).await;
    }

    session::authenticate(&mut client, cli.token.as_deref(), username, password, &saved).await?;

    match &cli.command {
        Commands::Login { .. } => {}
        Commands::Stats => stats::show_stats(&client, cli.format).await?,
        Commands::Health => stats::show_health(&client, cli.format).await?,
        Commands::Mission(mission_cmd) => match mission_cmd {
            MissionCommands::Status => mission::show_status(&client, cli.format).await?,
            MissionCommands::Logs { tail } => {
                mission::show_logs(&client, *tail, cli.format).await?
            }
            MissionCommands::Log { level, message } => {
                mission::add_log(&client, level, message, cli.format).await?
            }
        },
    }

    Ok(())
}
