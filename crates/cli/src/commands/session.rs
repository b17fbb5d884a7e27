//! Login and token handling

use anyhow::{Context, Result};
use serde_json::json;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::{print_info, print_json, print_success, OutputFormat};

/// Log in, print the token and optionally remember it for later commands
pub async fn login(
    client: &ApiClient,
    username: Option<&str>,
    password: Option<&str>,
    save: bool,
    format: OutputFormat,
) -> Result<()> {
    let (username, password) = username
        .zip(password)
        .context("--username and --password are required to log in")?;

    let token = client.login(username, password).await?;

    if save {
        let config = Config {
            api_url: Some(client.base_url().to_string()),
            token: Some(token.clone()),
        };
        let path = config.save()?;
        if matches!(format, OutputFormat::Table) {
            print_info(&format!("Token saved to {}", path.display()));
        }
    }

    match format {
        OutputFormat::Table => {
            print_success(&format!("Logged in as {}", username));
            println!("{}", token);
        }
        OutputFormat::Json => print_json(&json!({ "access_token": token })),
    }

    Ok(())
}

/// Pick the token for an authenticated command
///
/// An explicit token wins, then a fresh login with credentials, then the
/// token saved by `hwmon login`.
pub async fn authenticate(
    client: &mut ApiClient,
    token: Option<&str>,
    username: Option<&str>,
    password: Option<&str>,
    saved: &Config,
) -> Result<()> {
    let token = match (token, username.zip(password)) {
        (Some(token), _) => token.to_string(),
        (None, Some((username, password))) => client.login(username, password).await?,
        (None, None) => saved
            .token
            .clone()
            .context("Not logged in: run `hwmon login` or pass --token")?,
    };
    client.set_token(token);
    Ok(())
}
