//! Configuration commands.

use std::path::Path;

use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &AppConfig, path: &Path) -> ClientResult<()> {
    let toml_str = render(config)?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Renders the configuration with plain-text secrets masked.
fn render(config: &AppConfig) -> ClientResult<String> {
    #[cfg(feature = "google")]
    let config = &AppConfig {
        google: config.google.as_ref().map(|g| g.redacted()),
        ..config.clone()
    };

    toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
pub fn validate(config: &AppConfig) -> ClientResult<()> {
    config.validate()?;

    if config.feed.url.is_none() {
        println!("warning: no [feed] url set, 'icalsync sync' needs --feed-url");
    }

    #[cfg(feature = "google")]
    if let Some(ref google) = config.google
        && (google.client_id.is_some() || google.client_secret.is_some())
    {
        google.resolve_credentials().map_err(|e| {
            ClientError::Config(format!("invalid Google credentials: {}", e))
        })?;
        println!("Google credentials are valid.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
