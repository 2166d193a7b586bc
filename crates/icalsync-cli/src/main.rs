//! icalsync CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use icalsync_cli::cli::{AuthProvider, Cli, Command, ConfigAction, SyncArgs};
use icalsync_cli::commands;
use icalsync_cli::config::AppConfig;
use icalsync_cli::error::{ClientError, ClientResult};
use icalsync_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = if cli.config.is_some() {
        AppConfig::load_from(&config_path).map_err(ClientError::Config)?
    } else {
        AppConfig::load().map_err(ClientError::Config)?
    };

    let tracing_config = config.tracing_config(&cli)?;
    init_tracing(tracing_config).map_err(|e| ClientError::Config(e.to_string()))?;

    match cli.command {
        Some(Command::Sync(args)) => commands::sync::run(args, &config).await,
        Some(Command::Purge(args)) => commands::purge::run(args, &config).await,
        Some(Command::Auth { provider }) => match provider {
            #[cfg(feature = "google")]
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                commands::auth::google(
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    &config,
                    &config_path,
                )
                .await
            }
        },
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        None => commands::sync::run(SyncArgs::from_env(), &config).await,
    }
}
