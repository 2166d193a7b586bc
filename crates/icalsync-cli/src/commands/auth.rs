//! `icalsync auth google`: one-time consent so unattended syncs can write.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::{AppConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Authorizes icalsync against the user's Google Calendar.
///
/// Client credentials given as flags are saved into `config_path`, since
/// every later `sync` needs them to refresh the token.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &AppConfig,
    config_path: &Path,
) -> ClientResult<()> {
    use icalsync_providers::google::{GoogleCalendar, GoogleConfig, OAuthCredentials};

    let (client_id, client_secret, source) = resolve_google_credentials(
        client_id,
        client_secret,
        credentials_file,
        config.google.as_ref(),
    )?;

    let credentials = OAuthCredentials::new(&client_id, &client_secret);
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let mut google_config = GoogleConfig::new(credentials);
    if let Some(path) = config.google.as_ref().and_then(|g| g.token_path.as_ref())
    {
        google_config = google_config.with_token_path(path);
    }

    let service = GoogleCalendar::new(google_config)?;

    if service.is_authenticated() && !service.needs_reauth() && !force {
        save_credentials(config_path, &client_id, &client_secret, &source);
        println!("Google Calendar access is already set up (use --force to redo it).");
        return Ok(());
    }

    println!("Opening a browser to grant icalsync access to your calendars.");
    println!("If nothing opens, copy the URL printed below into a browser.");
    println!();

    service.authenticate().await?;

    save_credentials(config_path, &client_id, &client_secret, &source);

    info!("Google Calendar access granted");
    println!();
    println!("Done. Run 'icalsync sync' to mirror your feed.");

    Ok(())
}

#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// Flags or `--credentials-file`: not persisted yet.
    Cli,
    /// Already in `config.toml`.
    Config,
}

/// Persists flag-supplied credentials. Failure only costs a warning.
fn save_credentials(
    config_path: &Path,
    client_id: &str,
    client_secret: &str,
    source: &CredentialSource,
) {
    if *source == CredentialSource::Config {
        return;
    }

    match write_credentials(config_path, client_id, client_secret) {
        Ok(()) => {
            println!("Client credentials written to {}", config_path.display());
        }
        Err(e) => warn!("could not save client credentials: {}", e),
    }
}

/// Sets `[google] client_id` and `client_secret` in `config_path`.
///
/// The rest of the file, comments included, is kept as is.
fn write_credentials(config_path: &Path, client_id: &str, client_secret: &str) -> Result<(), String> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)
            .map_err(|e| format!("could not read {}: {}", config_path.display(), e))?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| format!("could not parse {}: {}", config_path.display(), e))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"]
        .as_table_mut()
        .ok_or_else(|| "[google] is not a table".to_string())?;
    google["client_id"] = toml_edit::value(client_id);
    google["client_secret"] = toml_edit::value(client_secret);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("could not create {}: {}", parent.display(), e))?;
    }

    std::fs::write(config_path, doc.to_string())
        .map_err(|e| format!("could not write {}: {}", config_path.display(), e))
}

/// Picks the OAuth client: both flags, then `--credentials-file`, then the
/// `[google]` section (whose secret may be an `env::`/`pass::` reference).
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(String, String, CredentialSource)> {
    use icalsync_providers::google::OAuthCredentials;

    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((id.clone(), secret.clone(), CredentialSource::Cli));
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Cli));
    }

    if let Some(google) = config_google
        && google.client_id.is_some()
        && google.client_secret.is_some()
    {
        let creds = google.resolve_credentials().map_err(|e| {
            ClientError::Config(format!(
                "failed to resolve Google credentials from config: {}",
                e
            ))
        })?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Config));
    }

    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    Err(ClientError::Config(format!(
        "no Google OAuth client configured; set [google] client_id and client_secret in {}, \
         pass --client-id/--client-secret, or pass --credentials-file",
        AppConfig::default_path().display()
    )))
}
