//! Command implementations.

#[cfg(feature = "google")]
pub mod auth;
pub mod config;
pub mod purge;
pub mod sync;

use std::sync::Arc;

use icalsync_engine::ReconcileReport;
use icalsync_providers::CalendarService;

use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};

/// Opens the configured calendar service.
#[cfg(feature = "google")]
pub(crate) fn calendar_service(config: &AppConfig) -> ClientResult<Arc<dyn CalendarService>> {
    use icalsync_providers::google::GoogleCalendar;

    let settings = config.google.as_ref().ok_or_else(|| {
        ClientError::Config(format!(
            "no [google] section in {}. Run 'icalsync auth google' first",
            AppConfig::default_path().display()
        ))
    })?;
    let provider_config = settings.to_provider_config().map_err(ClientError::Config)?;

    let service = GoogleCalendar::new(provider_config)?;
    if !service.is_authenticated() {
        return Err(ClientError::AuthRequired(
            "no Google tokens stored, run 'icalsync auth google'".to_string(),
        ));
    }
    if service.needs_reauth() {
        tracing::warn!("stored Google tokens lack the calendar scope, run 'icalsync auth google --force'");
    }
    Ok(Arc::new(service))
}

/// Opens the configured calendar service.
#[cfg(not(feature = "google"))]
pub(crate) fn calendar_service(_config: &AppConfig) -> ClientResult<Arc<dyn CalendarService>> {
    Err(ClientError::Config(
        "icalsync was built without a calendar backend (enable the 'google' feature)".to_string(),
    ))
}

/// Prints a run report as text or JSON.
pub(crate) fn print_report(
    label: &str,
    report: &ReconcileReport,
    dry_run: bool,
    json: bool,
) -> ClientResult<()> {
    if json {
        let out = serde_json::json!({
            "command": label,
            "dry_run": dry_run,
            "report": report,
        });
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| ClientError::Config(format!("failed to serialize report: {}", e)))?;
        println!("{}", text);
    } else if dry_run {
        println!("{} (dry run): {}", label, report);
    } else {
        println!("{}: {}", label, report);
    }
    Ok(())
}
