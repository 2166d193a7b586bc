//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/icalsync/config.toml` by default. Command-line flags override
//! file values.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use icalsync_core::{DEFAULT_IMPORT_MARKER, TracingConfig, TracingOutputFormat};
use icalsync_engine::SyncConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::cli::{CalendarArgs, Cli, PurgeArgs, SyncArgs};
use crate::error::{ClientError, ClientResult};
use crate::filters::TitleFilter;

// ---------------------------------------------------------------------------
// AppConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for icalsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Feed settings.
    pub feed: FeedSettings,

    /// Target calendar settings.
    pub calendar: CalendarSettings,

    /// Google Calendar settings.
    #[cfg(feature = "google")]
    pub google: Option<GoogleSettings>,

    /// Logging settings.
    pub logging: LoggingSettings,

    /// Feed filters.
    pub filters: FilterSettings,
}

/// The iCal feed to mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Feed URL (`http`, `https` or `webcal`).
    pub url: Option<String>,

    /// Only mirror events starting within this many days; 0 means unbounded.
    pub days_to_sync: u32,

    /// Namespace prefix of the event ids this tool manages.
    pub event_id_prefix: String,

    /// Text appended to every mirrored description.
    pub import_marker: String,

    /// Feed request timeout in seconds.
    pub timeout: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: None,
            days_to_sync: 0,
            event_id_prefix: String::new(),
            import_marker: DEFAULT_IMPORT_MARKER.to_string(),
            timeout: 60,
        }
    }
}

/// The calendar events are mirrored into.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar id.
    pub id: String,

    /// Pause after each write, in milliseconds.
    pub api_delay_ms: u64,

    /// Read feed values without a zone as calendar-local wall clock.
    pub replace_utc: bool,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            id: "primary".to_string(),
            api_delay_ms: 100,
            replace_utc: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,

    /// Default level when `RUST_LOG` is unset.
    pub level: String,

    /// Output format: pretty, compact or json.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Feed filter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Only mirror events whose title matches one of these regexes.
    pub include_titles: Vec<String>,

    /// Skip events whose title matches one of these regexes.
    pub exclude_titles: Vec<String>,

    /// Skip all-day events.
    pub skip_all_day: bool,
}

impl AppConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("icalsync")
    }

    /// Builds the tracing setup from the file and global flags.
    pub fn tracing_config(&self, cli: &Cli) -> ClientResult<TracingConfig> {
        let mut config = if cli.debug {
            TracingConfig::cli_debug()
        } else {
            let level = self
                .logging
                .level
                .parse::<Level>()
                .map_err(|_| ClientError::Config(format!("invalid log level '{}'", self.logging.level)))?;
            TracingConfig::default().with_level(level)
        };

        let format = cli.log_format.as_deref().unwrap_or(&self.logging.format);
        config = config.with_format(
            format
                .parse::<TracingOutputFormat>()
                .map_err(ClientError::Config)?,
        );

        if let Some(path) = cli.log_file.as_ref().or(self.logging.file.as_ref()) {
            config = config.with_log_file(path);
        }
        Ok(config)
    }

    /// Merges the file settings with `sync` flags.
    pub fn sync_config(&self, args: &SyncArgs) -> ClientResult<SyncConfig> {
        let feed_url = args
            .feed_url
            .clone()
            .or_else(|| self.feed.url.clone())
            .ok_or_else(|| {
                ClientError::Config(format!(
                    "no feed URL. Set [feed] url in {} or pass --feed-url",
                    Self::default_path().display()
                ))
            })?;

        let mut config = self
            .calendar_config(&args.calendar, feed_url)
            .with_horizon_days(args.days_to_sync.unwrap_or(self.feed.days_to_sync))
            .with_replace_utc(self.calendar.replace_utc && !args.no_replace_utc);
        config.normalize.import_marker = self.feed.import_marker.clone();

        config
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Merges the file settings with `purge` flags.
    pub fn purge_config(&self, args: &PurgeArgs) -> ClientResult<SyncConfig> {
        let feed_url = self.feed.url.clone().unwrap_or_default();
        Ok(self.calendar_config(&args.calendar, feed_url))
    }

    fn calendar_config(&self, args: &CalendarArgs, feed_url: String) -> SyncConfig {
        let calendar_id = args
            .calendar_id
            .clone()
            .unwrap_or_else(|| self.calendar.id.clone());
        let prefix = args
            .prefix
            .clone()
            .unwrap_or_else(|| self.feed.event_id_prefix.clone());
        let delay = args.api_delay_ms.unwrap_or(self.calendar.api_delay_ms);

        SyncConfig::new(feed_url, calendar_id)
            .with_prefix(prefix)
            .with_api_delay(Duration::from_millis(delay))
            .with_dry_run(args.dry_run)
    }

    /// Builds the title filter from the file and `sync` flags.
    ///
    /// Patterns given on the command line are added to the configured ones.
    pub fn title_filter(&self, args: &SyncArgs) -> ClientResult<TitleFilter> {
        let include: Vec<String> = self
            .filters
            .include_titles
            .iter()
            .chain(&args.include_title)
            .cloned()
            .collect();
        let exclude: Vec<String> = self
            .filters
            .exclude_titles
            .iter()
            .chain(&args.exclude_title)
            .cloned()
            .collect();

        TitleFilter::new(&include, &exclude)
            .map(|f| f.with_skip_all_day(self.filters.skip_all_day))
            .map_err(ClientError::Config)
    }

    /// Checks every setting without touching the network.
    pub fn validate(&self) -> ClientResult<()> {
        if self.calendar.id.trim().is_empty() {
            return Err(ClientError::Config("[calendar] id must not be empty".to_string()));
        }
        self.logging
            .level
            .parse::<Level>()
            .map_err(|_| ClientError::Config(format!("invalid log level '{}'", self.logging.level)))?;
        self.logging
            .format
            .parse::<TracingOutputFormat>()
            .map_err(ClientError::Config)?;
        TitleFilter::new(&self.filters.include_titles, &self.filters.exclude_titles)
            .map_err(ClientError::Config)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings (in config.toml, including credentials)
// ---------------------------------------------------------------------------

/// Google Calendar settings.
///
/// Credentials (`client_id`, `client_secret`) are stored inline and support
/// secret references (`pass::…`, `env::…`).
#[cfg(feature = "google")]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to service configuration.
    ///
    /// Resolves credentials (expanding `pass::` / `env::` references) and
    /// builds a `GoogleConfig`.
    pub fn to_provider_config(
        &self,
    ) -> Result<icalsync_providers::google::GoogleConfig, String> {
        use icalsync_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(|e| e.to_string())?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        Ok(config)
    }

    /// Resolves Google OAuth credentials from inline fields.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> Result<icalsync_providers::google::OAuthCredentials, String> {
        self.resolve_credentials_with(|var| std::env::var(var).ok())
    }

    /// Like [`Self::resolve_credentials`], reading `env::` references
    /// through `lookup`.
    pub(crate) fn resolve_credentials_with<F>(
        &self,
        lookup: F,
    ) -> Result<icalsync_providers::google::OAuthCredentials, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        use icalsync_providers::google::OAuthCredentials;

        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: icalsync auth google --credentials-file <path>",
                AppConfig::default_path().display()
            )
        })?;

        let raw_secret = self.client_secret.as_deref().ok_or_else(|| {
            "client_secret is missing from [google] section in config.toml".to_string()
        })?;

        let resolved_id = crate::secret::resolve_with(raw_id, &lookup)
            .map_err(|e| format!("failed to resolve client_id: {}", e))?;
        let resolved_secret = crate::secret::resolve_with(raw_secret, &lookup)
            .map_err(|e| format!("failed to resolve client_secret: {}", e))?;

        Ok(OAuthCredentials::new(resolved_id, resolved_secret))
    }

    /// Returns a copy safe to print: plain-text secrets are masked.
    pub fn redacted(&self) -> Self {
        Self {
            client_secret: self.client_secret.as_deref().map(crate::secret::redact),
            ..self.clone()
        }
    }
}
