//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, FromArgMatches, Parser, Subcommand};

/// icalsync - Mirror an iCal feed into a Google calendar
#[derive(Debug, Parser)]
#[command(name = "icalsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ICALSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, env = "ICALSYNC_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mirror the feed into the calendar (default)
    Sync(SyncArgs),

    /// Delete events from the start of today onwards
    Purge(PurgeArgs),

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options shared by commands that talk to the calendar.
#[derive(Debug, Clone, Default, Args)]
pub struct CalendarArgs {
    /// Target calendar id
    #[arg(long, env = "ICALSYNC_CALENDAR_ID")]
    pub calendar_id: Option<String>,

    /// Namespace prefix of managed event ids
    #[arg(long)]
    pub prefix: Option<String>,

    /// Pause after each calendar write, in milliseconds
    #[arg(long)]
    pub api_delay_ms: Option<u64>,

    /// Log decisions without changing the calendar
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Options of `icalsync sync`.
#[derive(Debug, Clone, Default, Args)]
pub struct SyncArgs {
    /// iCal feed URL
    #[arg(long, env = "ICALSYNC_FEED_URL")]
    pub feed_url: Option<String>,

    /// Only mirror events starting within this many days (0 = unbounded)
    #[arg(long)]
    pub days_to_sync: Option<u32>,

    /// Convert UTC feed values instead of reading them as calendar-local
    #[arg(long)]
    pub no_replace_utc: bool,

    /// Only mirror events whose title matches this regex (can be repeated)
    #[arg(long, action = clap::ArgAction::Append)]
    pub include_title: Vec<String>,

    /// Skip events whose title matches this regex (can be repeated)
    #[arg(long, action = clap::ArgAction::Append)]
    pub exclude_title: Vec<String>,

    #[command(flatten)]
    pub calendar: CalendarArgs,
}

impl SyncArgs {
    /// Options of a bare `icalsync` run: no flags, environment fallbacks only.
    pub fn from_env() -> Self {
        Self::from_bare_args(std::iter::empty::<String>())
    }

    fn bare_command() -> clap::Command {
        Self::augment_args(clap::Command::new("sync")).no_binary_name(true)
    }

    fn from_bare_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::bare_command()
            .try_get_matches_from(args)
            .ok()
            .and_then(|matches| Self::from_arg_matches(&matches).ok())
            .unwrap_or_default()
    }
}

/// Options of `icalsync purge`.
#[derive(Debug, Clone, Default, Args)]
pub struct PurgeArgs {
    /// Also delete events outside the managed prefix
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub calendar: CalendarArgs,
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    #[cfg(feature = "google")]
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
