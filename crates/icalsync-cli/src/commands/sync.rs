//! `icalsync sync`.

use std::sync::Arc;
use std::time::Duration;

use icalsync_engine::SyncRunner;
use icalsync_providers::FeedClient;
use tracing::debug;

use crate::cli::SyncArgs;
use crate::config::AppConfig;
use crate::error::ClientResult;

/// Mirrors the feed into the calendar once.
pub async fn run(args: SyncArgs, config: &AppConfig) -> ClientResult<()> {
    let sync_config = config.sync_config(&args)?;
    let filter = config.title_filter(&args)?;
    if !filter.is_empty() {
        debug!(?filter, "applying title filter");
    }

    let service = super::calendar_service(config)?;
    let feed = FeedClient::new(Duration::from_secs(config.feed.timeout))?;

    let runner = SyncRunner::new(sync_config, service).with_hooks(Arc::new(filter));
    let report = runner.run(&feed).await?;

    super::print_report(
        "sync",
        &report,
        runner.config().dry_run,
        args.calendar.json,
    )
}
