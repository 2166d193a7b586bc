//! `icalsync purge`.

use icalsync_engine::SyncRunner;
use tracing::warn;

use crate::cli::PurgeArgs;
use crate::config::AppConfig;
use crate::error::ClientResult;

/// Deletes events from the start of today onwards.
///
/// Only events carrying the managed prefix are deleted unless `--all` is set.
pub async fn run(args: PurgeArgs, config: &AppConfig) -> ClientResult<()> {
    let purge_config = config.purge_config(&args)?;
    if args.all {
        warn!(calendar = %purge_config.calendar_id, "purging every event, including ones icalsync did not create");
    }

    let service = super::calendar_service(config)?;
    let runner = SyncRunner::new(purge_config, service);
    let report = runner.purge(args.all).await?;

    super::print_report(
        "purge",
        &report,
        runner.config().dry_run,
        args.calendar.json,
    )
}
