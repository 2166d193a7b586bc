//! Target collection: the current state of the remote calendar.

use icalsync_core::{SyncWindow, TargetEvent};
use icalsync_providers::{CalendarService, ListQuery, ProviderResult};
use tracing::{debug, info};

/// Builds the `events.list` query used for every page of a window.
///
/// Cancelled events are included so the reconciler can tell "already
/// deleted" from "never existed".
pub fn window_query(window: &SyncWindow) -> ListQuery {
    ListQuery::new(window.from)
        .with_time_max(window.to)
        .with_show_deleted(true)
        .with_single_events_by_start()
}

/// Lists every event of `calendar_id` in `window`, following pagination.
pub async fn collect_targets(
    service: &dyn CalendarService,
    calendar_id: &str,
    window: &SyncWindow,
) -> ProviderResult<Vec<TargetEvent>> {
    let query = window_query(window);
    let mut events = Vec::new();
    let mut page_token = None;
    let mut pages = 0usize;

    loop {
        let page_query = query.page(page_token.take());
        let page = service.list_events_page(calendar_id, &page_query).await?;
        pages += 1;
        events.extend(page.items);

        match page.next_page_token {
            Some(token) => {
                debug!(page = pages, total = events.len(), "Fetching next page of calendar events");
                page_token = Some(token);
            }
            None => break,
        }
    }

    info!(
        count = events.len(),
        pages,
        calendar = calendar_id,
        "Found upcoming events in {} calendar",
        service.name()
    );
    Ok(events)
}
