//! Prometheus metrics endpoint.

use crate::server::ClubServer;
use crate::storage::RecordStorage;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(server): Extension<Arc<ClubServer>>) -> impl IntoResponse {
    let m = server.metrics();

    // Gauges: current state
    let subscribers = server.ws_client_count();
    let records = server.storage().total_records().await.unwrap_or(0);

    // Counters: monotonic since startup
    let lists = m.lists_total.load(Ordering::Relaxed);
    let creates = m.creates_total.load(Ordering::Relaxed);
    let updates = m.updates_total.load(Ordering::Relaxed);
    let deletes = m.deletes_total.load(Ordering::Relaxed);
    let syncs = m.snapshot_syncs_total.load(Ordering::Relaxed);
    let events = m.events_broadcast_total.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP clubsync_subscribers_active Number of connected WebSocket subscribers
# TYPE clubsync_subscribers_active gauge
clubsync_subscribers_active {subscribers}

# HELP clubsync_records Number of records in storage
# TYPE clubsync_records gauge
clubsync_records {records}

# HELP clubsync_info Server information
# TYPE clubsync_info gauge
clubsync_info{{version="{version}"}} 1

# HELP clubsync_lists_total Total list requests handled
# TYPE clubsync_lists_total counter
clubsync_lists_total {lists}

# HELP clubsync_creates_total Total create requests handled
# TYPE clubsync_creates_total counter
clubsync_creates_total {creates}

# HELP clubsync_updates_total Total update requests handled
# TYPE clubsync_updates_total counter
clubsync_updates_total {updates}

# HELP clubsync_deletes_total Total delete requests handled
# TYPE clubsync_deletes_total counter
clubsync_deletes_total {deletes}

# HELP clubsync_snapshot_syncs_total Total wholesale snapshot replacements
# TYPE clubsync_snapshot_syncs_total counter
clubsync_snapshot_syncs_total {syncs}

# HELP clubsync_events_broadcast_total Total change events broadcast
# TYPE clubsync_events_broadcast_total counter
clubsync_events_broadcast_total {events}

# HELP clubsync_errors_total Total requests rejected with an application error
# TYPE clubsync_errors_total counter
clubsync_errors_total {errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    #[test]
    fn prometheus_format_is_valid() {
        // Verify the format strings are valid
        let sample = format!(
            "# TYPE clubsync_subscribers_active gauge\nclubsync_subscribers_active {}",
            42
        );
        assert!(sample.contains("gauge"));
        assert!(sample.contains("42"));
    }
}
