use std::net::SocketAddr;

// ── Rule outcomes ───────────────────────────────────────────────

/// Counter: unused-subscription notifications handed to the notifier.
pub const UNUSED_NOTIFICATIONS_TOTAL: &str = "lessonbook_unused_notifications_total";

/// Counter: unused-subscription notifications the notifier refused.
pub const UNUSED_NOTIFICATION_FAILURES_TOTAL: &str = "lessonbook_unused_notification_failures_total";

/// Counter: entries marked finished by the completion sweep.
pub const ENTRIES_FINISHED_TOTAL: &str = "lessonbook_entries_finished_total";

/// Counter: rejected writes. Labels: reason.
pub const VALIDATION_FAILURES_TOTAL: &str = "lessonbook_validation_failures_total";

// ── Timings ─────────────────────────────────────────────────────

/// Histogram: duration of one periodic sweep in seconds. Labels: sweep.
pub const SWEEP_DURATION_SECONDS: &str = "lessonbook_sweep_duration_seconds";

/// Histogram: journal append + fsync duration in seconds.
pub const JOURNAL_APPEND_DURATION_SECONDS: &str = "lessonbook_journal_append_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
