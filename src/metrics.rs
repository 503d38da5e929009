use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const COUNTERS: &[(&str, &str)] = &[
    ("trade_events_total", "Trade events received from the live feed"),
    ("events_admitted_total", "Events that passed the save-filter"),
    ("events_dropped_total", "Events rejected by the save-filter"),
    ("wallet_lookups_total", "Profile-stats lookups attempted"),
    ("wallet_lookup_failures_total", "Profile-stats lookups that failed or timed out"),
    ("wallets_refreshed_total", "Wallets re-analyzed by the background worker"),
    ("fresh_wallets_detected_total", "Refreshes that found a fresh wallet"),
    ("notifications_sent_total", "Alerts delivered"),
    ("notifications_failed_total", "Alerts that failed to deliver"),
    ("notifications_deduplicated_total", "Alerts suppressed by the dedup ledger"),
];

/// Install the Prometheus recorder and pre-register every metric so the
/// scrape payload is complete before the first event.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    for (name, help) in COUNTERS {
        describe_counter!(*name, *help);
        counter!(*name).absolute(0);
    }

    describe_gauge!("wallet_cache_entries", "Profiles held in the analyzer cache");
    gauge!("wallet_cache_entries").set(0.0);

    describe_histogram!(
        "pipeline_latency_seconds",
        metrics::Unit::Seconds,
        "Time from feed receipt to admission decision"
    );
    histogram!("pipeline_latency_seconds").record(0.0);

    Ok(handle)
}
