use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::bus::{BusEvent, EventBus};
use crate::db::Store;
use crate::intelligence::Analyzer;
use crate::models::shorten_address;
use crate::shutdown::signalled;

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    pub batch_size: i64,
    /// Analyzed wallets above this bet count are no longer refreshed.
    pub max_bet_count: i32,
    /// Delay between consecutive stats lookups.
    pub pacing: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            batch_size: 10,
            max_bet_count: 50,
            pacing: Duration::from_millis(500),
        }
    }
}

/// Tally of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub selected: usize,
    pub refreshed: usize,
    pub fresh: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Periodically re-analyze wallets so stored profiles stay current.
///
/// Wallets in a batch are processed one at a time with `pacing` between
/// lookups. Returns once `shutdown` flips to `true`.
pub async fn run_wallet_refresher(
    analyzer: Arc<Analyzer>,
    store: Arc<dyn Store>,
    bus: EventBus,
    config: RefreshConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        batch_size = config.batch_size,
        max_bet_count = config.max_bet_count,
        "Wallet refresher started"
    );

    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // first tick completes immediately

    loop {
        let stop = tokio::select! {
            _ = signalled(&mut shutdown) => true,
            _ = ticker.tick() => false,
        };
        if stop {
            break;
        }

        let outcome = refresh_batch(&analyzer, store.as_ref(), &bus, &config, &mut shutdown).await;
        if outcome.cancelled {
            break;
        }
    }

    tracing::info!("Wallet refresher stopped");
}

/// Refresh one batch of wallets, oldest-analysis first.
pub async fn refresh_batch(
    analyzer: &Analyzer,
    store: &dyn Store,
    bus: &EventBus,
    config: &RefreshConfig,
    shutdown: &mut watch::Receiver<bool>,
) -> RefreshOutcome {
    let mut outcome = RefreshOutcome::default();

    let addresses = match store
        .get_wallets_for_refresh(config.batch_size, config.max_bet_count)
        .await
    {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(error = %e, "Failed to select wallets for refresh");
            return outcome;
        }
    };
    if addresses.is_empty() {
        return outcome;
    }

    outcome.selected = addresses.len();
    tracing::debug!(count = addresses.len(), "Refreshing wallets");

    for (i, address) in addresses.iter().enumerate() {
        if *shutdown.borrow() {
            outcome.cancelled = true;
            break;
        }

        if i > 0 {
            tokio::select! {
                _ = signalled(shutdown) => {
                    outcome.cancelled = true;
                    break;
                }
                _ = sleep(config.pacing) => {}
            }
        }

        let result = tokio::select! {
            _ = signalled(shutdown) => {
                outcome.cancelled = true;
                break;
            }
            result = analyzer.refresh(address) => result,
        };

        match result {
            Ok(profile) => {
                outcome.refreshed += 1;
                counter!("wallets_refreshed_total").increment(1);

                if profile.is_fresh {
                    outcome.fresh += 1;
                    counter!("fresh_wallets_detected_total").increment(1);
                    tracing::info!(
                        wallet = %shorten_address(address),
                        bet_count = profile.bet_count,
                        join_date = %profile.join_date,
                        level = %profile.freshness_level,
                        "Fresh wallet detected"
                    );
                    bus.publish(BusEvent::FreshWalletDetected(profile));
                }
            }
            Err(e) => {
                outcome.failed += 1;
                tracing::warn!(wallet = %shorten_address(address), error = %e, "Failed to refresh wallet");
            }
        }
    }

    if outcome.cancelled {
        tracing::info!(refreshed = outcome.refreshed, "Wallet refresh interrupted by shutdown");
    }
    outcome
}
