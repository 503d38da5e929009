use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::filter::should_admit;
use crate::bus::{BusEvent, EventBus};
use crate::db::Store;
use crate::intelligence::Analyzer;
use crate::models::{shorten_address, TradeEvent};
use crate::services::settings::SettingsHandle;
use crate::shutdown::signalled;

/// Admission stage between the live feed and everything downstream.
pub struct Pipeline {
    store: Arc<dyn Store>,
    settings: SettingsHandle,
    bus: EventBus,
    analyzer: Arc<Analyzer>,
    enrich_on_ingest: bool,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        settings: SettingsHandle,
        bus: EventBus,
        analyzer: Arc<Analyzer>,
        enrich_on_ingest: bool,
    ) -> Self {
        Self {
            store,
            settings,
            bus,
            analyzer,
            enrich_on_ingest,
        }
    }

    /// Run one event through the save-filter.
    ///
    /// Dropped events produce `None` and touch nothing. Admitted events queue
    /// their wallet for analysis, go out on the bus, and get persisted on a
    /// detached task whose handle is returned. Enrichment on that task only
    /// uses wallets that were already analyzed; it never calls the stats
    /// endpoint.
    pub async fn process(&self, event: TradeEvent) -> Option<JoinHandle<()>> {
        let start = Instant::now();
        counter!("trade_events_total").increment(1);

        let config = self.settings.config_snapshot().await;
        if !config.enabled {
            counter!("events_dropped_total").increment(1);
            return None;
        }

        let filter = self.settings.filter_snapshot().await;
        if !should_admit(&event, &filter, config.thresholds.min_trade_size()) {
            tracing::debug!(
                wallet = %shorten_address(&event.wallet_address),
                notional = %event.notional().round_dp(2),
                "Event below save-filter, dropping"
            );
            counter!("events_dropped_total").increment(1);
            return None;
        }
        counter!("events_admitted_total").increment(1);

        if !event.wallet_address.is_empty() {
            match self.store.save_wallet_address(&event.wallet_address).await {
                Ok(true) => tracing::info!(
                    wallet = %shorten_address(&event.wallet_address),
                    "New wallet queued for analysis"
                ),
                Ok(false) => {}
                Err(e) => tracing::error!(
                    wallet = %shorten_address(&event.wallet_address),
                    error = %e,
                    "Failed to queue wallet"
                ),
            }
        }

        self.bus.publish(BusEvent::QualifyingEvent(event.clone()));

        let store = self.store.clone();
        let analyzer = self.enrich_on_ingest.then(|| self.analyzer.clone());
        let handle = tokio::spawn(async move {
            persist_and_enrich(store, analyzer, event).await;
        });

        histogram!("pipeline_latency_seconds").record(start.elapsed().as_secs_f64());
        Some(handle)
    }
}

async fn persist_and_enrich(store: Arc<dyn Store>, analyzer: Option<Arc<Analyzer>>, mut event: TradeEvent) {
    let id = match store.save_event(&event).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, event = %event, "Failed to persist event");
            return;
        }
    };

    let Some(analyzer) = analyzer else {
        return;
    };
    if analyzer.enrich_from_known(&mut event).await.is_none() {
        return;
    }
    if let Err(e) = store.update_event_enrichment(id, &event).await {
        tracing::error!(error = %e, id, "Failed to store event enrichment");
    }
}

/// Drain the feed channel until it closes or `shutdown` flips.
pub async fn run_pipeline(
    mut rx: mpsc::Receiver<TradeEvent>,
    pipeline: Arc<Pipeline>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("Event pipeline started");

    loop {
        tokio::select! {
            _ = signalled(&mut shutdown) => break,
            next = rx.recv() => match next {
                Some(event) => {
                    pipeline.process(event).await;
                }
                None => {
                    tracing::warn!("Feed channel closed");
                    break;
                }
            },
        }
    }

    tracing::info!("Event pipeline stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::WalletCache;
    use crate::models::{EventFilter, EventType, WalletProfile, WatcherConfig};
    use crate::testkit::{MemoryStore, StubStatsSource};
    use rust_decimal::Decimal;
    use std::time::Duration;

    struct Harness {
        pipeline: Pipeline,
        store: Arc<MemoryStore>,
        source: Arc<StubStatsSource>,
        settings: SettingsHandle,
        bus: EventBus,
    }

    async fn make_harness(enrich: bool) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(StubStatsSource::new());
        let settings = SettingsHandle::load(store.clone(), None).await;
        let analyzer = Arc::new(Analyzer::new(
            source.clone(),
            store.clone(),
            settings.clone(),
            WalletCache::default(),
            Duration::from_secs(10),
        ));
        let bus = EventBus::new(64);
        let pipeline = Pipeline::new(store.clone(), settings.clone(), bus.clone(), analyzer, enrich);
        Harness {
            pipeline,
            store,
            source,
            settings,
            bus,
        }
    }

    fn make_trade(wallet: &str, price: &str, size: &str) -> TradeEvent {
        let mut event = TradeEvent::new(EventType::Trade);
        event.wallet_address = wallet.into();
        event.price = price.into();
        event.size = size.into();
        event.trade_id = format!("{wallet}-{size}");
        event
    }

    #[tokio::test]
    async fn test_admitted_event_is_queued_published_and_persisted() {
        let h = make_harness(false).await;
        let mut rx = h.bus.subscribe();

        let handle = h.pipeline.process(make_trade("0xabc", "0.45", "500")).await;
        handle.expect("event should be admitted").await.unwrap();

        match rx.recv().await.unwrap() {
            BusEvent::QualifyingEvent(e) => assert_eq!(e.wallet_address, "0xabc"),
            other => panic!("unexpected bus event: {other:?}"),
        }
        let wallet = h.store.get_wallet("0xabc").await.unwrap().unwrap();
        assert_eq!(wallet.bet_count, -1);
        assert_eq!(h.store.events().len(), 1);
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_dropped_event_touches_nothing() {
        let h = make_harness(true).await;
        let mut rx = h.bus.subscribe();

        assert!(h.pipeline.process(make_trade("0xabc", "0.01", "10")).await.is_none());

        assert!(rx.try_recv().is_err());
        assert_eq!(h.store.wallet_count(), 0);
        assert!(h.store.events().is_empty());
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_save_filter_min_size_applies() {
        let h = make_harness(false).await;
        h.settings
            .update_filter(EventFilter {
                min_size: Decimal::from(300),
                ..EventFilter::default()
            })
            .await
            .unwrap();

        assert!(h.pipeline.process(make_trade("0xabc", "0.45", "500")).await.is_none());
        assert!(h.pipeline.process(make_trade("0xabc", "0.45", "1000")).await.is_some());
    }

    #[tokio::test]
    async fn test_disabled_watcher_drops_everything() {
        let h = make_harness(false).await;
        h.settings
            .update_config(WatcherConfig {
                enabled: false,
                ..WatcherConfig::default()
            })
            .await
            .unwrap();

        assert!(h.pipeline.process(make_trade("0xabc", "0.5", "100000")).await.is_none());
    }

    #[tokio::test]
    async fn test_enrichment_backfills_stored_event() {
        let h = make_harness(true).await;
        let mut known = WalletProfile::unknown("0xfresh", 20);
        known.bet_count = 2;
        h.store.save_wallet(&known).await.unwrap();

        let handle = h.pipeline.process(make_trade("0xfresh", "0.5", "30000")).await;
        handle.unwrap().await.unwrap();

        let stored = &h.store.events()[0];
        assert!(stored.is_fresh_wallet);
        assert!((stored.risk_score - 0.9).abs() < 1e-9);
        assert!(stored
            .risk_signals
            .iter()
            .any(|s| s.contains("Large Position")));
        assert_eq!(stored.wallet_profile.as_ref().unwrap().bet_count, 2);
        assert_eq!(h.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_unseen_wallets_are_not_looked_up_on_ingest() {
        let h = make_harness(true).await;
        for i in 0..8 {
            let wallet = format!("0xnew{i}");
            h.source.set_trades(&wallet, 0);
            let handle = h.pipeline.process(make_trade(&wallet, "0.5", "30000")).await;
            handle.unwrap().await.unwrap();
        }

        assert_eq!(h.source.calls(), 0);
        assert_eq!(h.store.events().len(), 8);
        assert!(h.store.events().iter().all(|e| !e.is_fresh_wallet));
        assert_eq!(
            h.store.get_wallets_for_refresh(10, 50).await.unwrap().len(),
            8
        );
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_stop_publishing() {
        let h = make_harness(true).await;
        h.store.set_failing(true);
        let mut rx = h.bus.subscribe();

        let handle = h.pipeline.process(make_trade("0xabc", "0.5", "1000")).await;
        handle.unwrap().await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), BusEvent::QualifyingEvent(_)));
        assert!(h.store.events().is_empty());
    }

    #[tokio::test]
    async fn test_run_pipeline_stops_when_channel_closes() {
        let h = make_harness(false).await;
        let store = h.store.clone();
        let (tx, rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = watch::channel(false);

        tx.send(make_trade("0xabc", "0.5", "1000")).await.unwrap();
        drop(tx);
        tokio::spawn(run_pipeline(rx, Arc::new(h.pipeline), stop_rx))
            .await
            .unwrap();

        assert_eq!(store.wallet_count(), 1);
    }

    #[tokio::test]
    async fn test_spawned_pipeline_stops_on_shutdown() {
        let h = make_harness(false).await;
        let (_tx, rx) = mpsc::channel::<TradeEvent>(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(run_pipeline(rx, Arc::new(h.pipeline), stop_rx));
        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
