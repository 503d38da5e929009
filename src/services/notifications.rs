use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::messenger::{Messenger, NotifyError};
use super::settings::{SettingsError, SettingsHandle};
use crate::bus::BusEvent;
use crate::db::Store;
use crate::models::{
    shorten_address, NotificationConfig, NotificationContent, NotificationKind, TradeEvent,
    WalletProfile,
};

/// Subscribes to bus signals and sends at most one alert per logical item.
///
/// The ledger entry is written before delivery starts, so a failed or
/// interrupted send is never retried.
pub struct NotificationService {
    store: Arc<dyn Store>,
    settings: SettingsHandle,
    messenger: Arc<dyn Messenger>,
    delivery_timeout: Duration,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn Store>,
        settings: SettingsHandle,
        messenger: Arc<dyn Messenger>,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            store,
            settings,
            messenger,
            delivery_timeout,
        }
    }

    /// Consume bus events until shutdown or until the bus closes.
    pub async fn run(
        self: Arc<Self>,
        mut rx: broadcast::Receiver<BusEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!("Notification service started");

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                msg = rx.recv() => match msg {
                    Ok(BusEvent::QualifyingEvent(event)) => {
                        self.handle_qualifying_event(&event).await;
                    }
                    Ok(BusEvent::FreshWalletDetected(profile)) => {
                        self.handle_fresh_wallet(&profile).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Notification service lagged behind the bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!("Event bus closed");
                        break;
                    }
                }
            }
        }

        tracing::info!("Notification service stopped");
    }

    /// Big-trade alert for an admitted event. Returns the delivery task
    /// when a message was dispatched.
    pub async fn handle_qualifying_event(&self, event: &TradeEvent) -> Option<JoinHandle<()>> {
        let config = self.settings.notification_snapshot().await;
        if !config.enabled || !config.notify_big_trades {
            return None;
        }

        let key = event.dedup_key();
        let content = NotificationContent::big_trade(event);
        self.dispatch_once(config, NotificationKind::BigTrade, &key, content)
            .await
    }

    /// Fresh-wallet alert, deduplicated by address.
    pub async fn handle_fresh_wallet(&self, profile: &WalletProfile) -> Option<JoinHandle<()>> {
        let config = self.settings.notification_snapshot().await;
        if !config.enabled || !config.notify_fresh_wallets {
            return None;
        }

        let content = NotificationContent::fresh_wallet(profile);
        self.dispatch_once(config, NotificationKind::FreshWallet, &profile.address, content)
            .await
    }

    /// Send the test message and wait for the outcome.
    pub async fn send_test(&self) -> Result<(), NotifyError> {
        let config = self.settings.notification_snapshot().await;
        if !config.enabled {
            return Err(NotifyError::NotEnabled);
        }
        if !config.is_configured() {
            return Err(NotifyError::NotConfigured);
        }

        let content = NotificationContent::test();
        tokio::time::timeout(
            self.delivery_timeout,
            self.messenger.send(&config, &content.message),
        )
        .await
        .unwrap_or(Err(NotifyError::Timeout))
    }

    pub async fn config(&self) -> NotificationConfig {
        self.settings.notification_snapshot().await
    }

    pub async fn update_config(&self, config: NotificationConfig) -> Result<(), SettingsError> {
        let (enabled, big_trades, fresh_wallets) =
            (config.enabled, config.notify_big_trades, config.notify_fresh_wallets);
        self.settings.update_notification_config(config).await?;
        tracing::info!(enabled, big_trades, fresh_wallets, "Notification config updated");
        Ok(())
    }

    async fn dispatch_once(
        &self,
        config: NotificationConfig,
        kind: NotificationKind,
        item_id: &str,
        content: NotificationContent,
    ) -> Option<JoinHandle<()>> {
        if !config.is_configured() {
            tracing::debug!(kind = %kind, "Notifier not configured, skipping");
            return None;
        }

        match self.store.has_notified(kind, item_id).await {
            Ok(true) => {
                counter!("notifications_deduplicated_total").increment(1);
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(kind = %kind, item = %item_id, error = %e, "Failed to check notification ledger");
                return None;
            }
        }

        match self.store.mark_notified(kind, item_id).await {
            Ok(true) => {}
            Ok(false) => {
                // Another handler claimed the item between check and mark.
                counter!("notifications_deduplicated_total").increment(1);
                return None;
            }
            Err(e) => {
                tracing::error!(kind = %kind, item = %item_id, error = %e, "Failed to mark item as notified");
                return None;
            }
        }

        let messenger = self.messenger.clone();
        let timeout = self.delivery_timeout;
        let item = shorten_address(item_id);

        Some(tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, messenger.send(&config, &content.message))
                .await
                .unwrap_or(Err(NotifyError::Timeout));

            match result {
                Ok(()) => {
                    counter!("notifications_sent_total", "kind" => kind.as_str()).increment(1);
                    tracing::info!(kind = %kind, item = %item, "Notification sent");
                }
                Err(e) => {
                    counter!("notifications_failed_total", "kind" => kind.as_str()).increment(1);
                    tracing::warn!(kind = %kind, item = %item, error = %e, "Failed to send notification");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, FreshnessLevel, Side};
    use crate::testkit::{MemoryStore, RecordingMessenger};

    struct Harness {
        service: Arc<NotificationService>,
        store: Arc<MemoryStore>,
        messenger: Arc<RecordingMessenger>,
    }

    fn enabled_config() -> NotificationConfig {
        NotificationConfig {
            enabled: true,
            telegram_bot_token: "123:abc".into(),
            telegram_chat_ids: vec!["42".into()],
            notify_big_trades: true,
            notify_fresh_wallets: true,
            ..NotificationConfig::default()
        }
    }

    async fn make_harness(config: NotificationConfig) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsHandle::load(store.clone(), Some(config)).await;
        let messenger = Arc::new(RecordingMessenger::new());
        let service = Arc::new(NotificationService::new(
            store.clone(),
            settings,
            messenger.clone(),
            Duration::from_secs(10),
        ));
        Harness {
            service,
            store,
            messenger,
        }
    }

    fn make_trade(trade_id: &str) -> TradeEvent {
        let mut event = TradeEvent::new(EventType::Trade);
        event.trade_id = trade_id.into();
        event.wallet_address = "0x1234567890abcdef1234567890abcdef12345678".into();
        event.price = "0.5".into();
        event.size = "1000".into();
        event.side = Some(Side::Buy);
        event
    }

    fn make_fresh_profile(address: &str) -> WalletProfile {
        let mut profile = WalletProfile::unknown(address, 20);
        profile.bet_count = 1;
        profile.freshness_level = FreshnessLevel::Insider;
        profile.is_fresh = true;
        profile
    }

    #[tokio::test]
    async fn test_big_trade_sent_once() {
        let h = make_harness(enabled_config()).await;
        let event = make_trade("trade-1");

        let handle = h.service.handle_qualifying_event(&event).await.unwrap();
        handle.await.unwrap();
        assert!(h.service.handle_qualifying_event(&event).await.is_none());
        assert!(h.service.handle_qualifying_event(&event).await.is_none());

        assert_eq!(h.messenger.sent().len(), 1);
        assert!(h
            .store
            .has_notified(NotificationKind::BigTrade, "trade-1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_big_trade_without_trade_id_uses_wallet_and_timestamp() {
        let h = make_harness(enabled_config()).await;
        let event = make_trade("");
        let key = event.dedup_key();

        h.service.handle_qualifying_event(&event).await.unwrap().await.unwrap();

        assert!(h
            .store
            .has_notified(NotificationKind::BigTrade, &key)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_fresh_wallet_dedup_by_address() {
        let h = make_harness(enabled_config()).await;
        let profile = make_fresh_profile("0xfresh");

        h.service.handle_fresh_wallet(&profile).await.unwrap().await.unwrap();
        assert!(h.service.handle_fresh_wallet(&profile).await.is_none());

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Fresh Wallet Detected"));
    }

    #[tokio::test]
    async fn test_toggles_gate_each_branch() {
        let config = NotificationConfig {
            notify_big_trades: false,
            ..enabled_config()
        };
        let h = make_harness(config).await;

        assert!(h.service.handle_qualifying_event(&make_trade("t")).await.is_none());
        assert!(h
            .service
            .handle_fresh_wallet(&make_fresh_profile("0xa"))
            .await
            .is_some());
        assert!(!h
            .store
            .has_notified(NotificationKind::BigTrade, "t")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_global_disable_blocks_everything() {
        let config = NotificationConfig {
            enabled: false,
            ..enabled_config()
        };
        let h = make_harness(config).await;

        assert!(h.service.handle_qualifying_event(&make_trade("t")).await.is_none());
        assert!(h.service.handle_fresh_wallet(&make_fresh_profile("0xa")).await.is_none());
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_stays_marked() {
        let h = make_harness(enabled_config()).await;
        h.messenger.set_failing(true);
        let event = make_trade("trade-9");

        h.service.handle_qualifying_event(&event).await.unwrap().await.unwrap();

        assert!(h.messenger.sent().is_empty());
        assert!(h
            .store
            .has_notified(NotificationKind::BigTrade, "trade-9")
            .await
            .unwrap());
        h.messenger.set_failing(false);
        assert!(h.service.handle_qualifying_event(&event).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_deliveries_send_one_message() {
        let h = make_harness(enabled_config()).await;
        let event = make_trade("trade-race");

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let service = h.service.clone();
            let event = event.clone();
            tasks.push(tokio::spawn(async move {
                service.handle_qualifying_event(&event).await
            }));
        }

        let mut dispatched = 0;
        for task in tasks {
            if let Some(handle) = task.await.unwrap() {
                handle.await.unwrap();
                dispatched += 1;
            }
        }
        assert_eq!(dispatched, 1);
        assert_eq!(h.messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_send_test_reports_configuration_errors() {
        let h = make_harness(NotificationConfig::default()).await;
        assert!(matches!(h.service.send_test().await, Err(NotifyError::NotEnabled)));

        let config = NotificationConfig {
            enabled: true,
            ..NotificationConfig::default()
        };
        h.service.update_config(config).await.unwrap();
        assert!(matches!(h.service.send_test().await, Err(NotifyError::NotConfigured)));

        h.service.update_config(enabled_config()).await.unwrap();
        h.service.send_test().await.unwrap();
        assert_eq!(h.messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_run_consumes_bus_until_shutdown() {
        let h = make_harness(enabled_config()).await;
        let bus = crate::bus::EventBus::new(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(h.service.clone().run(bus.subscribe(), shutdown_rx));
        bus.publish(BusEvent::FreshWalletDetected(make_fresh_profile("0xbus")));

        for _ in 0..50 {
            if !h.messenger.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.messenger.sent().len(), 1);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
