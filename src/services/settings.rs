use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::db::Store;
use crate::models::{EventFilter, FreshnessThresholds, NotificationConfig, WatcherConfig};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Invalid(String),

    #[error("failed to persist settings: {0}")]
    Store(#[from] anyhow::Error),
}

/// Runtime-editable settings shared across tasks.
///
/// Readers take a cloned snapshot and drop the lock before doing any I/O.
/// Writers swap the value under the write lock, release it, then persist.
#[derive(Clone)]
pub struct SettingsHandle {
    store: Arc<dyn Store>,
    config: Arc<RwLock<WatcherConfig>>,
    filter: Arc<RwLock<EventFilter>>,
    notifications: Arc<RwLock<NotificationConfig>>,
}

impl SettingsHandle {
    pub fn new(
        store: Arc<dyn Store>,
        config: WatcherConfig,
        filter: EventFilter,
        notifications: NotificationConfig,
    ) -> Self {
        Self {
            store,
            config: Arc::new(RwLock::new(config)),
            filter: Arc::new(RwLock::new(filter)),
            notifications: Arc::new(RwLock::new(notifications)),
        }
    }

    /// Load persisted settings, falling back to defaults. `seed` is used for
    /// the notification config when none has been saved yet.
    pub async fn load(store: Arc<dyn Store>, seed: Option<NotificationConfig>) -> Self {
        let config = match store.load_config().await {
            Ok(Some(cfg)) => cfg,
            Ok(None) => WatcherConfig::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load watcher config, using defaults");
                WatcherConfig::default()
            }
        };

        let filter = match store.load_filter().await {
            Ok(Some(filter)) => filter,
            Ok(None) => EventFilter::default_save_filter(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load save-filter, using defaults");
                EventFilter::default_save_filter()
            }
        };

        let notifications = match store.load_notification_config().await {
            Ok(Some(cfg)) => cfg,
            Ok(None) => seed.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load notification config");
                seed.unwrap_or_default()
            }
        };

        tracing::info!(
            watcher_enabled = config.enabled,
            min_trade_size = %config.thresholds.min_trade_size(),
            notifications_enabled = notifications.enabled,
            "Settings loaded"
        );

        Self::new(store, config, filter, notifications)
    }

    pub async fn config_snapshot(&self) -> WatcherConfig {
        self.config.read().await.clone()
    }

    pub async fn thresholds_snapshot(&self) -> FreshnessThresholds {
        self.config.read().await.thresholds.clone()
    }

    pub async fn filter_snapshot(&self) -> EventFilter {
        self.filter.read().await.clone()
    }

    pub async fn notification_snapshot(&self) -> NotificationConfig {
        self.notifications.read().await.clone()
    }

    pub async fn update_config(&self, config: WatcherConfig) -> Result<(), SettingsError> {
        config.thresholds.validate().map_err(SettingsError::Invalid)?;
        if !(0.0..=1.0).contains(&config.alert_threshold) {
            return Err(SettingsError::Invalid(
                "alert_threshold must be between 0 and 1".into(),
            ));
        }

        *self.config.write().await = config.clone();
        self.store.save_config(&config).await?;
        Ok(())
    }

    pub async fn update_filter(&self, filter: EventFilter) -> Result<(), SettingsError> {
        if filter.min_price > rust_decimal::Decimal::ZERO
            && filter.max_price > rust_decimal::Decimal::ZERO
            && filter.min_price > filter.max_price
        {
            return Err(SettingsError::Invalid(
                "min_price must not exceed max_price".into(),
            ));
        }

        *self.filter.write().await = filter.clone();
        self.store.save_filter(&filter).await?;
        Ok(())
    }

    pub async fn update_notification_config(
        &self,
        config: NotificationConfig,
    ) -> Result<(), SettingsError> {
        *self.notifications.write().await = config.clone();
        self.store.save_notification_config(&config).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::MemoryStore;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_load_falls_back_to_defaults_and_seed() {
        let store = Arc::new(MemoryStore::new());
        let seed = NotificationConfig {
            enabled: true,
            telegram_bot_token: "123:abc".into(),
            telegram_chat_ids: vec!["42".into()],
            ..NotificationConfig::default()
        };

        let settings = SettingsHandle::load(store, Some(seed.clone())).await;

        assert_eq!(settings.config_snapshot().await, WatcherConfig::default());
        assert_eq!(settings.filter_snapshot().await.min_size, Decimal::from(100));
        assert_eq!(settings.notification_snapshot().await, seed);
    }

    #[tokio::test]
    async fn test_persisted_values_win_over_seed() {
        let store = Arc::new(MemoryStore::new());
        let saved = NotificationConfig {
            enabled: false,
            ..NotificationConfig::default()
        };
        store.save_notification_config(&saved).await.unwrap();

        let seed = NotificationConfig {
            enabled: true,
            ..NotificationConfig::default()
        };
        let settings = SettingsHandle::load(store, Some(seed)).await;
        assert!(!settings.notification_snapshot().await.enabled);
    }

    #[tokio::test]
    async fn test_update_config_persists_and_rejects_invalid() {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsHandle::load(store.clone(), None).await;

        let mut cfg = WatcherConfig::default();
        cfg.thresholds.newbie_max_bets = 30;
        settings.update_config(cfg.clone()).await.unwrap();
        assert_eq!(settings.thresholds_snapshot().await.newbie(), 30);
        assert_eq!(store.load_config().await.unwrap(), Some(cfg));

        let mut bad = WatcherConfig::default();
        bad.thresholds.insider_max_bets = 50;
        let err = settings.update_config(bad).await.unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
        assert_eq!(settings.thresholds_snapshot().await.newbie(), 30);
    }

    #[tokio::test]
    async fn test_update_filter_rejects_inverted_price_band() {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsHandle::load(store, None).await;

        let filter = EventFilter {
            min_price: Decimal::new(8, 1),
            max_price: Decimal::new(2, 1),
            ..EventFilter::default()
        };
        assert!(settings.update_filter(filter).await.is_err());
    }
}
