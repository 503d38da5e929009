use async_trait::async_trait;
use sqlx::PgPool;

use super::settings_repo::{CONFIG_KEY, FILTER_KEY, NOTIFICATION_CONFIG_KEY};
use super::{event_repo, format_bytes, notified_repo, settings_repo, wallet_repo};
use super::{DatabaseInfo, Store};
use crate::models::{
    EventFilter, NotificationConfig, NotificationKind, TradeEvent, WalletProfile, WatcherConfig,
};

/// Postgres-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn save_event(&self, event: &TradeEvent) -> anyhow::Result<i64> {
        event_repo::insert_event(&self.pool, event).await
    }

    async fn update_event_enrichment(&self, id: i64, event: &TradeEvent) -> anyhow::Result<()> {
        event_repo::update_enrichment(&self.pool, id, event).await
    }

    async fn get_events(&self, filter: &EventFilter) -> anyhow::Result<Vec<TradeEvent>> {
        event_repo::get_events(&self.pool, filter).await
    }

    async fn count_events(&self) -> anyhow::Result<i64> {
        event_repo::count_events(&self.pool).await
    }

    async fn clear_events(&self) -> anyhow::Result<()> {
        event_repo::clear_events_and_wallets(&self.pool).await
    }

    async fn save_wallet(&self, profile: &WalletProfile) -> anyhow::Result<()> {
        wallet_repo::upsert_wallet(&self.pool, profile).await
    }

    async fn get_wallet(&self, address: &str) -> anyhow::Result<Option<WalletProfile>> {
        wallet_repo::get_wallet(&self.pool, address).await
    }

    async fn get_all_wallets(&self, limit: i64) -> anyhow::Result<Vec<WalletProfile>> {
        wallet_repo::get_all_wallets(&self.pool, limit).await
    }

    async fn get_wallets_for_refresh(
        &self,
        limit: i64,
        max_bet_count: i32,
    ) -> anyhow::Result<Vec<String>> {
        wallet_repo::get_wallets_for_refresh(&self.pool, limit, max_bet_count).await
    }

    async fn save_wallet_address(&self, address: &str) -> anyhow::Result<bool> {
        wallet_repo::insert_wallet_address(&self.pool, address).await
    }

    async fn save_config(&self, config: &WatcherConfig) -> anyhow::Result<()> {
        settings_repo::save_setting(&self.pool, CONFIG_KEY, config).await
    }

    async fn load_config(&self) -> anyhow::Result<Option<WatcherConfig>> {
        settings_repo::load_setting(&self.pool, CONFIG_KEY).await
    }

    async fn save_filter(&self, filter: &EventFilter) -> anyhow::Result<()> {
        settings_repo::save_setting(&self.pool, FILTER_KEY, filter).await
    }

    async fn load_filter(&self) -> anyhow::Result<Option<EventFilter>> {
        settings_repo::load_setting(&self.pool, FILTER_KEY).await
    }

    async fn save_notification_config(&self, config: &NotificationConfig) -> anyhow::Result<()> {
        settings_repo::save_setting(&self.pool, NOTIFICATION_CONFIG_KEY, config).await
    }

    async fn load_notification_config(&self) -> anyhow::Result<Option<NotificationConfig>> {
        settings_repo::load_setting(&self.pool, NOTIFICATION_CONFIG_KEY).await
    }

    async fn has_notified(&self, kind: NotificationKind, item_id: &str) -> anyhow::Result<bool> {
        notified_repo::has_notified(&self.pool, kind.as_str(), item_id).await
    }

    async fn mark_notified(&self, kind: NotificationKind, item_id: &str) -> anyhow::Result<bool> {
        notified_repo::mark_notified(&self.pool, kind.as_str(), item_id).await
    }

    async fn database_info(&self) -> anyhow::Result<DatabaseInfo> {
        let event_count = event_repo::count_events(&self.pool).await?;
        let wallet_count = wallet_repo::count_wallets(&self.pool).await?;
        let size_bytes = event_repo::database_size(&self.pool).await?;

        Ok(DatabaseInfo {
            event_count,
            wallet_count,
            size_bytes,
            size_formatted: format_bytes(size_bytes),
        })
    }
}
