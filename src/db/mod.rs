pub mod event_repo;
pub mod notified_repo;
pub mod pg_store;
pub mod settings_repo;
pub mod wallet_repo;

pub use pg_store::PgStore;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::{
    EventFilter, NotificationConfig, NotificationKind, TradeEvent, WalletProfile, WatcherConfig,
};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Storage statistics reported by the API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseInfo {
    pub event_count: i64,
    pub wallet_count: i64,
    pub size_bytes: i64,
    pub size_formatted: String,
}

/// Read/write contract of the persisted store. Every method is a single
/// statement (or an upsert) and safe to call concurrently.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist an event, returning its id.
    async fn save_event(&self, event: &TradeEvent) -> anyhow::Result<i64>;

    /// Back-fill the enrichment columns of a stored event.
    async fn update_event_enrichment(&self, id: i64, event: &TradeEvent) -> anyhow::Result<()>;

    async fn get_events(&self, filter: &EventFilter) -> anyhow::Result<Vec<TradeEvent>>;

    async fn count_events(&self) -> anyhow::Result<i64>;

    /// Bulk purge of events and wallets. The dedup ledger is kept.
    async fn clear_events(&self) -> anyhow::Result<()>;

    /// Insert or update a wallet profile.
    async fn save_wallet(&self, profile: &WalletProfile) -> anyhow::Result<()>;

    async fn get_wallet(&self, address: &str) -> anyhow::Result<Option<WalletProfile>>;

    async fn get_all_wallets(&self, limit: i64) -> anyhow::Result<Vec<WalletProfile>>;

    /// Addresses due for re-analysis: unanalyzed first, then wallets with
    /// at most `max_bet_count` bets, oldest analysis first.
    async fn get_wallets_for_refresh(
        &self,
        limit: i64,
        max_bet_count: i32,
    ) -> anyhow::Result<Vec<String>>;

    /// Queue an address as unanalyzed. Returns `true` if it was new.
    async fn save_wallet_address(&self, address: &str) -> anyhow::Result<bool>;

    async fn save_config(&self, config: &WatcherConfig) -> anyhow::Result<()>;
    async fn load_config(&self) -> anyhow::Result<Option<WatcherConfig>>;

    async fn save_filter(&self, filter: &EventFilter) -> anyhow::Result<()>;
    async fn load_filter(&self) -> anyhow::Result<Option<EventFilter>>;

    async fn save_notification_config(&self, config: &NotificationConfig) -> anyhow::Result<()>;
    async fn load_notification_config(&self) -> anyhow::Result<Option<NotificationConfig>>;

    async fn has_notified(&self, kind: NotificationKind, item_id: &str) -> anyhow::Result<bool>;

    /// Record an item as notified. Returns `true` if this call created the
    /// ledger entry, `false` if it already existed.
    async fn mark_notified(&self, kind: NotificationKind, item_id: &str) -> anyhow::Result<bool>;

    async fn database_info(&self) -> anyhow::Result<DatabaseInfo>;
}

/// Human-readable byte count (`1.5 MB`).
pub fn format_bytes(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = ['K', 'M', 'G', 'T', 'P', 'E'][exp.min(5)];
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}
