//! In-memory doubles for the store, the stats endpoint and the messenger.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::db::{format_bytes, DatabaseInfo, Store};
use crate::models::{
    parse_decimal, EventFilter, NotificationConfig, NotificationKind, TradeEvent, WalletProfile,
    WatcherConfig,
};
use crate::polymarket::{ProfileStats, StatsError, WalletStatsSource};
use crate::services::messenger::{Messenger, NotifyError};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct WalletRecord {
    profile: WalletProfile,
    first_seen_at: DateTime<Utc>,
    last_analyzed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct MemoryState {
    next_event_id: i64,
    events: Vec<TradeEvent>,
    wallets: HashMap<String, WalletRecord>,
    settings: HashMap<String, String>,
    notified: HashSet<(String, String)>,
}

/// [`Store`] backed by process memory. `set_failing(true)` makes every
/// write return an error.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<TradeEvent> {
        self.lock().events.clone()
    }

    pub fn wallet_count(&self) -> usize {
        self.lock().wallets.len()
    }

    /// Backdate a wallet's last analysis, for refresh ordering tests.
    pub fn set_last_analyzed(&self, address: &str, at: DateTime<Utc>) {
        if let Some(record) = self.lock().wallets.get_mut(address) {
            record.last_analyzed_at = Some(at);
            record.profile.analyzed_at = at;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("memory store is in failing mode");
        }
        Ok(())
    }

    fn save_setting<T: serde::Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.check_writable()?;
        let encoded = serde_json::to_string(value)?;
        self.lock().settings.insert(key.to_string(), encoded);
        Ok(())
    }

    fn load_setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.lock().settings.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }
}

fn matches_query(event: &TradeEvent, filter: &EventFilter) -> bool {
    if !filter.event_types.is_empty() && !filter.event_types.contains(&event.event_type) {
        return false;
    }
    if !filter.market_name.is_empty() {
        let needle = filter.market_name.to_lowercase();
        if !event.market_name.to_lowercase().contains(&needle)
            && !event.event_title.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if filter.side.is_some() && event.side != filter.side {
        return false;
    }
    let price = parse_decimal(&event.price);
    if filter.min_price > Decimal::ZERO && price < filter.min_price {
        return false;
    }
    if filter.max_price > Decimal::ZERO && price > filter.max_price {
        return false;
    }
    if filter.min_size > Decimal::ZERO && event.notional() < filter.min_size {
        return false;
    }
    if filter.fresh_wallets_only && !event.is_fresh_wallet {
        return false;
    }
    if filter.min_risk_score > 0.0 && event.risk_score < filter.min_risk_score {
        return false;
    }
    if filter.max_wallet_bet_count > 0 {
        match &event.wallet_profile {
            Some(p) if p.bet_count >= 0 && p.bet_count <= filter.max_wallet_bet_count => {}
            _ => return false,
        }
    }
    true
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_event(&self, event: &TradeEvent) -> anyhow::Result<i64> {
        self.check_writable()?;
        let mut state = self.lock();
        state.next_event_id += 1;
        let id = state.next_event_id;
        let mut stored = event.clone();
        stored.id = Some(id);
        state.events.push(stored);
        Ok(id)
    }

    async fn update_event_enrichment(&self, id: i64, event: &TradeEvent) -> anyhow::Result<()> {
        self.check_writable()?;
        let mut state = self.lock();
        if let Some(stored) = state.events.iter_mut().find(|e| e.id == Some(id)) {
            stored.is_fresh_wallet = event.is_fresh_wallet;
            stored.wallet_profile = event.wallet_profile.clone();
            stored.risk_score = event.risk_score;
            stored.risk_signals = event.risk_signals.clone();
            stored.fresh_wallet_signal = event.fresh_wallet_signal.clone();
        }
        Ok(())
    }

    async fn get_events(&self, filter: &EventFilter) -> anyhow::Result<Vec<TradeEvent>> {
        let mut events: Vec<TradeEvent> = self
            .lock()
            .events
            .iter()
            .filter(|e| matches_query(e, filter))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        let limit = if filter.limit > 0 { filter.limit } else { 100 };
        Ok(events
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_events(&self) -> anyhow::Result<i64> {
        Ok(self.lock().events.len() as i64)
    }

    async fn clear_events(&self) -> anyhow::Result<()> {
        self.check_writable()?;
        let mut state = self.lock();
        state.events.clear();
        state.wallets.clear();
        Ok(())
    }

    async fn save_wallet(&self, profile: &WalletProfile) -> anyhow::Result<()> {
        self.check_writable()?;
        let mut state = self.lock();
        let record = state
            .wallets
            .entry(profile.address.clone())
            .or_insert_with(|| WalletRecord {
                profile: profile.clone(),
                first_seen_at: Utc::now(),
                last_analyzed_at: None,
            });
        record.profile = profile.clone();
        record.last_analyzed_at = Some(profile.analyzed_at);
        Ok(())
    }

    async fn get_wallet(&self, address: &str) -> anyhow::Result<Option<WalletProfile>> {
        Ok(self.lock().wallets.get(address).map(|r| r.profile.clone()))
    }

    async fn get_all_wallets(&self, limit: i64) -> anyhow::Result<Vec<WalletProfile>> {
        let mut records: Vec<WalletRecord> = self.lock().wallets.values().cloned().collect();
        records.sort_by(|a, b| b.last_analyzed_at.cmp(&a.last_analyzed_at));
        Ok(records
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|r| r.profile)
            .collect())
    }

    async fn get_wallets_for_refresh(
        &self,
        limit: i64,
        max_bet_count: i32,
    ) -> anyhow::Result<Vec<String>> {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        let mut candidates: Vec<(bool, DateTime<Utc>, String)> = self
            .lock()
            .wallets
            .values()
            .filter(|r| r.profile.bet_count == -1 || r.profile.bet_count <= max_bet_count)
            .map(|r| {
                (
                    r.profile.bet_count != -1,
                    r.last_analyzed_at.unwrap_or(epoch),
                    r.profile.address.clone(),
                )
            })
            .collect();
        candidates.sort();
        Ok(candidates
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, _, address)| address)
            .collect())
    }

    async fn save_wallet_address(&self, address: &str) -> anyhow::Result<bool> {
        self.check_writable()?;
        let mut state = self.lock();
        if state.wallets.contains_key(address) {
            return Ok(false);
        }
        let now = Utc::now();
        let mut profile = WalletProfile::unknown(address, 0);
        profile.analyzed_at = now;
        state.wallets.insert(
            address.to_string(),
            WalletRecord {
                profile,
                first_seen_at: now,
                last_analyzed_at: None,
            },
        );
        Ok(true)
    }

    async fn save_config(&self, config: &WatcherConfig) -> anyhow::Result<()> {
        self.save_setting("config", config)
    }

    async fn load_config(&self) -> anyhow::Result<Option<WatcherConfig>> {
        self.load_setting("config")
    }

    async fn save_filter(&self, filter: &EventFilter) -> anyhow::Result<()> {
        self.save_setting("filter", filter)
    }

    async fn load_filter(&self) -> anyhow::Result<Option<EventFilter>> {
        self.load_setting("filter")
    }

    async fn save_notification_config(&self, config: &NotificationConfig) -> anyhow::Result<()> {
        self.save_setting("notification_config", config)
    }

    async fn load_notification_config(&self) -> anyhow::Result<Option<NotificationConfig>> {
        self.load_setting("notification_config")
    }

    async fn has_notified(&self, kind: NotificationKind, item_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .lock()
            .notified
            .contains(&(kind.as_str().to_string(), item_id.to_string())))
    }

    async fn mark_notified(&self, kind: NotificationKind, item_id: &str) -> anyhow::Result<bool> {
        self.check_writable()?;
        Ok(self
            .lock()
            .notified
            .insert((kind.as_str().to_string(), item_id.to_string())))
    }

    async fn database_info(&self) -> anyhow::Result<DatabaseInfo> {
        let state = self.lock();
        let size_bytes = serde_json::to_vec(&state.events).map(|v| v.len() as i64)?;
        Ok(DatabaseInfo {
            event_count: state.events.len() as i64,
            wallet_count: state.wallets.len() as i64,
            size_bytes,
            size_formatted: format_bytes(size_bytes),
        })
    }
}

// ---------------------------------------------------------------------------
// StubStatsSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Stats(ProfileStats),
    Fail(u16),
    Hang,
}

/// Scripted stats endpoint. Unknown addresses answer 404.
#[derive(Default)]
pub struct StubStatsSource {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl StubStatsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_trades(&self, address: &str, trades: i32) {
        let stats = ProfileStats {
            trades,
            join_date: "Dec 2025".into(),
            ..ProfileStats::default()
        };
        self.script(address, Scripted::Stats(stats));
    }

    pub fn set_failure(&self, address: &str) {
        self.script(address, Scripted::Fail(500));
    }

    /// The call never completes; only a timeout or cancellation ends it.
    pub fn set_hang(&self, address: &str) {
        self.script(address, Scripted::Hang);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn calls_for(&self, address: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|a| a.as_str() == address).count())
            .unwrap_or_default()
    }

    /// Addresses in the order they were looked up.
    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn script(&self, address: &str, response: Scripted) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(address.to_string(), response);
        }
    }
}

#[async_trait]
impl WalletStatsSource for StubStatsSource {
    async fn fetch_stats(&self, address: &str) -> Result<ProfileStats, StatsError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(address.to_string());
        }
        let scripted = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(address).cloned());

        match scripted {
            Some(Scripted::Stats(stats)) => Ok(stats),
            Some(Scripted::Fail(status)) => Err(StatsError::Status(status)),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(StatsError::Status(404)),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingMessenger
// ---------------------------------------------------------------------------

/// Records delivered texts; `set_failing(true)` makes sends fail.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, config: &NotificationConfig, text: &str) -> Result<(), NotifyError> {
        if !config.is_configured() {
            return Err(NotifyError::NotConfigured);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("scripted failure".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(text.to_string());
        }
        Ok(())
    }
}
