use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::signal::FreshWalletSignal;
use super::wallet::{FreshnessLevel, WalletProfile};
use super::{parse_decimal, shorten_address, EventType, Side};

// ---------------------------------------------------------------------------
// TradeEvent: core pipeline message
// ---------------------------------------------------------------------------

/// One observed market event. Price and size stay in their wire (string)
/// form; `notional()` parses them on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Database id, set once the event is persisted.
    #[serde(default)]
    pub id: Option<i64>,
    pub event_type: EventType,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub condition_id: String,
    #[serde(default)]
    pub market_slug: String,
    #[serde(default)]
    pub market_name: String,
    #[serde(default)]
    pub market_image: String,
    #[serde(default)]
    pub market_link: String,
    #[serde(default)]
    pub event_slug: String,
    #[serde(default)]
    pub event_title: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub trade_id: String,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub trader_name: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub outcome_index: i32,

    // Enrichment, back-filled after persistence.
    #[serde(default)]
    pub is_fresh_wallet: bool,
    #[serde(default)]
    pub wallet_profile: Option<WalletProfile>,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub risk_signals: Vec<String>,
    #[serde(default)]
    pub fresh_wallet_signal: Option<FreshWalletSignal>,
}

impl TradeEvent {
    /// Empty trade event of the given type, stamped now.
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: None,
            event_type,
            asset_id: String::new(),
            condition_id: String::new(),
            market_slug: String::new(),
            market_name: String::new(),
            market_image: String::new(),
            market_link: String::new(),
            event_slug: String::new(),
            event_title: String::new(),
            timestamp: Utc::now(),
            price: String::new(),
            size: String::new(),
            side: None,
            trade_id: String::new(),
            wallet_address: String::new(),
            trader_name: String::new(),
            outcome: String::new(),
            outcome_index: 0,
            is_fresh_wallet: false,
            wallet_profile: None,
            risk_score: 0.0,
            risk_signals: Vec::new(),
            fresh_wallet_signal: None,
        }
    }

    /// Price × size in USDC. Unparseable fields, and products too large
    /// for `Decimal`, count as zero.
    pub fn notional(&self) -> Decimal {
        if self.price.is_empty() || self.size.is_empty() {
            return Decimal::ZERO;
        }
        parse_decimal(&self.price)
            .checked_mul(parse_decimal(&self.size))
            .unwrap_or(Decimal::ZERO)
    }

    /// Logical identity used for big-trade deduplication.
    pub fn dedup_key(&self) -> String {
        if !self.trade_id.is_empty() {
            return self.trade_id.clone();
        }
        format!(
            "{}_{}",
            self.wallet_address,
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
        )
    }
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: wallet={} market={} side={} size={} price={} notional={}",
            self.event_type,
            shorten_address(&self.wallet_address),
            self.market_slug,
            self.side.map(|s| s.as_str()).unwrap_or("-"),
            self.size,
            self.price,
            self.notional().round_dp(2),
        )
    }
}

/// Row in the `trade_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TradeEventRow {
    pub id: i64,
    pub event_type: String,
    pub asset_id: Option<String>,
    pub condition_id: Option<String>,
    pub market_slug: Option<String>,
    pub market_name: Option<String>,
    pub market_image: Option<String>,
    pub market_link: Option<String>,
    pub event_slug: Option<String>,
    pub event_title: Option<String>,
    pub event_timestamp: DateTime<Utc>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub side: Option<String>,
    pub trade_id: Option<String>,
    pub wallet_address: Option<String>,
    pub trader_name: Option<String>,
    pub outcome: Option<String>,
    pub outcome_index: Option<i32>,
    pub is_fresh_wallet: bool,
    pub wallet_bet_count: Option<i32>,
    pub freshness_level: Option<String>,
    pub risk_score: f64,
    pub risk_signals: Vec<String>,
    pub fresh_wallet_signal: Option<serde_json::Value>,
}

impl From<TradeEventRow> for TradeEvent {
    fn from(row: TradeEventRow) -> Self {
        let wallet_address = row.wallet_address.unwrap_or_default();
        let wallet_profile = row.wallet_bet_count.map(|bet_count| {
            let freshness_level = row
                .freshness_level
                .as_deref()
                .map(FreshnessLevel::from_db_str)
                .unwrap_or_default();
            WalletProfile {
                address: wallet_address.clone(),
                bet_count,
                join_date: String::new(),
                freshness_level,
                is_fresh: row.is_fresh_wallet,
                analyzed_at: row.event_timestamp,
                fresh_threshold: 0,
            }
        });

        Self {
            id: Some(row.id),
            event_type: EventType::from_api_str(&row.event_type).unwrap_or(EventType::Trade),
            asset_id: row.asset_id.unwrap_or_default(),
            condition_id: row.condition_id.unwrap_or_default(),
            market_slug: row.market_slug.unwrap_or_default(),
            market_name: row.market_name.unwrap_or_default(),
            market_image: row.market_image.unwrap_or_default(),
            market_link: row.market_link.unwrap_or_default(),
            event_slug: row.event_slug.unwrap_or_default(),
            event_title: row.event_title.unwrap_or_default(),
            timestamp: row.event_timestamp,
            price: row.price.unwrap_or_default(),
            size: row.size.unwrap_or_default(),
            side: row.side.as_deref().and_then(Side::from_api_str),
            trade_id: row.trade_id.unwrap_or_default(),
            wallet_address,
            trader_name: row.trader_name.unwrap_or_default(),
            outcome: row.outcome.unwrap_or_default(),
            outcome_index: row.outcome_index.unwrap_or_default(),
            is_fresh_wallet: row.is_fresh_wallet,
            wallet_profile,
            risk_score: row.risk_score,
            risk_signals: row.risk_signals,
            fresh_wallet_signal: row
                .fresh_wallet_signal
                .and_then(|v| serde_json::from_value(v).ok()),
        }
    }
}
