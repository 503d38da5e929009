pub mod event;
pub mod notification;
pub mod settings;
pub mod signal;
pub mod wallet;

pub use event::TradeEvent;
pub use notification::{NotificationContent, NotificationKind, Priority};
pub use settings::{EventFilter, FreshnessThresholds, NotificationChannel, NotificationConfig, WatcherConfig};
pub use signal::FreshWalletSignal;
pub use wallet::{FreshnessLevel, WalletProfile};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" | "0" => Some(Side::Buy),
            "SELL" | "1" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// Kinds of market events the live feed can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Trade,
    Book,
    PriceChange,
    LastTradePrice,
    TickSizeChange,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Trade => "trade",
            EventType::Book => "book",
            EventType::PriceChange => "price_change",
            EventType::LastTradePrice => "last_trade_price",
            EventType::TickSizeChange => "tick_size_change",
        }
    }

    pub fn from_api_str(s: &str) -> Option<Self> {
        match s {
            "trade" | "trades" => Some(EventType::Trade),
            "book" => Some(EventType::Book),
            "price_change" => Some(EventType::PriceChange),
            "last_trade_price" => Some(EventType::LastTradePrice),
            "tick_size_change" => Some(EventType::TickSizeChange),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a decimal string from the feed. Empty or malformed input is zero.
pub fn parse_decimal(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

/// `0x1234...abcd` form used in logs and messages.
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
