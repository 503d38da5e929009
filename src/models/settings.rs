use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EventType, Side};

pub const DEFAULT_INSIDER_MAX_BETS: i32 = 3;
pub const DEFAULT_FRESH_MAX_BETS: i32 = 10;
pub const DEFAULT_NEWBIE_MAX_BETS: i32 = 20;
/// Minimum notional (USDC) for a trade to be admitted or analyzed.
pub const DEFAULT_MIN_TRADE_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// Freshness thresholds
// ---------------------------------------------------------------------------

/// Bet-count cut-offs for the freshness bands plus the notional floor.
///
/// Zero or negative standard cut-offs fall back to the defaults; a
/// `custom_max_bets` of zero disables the custom band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessThresholds {
    pub insider_max_bets: i32,
    pub fresh_max_bets: i32,
    pub newbie_max_bets: i32,
    pub custom_max_bets: i32,
    pub min_trade_size: Decimal,
}

impl Default for FreshnessThresholds {
    fn default() -> Self {
        Self {
            insider_max_bets: DEFAULT_INSIDER_MAX_BETS,
            fresh_max_bets: DEFAULT_FRESH_MAX_BETS,
            newbie_max_bets: DEFAULT_NEWBIE_MAX_BETS,
            custom_max_bets: 0,
            min_trade_size: Decimal::from(DEFAULT_MIN_TRADE_SIZE),
        }
    }
}

impl FreshnessThresholds {
    pub fn insider(&self) -> i32 {
        positive_or(self.insider_max_bets, DEFAULT_INSIDER_MAX_BETS)
    }

    pub fn fresh(&self) -> i32 {
        positive_or(self.fresh_max_bets, DEFAULT_FRESH_MAX_BETS)
    }

    pub fn newbie(&self) -> i32 {
        positive_or(self.newbie_max_bets, DEFAULT_NEWBIE_MAX_BETS)
    }

    /// Custom override, `None` when disabled.
    pub fn custom(&self) -> Option<i32> {
        (self.custom_max_bets > 0).then_some(self.custom_max_bets)
    }

    pub fn min_trade_size(&self) -> Decimal {
        if self.min_trade_size > Decimal::ZERO {
            self.min_trade_size
        } else {
            Decimal::from(DEFAULT_MIN_TRADE_SIZE)
        }
    }

    /// Widest threshold in effect: the custom override when set, else newbie.
    pub fn max_fresh_threshold(&self) -> i32 {
        self.custom().unwrap_or_else(|| self.newbie())
    }

    /// Cut-offs must be non-decreasing: insider ≤ fresh ≤ newbie.
    pub fn validate(&self) -> Result<(), String> {
        let (insider, fresh, newbie) = (self.insider(), self.fresh(), self.newbie());
        if insider > fresh {
            return Err(format!(
                "insider threshold ({insider}) must not exceed fresh threshold ({fresh})"
            ));
        }
        if fresh > newbie {
            return Err(format!(
                "fresh threshold ({fresh}) must not exceed newbie threshold ({newbie})"
            ));
        }
        if self.custom_max_bets < 0 {
            return Err("custom threshold must be zero (disabled) or positive".into());
        }
        Ok(())
    }
}

fn positive_or(value: i32, default: i32) -> i32 {
    if value > 0 {
        value
    } else {
        default
    }
}

// ---------------------------------------------------------------------------
// Watcher config (persisted as "config")
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub enabled: bool,
    /// Risk score at or above which a trade is considered alert-worthy.
    pub alert_threshold: f64,
    pub thresholds: FreshnessThresholds,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alert_threshold: 0.7,
            thresholds: FreshnessThresholds::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event filter (persisted as "filter", also the GetEvents query)
// ---------------------------------------------------------------------------

/// Predicate configuration for admission and for event queries.
///
/// `fresh_wallets_only`, `min_risk_score` and `max_wallet_bet_count` only
/// apply to queries; admission ignores them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFilter {
    pub event_types: Vec<EventType>,
    pub market_name: String,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub side: Option<Side>,
    /// Minimum notional (price × size).
    pub min_size: Decimal,
    pub limit: i64,
    pub offset: i64,
    pub fresh_wallets_only: bool,
    pub min_risk_score: f64,
    pub max_wallet_bet_count: i32,
}

impl EventFilter {
    /// Save-filter used when none has been persisted.
    pub fn default_save_filter() -> Self {
        Self {
            min_size: Decimal::from(DEFAULT_MIN_TRADE_SIZE),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Notification config (persisted as "notification_config")
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    #[default]
    Telegram,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::Telegram => f.write_str("telegram"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub channel: NotificationChannel,
    pub telegram_bot_token: String,
    pub telegram_chat_ids: Vec<String>,
    pub notify_big_trades: bool,
    pub notify_fresh_wallets: bool,
}

impl NotificationConfig {
    /// Enabled and carrying the credentials its channel needs.
    pub fn is_configured(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.channel {
            NotificationChannel::Telegram => {
                !self.telegram_bot_token.is_empty()
                    && self.telegram_chat_ids.iter().any(|id| !id.is_empty())
            }
        }
    }

    /// Copy safe to return over the API: the bot token keeps only its last
    /// four characters.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        out.telegram_bot_token = mask_secret(&self.telegram_bot_token);
        out
    }

    /// Put the stored token back when `self` carries the masked form of it.
    pub fn restore_redacted_token(&mut self, current: &NotificationConfig) {
        if !self.telegram_bot_token.is_empty()
            && self.telegram_bot_token == mask_secret(&current.telegram_bot_token)
        {
            self.telegram_bot_token = current.telegram_bot_token.clone();
        }
    }

    /// Non-empty chat ids.
    pub fn recipients(&self) -> Vec<String> {
        self.telegram_chat_ids
            .iter()
            .filter(|id| !id.trim().is_empty())
            .map(|id| id.trim().to_string())
            .collect()
    }
}

const SECRET_MASK: &str = "****";

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return SECRET_MASK.to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{SECRET_MASK}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_fall_back_to_defaults() {
        let t = FreshnessThresholds {
            insider_max_bets: 0,
            fresh_max_bets: -5,
            newbie_max_bets: 0,
            custom_max_bets: 0,
            min_trade_size: Decimal::ZERO,
        };
        assert_eq!(t.insider(), 3);
        assert_eq!(t.fresh(), 10);
        assert_eq!(t.newbie(), 20);
        assert_eq!(t.custom(), None);
        assert_eq!(t.min_trade_size(), Decimal::from(100));
        assert_eq!(t.max_fresh_threshold(), 20);
    }

    #[test]
    fn test_thresholds_validate_ordering() {
        let mut t = FreshnessThresholds::default();
        assert!(t.validate().is_ok());

        t.insider_max_bets = 15;
        assert!(t.validate().is_err());

        t.insider_max_bets = 3;
        t.fresh_max_bets = 30;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_notification_config_is_configured() {
        let mut cfg = NotificationConfig::default();
        assert!(!cfg.is_configured());

        cfg.enabled = true;
        cfg.telegram_bot_token = "123:abc".into();
        assert!(!cfg.is_configured());

        cfg.telegram_chat_ids = vec!["".into(), "42".into()];
        assert!(cfg.is_configured());
        assert_eq!(cfg.recipients(), vec!["42".to_string()]);
    }

    #[test]
    fn test_settings_decode_with_missing_fields() {
        let cfg: WatcherConfig = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert!(!cfg.enabled);
        assert_eq!(cfg.thresholds, FreshnessThresholds::default());

        let filter: EventFilter = serde_json::from_str(r#"{"side": "SELL"}"#).unwrap();
        assert_eq!(filter.side, Some(Side::Sell));
        assert!(filter.event_types.is_empty());
    }

    #[test]
    fn test_redacted_token_round_trip() {
        let stored = NotificationConfig {
            enabled: true,
            telegram_bot_token: "123456:ABCDEFGHIJ".into(),
            telegram_chat_ids: vec!["42".into()],
            ..NotificationConfig::default()
        };

        let mut shown = stored.redacted();
        assert_eq!(shown.telegram_bot_token, "****GHIJ");
        assert_eq!(shown.telegram_chat_ids, stored.telegram_chat_ids);

        shown.restore_redacted_token(&stored);
        assert_eq!(shown, stored);

        let mut replaced = stored.redacted();
        replaced.telegram_bot_token = "999:NEWTOKEN".into();
        replaced.restore_redacted_token(&stored);
        assert_eq!(replaced.telegram_bot_token, "999:NEWTOKEN");

        assert_eq!(NotificationConfig::default().redacted().telegram_bot_token, "");
    }
}
