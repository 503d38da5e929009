use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{shorten_address, FreshnessLevel, Side, TradeEvent, WalletProfile};

const PROFILE_URL_BASE: &str = "https://polymarket.com/profile/";

/// Notification categories; also the item type of the dedup ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BigTrade,
    FreshWallet,
    Test,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BigTrade => "big_trade",
            NotificationKind::FreshWallet => "fresh_wallet",
            NotificationKind::Test => "test",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A rendered message plus metadata for channel-specific formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub kind: NotificationKind,
    pub title: String,
    /// Telegram HTML.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub priority: Priority,
    pub metadata: BTreeMap<String, String>,
}

impl NotificationContent {
    pub fn big_trade(event: &TradeEvent) -> Self {
        let side = event.side.unwrap_or(Side::Buy);
        let side_marker = match side {
            Side::Buy => "🟢",
            Side::Sell => "🔴",
        };
        let notional = event.notional().round_dp(2);

        let mut metadata = BTreeMap::new();
        metadata.insert("market".to_string(), event.event_title.clone());
        metadata.insert("outcome".to_string(), event.outcome.clone());
        metadata.insert("side".to_string(), side.to_string());
        metadata.insert("walletAddress".to_string(), event.wallet_address.clone());
        metadata.insert("tradeId".to_string(), event.trade_id.clone());

        let mut message = format!("<b>{side_marker} Big Trade Alert</b>\n\n");
        if !event.event_title.is_empty() {
            message.push_str(&format!("<b>Market:</b> {}\n", escape_html(&event.event_title)));
        }
        if !event.outcome.is_empty() {
            message.push_str(&format!("<b>Outcome:</b> {}\n", escape_html(&event.outcome)));
        }
        message.push_str(&format!("<b>Value:</b> ${notional:.2}\n"));
        message.push_str(&format!("<b>Side:</b> {side}\n"));
        push_wallet_line(&mut message, &event.wallet_address);

        if let Some(profile) = &event.wallet_profile {
            metadata.insert("betCount".to_string(), profile.bet_count.to_string());
            metadata.insert("joinDate".to_string(), profile.join_date.clone());
            message.push_str(&format!("<b>Trades:</b> {}\n", profile.bet_count));
            if !profile.join_date.is_empty() {
                message.push_str(&format!(
                    "<b>Join Date:</b> {}\n",
                    escape_html(&profile.join_date)
                ));
            }
        }
        push_profile_link(&mut message, &event.wallet_address);

        Self {
            kind: NotificationKind::BigTrade,
            title: "Big Trade Alert".into(),
            message,
            timestamp: event.timestamp,
            priority: Priority::High,
            metadata,
        }
    }

    pub fn fresh_wallet(profile: &WalletProfile) -> Self {
        let marker = match profile.freshness_level {
            FreshnessLevel::Fresh => "🔥",
            FreshnessLevel::Newbie => "⚡",
            _ => "🚨",
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("walletAddress".to_string(), profile.address.clone());
        metadata.insert("betCount".to_string(), profile.bet_count.to_string());
        metadata.insert("joinDate".to_string(), profile.join_date.clone());
        metadata.insert(
            "freshnessLevel".to_string(),
            profile.freshness_level.to_string(),
        );

        let mut message = format!("<b>{marker} Fresh Wallet Detected</b>\n\n");
        push_wallet_line(&mut message, &profile.address);
        message.push_str(&format!("<b>Total Trades:</b> {}\n", profile.bet_count));
        if !profile.join_date.is_empty() {
            message.push_str(&format!(
                "<b>Join Date:</b> {}\n",
                escape_html(&profile.join_date)
            ));
        }
        message.push_str(&format!("<b>Freshness:</b> {}\n", profile.freshness_level));
        push_profile_link(&mut message, &profile.address);

        Self {
            kind: NotificationKind::FreshWallet,
            title: "Fresh Wallet Detected".into(),
            message,
            timestamp: profile.analyzed_at,
            priority: Priority::High,
            metadata,
        }
    }

    pub fn test() -> Self {
        Self {
            kind: NotificationKind::Test,
            title: "Test Notification".into(),
            message: "This is a test notification from polywatch. \
                      If you received this, your Telegram notifications are working."
                .into(),
            timestamp: Utc::now(),
            priority: Priority::Low,
            metadata: BTreeMap::new(),
        }
    }
}

fn push_wallet_line(message: &mut String, wallet: &str) {
    if !wallet.is_empty() {
        message.push_str(&format!(
            "<b>Wallet:</b> <code>{}</code>\n",
            escape_html(&shorten_address(wallet))
        ));
    }
}

fn push_profile_link(message: &mut String, wallet: &str) {
    if !wallet.is_empty() {
        message.push_str(&format!(
            "\n<a href=\"{PROFILE_URL_BASE}{}\">View Profile</a>",
            escape_html(wallet)
        ));
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
