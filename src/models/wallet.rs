use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bet-count sentinel for a wallet that has been seen but not analyzed.
pub const UNANALYZED_BET_COUNT: i32 = -1;

/// Freshness band derived from a wallet's historical bet count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessLevel {
    /// Exceeds every configured threshold.
    #[default]
    None,
    Insider,
    Fresh,
    Newbie,
    /// Only within the custom override.
    #[serde(rename = "fresher")]
    Custom,
}

impl FreshnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreshnessLevel::None => "none",
            FreshnessLevel::Insider => "insider",
            FreshnessLevel::Fresh => "fresh",
            FreshnessLevel::Newbie => "newbie",
            FreshnessLevel::Custom => "fresher",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "insider" => FreshnessLevel::Insider,
            "fresh" => FreshnessLevel::Fresh,
            "newbie" => FreshnessLevel::Newbie,
            "fresher" => FreshnessLevel::Custom,
            _ => FreshnessLevel::None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        *self != FreshnessLevel::None
    }
}

impl fmt::Display for FreshnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reputation snapshot for one wallet address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletProfile {
    pub address: String,
    /// Total historical trades on Polymarket, `-1` until analyzed.
    pub bet_count: i32,
    /// Month the account joined, as reported upstream (e.g. "Dec 2025").
    #[serde(default)]
    pub join_date: String,
    #[serde(default)]
    pub freshness_level: FreshnessLevel,
    #[serde(default)]
    pub is_fresh: bool,
    pub analyzed_at: DateTime<Utc>,
    /// Widest threshold in effect when the profile was classified.
    #[serde(default)]
    pub fresh_threshold: i32,
}

impl WalletProfile {
    /// Profile returned when the wallet could not be looked up.
    pub fn unknown(address: &str, fresh_threshold: i32) -> Self {
        Self {
            address: address.to_string(),
            bet_count: UNANALYZED_BET_COUNT,
            join_date: String::new(),
            freshness_level: FreshnessLevel::None,
            is_fresh: false,
            analyzed_at: Utc::now(),
            fresh_threshold,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.bet_count >= 0
    }
}

/// Row in the `wallets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletRow {
    pub address: String,
    pub bet_count: i32,
    pub join_date: Option<String>,
    pub freshness_level: Option<String>,
    pub is_fresh: bool,
    pub first_seen_at: DateTime<Utc>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
}

impl From<WalletRow> for WalletProfile {
    fn from(row: WalletRow) -> Self {
        Self {
            address: row.address,
            bet_count: row.bet_count,
            join_date: row.join_date.unwrap_or_default(),
            freshness_level: row
                .freshness_level
                .as_deref()
                .map(FreshnessLevel::from_db_str)
                .unwrap_or_default(),
            is_fresh: row.is_fresh,
            analyzed_at: row.last_analyzed_at.unwrap_or(row.first_seen_at),
            fresh_threshold: 0,
        }
    }
}
