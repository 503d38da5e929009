use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::models::NotificationConfig;
use crate::polymarket::{LIVE_DATA_WS_URL, PROFILE_STATS_URL};
use crate::services::wallet_refresher::RefreshConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Live feed
    pub live_ws_url: String,
    pub feed_enabled: bool,

    // Wallet analysis
    pub profile_stats_url: String,
    pub external_call_timeout: Duration,
    pub wallet_cache_ttl: Duration,
    pub wallet_cache_capacity: usize,
    pub enrich_on_ingest: bool,

    // Background refresh
    pub refresh_interval: Duration,
    pub refresh_batch_size: i64,
    pub refresh_max_bet_count: i32,
    pub refresh_pacing: Duration,

    // Notification seed, used only when nothing is persisted yet
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_ids: Vec<String>,

    /// Bearer token for `/api/*`. Auth is off when unset.
    pub api_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: get("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(get("PORT"), "PORT", 8080)?,

            live_ws_url: get("POLYMARKET_LIVE_WS_URL").unwrap_or_else(|| LIVE_DATA_WS_URL.into()),
            feed_enabled: parse_or(get("FEED_ENABLED"), "FEED_ENABLED", true)?,

            profile_stats_url: get("PROFILE_STATS_URL").unwrap_or_else(|| PROFILE_STATS_URL.into()),
            external_call_timeout: Duration::from_secs(positive_or(
                get("EXTERNAL_CALL_TIMEOUT_SECS"),
                "EXTERNAL_CALL_TIMEOUT_SECS",
                10,
            )?),
            wallet_cache_ttl: Duration::from_secs(parse_or(
                get("WALLET_CACHE_TTL_SECS"),
                "WALLET_CACHE_TTL_SECS",
                300,
            )?),
            wallet_cache_capacity: positive_or(get("WALLET_CACHE_CAPACITY"), "WALLET_CACHE_CAPACITY", 10_000)?,
            enrich_on_ingest: parse_or(get("ENRICH_ON_INGEST"), "ENRICH_ON_INGEST", true)?,

            refresh_interval: Duration::from_secs(positive_or(
                get("REFRESH_INTERVAL_SECS"),
                "REFRESH_INTERVAL_SECS",
                10,
            )?),
            refresh_batch_size: positive_or(get("REFRESH_BATCH_SIZE"), "REFRESH_BATCH_SIZE", 10)?,
            refresh_max_bet_count: parse_or(get("REFRESH_MAX_BET_COUNT"), "REFRESH_MAX_BET_COUNT", 50)?,
            refresh_pacing: Duration::from_millis(parse_or(
                get("REFRESH_PACING_MS"),
                "REFRESH_PACING_MS",
                500,
            )?),

            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_ids: get("TELEGRAM_CHAT_IDS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            api_token: get("API_TOKEN"),
        })
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            interval: self.refresh_interval,
            batch_size: self.refresh_batch_size,
            max_bet_count: self.refresh_max_bet_count,
            pacing: self.refresh_pacing,
        }
    }

    /// Notification config to seed the store with when none is persisted.
    pub fn notification_seed(&self) -> Option<NotificationConfig> {
        let token = self.telegram_bot_token.clone()?;
        Some(NotificationConfig {
            enabled: !self.telegram_chat_ids.is_empty(),
            telegram_bot_token: token,
            telegram_chat_ids: self.telegram_chat_ids.clone(),
            notify_big_trades: true,
            notify_fresh_wallets: true,
            ..NotificationConfig::default()
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}={value}: {e}")),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but zero and negative values are rejected.
fn positive_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + PartialOrd + Default + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = parse_or(raw, key, default)?;
    if value <= T::default() {
        anyhow::bail!("{key} must be positive, got {value}");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/pw")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.live_ws_url, LIVE_DATA_WS_URL);
        assert!(config.feed_enabled);
        assert_eq!(config.wallet_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.wallet_cache_capacity, 10_000);
        assert_eq!(config.refresh_batch_size, 10);
        assert_eq!(config.refresh_max_bet_count, 50);
        assert_eq!(config.refresh_pacing, Duration::from_millis(500));
        assert!(config.api_token.is_none());
        assert!(config.notification_seed().is_none());
    }

    #[test]
    fn test_database_url_required() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).is_err());
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let result = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pw"),
            ("REFRESH_BATCH_SIZE", "ten"),
        ]));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("REFRESH_BATCH_SIZE"));

        for (key, value) in [
            ("REFRESH_INTERVAL_SECS", "0"),
            ("REFRESH_BATCH_SIZE", "-1"),
            ("REFRESH_BATCH_SIZE", "0"),
            ("EXTERNAL_CALL_TIMEOUT_SECS", "0"),
            ("WALLET_CACHE_CAPACITY", "0"),
        ] {
            let result = AppConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/pw"),
                (key, value),
            ]));
            let err = result.unwrap_err().to_string();
            assert!(err.contains(key), "{key}={value}: {err}");
        }
    }

    #[test]
    fn test_telegram_seed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pw"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_IDS", "42, ,-100"),
        ]))
        .unwrap();

        let seed = config.notification_seed().unwrap();
        assert!(seed.is_configured());
        assert_eq!(seed.telegram_chat_ids, vec!["42", "-100"]);
    }
}
