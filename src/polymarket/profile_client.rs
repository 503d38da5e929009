use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

pub const PROFILE_STATS_URL: &str = "https://polymarket.com/api/profile/stats";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stats endpoint returned status {0}")]
    Status(u16),

    #[error("malformed stats response: {0}")]
    Decode(String),

    #[error("stats lookup timed out")]
    Timeout,
}

/// Body of `GET /api/profile/stats?proxyAddress=...`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    #[serde(default)]
    pub trades: i32,
    #[serde(default)]
    pub largest_win: f64,
    #[serde(default)]
    pub views: i64,
    /// e.g. "Dec 2025"
    #[serde(default)]
    pub join_date: String,
}

/// Source of per-wallet trading statistics.
#[async_trait]
pub trait WalletStatsSource: Send + Sync {
    async fn fetch_stats(&self, address: &str) -> Result<ProfileStats, StatsError>;
}

#[derive(Debug, Clone)]
pub struct ProfileClient {
    http: Client,
    base_url: String,
}

impl ProfileClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StatsError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl WalletStatsSource for ProfileClient {
    async fn fetch_stats(&self, address: &str) -> Result<ProfileStats, StatsError> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[("proxyAddress", address)])
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StatsError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        parse_stats(&body)
    }
}

pub fn parse_stats(body: &str) -> Result<ProfileStats, StatsError> {
    serde_json::from_str(body).map_err(|e| StatsError::Decode(e.to_string()))
}
