use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::cache::WalletCache;
use super::freshness::{calculate_confidence, classify, risk_signals};
use crate::db::Store;
use crate::models::{
    shorten_address, FreshWalletSignal, FreshnessThresholds, TradeEvent, WalletProfile,
};
use crate::polymarket::{StatsError, WalletStatsSource};
use crate::services::settings::SettingsHandle;

/// Wallet freshness analyzer.
///
/// Lookups resolve cache → store → stats endpoint. Every returned profile is
/// reclassified against the thresholds in effect at call time.
pub struct Analyzer {
    source: Arc<dyn WalletStatsSource>,
    store: Arc<dyn Store>,
    settings: SettingsHandle,
    cache: WalletCache,
    call_timeout: Duration,
}

impl Analyzer {
    pub fn new(
        source: Arc<dyn WalletStatsSource>,
        store: Arc<dyn Store>,
        settings: SettingsHandle,
        cache: WalletCache,
        call_timeout: Duration,
    ) -> Self {
        Self {
            source,
            store,
            settings,
            cache,
            call_timeout,
        }
    }

    /// Profile for `address`. Never fails: lookup errors yield the unknown
    /// profile, which is neither cached nor persisted.
    pub async fn analyze(&self, address: &str) -> WalletProfile {
        let thresholds = self.settings.thresholds_snapshot().await;

        if address.is_empty() {
            return WalletProfile::unknown(address, thresholds.max_fresh_threshold());
        }

        if let Some(profile) = self.known_profile(address, &thresholds).await {
            return profile;
        }

        match self.fetch_profile(address).await {
            Ok(mut profile) => {
                classify(&mut profile, &thresholds);
                if let Err(e) = self.store.save_wallet(&profile).await {
                    tracing::error!(wallet = %shorten_address(address), error = %e, "Failed to save wallet");
                }
                self.cache.insert(profile.clone()).await;
                profile
            }
            Err(e) => {
                tracing::warn!(wallet = %shorten_address(address), error = %e, "Wallet stats lookup failed");
                WalletProfile::unknown(address, thresholds.max_fresh_threshold())
            }
        }
    }

    /// Forced lookup that bypasses cache and store, then writes the result
    /// to the cache and the store.
    pub async fn refresh(&self, address: &str) -> Result<WalletProfile, StatsError> {
        let thresholds = self.settings.thresholds_snapshot().await;

        let mut profile = self.fetch_profile(address).await?;
        classify(&mut profile, &thresholds);

        self.cache.insert(profile.clone()).await;
        if let Err(e) = self.store.save_wallet(&profile).await {
            tracing::error!(wallet = %shorten_address(address), error = %e, "Failed to save refreshed wallet");
        }

        tracing::debug!(
            wallet = %shorten_address(address),
            bet_count = profile.bet_count,
            join_date = %profile.join_date,
            fresh = profile.is_fresh,
            "Wallet refreshed"
        );
        Ok(profile)
    }

    /// Enrich a trade with its wallet's freshness signal.
    ///
    /// Returns `None` (event untouched) when the trade has no wallet, is
    /// below the minimum notional, or the wallet is not fresh.
    pub async fn analyze_trade(&self, event: &mut TradeEvent) -> Option<FreshWalletSignal> {
        self.score_trade(event, true).await
    }

    /// [`Analyzer::analyze_trade`] restricted to wallets already in the cache
    /// or store. Unseen wallets are left to the background refresher.
    pub async fn enrich_from_known(&self, event: &mut TradeEvent) -> Option<FreshWalletSignal> {
        self.score_trade(event, false).await
    }

    async fn score_trade(&self, event: &mut TradeEvent, allow_lookup: bool) -> Option<FreshWalletSignal> {
        if event.wallet_address.is_empty() {
            return None;
        }

        let config = self.settings.config_snapshot().await;
        let notional = event.notional();
        if notional < config.thresholds.min_trade_size() {
            return None;
        }

        let profile = if allow_lookup {
            self.analyze(&event.wallet_address).await
        } else {
            self.known_profile(&event.wallet_address, &config.thresholds).await?
        };
        if !profile.is_fresh {
            return None;
        }

        let (confidence, factors) = calculate_confidence(&profile, notional);
        let signal = FreshWalletSignal {
            confidence,
            factors,
            triggered: confidence >= config.alert_threshold,
        };

        event.risk_signals = risk_signals(&profile, notional);
        event.risk_score = confidence;
        event.is_fresh_wallet = true;
        event.fresh_wallet_signal = Some(signal.clone());

        tracing::info!(
            wallet = %shorten_address(&event.wallet_address),
            bet_count = profile.bet_count,
            level = %profile.freshness_level,
            confidence,
            notional = %notional.round_dp(2),
            "Fresh wallet trade detected"
        );

        event.wallet_profile = Some(profile);
        Some(signal)
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Cache, then store. Only analyzed profiles count; the stats endpoint
    /// is never called.
    async fn known_profile(
        &self,
        address: &str,
        thresholds: &FreshnessThresholds,
    ) -> Option<WalletProfile> {
        if let Some(mut profile) = self.cache.get(address).await {
            classify(&mut profile, thresholds);
            return Some(profile);
        }

        match self.store.get_wallet(address).await {
            Ok(Some(mut profile)) if profile.is_analyzed() => {
                classify(&mut profile, thresholds);
                self.cache.insert(profile.clone()).await;
                tracing::debug!(
                    wallet = %shorten_address(address),
                    bet_count = profile.bet_count,
                    level = %profile.freshness_level,
                    "Wallet loaded from store"
                );
                Some(profile)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(wallet = %shorten_address(address), error = %e, "Wallet store lookup failed");
                None
            }
        }
    }

    async fn fetch_profile(&self, address: &str) -> Result<WalletProfile, StatsError> {
        metrics::counter!("wallet_lookups_total").increment(1);

        let result = tokio::time::timeout(self.call_timeout, self.source.fetch_stats(address))
            .await
            .unwrap_or(Err(StatsError::Timeout));

        let stats = result.inspect_err(|_| {
            metrics::counter!("wallet_lookup_failures_total").increment(1);
        })?;

        Ok(WalletProfile {
            address: address.to_string(),
            bet_count: stats.trades,
            join_date: stats.join_date,
            freshness_level: Default::default(),
            is_fresh: false,
            analyzed_at: Utc::now(),
            fresh_threshold: 0,
        })
    }
}
