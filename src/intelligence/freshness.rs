use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{FreshnessLevel, FreshnessThresholds, WalletProfile};

pub const BASE_CONFIDENCE: f64 = 0.5;
pub const INSIDER_BONUS: f64 = 0.3;
pub const FRESH_WALLET_BONUS: f64 = 0.2;
pub const NEWBIE_BONUS: f64 = 0.1;
pub const ZERO_BETS_BONUS: f64 = 0.1;
pub const LARGE_TRADE_BONUS: f64 = 0.1;
/// Notional (USDC) above which a trade counts as large.
pub const LARGE_TRADE_THRESHOLD: i64 = 10_000;

/// Map a bet count to its freshness band.
///
/// Standard bands are checked in ascending order (insider, fresh, newbie).
/// A positive custom cut-off only labels counts that miss all three
/// standard bands but still fall at or below it. Negative counts
/// (unanalyzed) are never fresh.
pub fn determine_freshness_level(bet_count: i32, thresholds: &FreshnessThresholds) -> FreshnessLevel {
    if bet_count < 0 {
        return FreshnessLevel::None;
    }

    if bet_count <= thresholds.insider() {
        return FreshnessLevel::Insider;
    }
    if bet_count <= thresholds.fresh() {
        return FreshnessLevel::Fresh;
    }
    if bet_count <= thresholds.newbie() {
        return FreshnessLevel::Newbie;
    }

    match thresholds.custom() {
        Some(custom) if bet_count <= custom => FreshnessLevel::Custom,
        _ => FreshnessLevel::None,
    }
}

/// Recompute the derived classification fields against `thresholds`.
pub fn classify(profile: &mut WalletProfile, thresholds: &FreshnessThresholds) {
    profile.freshness_level = determine_freshness_level(profile.bet_count, thresholds);
    profile.is_fresh = profile.freshness_level.is_fresh();
    profile.fresh_threshold = thresholds.max_fresh_threshold();
}

/// Confidence in [0, 1] that a trade comes from an informed fresh wallet,
/// plus the contributing factors keyed by name.
pub fn calculate_confidence(
    profile: &WalletProfile,
    notional: Decimal,
) -> (f64, BTreeMap<String, f64>) {
    let mut factors = BTreeMap::new();
    let mut confidence = BASE_CONFIDENCE;
    factors.insert("base".to_string(), BASE_CONFIDENCE);

    let band = match profile.freshness_level {
        FreshnessLevel::Insider => Some(("insider_wallet", INSIDER_BONUS)),
        FreshnessLevel::Fresh => Some(("fresh_wallet", FRESH_WALLET_BONUS)),
        FreshnessLevel::Newbie => Some(("newbie_wallet", NEWBIE_BONUS)),
        FreshnessLevel::Custom => Some(("custom_fresh", NEWBIE_BONUS)),
        FreshnessLevel::None => None,
    };
    if let Some((key, bonus)) = band {
        factors.insert(key.to_string(), bonus);
        confidence += bonus;
    }

    if profile.bet_count == 0 {
        factors.insert("zero_bets".to_string(), ZERO_BETS_BONUS);
        confidence += ZERO_BETS_BONUS;
    }

    if notional > Decimal::from(LARGE_TRADE_THRESHOLD) {
        factors.insert("large_trade".to_string(), LARGE_TRADE_BONUS);
        confidence += LARGE_TRADE_BONUS;
    }

    (confidence.clamp(0.0, 1.0), factors)
}

/// Human-readable annotations attached to an enriched event.
pub fn risk_signals(profile: &WalletProfile, notional: Decimal) -> Vec<String> {
    let mut signals = Vec::new();
    let n = profile.bet_count;

    match profile.freshness_level {
        FreshnessLevel::Insider => signals.push(format!("🚨 Fresh Insider ({n} bets)")),
        FreshnessLevel::Fresh => signals.push(format!("🔥 Fresh Wallet ({n} bets)")),
        FreshnessLevel::Newbie => signals.push(format!("⚡ Fresh Newbie ({n} bets)")),
        FreshnessLevel::Custom => signals.push(format!("✨ Fresher ({n} bets)")),
        FreshnessLevel::None => {}
    }

    if notional >= Decimal::from(LARGE_TRADE_THRESHOLD) {
        let value = notional.round_dp(2).to_f64().unwrap_or_default();
        signals.push(format!("💰 Large Position (${value:.2})"));
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_profile(bet_count: i32, level: FreshnessLevel) -> WalletProfile {
        WalletProfile {
            address: "0xabc".into(),
            bet_count,
            join_date: String::new(),
            freshness_level: level,
            is_fresh: level.is_fresh(),
            analyzed_at: Utc::now(),
            fresh_threshold: 20,
        }
    }

    fn severity(level: FreshnessLevel) -> u8 {
        match level {
            FreshnessLevel::Insider => 4,
            FreshnessLevel::Fresh => 3,
            FreshnessLevel::Newbie => 2,
            FreshnessLevel::Custom => 1,
            FreshnessLevel::None => 0,
        }
    }

    #[test]
    fn test_default_bands() {
        let t = FreshnessThresholds::default();
        assert_eq!(determine_freshness_level(0, &t), FreshnessLevel::Insider);
        assert_eq!(determine_freshness_level(3, &t), FreshnessLevel::Insider);
        assert_eq!(determine_freshness_level(4, &t), FreshnessLevel::Fresh);
        assert_eq!(determine_freshness_level(15, &t), FreshnessLevel::Newbie);
        assert_eq!(determine_freshness_level(25, &t), FreshnessLevel::None);
        assert_eq!(determine_freshness_level(-1, &t), FreshnessLevel::None);
    }

    #[test]
    fn test_custom_band_only_beyond_standard_bands() {
        let t = FreshnessThresholds {
            custom_max_bets: 40,
            ..FreshnessThresholds::default()
        };
        assert_eq!(determine_freshness_level(2, &t), FreshnessLevel::Insider);
        assert_eq!(determine_freshness_level(18, &t), FreshnessLevel::Newbie);
        assert_eq!(determine_freshness_level(30, &t), FreshnessLevel::Custom);
        assert_eq!(determine_freshness_level(41, &t), FreshnessLevel::None);
        assert_eq!(t.max_fresh_threshold(), 40);
    }

    #[test]
    fn test_severity_non_increasing_with_bet_count() {
        let t = FreshnessThresholds {
            custom_max_bets: 35,
            ..FreshnessThresholds::default()
        };
        let mut prev = u8::MAX;
        for count in 0..60 {
            let s = severity(determine_freshness_level(count, &t));
            assert!(s <= prev, "severity increased at bet count {count}");
            prev = s;
        }
    }

    #[test]
    fn test_classify_sets_derived_fields() {
        let t = FreshnessThresholds::default();
        let mut profile = make_profile(0, FreshnessLevel::None);
        classify(&mut profile, &t);
        assert_eq!(profile.freshness_level, FreshnessLevel::Insider);
        assert!(profile.is_fresh);
        assert_eq!(profile.fresh_threshold, 20);

        profile.bet_count = 25;
        classify(&mut profile, &t);
        assert_eq!(profile.freshness_level, FreshnessLevel::None);
        assert!(!profile.is_fresh);
    }

    #[test]
    fn test_confidence_insider_zero_bets_large_trade_clamps() {
        let profile = make_profile(0, FreshnessLevel::Insider);
        let (confidence, factors) = calculate_confidence(&profile, Decimal::from(20_000));
        // 0.5 + 0.3 + 0.1 + 0.1
        assert_eq!(confidence, 1.0);
        assert_eq!(factors.len(), 4);
        assert!(factors.contains_key("insider_wallet"));
        assert!(factors.contains_key("zero_bets"));
        assert!(factors.contains_key("large_trade"));
    }

    #[test]
    fn test_confidence_newbie_small_trade() {
        let profile = make_profile(15, FreshnessLevel::Newbie);
        let (confidence, factors) = calculate_confidence(&profile, Decimal::from(500));
        assert!((confidence - 0.6).abs() < 1e-9);
        assert_eq!(factors.get("newbie_wallet"), Some(&NEWBIE_BONUS));
        assert!(!factors.contains_key("large_trade"));
    }

    #[test]
    fn test_confidence_large_trade_is_strictly_above_threshold() {
        let profile = make_profile(8, FreshnessLevel::Fresh);
        let (at, _) = calculate_confidence(&profile, Decimal::from(10_000));
        let (above, _) = calculate_confidence(&profile, Decimal::from(10_001));
        assert!((at - 0.7).abs() < 1e-9);
        assert!((above - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_risk_signals() {
        let profile = make_profile(2, FreshnessLevel::Insider);
        let signals = risk_signals(&profile, Decimal::from(12_500));
        assert_eq!(signals.len(), 2);
        assert!(signals[0].contains("Fresh Insider (2 bets)"));
        assert!(signals[1].contains("Large Position ($12500.00)"));

        let custom = make_profile(30, FreshnessLevel::Custom);
        let signals = risk_signals(&custom, Decimal::from(150));
        assert_eq!(signals.len(), 1);
        assert!(signals[0].contains("Fresher (30 bets)"));
    }
}
