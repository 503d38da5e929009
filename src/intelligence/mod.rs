pub mod analyzer;
pub mod cache;
pub mod freshness;

pub use analyzer::Analyzer;
pub use cache::WalletCache;
pub use freshness::{calculate_confidence, classify, determine_freshness_level, risk_signals};
