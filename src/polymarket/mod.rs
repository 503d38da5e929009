pub mod profile_client;
pub mod types;

pub use profile_client::{ProfileClient, ProfileStats, StatsError, WalletStatsSource, PROFILE_STATS_URL};
pub use types::{LiveMessage, LiveSubscribe, LiveTrade, LIVE_DATA_WS_URL};
