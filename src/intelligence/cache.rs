use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::WalletProfile;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
struct CachedProfile {
    profile: WalletProfile,
    expires_at: Instant,
}

impl CachedProfile {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Bounded TTL cache of wallet profiles keyed by address.
///
/// On overflow, expired entries go first, then half of whatever remains
/// in map order.
#[derive(Debug)]
pub struct WalletCache {
    entries: RwLock<HashMap<String, CachedProfile>>,
    ttl: Duration,
    capacity: usize,
}

impl WalletCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(2),
        }
    }

    /// Unexpired profile for `address`, cloned out of the lock.
    pub async fn get(&self, address: &str) -> Option<WalletProfile> {
        let entries = self.entries.read().await;
        let cached = entries.get(address)?;
        if cached.is_expired(Instant::now()) {
            return None;
        }
        Some(cached.profile.clone())
    }

    pub async fn insert(&self, profile: WalletProfile) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        if entries.len() >= self.capacity && !entries.contains_key(&profile.address) {
            entries.retain(|_, cached| !cached.is_expired(now));

            if entries.len() >= self.capacity {
                let victims: Vec<String> = entries
                    .keys()
                    .take(self.capacity / 2)
                    .cloned()
                    .collect();
                for key in victims {
                    entries.remove(&key);
                }
                tracing::debug!(remaining = entries.len(), "Wallet cache overflow, evicted half");
            }
        }

        entries.insert(
            profile.address.clone(),
            CachedProfile {
                profile,
                expires_at: now + self.ttl,
            },
        );
        metrics::gauge!("wallet_cache_entries").set(entries.len() as f64);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        metrics::gauge!("wallet_cache_entries").set(0.0);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for WalletCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_profile(address: &str, bet_count: i32) -> WalletProfile {
        let mut profile = WalletProfile::unknown(address, 20);
        profile.bet_count = bet_count;
        profile
    }

    #[tokio::test]
    async fn test_get_returns_inserted_profile() {
        let cache = WalletCache::default();
        cache.insert(make_profile("0xa", 4)).await;

        let hit = cache.get("0xa").await.unwrap();
        assert_eq!(hit.bet_count, 4);
        assert!(cache.get("0xb").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = WalletCache::new(Duration::from_secs(300), 100);
        cache.insert(make_profile("0xa", 1)).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("0xa").await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("0xa").await.is_none());
    }

    #[tokio::test]
    async fn test_overflow_without_expired_entries_evicts_half() {
        let capacity = 100;
        let cache = WalletCache::new(Duration::from_secs(300), capacity);
        for i in 0..capacity {
            cache.insert(make_profile(&format!("0x{i}"), i as i32)).await;
        }
        assert_eq!(cache.len().await, capacity);

        cache.insert(make_profile("0xnew", 1)).await;

        let len = cache.len().await;
        assert!(len < capacity, "cache size {len} not below capacity");
        assert_eq!(len, capacity - capacity / 2 + 1);
        assert!(cache.get("0xnew").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_purges_expired_first() {
        let cache = WalletCache::new(Duration::from_secs(60), 10);
        for i in 0..5 {
            cache.insert(make_profile(&format!("0xold{i}"), 1)).await;
        }
        tokio::time::advance(Duration::from_secs(61)).await;
        for i in 0..5 {
            cache.insert(make_profile(&format!("0xfresh{i}"), 1)).await;
        }

        cache.insert(make_profile("0xnext", 1)).await;

        assert_eq!(cache.len().await, 6);
        for i in 0..5 {
            assert!(cache.get(&format!("0xfresh{i}")).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_reinsert_existing_key_at_capacity_does_not_evict() {
        let cache = WalletCache::new(Duration::from_secs(300), 4);
        for i in 0..4 {
            cache.insert(make_profile(&format!("0x{i}"), 1)).await;
        }
        cache.insert(make_profile("0x2", 9)).await;

        assert_eq!(cache.len().await, 4);
        assert_eq!(cache.get("0x2").await.unwrap().bet_count, 9);
    }
}
