//! Short-TTL route cache with per-key single-flight locking.

use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::{Amount, Route, TokenPair};

/// Cache key: token pair plus the bucket the requested amount falls in.
///
/// Bucketing keeps nearby amounts sharing one cached route instead of
/// recomputing per dollar of variation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pair: String,
    bucket: i64,
}

impl RouteKey {
    pub fn new(pair: &TokenPair, amount: Amount, bucket_size: Amount) -> Self {
        let bucket = if bucket_size > Amount::ZERO {
            (amount / bucket_size).trunc().to_i64().unwrap_or(i64::MAX)
        } else {
            0
        };
        Self {
            pair: pair.as_str().to_string(),
            bucket,
        }
    }
}

struct CachedRoute {
    route: Route,
    inserted_at: Instant,
}

/// Routes cached per `(pair, amount bucket)` with a short TTL.
///
/// Locking is per key: concurrent requests for the same key serialize on
/// that key's mutex and share the first computation's result, while
/// unrelated keys never contend with each other.
pub struct RouteCache {
    entries: DashMap<RouteKey, CachedRoute>,
    locks: DashMap<RouteKey, Arc<Mutex<()>>>,
    ttl: Duration,
}

impl RouteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
            ttl,
        }
    }

    /// A fresh cached route for the key, if one exists.
    pub fn get(&self, key: &RouteKey) -> Option<Route> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.route.clone())
        } else {
            drop(entry);
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&self, key: RouteKey, route: Route) {
        self.entries.insert(
            key,
            CachedRoute {
                route,
                inserted_at: Instant::now(),
            },
        );
    }

    /// The single-flight lock for a key. At most one route computation per
    /// key is ever in flight; everyone else awaits it.
    pub fn key_lock(&self, key: &RouteKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a key's lock entry once its computation has finished, so the
    /// lock map does not grow with every key the session ever saw.
    ///
    /// Tasks already waiting hold their own `Arc` clone and still serialize
    /// on it; later arrivals either hit the cache or mint a fresh lock.
    pub fn release_lock(&self, key: &RouteKey) {
        self.locks.remove(key);
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chain, DexId, LiquidityPool, RouteSegment};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn route(amount: Amount) -> Route {
        let pool = LiquidityPool {
            pool_id: "a".into(),
            chain: Chain::from("ethereum"),
            dex: DexId::from("uniswap_v3"),
            pair: TokenPair::from("ETH/USDC"),
            liquidity: dec!(10000000),
        };
        let slippage = pool.slippage_for(amount);
        Route::new(
            vec![RouteSegment {
                min_amount_out: amount * (Decimal::ONE - slippage),
                slippage_pct: slippage,
                pool,
                amount_in: amount,
            }],
            amount,
            dec!(0.01),
        )
        .unwrap()
    }

    #[test]
    fn amounts_in_same_bucket_share_a_key() {
        let pair = TokenPair::from("ETH/USDC");
        let a = RouteKey::new(&pair, dec!(1050), dec!(1000));
        let b = RouteKey::new(&pair, dec!(1900), dec!(1000));
        let c = RouteKey::new(&pair, dec!(2100), dec!(1000));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache = RouteCache::new(Duration::from_millis(0));
        let key = RouteKey::new(&TokenPair::from("ETH/USDC"), dec!(1000), dec!(1000));
        cache.insert(key.clone(), route(dec!(1000)));

        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn released_locks_do_not_accumulate() {
        let cache = RouteCache::new(Duration::from_secs(30));
        let pair = TokenPair::from("ETH/USDC");
        for i in 0..10 {
            let key = RouteKey::new(&pair, Decimal::from(1000 * (i + 1)), dec!(1000));
            let lock = cache.key_lock(&key);
            drop(lock);
            cache.release_lock(&key);
        }
        assert_eq!(cache.lock_count(), 0);
    }

    #[test]
    fn fresh_entries_are_returned() {
        let cache = RouteCache::new(Duration::from_secs(30));
        let key = RouteKey::new(&TokenPair::from("ETH/USDC"), dec!(1000), dec!(1000));
        let r = route(dec!(1000));
        cache.insert(key.clone(), r.clone());

        assert_eq!(cache.get(&key), Some(r));
    }
}
