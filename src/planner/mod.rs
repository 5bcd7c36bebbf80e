//! Liquidity-aware route planning and flash-loan funding selection.
//!
//! Given a requested amount and the candidate pools for a pair, the planner
//! produces a route that stays under the slippage cap, or declares the
//! request infeasible. It also assembles the funding stack, combining
//! flash-loan providers when a single provider's capacity is insufficient.

pub mod cache;

pub use cache::{RouteCache, RouteKey};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::{
    Amount, Chain, FlashLoanQuote, FundingSource, LiquidityPool, Pct, Route, RouteSegment,
    TokenPair,
};
use crate::error::EngineError;
use crate::port::FlashLoanProvider;

/// Configuration for the route planner.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    /// Aggregate slippage cap as a fraction (0.005 = 0.5%).
    #[serde(default = "default_max_slippage")]
    pub max_slippage: Pct,

    /// Maximum pools to split across, and maximum flash-loan providers to
    /// combine.
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,

    /// Route cache time-to-live in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Amount bucket width for route cache keys, in USD.
    #[serde(default = "default_amount_bucket")]
    pub amount_bucket: Amount,
}

fn default_max_slippage() -> Pct {
    Decimal::new(5, 3) // 0.5%
}

fn default_max_paths() -> usize {
    3
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_amount_bucket() -> Amount {
    Decimal::from(1000)
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_slippage: default_max_slippage(),
            max_paths: default_max_paths(),
            cache_ttl_secs: default_cache_ttl_secs(),
            amount_bucket: default_amount_bucket(),
        }
    }
}

/// Splits amounts across pools and selects flash-loan funding.
pub struct RoutePlanner {
    config: PlannerConfig,
    cache: RouteCache,
}

impl RoutePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            config,
            cache: RouteCache::new(ttl),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Greedily allocate `requested` across the deepest pools.
    ///
    /// Each segment is capped at what its pool can absorb under the
    /// slippage cap, rounded down to cents so division rounding can never
    /// nudge a segment over it. Anything left unallocated after `max_paths`
    /// pools makes the request infeasible.
    pub fn plan_route(
        &self,
        requested: Amount,
        pools: &[LiquidityPool],
    ) -> Result<Route, EngineError> {
        if requested <= Amount::ZERO {
            return Err(EngineError::RouteInfeasible {
                requested,
                max_slippage: self.config.max_slippage,
            });
        }

        let mut candidates: Vec<&LiquidityPool> = pools.iter().collect();
        candidates.sort_by(|a, b| b.liquidity.cmp(&a.liquidity));
        candidates.truncate(self.config.max_paths);

        let mut segments = Vec::new();
        let mut remaining = requested;
        for pool in candidates {
            if remaining <= Amount::ZERO {
                break;
            }
            let absorbable = pool
                .max_absorbable(self.config.max_slippage)
                .round_dp_with_strategy(2, RoundingStrategy::ToZero);
            let allocation = remaining.min(absorbable);
            if allocation <= Amount::ZERO {
                continue;
            }
            let slippage = pool.slippage_for(allocation);
            segments.push(RouteSegment {
                min_amount_out: allocation * (Decimal::ONE - slippage),
                slippage_pct: slippage,
                pool: pool.clone(),
                amount_in: allocation,
            });
            remaining -= allocation;
        }

        if remaining > Amount::ZERO {
            debug!(
                requested = %requested,
                unallocated = %remaining,
                "Route infeasible under slippage cap"
            );
            return Err(EngineError::RouteInfeasible {
                requested,
                max_slippage: self.config.max_slippage,
            });
        }

        Route::new(segments, requested, self.config.max_slippage).map_err(|_| {
            EngineError::RouteInfeasible {
                requested,
                max_slippage: self.config.max_slippage,
            }
        })
    }

    /// Cached route lookup with per-key single-flight computation.
    ///
    /// Concurrent callers for the same `(pair, bucket)` key await the first
    /// computation rather than duplicating it; unrelated keys never
    /// serialize against each other.
    pub async fn route_for(
        &self,
        pair: &TokenPair,
        requested: Amount,
        pools: &[LiquidityPool],
    ) -> Result<Route, EngineError> {
        let key = RouteKey::new(pair, requested, self.config.amount_bucket);
        if let Some(route) = self.cache.get(&key) {
            return Ok(route);
        }

        let lock = self.cache.key_lock(&key);
        let _guard = lock.lock().await;
        // Another task may have computed it while we waited.
        if let Some(route) = self.cache.get(&key) {
            self.cache.release_lock(&key);
            return Ok(route);
        }

        let route = match self.plan_route(requested, pools) {
            Ok(route) => route,
            Err(err) => {
                self.cache.release_lock(&key);
                return Err(err);
            }
        };
        self.cache.insert(key.clone(), route.clone());
        self.cache.release_lock(&key);
        Ok(route)
    }

    /// Assemble a flash-loan funding stack for `amount`.
    ///
    /// Providers are quoted, unviable quotes are skipped (the fallback path
    /// for a declined or unreachable provider), and viable quotes are
    /// combined cheapest-fee-first up to `max_paths`. Exhausting every
    /// provider yields an error string for a `viable = false` evaluation,
    /// never a panic or an aborted cycle.
    pub async fn select_funding(
        &self,
        token: &str,
        amount: Amount,
        chain: &Chain,
        providers: &[Arc<dyn FlashLoanProvider>],
    ) -> Result<FundingSource, String> {
        if providers.is_empty() {
            return Err("no flash loan providers configured".to_string());
        }

        let mut quotes: Vec<FlashLoanQuote> = Vec::new();
        for provider in providers {
            let quote = provider.quote(token, amount, chain).await;
            if quote.viable && quote.max_amount > Amount::ZERO {
                quotes.push(quote);
            } else {
                debug!(
                    provider = provider.name(),
                    reason = quote.reason.as_deref().unwrap_or("no capacity"),
                    "Skipping provider"
                );
            }
        }
        if quotes.is_empty() {
            return Err("all flash loan providers declined".to_string());
        }

        quotes.sort_by(|a, b| a.fee_pct.cmp(&b.fee_pct));

        let mut stack = Vec::new();
        let mut remaining = amount;
        for quote in quotes.into_iter().take(self.config.max_paths) {
            if remaining <= Amount::ZERO {
                break;
            }
            let share = remaining.min(quote.max_amount);
            stack.push(FlashLoanQuote {
                fee_amount: share * quote.fee_pct,
                ..quote
            });
            remaining -= share;
        }

        if remaining > Amount::ZERO {
            return Err(format!(
                "flash loan capacity exhausted: {remaining} of {amount} unfunded"
            ));
        }

        Ok(FundingSource::FlashLoan(stack))
    }
}
