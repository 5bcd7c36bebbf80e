//! Routes: liquidity-aware splits of a funded amount across pools.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{Chain, DexId, TokenPair};
use super::money::{Amount, Pct};

/// A candidate liquidity pool the planner may allocate against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub pool_id: String,
    pub chain: Chain,
    pub dex: DexId,
    pub pair: TokenPair,
    /// Liquidity in USD available to trade against.
    pub liquidity: Amount,
}

impl LiquidityPool {
    /// Price impact of pushing `amount` through this pool.
    ///
    /// Constant-product-shaped heuristic: `amount / (liquidity + amount)`,
    /// monotonic in `amount` and bounded below 1. Curve-exact math can
    /// replace this behind the same signature.
    pub fn slippage_for(&self, amount: Amount) -> Pct {
        if self.liquidity <= Amount::ZERO || amount <= Amount::ZERO {
            return Pct::ZERO;
        }
        amount / (self.liquidity + amount)
    }

    /// Largest amount this pool can absorb with slippage at or below `cap`.
    ///
    /// Inverse of `slippage_for`: `cap * L / (1 - cap)`.
    pub fn max_absorbable(&self, cap: Pct) -> Amount {
        if cap <= Pct::ZERO || cap >= Decimal::ONE || self.liquidity <= Amount::ZERO {
            return Amount::ZERO;
        }
        (cap * self.liquidity) / (Decimal::ONE - cap)
    }
}

/// One allocation of a route: an amount pushed through one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub pool: LiquidityPool,
    pub amount_in: Amount,
    pub min_amount_out: Amount,
    pub slippage_pct: Pct,
}

/// Errors produced when assembling a route from segments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("aggregate slippage {aggregate} exceeds cap {cap}")]
    SlippageExceeded { aggregate: Pct, cap: Pct },

    #[error("segments allocate {allocated}, requested {requested}")]
    AmountMismatch {
        allocated: Amount,
        requested: Amount,
    },

    #[error("route has no segments")]
    Empty,
}

/// An ordered, fully-allocated split of `requested_amount` across pools.
///
/// Construction enforces the two route invariants: segments sum exactly to
/// the requested amount, and the amount-weighted aggregate slippage stays at
/// or below the cap. A split that cannot satisfy both is infeasible and is
/// never represented as a `Route`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    segments: Vec<RouteSegment>,
    requested_amount: Amount,
    aggregate_slippage: Pct,
}

impl Route {
    pub fn new(
        segments: Vec<RouteSegment>,
        requested_amount: Amount,
        max_slippage: Pct,
    ) -> Result<Self, RouteError> {
        if segments.is_empty() {
            return Err(RouteError::Empty);
        }
        let allocated: Amount = segments.iter().map(|s| s.amount_in).sum();
        if allocated != requested_amount {
            return Err(RouteError::AmountMismatch {
                allocated,
                requested: requested_amount,
            });
        }
        let aggregate = Self::weighted_slippage(&segments, requested_amount);
        if aggregate > max_slippage {
            return Err(RouteError::SlippageExceeded {
                aggregate,
                cap: max_slippage,
            });
        }
        Ok(Self {
            segments,
            requested_amount,
            aggregate_slippage: aggregate,
        })
    }

    fn weighted_slippage(segments: &[RouteSegment], total: Amount) -> Pct {
        if total <= Amount::ZERO {
            return Pct::ZERO;
        }
        segments
            .iter()
            .map(|s| s.slippage_pct * s.amount_in)
            .sum::<Decimal>()
            / total
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn requested_amount(&self) -> Amount {
        self.requested_amount
    }

    /// Amount-weighted mean slippage across segments.
    pub fn aggregate_slippage(&self) -> Pct {
        self.aggregate_slippage
    }

    /// Slippage cost in USD for the requested amount.
    pub fn slippage_cost(&self) -> Amount {
        self.requested_amount * self.aggregate_slippage
    }
}
