//! Admission decisions and gas categorization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;

use super::ids::Fingerprint;
use super::money::Amount;

/// Network gas price tier.
///
/// Tiers carry their own minimum-net-profit floors in configuration;
/// `Extreme` always rejects regardless of profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasCategory {
    UltraLow,
    Low,
    Medium,
    High,
    Extreme,
}

impl fmt::Display for GasCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UltraLow => "ultra_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        };
        write!(f, "{s}")
    }
}

/// Tier boundaries in gwei, ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasTiers {
    pub ultra_low_max: Decimal,
    pub low_max: Decimal,
    pub medium_max: Decimal,
    pub high_max: Decimal,
}

impl Default for GasTiers {
    fn default() -> Self {
        Self {
            ultra_low_max: Decimal::from(10),
            low_max: Decimal::from(25),
            medium_max: Decimal::from(60),
            high_max: Decimal::from(120),
        }
    }
}

impl GasCategory {
    /// Categorize a gas price in gwei against tier boundaries.
    pub fn from_gwei(price_gwei: Decimal, tiers: &GasTiers) -> Self {
        if price_gwei <= tiers.ultra_low_max {
            Self::UltraLow
        } else if price_gwei <= tiers.low_max {
            Self::Low
        } else if price_gwei <= tiers.medium_max {
            Self::Medium
        } else if price_gwei <= tiers.high_max {
            Self::High
        } else {
            Self::Extreme
        }
    }
}

/// One gwei expressed in native token units.
const GWEI: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Point-in-time view of network gas conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasSnapshot {
    pub price_gwei: Decimal,
    /// USD price of the native token, for gas cost conversion.
    pub native_token_usd: Decimal,
    /// Expected time until the next block.
    pub next_block_eta: Duration,
}

impl GasSnapshot {
    /// USD cost of `gas_units` at this snapshot's gas price.
    pub fn cost_usd(&self, gas_units: u64) -> Amount {
        Decimal::from(gas_units) * self.price_gwei * GWEI * self.native_token_usd
    }
}

/// Point-in-time view of mempool congestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolSnapshot {
    pub pending_tx_count: u64,
    /// Congestion as a fraction of recent capacity (0.9 = heavily congested).
    pub congestion: Decimal,
}

impl Default for MempoolSnapshot {
    fn default() -> Self {
        Self {
            pending_tx_count: 0,
            congestion: Decimal::ZERO,
        }
    }
}

/// Admission verdict for one evaluated opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Admit,
    Reject,
    Wait,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Admit => "admit",
            Self::Reject => "reject",
            Self::Wait => "wait",
        };
        write!(f, "{s}")
    }
}

/// Outcome of the admission gate, derived fresh each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub fingerprint: Fingerprint,
    pub verdict: Verdict,
    pub reason: String,
    pub gas_category: GasCategory,
    /// Bounded wait before re-check; set only for `Wait` verdicts.
    pub wait: Option<Duration>,
    /// The profit floor the opportunity was held against.
    pub threshold: Amount,
}

impl AdmissionDecision {
    pub fn is_admit(&self) -> bool {
        self.verdict == Verdict::Admit
    }

    pub fn is_wait(&self) -> bool {
        self.verdict == Verdict::Wait
    }
}
