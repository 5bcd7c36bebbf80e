//! Opportunity type with builder pattern.
//!
//! An `Opportunity` is created by the detector once per cycle, is immutable
//! after construction, and is discarded at end of cycle unless admitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{Chain, DexId, Fingerprint, TokenPair};
use super::money::{Pct, Price};
use super::quote::PriceQuote;

/// Shape of a detected discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    /// Two-leg buy-low/sell-high between two venues.
    Simple,
    /// Three-leg A→B→C→A cycle.
    Triangular,
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Triangular => write!(f, "triangular"),
        }
    }
}

/// One traded leg of an opportunity, a copy of the quote it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityLeg {
    pub chain: Chain,
    pub dex: DexId,
    pub pair: TokenPair,
    pub price: Price,
}

impl OpportunityLeg {
    pub fn from_quote(quote: &PriceQuote) -> Self {
        Self {
            chain: quote.chain.clone(),
            dex: quote.dex.clone(),
            pair: quote.pair.clone(),
            price: quote.price,
        }
    }
}

/// Error returned when building an Opportunity fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpportunityBuildError {
    /// Fingerprint is required but was not provided.
    MissingFingerprint,
    /// At least two legs are required.
    TooFewLegs,
    /// Gross profit is required but was not provided.
    MissingGrossProfit,
}

impl fmt::Display for OpportunityBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFingerprint => write!(f, "fingerprint is required"),
            Self::TooFewLegs => write!(f, "an opportunity needs at least two legs"),
            Self::MissingGrossProfit => write!(f, "gross_profit_pct is required"),
        }
    }
}

impl std::error::Error for OpportunityBuildError {}

/// A detected price discrepancy.
///
/// Use `Opportunity::builder()` to construct instances. Legs are ordered in
/// trade order: for a simple opportunity the buy leg precedes the sell leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    fingerprint: Fingerprint,
    kind: OpportunityKind,
    legs: Vec<OpportunityLeg>,
    /// Gross spread as a fraction of the funded amount (0.008 = 0.8%).
    gross_profit_pct: Pct,
    detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Create a new builder for constructing an Opportunity.
    pub fn builder() -> OpportunityBuilder {
        OpportunityBuilder::new()
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn kind(&self) -> OpportunityKind {
        self.kind
    }

    pub fn legs(&self) -> &[OpportunityLeg] {
        &self.legs
    }

    /// Gross spread fraction before any cost is netted out.
    pub fn gross_profit_pct(&self) -> Pct {
        self.gross_profit_pct
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    /// Chain of the first leg. Cross-chain opportunities span several; this
    /// is the chain the funding transaction starts on.
    pub fn origin_chain(&self) -> &Chain {
        &self.legs[0].chain
    }

    /// Token pair of the first leg; for flash-loan grouping the borrowed
    /// token is this pair's base.
    pub fn primary_pair(&self) -> &TokenPair {
        &self.legs[0].pair
    }

    /// Whether any two legs sit on different chains.
    pub fn is_cross_chain(&self) -> bool {
        self.legs.iter().any(|l| l.chain != self.legs[0].chain)
    }

    /// Age of the opportunity at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.detected_at)
    }
}

/// Builder for constructing `Opportunity` instances.
#[derive(Debug, Default)]
pub struct OpportunityBuilder {
    fingerprint: Option<Fingerprint>,
    kind: Option<OpportunityKind>,
    legs: Vec<OpportunityLeg>,
    gross_profit_pct: Option<Pct>,
    detected_at: Option<DateTime<Utc>>,
}

impl OpportunityBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn kind(mut self, kind: OpportunityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Append a leg in trade order.
    pub fn leg(mut self, leg: OpportunityLeg) -> Self {
        self.legs.push(leg);
        self
    }

    pub fn gross_profit_pct(mut self, pct: Pct) -> Self {
        self.gross_profit_pct = Some(pct);
        self
    }

    /// Override the detection timestamp (defaults to now).
    pub fn detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = Some(at);
        self
    }

    /// Build the Opportunity.
    ///
    /// # Errors
    ///
    /// Returns `OpportunityBuildError` if any required field is missing or
    /// fewer than two legs were provided.
    pub fn build(self) -> Result<Opportunity, OpportunityBuildError> {
        let fingerprint = self
            .fingerprint
            .ok_or(OpportunityBuildError::MissingFingerprint)?;
        let gross_profit_pct = self
            .gross_profit_pct
            .ok_or(OpportunityBuildError::MissingGrossProfit)?;
        if self.legs.len() < 2 {
            return Err(OpportunityBuildError::TooFewLegs);
        }
        let kind = self.kind.unwrap_or(if self.legs.len() == 2 {
            OpportunityKind::Simple
        } else {
            OpportunityKind::Triangular
        });

        Ok(Opportunity {
            fingerprint,
            kind,
            legs: self.legs,
            gross_profit_pct,
            detected_at: self.detected_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn leg(chain: &str, dex: &str, price: Price) -> OpportunityLeg {
        OpportunityLeg {
            chain: Chain::from(chain),
            dex: DexId::from(dex),
            pair: TokenPair::from("ETH/USDC"),
            price,
        }
    }

    fn fingerprint() -> Fingerprint {
        Fingerprint::simple(
            &Chain::from("ethereum"),
            &TokenPair::from("ETH/USDC"),
            &DexId::from("uniswap_v3"),
            &DexId::from("sushiswap"),
        )
    }

    #[test]
    fn builder_creates_simple_opportunity() {
        let opp = Opportunity::builder()
            .fingerprint(fingerprint())
            .leg(leg("ethereum", "uniswap_v3", dec!(2565)))
            .leg(leg("ethereum", "sushiswap", dec!(2570)))
            .gross_profit_pct(dec!(0.00195))
            .build()
            .unwrap();

        assert_eq!(opp.kind(), OpportunityKind::Simple);
        assert_eq!(opp.legs().len(), 2);
        assert_eq!(opp.gross_profit_pct(), dec!(0.00195));
        assert!(!opp.is_cross_chain());
    }

    #[test]
    fn builder_fails_without_fingerprint() {
        let result = Opportunity::builder()
            .leg(leg("ethereum", "uniswap_v3", dec!(2565)))
            .leg(leg("ethereum", "sushiswap", dec!(2570)))
            .gross_profit_pct(dec!(0.002))
            .build();

        assert_eq!(result.unwrap_err(), OpportunityBuildError::MissingFingerprint);
    }

    #[test]
    fn builder_fails_with_one_leg() {
        let result = Opportunity::builder()
            .fingerprint(fingerprint())
            .leg(leg("ethereum", "uniswap_v3", dec!(2565)))
            .gross_profit_pct(dec!(0.002))
            .build();

        assert_eq!(result.unwrap_err(), OpportunityBuildError::TooFewLegs);
    }

    #[test]
    fn three_legs_default_to_triangular() {
        let opp = Opportunity::builder()
            .fingerprint(fingerprint())
            .leg(leg("ethereum", "uniswap_v3", dec!(2565)))
            .leg(leg("arbitrum", "sushiswap", dec!(2570)))
            .leg(leg("ethereum", "curve", dec!(1.0001)))
            .gross_profit_pct(dec!(0.004))
            .build()
            .unwrap();

        assert_eq!(opp.kind(), OpportunityKind::Triangular);
        assert!(opp.is_cross_chain());
    }

    #[test]
    fn serde_round_trip_preserves_decimals_exactly() {
        let opp = Opportunity::builder()
            .fingerprint(fingerprint())
            .leg(leg("ethereum", "uniswap_v3", dec!(2565.00)))
            .leg(leg("ethereum", "sushiswap", dec!(2570.00)))
            .gross_profit_pct(dec!(0.0019493177387914))
            .build()
            .unwrap();

        let json = serde_json::to_string(&opp).unwrap();
        let back: Opportunity = serde_json::from_str(&json).unwrap();

        assert_eq!(back, opp);
        assert_eq!(back.gross_profit_pct(), dec!(0.0019493177387914));
    }
}
