//! Two-leg cross-venue arbitrage detection.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{
    Fingerprint, Opportunity, OpportunityKind, OpportunityLeg, Pct, PriceSnapshot,
};

use super::Detector;

/// Configuration for the simple pairwise detector.
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleArbitrageConfig {
    /// Minimum spread fraction to report (0.002 = 0.2%).
    #[serde(default = "default_min_spread_pct")]
    pub min_spread_pct: Pct,
}

fn default_min_spread_pct() -> Pct {
    Decimal::new(2, 3) // 0.2%
}

impl Default for SimpleArbitrageConfig {
    fn default() -> Self {
        Self {
            min_spread_pct: default_min_spread_pct(),
        }
    }
}

/// Compares every pair of sources quoting the same token pair.
///
/// An opportunity exists when `(high - low) / low >= min_spread_pct`.
/// Zero-priced legs never reach this detector (the snapshot drops them),
/// but the division guard stays as a local invariant.
pub struct SimpleArbitrage {
    config: SimpleArbitrageConfig,
}

impl SimpleArbitrage {
    pub fn new(config: SimpleArbitrageConfig) -> Self {
        Self { config }
    }
}

impl Detector for SimpleArbitrage {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn detect(&self, snapshot: &PriceSnapshot) -> Vec<Opportunity> {
        let mut found = Vec::new();

        for pair in snapshot.pairs() {
            let quotes = snapshot.quotes_for(&pair);
            for (i, a) in quotes.iter().enumerate() {
                for b in quotes.iter().skip(i + 1) {
                    // Same venue on the same chain is not a discrepancy.
                    if a.dex == b.dex && a.chain == b.chain {
                        continue;
                    }
                    let (low, high) = if a.price <= b.price { (a, b) } else { (b, a) };
                    if low.price <= Decimal::ZERO {
                        continue;
                    }
                    let spread = (high.price - low.price) / low.price;
                    if spread < self.config.min_spread_pct {
                        continue;
                    }

                    let opportunity = Opportunity::builder()
                        .fingerprint(Fingerprint::simple(
                            &low.chain, &pair, &low.dex, &high.dex,
                        ))
                        .kind(OpportunityKind::Simple)
                        .leg(OpportunityLeg::from_quote(low))
                        .leg(OpportunityLeg::from_quote(high))
                        .gross_profit_pct(spread)
                        .build();
                    if let Ok(opp) = opportunity {
                        found.push(opp);
                    }
                }
            }
        }

        found
    }
}
