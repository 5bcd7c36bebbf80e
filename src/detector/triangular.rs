//! Three-leg (triangular) arbitrage detection over configured token triples.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{
    Fingerprint, Opportunity, OpportunityKind, OpportunityLeg, Pct, PriceSnapshot, TokenPair,
};

use super::Detector;

/// Configuration for the triangular detector.
#[derive(Debug, Clone, Deserialize)]
pub struct TriangularConfig {
    /// Token triples (A, B, C) to scan, each as three symbols.
    #[serde(default = "default_triples")]
    pub triples: Vec<[String; 3]>,

    /// Minimum compounded return fraction to report.
    #[serde(default = "default_min_spread_pct")]
    pub min_spread_pct: Pct,
}

fn default_triples() -> Vec<[String; 3]> {
    vec![["ETH".into(), "USDC".into(), "WBTC".into()]]
}

fn default_min_spread_pct() -> Pct {
    Decimal::new(2, 3) // 0.2%
}

impl Default for TriangularConfig {
    fn default() -> Self {
        Self {
            triples: default_triples(),
            min_spread_pct: default_min_spread_pct(),
        }
    }
}

/// Computes the compounded return of trading one unit A→B→C→A.
///
/// Each leg uses the best available price for its pair across all sources,
/// so legs may come from different DEXes or chains. A triple with any
/// unquoted leg is skipped, never an error.
pub struct TriangularArbitrage {
    config: TriangularConfig,
}

impl TriangularArbitrage {
    pub fn new(config: TriangularConfig) -> Self {
        Self { config }
    }
}

impl Detector for TriangularArbitrage {
    fn name(&self) -> &'static str {
        "triangular"
    }

    fn detect(&self, snapshot: &PriceSnapshot) -> Vec<Opportunity> {
        let mut found = Vec::new();

        for triple in &self.config.triples {
            let [a, b, c] = [triple[0].as_str(), triple[1].as_str(), triple[2].as_str()];
            let legs = [
                TokenPair::from_symbols(a, b),
                TokenPair::from_symbols(b, c),
                TokenPair::from_symbols(c, a),
            ];

            let quotes: Option<Vec<_>> = legs
                .iter()
                .map(|pair| snapshot.best_price_for(pair))
                .collect();
            let Some(quotes) = quotes else {
                continue;
            };
            if quotes.iter().any(|q| q.price <= Decimal::ZERO) {
                continue;
            }

            // One unit of A compounded through the cycle.
            let compounded = quotes[0].price * quotes[1].price * quotes[2].price;
            let ret = compounded - Decimal::ONE;
            if ret < self.config.min_spread_pct {
                continue;
            }

            let fingerprint = Fingerprint::triangular(
                &quotes[0].chain,
                &[a, b, c],
                &[&quotes[0].dex, &quotes[1].dex, &quotes[2].dex],
            );
            let mut builder = Opportunity::builder()
                .fingerprint(fingerprint)
                .kind(OpportunityKind::Triangular)
                .gross_profit_pct(ret);
            for quote in &quotes {
                builder = builder.leg(OpportunityLeg::from_quote(quote));
            }
            if let Ok(opp) = builder.build() {
                found.push(opp);
            }
        }

        found
    }
}
