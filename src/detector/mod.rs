//! Detection strategies for price discrepancies.
//!
//! Each detection algorithm implements the [`Detector`] trait; the
//! [`DetectorRegistry`] runs all registered detectors over one immutable
//! snapshot and deduplicates results by fingerprint. Detection is pure and
//! side-effect-free, so independent pairs and triples are safe to process
//! fully in parallel.

pub mod simple;
pub mod triangular;

pub use simple::{SimpleArbitrage, SimpleArbitrageConfig};
pub use triangular::{TriangularArbitrage, TriangularConfig};

use std::collections::HashMap;

use crate::domain::{Fingerprint, Opportunity, PriceSnapshot};

/// A detection strategy that finds arbitrage opportunities in a snapshot.
pub trait Detector: Send + Sync {
    /// Unique identifier for this detector, used in config and logging.
    fn name(&self) -> &'static str;

    /// Detect opportunities in the snapshot. May return duplicates across
    /// detectors; the registry resolves them.
    fn detect(&self, snapshot: &PriceSnapshot) -> Vec<Opportunity>;
}

/// Registry of enabled detectors.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a detector. Detectors run in registration order.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn detectors(&self) -> &[Box<dyn Detector>] {
        &self.detectors
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector and keep, per fingerprint, only the variant with
    /// the highest gross profit.
    pub fn detect_all(&self, snapshot: &PriceSnapshot) -> Vec<Opportunity> {
        let mut best: HashMap<Fingerprint, Opportunity> = HashMap::new();
        for detector in &self.detectors {
            for opp in detector.detect(snapshot) {
                match best.get(opp.fingerprint()) {
                    Some(existing) if existing.gross_profit_pct() >= opp.gross_profit_pct() => {}
                    _ => {
                        best.insert(opp.fingerprint().clone(), opp);
                    }
                }
            }
        }
        let mut out: Vec<Opportunity> = best.into_values().collect();
        // Stable output order for downstream ranking and tests.
        out.sort_by(|a, b| b.gross_profit_pct().cmp(&a.gross_profit_pct()));
        out
    }
}
