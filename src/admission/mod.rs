//! Gas-tiered admission control.
//!
//! A pure function of (evaluation, gas snapshot, mempool snapshot, rolling
//! success rate) to a decision. No side effects, no shared state; trivially
//! testable.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::{
    AdmissionDecision, Amount, Evaluation, GasCategory, GasSnapshot, GasTiers, MempoolSnapshot,
    Verdict,
};

/// Configuration for the admission controller.
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionConfig {
    /// Gas tier boundaries in gwei.
    #[serde(default)]
    pub tiers: GasTiers,

    /// Minimum net profit (USD) per tier; stricter as gas rises. The
    /// `extreme` tier has no floor because it always rejects.
    #[serde(default = "default_floor_ultra_low")]
    pub floor_ultra_low: Amount,
    #[serde(default = "default_floor_low")]
    pub floor_low: Amount,
    #[serde(default = "default_floor_medium")]
    pub floor_medium: Amount,
    #[serde(default = "default_floor_high")]
    pub floor_high: Amount,

    /// Hard cap on any `Wait` verdict, in seconds. Opportunities live for
    /// seconds to a few minutes; open-ended waits are never sound.
    #[serde(default = "default_wait_cap_secs")]
    pub wait_cap_secs: u64,

    /// Mempool congestion at or above which an otherwise-admittable
    /// opportunity waits for the next block instead.
    #[serde(default = "default_wait_congestion")]
    pub wait_congestion: Decimal,

    /// Rolling success rate below which floors scale up.
    #[serde(default = "default_degraded_success_floor")]
    pub degraded_success_floor: Decimal,

    /// Multiplier applied to floors while the success rate is degraded.
    #[serde(default = "default_degraded_multiplier")]
    pub degraded_multiplier: Decimal,

    /// Historical pattern success ratio below which floors also tighten.
    #[serde(default = "default_pattern_bias_floor")]
    pub pattern_bias_floor: Decimal,
}

fn default_floor_ultra_low() -> Amount {
    Decimal::new(10, 2) // $0.10
}

fn default_floor_low() -> Amount {
    Decimal::ONE
}

fn default_floor_medium() -> Amount {
    Decimal::from(5)
}

fn default_floor_high() -> Amount {
    Decimal::from(25)
}

fn default_wait_cap_secs() -> u64 {
    5
}

fn default_wait_congestion() -> Decimal {
    Decimal::new(75, 2) // 0.75
}

fn default_degraded_success_floor() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_degraded_multiplier() -> Decimal {
    Decimal::new(15, 1) // 1.5
}

fn default_pattern_bias_floor() -> Decimal {
    Decimal::new(4, 1) // 0.4
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            tiers: GasTiers::default(),
            floor_ultra_low: default_floor_ultra_low(),
            floor_low: default_floor_low(),
            floor_medium: default_floor_medium(),
            floor_high: default_floor_high(),
            wait_cap_secs: default_wait_cap_secs(),
            wait_congestion: default_wait_congestion(),
            degraded_success_floor: default_degraded_success_floor(),
            degraded_multiplier: default_degraded_multiplier(),
            pattern_bias_floor: default_pattern_bias_floor(),
        }
    }
}

/// Decides admit / reject / bounded-wait for evaluated opportunities.
pub struct AdmissionController {
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// The profit floor for a tier after dynamic scaling.
    ///
    /// `success_rate` is the scheduler's rolling rate; `pattern_bias` is
    /// the optional historical success ratio from the pattern store. Either
    /// signal being degraded scales the floor up; both compound.
    pub fn effective_floor(
        &self,
        category: GasCategory,
        success_rate: Decimal,
        pattern_bias: Option<Decimal>,
    ) -> Amount {
        let base = match category {
            GasCategory::UltraLow => self.config.floor_ultra_low,
            GasCategory::Low => self.config.floor_low,
            GasCategory::Medium => self.config.floor_medium,
            GasCategory::High | GasCategory::Extreme => self.config.floor_high,
        };
        let mut floor = base;
        if success_rate < self.config.degraded_success_floor {
            floor *= self.config.degraded_multiplier;
        }
        if let Some(bias) = pattern_bias {
            if bias < self.config.pattern_bias_floor {
                floor *= self.config.degraded_multiplier;
            }
        }
        floor
    }

    /// Decide the verdict for one evaluated opportunity.
    pub fn decide(
        &self,
        evaluation: &Evaluation,
        gas: &GasSnapshot,
        mempool: &MempoolSnapshot,
        success_rate: Decimal,
        pattern_bias: Option<Decimal>,
    ) -> AdmissionDecision {
        let fingerprint = evaluation.opportunity.fingerprint().clone();
        let category = GasCategory::from_gwei(gas.price_gwei, &self.config.tiers);
        let threshold = self.effective_floor(category, success_rate, pattern_bias);

        if !evaluation.viable {
            return AdmissionDecision {
                fingerprint,
                verdict: Verdict::Reject,
                reason: evaluation
                    .reason
                    .clone()
                    .unwrap_or_else(|| "not viable".to_string()),
                gas_category: category,
                wait: None,
                threshold,
            };
        }

        if category == GasCategory::Extreme {
            return AdmissionDecision {
                fingerprint,
                verdict: Verdict::Reject,
                reason: format!("gas extreme at {} gwei", gas.price_gwei),
                gas_category: category,
                wait: None,
                threshold,
            };
        }

        if evaluation.net_profit < threshold {
            return AdmissionDecision {
                fingerprint,
                verdict: Verdict::Reject,
                reason: format!(
                    "net profit {} below {} floor {}",
                    evaluation.net_profit, category, threshold
                ),
                gas_category: category,
                wait: None,
                threshold,
            };
        }

        if category == GasCategory::High && mempool.congestion >= self.config.wait_congestion {
            let cap = Duration::from_secs(self.config.wait_cap_secs);
            let wait = cap.min(gas.next_block_eta);
            return AdmissionDecision {
                fingerprint,
                verdict: Verdict::Wait,
                reason: format!("congested mempool at high gas; wait {}ms", wait.as_millis()),
                gas_category: category,
                wait: Some(wait),
                threshold,
            };
        }

        AdmissionDecision {
            fingerprint,
            verdict: Verdict::Admit,
            reason: format!(
                "net profit {} clears {} floor {}",
                evaluation.net_profit, category, threshold
            ),
            gas_category: category,
            wait: None,
            threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Chain, DexId, Fingerprint, FundingSource, Opportunity, OpportunityLeg, TokenPair,
    };
    use rust_decimal_macros::dec;

    fn evaluation(net_profit: Amount) -> Evaluation {
        let leg = |dex: &str, price| OpportunityLeg {
            chain: Chain::from("ethereum"),
            dex: DexId::from(dex),
            pair: TokenPair::from("ETH/USDC"),
            price,
        };
        let opportunity = Opportunity::builder()
            .fingerprint(Fingerprint::simple(
                &Chain::from("ethereum"),
                &TokenPair::from("ETH/USDC"),
                &DexId::from("uniswap_v3"),
                &DexId::from("sushiswap"),
            ))
            .leg(leg("uniswap_v3", dec!(2565)))
            .leg(leg("sushiswap", dec!(2570)))
            .gross_profit_pct(dec!(0.002))
            .build()
            .unwrap();
        Evaluation {
            opportunity,
            amount: dec!(10000),
            funding: FundingSource::Wallet,
            route: None,
            gross_profit: dec!(20),
            flash_loan_fee: Amount::ZERO,
            gas_cost_usd: dec!(8),
            gas_units: 200_000,
            slippage_cost: Amount::ZERO,
            bridge_fee_usd: Amount::ZERO,
            net_profit,
            viable: true,
            reason: None,
        }
    }

    fn gas(gwei: Decimal) -> GasSnapshot {
        GasSnapshot {
            price_gwei: gwei,
            native_token_usd: dec!(2000),
            next_block_eta: Duration::from_secs(12),
        }
    }

    fn controller() -> AdmissionController {
        AdmissionController::new(AdmissionConfig::default())
    }

    #[test]
    fn negative_net_profit_never_admits() {
        let decision = controller().decide(
            &evaluation(dec!(-6.55)),
            &gas(dec!(5)),
            &MempoolSnapshot::default(),
            Decimal::ONE,
            None,
        );

        assert_eq!(decision.verdict, Verdict::Reject);
    }

    #[test]
    fn profit_above_floor_admits_at_low_gas() {
        let decision = controller().decide(
            &evaluation(dec!(367)),
            &gas(dec!(5)),
            &MempoolSnapshot::default(),
            Decimal::ONE,
            None,
        );

        assert_eq!(decision.verdict, Verdict::Admit);
        assert_eq!(decision.gas_category, GasCategory::UltraLow);
    }

    #[test]
    fn extreme_gas_rejects_any_profit() {
        let decision = controller().decide(
            &evaluation(dec!(100000)),
            &gas(dec!(500)),
            &MempoolSnapshot::default(),
            Decimal::ONE,
            None,
        );

        assert_eq!(decision.verdict, Verdict::Reject);
        assert_eq!(decision.gas_category, GasCategory::Extreme);
    }

    #[test]
    fn floors_rise_with_gas_tier() {
        let c = controller();
        let low = c.effective_floor(GasCategory::UltraLow, Decimal::ONE, None);
        let medium = c.effective_floor(GasCategory::Medium, Decimal::ONE, None);
        let high = c.effective_floor(GasCategory::High, Decimal::ONE, None);

        assert!(low < medium);
        assert!(medium < high);
    }

    #[test]
    fn degraded_success_rate_raises_floor() {
        let c = controller();
        let normal = c.effective_floor(GasCategory::Medium, Decimal::ONE, None);
        let degraded = c.effective_floor(GasCategory::Medium, dec!(0.3), None);

        assert_eq!(degraded, normal * dec!(1.5));
    }

    #[test]
    fn poor_pattern_history_raises_floor() {
        let c = controller();
        let unbiased = c.effective_floor(GasCategory::Low, Decimal::ONE, None);
        let biased = c.effective_floor(GasCategory::Low, Decimal::ONE, Some(dec!(0.2)));

        assert!(biased > unbiased);
    }

    #[test]
    fn congested_high_gas_waits_bounded() {
        let decision = controller().decide(
            &evaluation(dec!(500)),
            &gas(dec!(100)),
            &MempoolSnapshot {
                pending_tx_count: 180_000,
                congestion: dec!(0.9),
            },
            Decimal::ONE,
            None,
        );

        assert_eq!(decision.verdict, Verdict::Wait);
        let wait = decision.wait.unwrap();
        assert!(wait <= Duration::from_secs(5));
    }

    #[test]
    fn wait_never_exceeds_next_block_eta() {
        let mut snapshot = gas(dec!(100));
        snapshot.next_block_eta = Duration::from_secs(2);
        let decision = controller().decide(
            &evaluation(dec!(500)),
            &snapshot,
            &MempoolSnapshot {
                pending_tx_count: 180_000,
                congestion: dec!(0.9),
            },
            Decimal::ONE,
            None,
        );

        assert_eq!(decision.wait, Some(Duration::from_secs(2)));
    }

    #[test]
    fn unviable_evaluation_rejects_with_its_reason() {
        let mut eval = evaluation(dec!(100));
        eval.viable = false;
        eval.reason = Some("all flash loan providers declined".to_string());

        let decision = controller().decide(
            &eval,
            &gas(dec!(5)),
            &MempoolSnapshot::default(),
            Decimal::ONE,
            None,
        );

        assert_eq!(decision.verdict, Verdict::Reject);
        assert!(decision.reason.contains("declined"));
    }
}
