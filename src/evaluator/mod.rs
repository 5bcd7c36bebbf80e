//! Profitability evaluation.
//!
//! Nets the gross spread against the flash-loan fee, gas, slippage, and any
//! bridge fee. Pure Decimal arithmetic end to end; the compounding in
//! triangular legs and multi-provider fee stacks makes floating point drift
//! visible at trade-relevant magnitudes, so it is banned from this path.

use serde::Deserialize;

use crate::domain::{Amount, Evaluation, FundingSource, GasSnapshot, Opportunity, Route};

/// Configuration for the evaluator.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    /// Execution gas per trade leg, on top of the funding stack's own
    /// estimate (loan dispatch and repayment).
    #[serde(default = "default_gas_per_leg")]
    pub gas_per_leg: u64,
}

fn default_gas_per_leg() -> u64 {
    120_000
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            gas_per_leg: default_gas_per_leg(),
        }
    }
}

/// Computes net profitability for a candidate funding of an opportunity.
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Annotate an opportunity with its full cost stack.
    ///
    /// Never errors: evaluation failures upstream (no funding, no route)
    /// are expressed via [`Evaluation::not_viable`] by the caller.
    pub fn evaluate(
        &self,
        opportunity: Opportunity,
        amount: Amount,
        funding: FundingSource,
        route: Option<Route>,
        gas: &GasSnapshot,
        bridge_fee_usd: Amount,
    ) -> Evaluation {
        let gross_profit = amount * opportunity.gross_profit_pct();
        let flash_loan_fee = funding.total_fee_amount();

        let trade_gas = self.config.gas_per_leg * opportunity.legs().len() as u64;
        let gas_units = funding.gas_estimate() + trade_gas;
        let gas_cost_usd = gas.cost_usd(gas_units);

        let slippage_cost = route.as_ref().map_or(Amount::ZERO, Route::slippage_cost);

        let net_profit =
            gross_profit - flash_loan_fee - gas_cost_usd - slippage_cost - bridge_fee_usd;

        Evaluation {
            opportunity,
            amount,
            funding,
            route,
            gross_profit,
            flash_loan_fee,
            gas_cost_usd,
            gas_units,
            slippage_cost,
            bridge_fee_usd,
            net_profit,
            viable: true,
            reason: None,
        }
    }
}
