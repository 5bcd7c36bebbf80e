//! The evaluator's output: an opportunity annotated with its cost stack.

use serde::{Deserialize, Serialize};

use super::flashloan::FundingSource;
use super::money::Amount;
use super::opportunity::Opportunity;
use super::route::Route;

/// An opportunity netted against funding fee, gas, and slippage.
///
/// `viable = false` never means an error occurred; it means the cost stack
/// ate the spread or no funding source could cover the amount. The reason
/// string says which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub opportunity: Opportunity,
    pub amount: Amount,
    pub funding: FundingSource,
    pub route: Option<Route>,
    pub gross_profit: Amount,
    pub flash_loan_fee: Amount,
    pub gas_cost_usd: Amount,
    /// Total gas units behind `gas_cost_usd`; kept so the scheduler can
    /// re-price the attempt against a fresher gas snapshot.
    pub gas_units: u64,
    pub slippage_cost: Amount,
    pub bridge_fee_usd: Amount,
    pub net_profit: Amount,
    pub viable: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Evaluation {
    /// An evaluation that failed before a route or funding stack existed.
    pub fn not_viable(
        opportunity: Opportunity,
        amount: Amount,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            opportunity,
            amount,
            funding: FundingSource::Wallet,
            route: None,
            gross_profit: Amount::ZERO,
            flash_loan_fee: Amount::ZERO,
            gas_cost_usd: Amount::ZERO,
            gas_units: 0,
            slippage_cost: Amount::ZERO,
            bridge_fee_usd: Amount::ZERO,
            net_profit: Amount::ZERO,
            viable: false,
            reason: Some(reason.into()),
        }
    }

    /// Label of the chosen funding provider, for logging and grouping.
    pub fn provider_label(&self) -> &str {
        self.funding.provider_label()
    }
}
