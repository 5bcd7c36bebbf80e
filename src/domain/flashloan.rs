//! Flash-loan quotes and funding sources.

use serde::{Deserialize, Serialize};

use super::money::{Amount, Pct};

/// A quote from one flash-loan provider for one opportunity.
///
/// Obtained fresh for each evaluation and never cached beyond it; provider
/// fee schedules move and conflicting constants are a known hazard, so fees
/// arrive here from runtime configuration or the provider itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashLoanQuote {
    pub provider: String,
    pub fee_amount: Amount,
    pub fee_pct: Pct,
    pub max_amount: Amount,
    pub gas_estimate: u64,
    pub viable: bool,
    /// Populated when `viable` is false.
    #[serde(default)]
    pub reason: Option<String>,
}

impl FlashLoanQuote {
    /// An unviable quote with a reason; providers never throw, they decline.
    pub fn declined(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            fee_amount: Amount::ZERO,
            fee_pct: Pct::ZERO,
            max_amount: Amount::ZERO,
            gas_estimate: 0,
            viable: false,
            reason: Some(reason.into()),
        }
    }
}

/// How an opportunity's principal is funded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "quotes")]
pub enum FundingSource {
    /// Borrowed via one or more flash-loan providers; fees stack.
    FlashLoan(Vec<FlashLoanQuote>),
    /// Funded from the wallet, zero loan fee.
    Wallet,
}

impl FundingSource {
    /// Combined fee fraction across the funding stack.
    ///
    /// For a multi-provider loan the effective fee is amount-weighted:
    /// `sum(fee_amount) / sum(borrowed)`; with the per-quote `fee_amount`
    /// already computed against each provider's share this reduces to
    /// summing the amounts.
    pub fn total_fee_amount(&self) -> Amount {
        match self {
            Self::FlashLoan(quotes) => quotes.iter().map(|q| q.fee_amount).sum(),
            Self::Wallet => Amount::ZERO,
        }
    }

    /// Combined gas estimate for funding (loan dispatch + repayment).
    pub fn gas_estimate(&self) -> u64 {
        match self {
            Self::FlashLoan(quotes) => quotes.iter().map(|q| q.gas_estimate).sum(),
            Self::Wallet => 0,
        }
    }

    pub fn is_flash_loan(&self) -> bool {
        matches!(self, Self::FlashLoan(_))
    }

    /// Name of the first provider in the stack, for logging.
    pub fn provider_label(&self) -> &str {
        match self {
            Self::FlashLoan(quotes) => quotes
                .first()
                .map(|q| q.provider.as_str())
                .unwrap_or("none"),
            Self::Wallet => "wallet",
        }
    }
}
