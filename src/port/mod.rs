//! Collaborator trait definitions.
//!
//! These traits define the seams to everything outside the engine: price
//! feeds, flash-loan and bridge providers, the gas oracle, the optional
//! pattern store, the result sink, and the trade executor. The engine is
//! fully testable against deterministic implementations of these traits.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Amount, BatchReport, Chain, DexId, Evaluation, ExecutionResult, ExecutionStrategy,
    FlashLoanQuote, GasSnapshot, MempoolSnapshot, Opportunity, PriceQuote,
};
use crate::error::EngineError;

/// Source of per-DEX, per-chain prices.
///
/// May return stale or partial data; the caller enforces the staleness gate.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Feed name for logging.
    fn name(&self) -> &str;

    /// All known quotes for one DEX on one chain.
    async fn get_prices(&self, chain: &Chain, dex: &DexId) -> Result<Vec<PriceQuote>, EngineError>;
}

/// Flash-loan liquidity provider.
///
/// Never errors: unavailability is expressed as `viable = false` on the
/// returned quote.
#[async_trait]
pub trait FlashLoanProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn quote(&self, token: &str, amount: Amount, chain: &Chain) -> FlashLoanQuote;
}

/// Quote for moving funds between chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeQuote {
    pub fee_usd: Amount,
    pub eta_minutes: u32,
    /// Historical delivery reliability in [0, 1].
    pub reliability: Decimal,
}

/// Cross-chain bridging provider.
#[async_trait]
pub trait BridgeProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn quote(
        &self,
        source: &Chain,
        target: &Chain,
        token: &str,
        amount: Amount,
    ) -> Result<BridgeQuote, EngineError>;
}

/// Current gas and mempool conditions for a chain.
#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn gas_snapshot(&self, chain: &Chain) -> Result<GasSnapshot, EngineError>;

    async fn mempool_snapshot(&self, chain: &Chain) -> Result<MempoolSnapshot, EngineError>;
}

/// A historical execution pattern similar to a current opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPattern {
    pub fingerprint: String,
    pub success: bool,
    pub profit_usd: Amount,
}

/// Optional memory of past executions, used only to bias admission
/// thresholds. The engine functions with static thresholds when this
/// collaborator is absent or unreachable.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn store_pattern(&self, opportunity: &Opportunity, result: &ExecutionResult);

    async fn query_similar(&self, opportunity: &Opportunity) -> Vec<HistoricalPattern>;
}

/// Out-of-band recorder for results and statistics.
///
/// Nothing written here is read back into the hot path; the rolling success
/// rate is tracked separately by the engine itself.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, result: &ExecutionResult);

    async fn record_report(&self, report: &BatchReport);
}

/// Submits a planned trade and waits for its terminal outcome.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn execute(
        &self,
        evaluation: &Evaluation,
        strategy: ExecutionStrategy,
    ) -> Result<ExecutionResult, EngineError>;
}

/// `ResultSink` that writes structured log lines.
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn record(&self, result: &ExecutionResult) {
        use crate::domain::ExecutionOutcome;
        match &result.outcome {
            ExecutionOutcome::Success { profit_usd, tx_ref } => {
                tracing::info!(
                    fingerprint = %result.fingerprint,
                    profit_usd = %profit_usd,
                    tx = %tx_ref,
                    elapsed_ms = result.execution_time.as_millis() as u64,
                    "Trade succeeded"
                );
            }
            ExecutionOutcome::Failed { error, gas_cost_usd } => {
                tracing::warn!(
                    fingerprint = %result.fingerprint,
                    error = %error,
                    gas_cost_usd = %gas_cost_usd,
                    "Trade failed"
                );
            }
            ExecutionOutcome::Timeout => {
                tracing::warn!(
                    fingerprint = %result.fingerprint,
                    elapsed_ms = result.execution_time.as_millis() as u64,
                    "Trade timed out"
                );
            }
        }
    }

    async fn record_report(&self, report: &BatchReport) {
        tracing::info!(
            found = report.opportunities_found,
            executed = report.opportunities_executed,
            succeeded = report.succeeded,
            failed = report.failed,
            timed_out = report.timed_out,
            net_profit = %report.net_profit,
            trades_per_second = %report.trades_per_second,
            "Batch complete"
        );
    }
}
