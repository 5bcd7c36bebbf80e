//! Concurrent batch scheduling of admitted opportunities.
//!
//! The scheduler drains one cycle's admitted opportunities: it re-checks
//! staleness against a fresh gas snapshot, ranks by net profit, groups by
//! execution strategy, and dispatches under a bounded worker pool with one
//! shared batch deadline. A lapsed deadline cancels outstanding work and
//! records a timeout result per opportunity; nothing is ever silently
//! dropped. Sub-operation timeouts (quote, submit, confirm) nest inside the
//! executor implementations behind the `TradeExecutor` port.

pub mod inflight;

pub use inflight::{Claim, InFlightGuard, InFlightSet};

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::{
    Amount, BatchReport, Evaluation, ExecutionBatch, ExecutionResult, ExecutionStrategy,
    GasSnapshot,
};
use crate::error::EngineError;
use crate::port::{PatternStore, ResultSink, TradeExecutor};

/// Configuration for the batch scheduler.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Bounded worker pool size.
    #[serde(default = "default_max_concurrent_trades")]
    pub max_concurrent_trades: usize,

    /// Shared deadline for the whole batch, in milliseconds.
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    /// Opportunities older than this are stale and dropped, in seconds.
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: i64,

    /// Only the top-N by net profit are dispatched per cycle, bounding
    /// flash-loan exposure concentration.
    #[serde(default = "default_max_per_cycle")]
    pub max_per_cycle: usize,

    /// Trades at or below this amount go through the wallet path.
    #[serde(default = "default_wallet_trade_cap")]
    pub wallet_trade_cap: Amount,

    /// Net profit must still clear this multiple of the re-estimated gas
    /// cost at dispatch time.
    #[serde(default = "default_gas_safety_multiplier")]
    pub gas_safety_multiplier: Decimal,
}

fn default_max_concurrent_trades() -> usize {
    4
}

fn default_batch_timeout_ms() -> u64 {
    10_000
}

fn default_freshness_window_secs() -> i64 {
    30
}

fn default_max_per_cycle() -> usize {
    10
}

fn default_wallet_trade_cap() -> Amount {
    Decimal::from(1000)
}

fn default_gas_safety_multiplier() -> Decimal {
    Decimal::from(2)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_trades: default_max_concurrent_trades(),
            batch_timeout_ms: default_batch_timeout_ms(),
            freshness_window_secs: default_freshness_window_secs(),
            max_per_cycle: default_max_per_cycle(),
            wallet_trade_cap: default_wallet_trade_cap(),
            gas_safety_multiplier: default_gas_safety_multiplier(),
        }
    }
}

/// Executes admitted opportunities in strategy-grouped batches.
pub struct BatchScheduler {
    config: SchedulerConfig,
    inflight: Arc<InFlightSet>,
    executor: Arc<dyn TradeExecutor>,
    sink: Arc<dyn ResultSink>,
    pattern_store: Option<Arc<dyn PatternStore>>,
}

impl BatchScheduler {
    pub fn new(
        config: SchedulerConfig,
        executor: Arc<dyn TradeExecutor>,
        sink: Arc<dyn ResultSink>,
        pattern_store: Option<Arc<dyn PatternStore>>,
    ) -> Self {
        Self {
            config,
            inflight: Arc::new(InFlightSet::new()),
            executor,
            sink,
            pattern_store,
        }
    }

    pub fn inflight(&self) -> &Arc<InFlightSet> {
        &self.inflight
    }

    /// Which dispatch path an evaluation takes.
    ///
    /// Flash-loan funding dominates (the loan transaction shapes the whole
    /// trade), then cross-chain, then the small-trade wallet path.
    pub fn classify(&self, evaluation: &Evaluation) -> ExecutionStrategy {
        if evaluation.funding.is_flash_loan() {
            ExecutionStrategy::FlashLoan
        } else if evaluation.opportunity.is_cross_chain() {
            ExecutionStrategy::CrossChain
        } else if evaluation.amount <= self.config.wallet_trade_cap {
            ExecutionStrategy::Wallet
        } else {
            ExecutionStrategy::Standard
        }
    }

    /// Sub-group key within a strategy bucket.
    ///
    /// Flash-loan trades borrowing the same token can share one loan
    /// transaction; cross-chain trades on the same chain pair amortize one
    /// bridge transfer.
    fn group_key(&self, strategy: ExecutionStrategy, evaluation: &Evaluation) -> String {
        match strategy {
            ExecutionStrategy::FlashLoan => evaluation
                .opportunity
                .primary_pair()
                .base()
                .unwrap_or("unknown")
                .to_string(),
            ExecutionStrategy::CrossChain => {
                let legs = evaluation.opportunity.legs();
                let mut chains: Vec<&str> =
                    legs.iter().map(|l| l.chain.as_str()).collect();
                chains.sort_unstable();
                chains.dedup();
                chains.join("-")
            }
            ExecutionStrategy::Wallet | ExecutionStrategy::Standard => String::new(),
        }
    }

    /// Bucket survivors into execution batches sharing one deadline.
    pub fn group(
        &self,
        evaluations: Vec<Evaluation>,
        deadline: std::time::Instant,
    ) -> Vec<ExecutionBatch> {
        let mut buckets: HashMap<(ExecutionStrategy, String), ExecutionBatch> = HashMap::new();
        for evaluation in evaluations {
            let strategy = self.classify(&evaluation);
            let key = self.group_key(strategy, &evaluation);
            buckets
                .entry((strategy, key.clone()))
                .or_insert_with(|| ExecutionBatch::new(strategy, key, deadline))
                .opportunities
                .push(evaluation);
        }
        let mut batches: Vec<ExecutionBatch> = buckets.into_values().collect();
        batches.sort_by(|a, b| a.group_key.cmp(&b.group_key));
        batches
    }

    /// Drop opportunities that went stale between admission and dispatch.
    fn prefilter(&self, evaluations: Vec<Evaluation>, gas: &GasSnapshot) -> Vec<Evaluation> {
        let now = Utc::now();
        let freshness = chrono::Duration::seconds(self.config.freshness_window_secs);
        evaluations
            .into_iter()
            .filter(|e| {
                if e.opportunity.age(now) > freshness {
                    debug!(fingerprint = %e.opportunity.fingerprint(), "Dropping stale opportunity");
                    return false;
                }
                let fresh_gas = gas.cost_usd(e.gas_units);
                if e.net_profit < fresh_gas * self.config.gas_safety_multiplier {
                    debug!(
                        fingerprint = %e.opportunity.fingerprint(),
                        net_profit = %e.net_profit,
                        fresh_gas = %fresh_gas,
                        "Dropping opportunity that no longer clears re-estimated gas"
                    );
                    return false;
                }
                true
            })
            .collect()
    }

    /// Run one cycle's admitted opportunities to completion.
    ///
    /// Returns within the batch timeout (plus scheduling overhead); work
    /// still outstanding at the deadline is recorded as a timeout result.
    pub async fn run_cycle(
        &self,
        admitted: Vec<Evaluation>,
        gas: &GasSnapshot,
    ) -> BatchReport {
        let found = admitted.len();
        let started = Instant::now();

        let mut survivors = self.prefilter(admitted, gas);
        survivors.sort_by(|a, b| b.net_profit.cmp(&a.net_profit));
        survivors.truncate(self.config.max_per_cycle);

        if survivors.is_empty() {
            return BatchReport::empty(found);
        }

        let deadline_std =
            std::time::Instant::now() + Duration::from_millis(self.config.batch_timeout_ms);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_trades));
        let mut tasks: JoinSet<Option<ExecutionResult>> = JoinSet::new();

        for batch in self.group(survivors, deadline_std) {
            let strategy = batch.strategy;
            let deadline = Instant::from_std(batch.deadline);
            for evaluation in batch.opportunities {
                let semaphore = semaphore.clone();
                let executor = self.executor.clone();
                let inflight = self.inflight.clone();
                let sink = self.sink.clone();
                let pattern_store = self.pattern_store.clone();
                tasks.spawn(async move {
                    dispatch_one(
                        evaluation,
                        strategy,
                        deadline,
                        semaphore,
                        executor,
                        inflight,
                        sink,
                        pattern_store,
                    )
                    .await
                });
            }
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {} // coalesced into an attempt owned elsewhere
                Err(e) => warn!(error = %e, "Execution task panicked"),
            }
        }

        let report = aggregate(found, &results, started.elapsed());
        self.sink.record_report(&report).await;
        report
    }
}

/// Execute one evaluation under the batch deadline.
///
/// Returns `None` when the fingerprint was already in flight (the admission
/// coalesces into the existing attempt and produces no second result).
#[allow(clippy::too_many_arguments)]
async fn dispatch_one(
    evaluation: Evaluation,
    strategy: ExecutionStrategy,
    deadline: Instant,
    semaphore: Arc<Semaphore>,
    executor: Arc<dyn TradeExecutor>,
    inflight: Arc<InFlightSet>,
    sink: Arc<dyn ResultSink>,
    pattern_store: Option<Arc<dyn PatternStore>>,
) -> Option<ExecutionResult> {
    let fingerprint = evaluation.opportunity.fingerprint().clone();
    let started = Instant::now();

    let guard = match inflight.claim(&fingerprint) {
        Claim::New(guard) => guard,
        Claim::Existing(rx) => {
            debug!(fingerprint = %fingerprint, "Coalescing into in-flight attempt");
            let _ = InFlightSet::await_existing(rx).await;
            return None;
        }
    };

    let attempt = async {
        let _permit = semaphore.acquire().await.ok()?;
        match executor.execute(&evaluation, strategy).await {
            Ok(result) => Some(result),
            Err(EngineError::ExecutionTimeout { elapsed_ms }) => Some(ExecutionResult::timeout(
                fingerprint.clone(),
                Duration::from_millis(elapsed_ms),
            )),
            Err(e) => Some(ExecutionResult::failed(
                fingerprint.clone(),
                e.to_string(),
                evaluation.gas_cost_usd,
                evaluation.gas_units,
                started.elapsed(),
            )),
        }
    };

    let result = match tokio::time::timeout_at(deadline, attempt).await {
        Ok(Some(result)) => result,
        // Semaphore closed; treat as a timeout since the pool is draining.
        Ok(None) => ExecutionResult::timeout(fingerprint.clone(), started.elapsed()),
        Err(_) => ExecutionResult::timeout(fingerprint.clone(), started.elapsed()),
    };

    guard.complete(&result);
    sink.record(&result).await;
    if let Some(store) = pattern_store {
        store.store_pattern(&evaluation.opportunity, &result).await;
    }
    Some(result)
}

/// Fold per-opportunity results into a batch report.
fn aggregate(found: usize, results: &[ExecutionResult], elapsed: Duration) -> BatchReport {
    let mut report = BatchReport::empty(found);
    report.opportunities_executed = results.len();

    for result in results {
        if result.outcome.is_success() {
            report.succeeded += 1;
        } else if result.outcome.is_timeout() {
            report.timed_out += 1;
        } else {
            report.failed += 1;
        }
        report.net_profit += result.outcome.realized_profit();

        report.fastest_execution = Some(match report.fastest_execution {
            Some(f) => f.min(result.execution_time),
            None => result.execution_time,
        });
        report.slowest_execution = Some(match report.slowest_execution {
            Some(s) => s.max(result.execution_time),
            None => result.execution_time,
        });
    }

    let elapsed_ms = elapsed.as_millis().max(1) as i64;
    report.trades_per_second =
        Decimal::from(results.len() as i64 * 1000) / Decimal::from(elapsed_ms);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Chain, DexId, ExecutionOutcome, Fingerprint, FundingSource, Opportunity, OpportunityLeg,
        TokenPair,
    };
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    fn evaluation(pair: &str, net_profit: Amount, amount: Amount) -> Evaluation {
        let leg = |dex: &str| OpportunityLeg {
            chain: Chain::from("ethereum"),
            dex: DexId::from(dex),
            pair: TokenPair::from(pair),
            price: dec!(2565),
        };
        let opportunity = Opportunity::builder()
            .fingerprint(Fingerprint::simple(
                &Chain::from("ethereum"),
                &TokenPair::from(pair),
                &DexId::from("uniswap_v3"),
                &DexId::from("sushiswap"),
            ))
            .leg(leg("uniswap_v3"))
            .leg(leg("sushiswap"))
            .gross_profit_pct(dec!(0.002))
            .build()
            .unwrap();
        Evaluation {
            opportunity,
            amount,
            funding: FundingSource::Wallet,
            route: None,
            gross_profit: net_profit,
            flash_loan_fee: Amount::ZERO,
            gas_cost_usd: dec!(1),
            gas_units: 100_000,
            slippage_cost: Amount::ZERO,
            bridge_fee_usd: Amount::ZERO,
            net_profit,
            viable: true,
            reason: None,
        }
    }

    fn gas() -> GasSnapshot {
        GasSnapshot {
            price_gwei: dec!(5),
            native_token_usd: dec!(2000),
            next_block_eta: Duration::from_secs(12),
        }
    }

    struct InstantExecutor;

    #[async_trait]
    impl TradeExecutor for InstantExecutor {
        async fn execute(
            &self,
            evaluation: &Evaluation,
            _strategy: ExecutionStrategy,
        ) -> Result<ExecutionResult, EngineError> {
            Ok(ExecutionResult::success(
                evaluation.opportunity.fingerprint().clone(),
                evaluation.net_profit,
                "0xtest",
                100_000,
                Duration::from_millis(5),
            ))
        }
    }

    struct NullSink;

    #[async_trait]
    impl ResultSink for NullSink {
        async fn record(&self, _result: &ExecutionResult) {}
        async fn record_report(&self, _report: &BatchReport) {}
    }

    fn scheduler(config: SchedulerConfig) -> BatchScheduler {
        BatchScheduler::new(config, Arc::new(InstantExecutor), Arc::new(NullSink), None)
    }

    #[test]
    fn small_wallet_trades_classify_as_wallet() {
        let s = scheduler(SchedulerConfig::default());
        assert_eq!(
            s.classify(&evaluation("ETH/USDC", dec!(10), dec!(500))),
            ExecutionStrategy::Wallet
        );
        assert_eq!(
            s.classify(&evaluation("ETH/USDC", dec!(10), dec!(50000))),
            ExecutionStrategy::Standard
        );
    }

    #[test]
    fn grouping_sub_keys_flash_loans_by_borrowed_token() {
        let s = scheduler(SchedulerConfig::default());
        let mut eth = evaluation("ETH/USDC", dec!(10), dec!(50000));
        eth.funding = FundingSource::FlashLoan(vec![]);
        let mut wbtc = evaluation("WBTC/USDC", dec!(10), dec!(50000));
        wbtc.funding = FundingSource::FlashLoan(vec![]);
        let mut eth2 = evaluation("ETH/DAI", dec!(10), dec!(50000));
        eth2.funding = FundingSource::FlashLoan(vec![]);

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let batches = s.group(vec![eth, wbtc, eth2], deadline);

        assert_eq!(batches.len(), 2);
        let eth_batch = batches.iter().find(|b| b.group_key == "ETH").unwrap();
        assert_eq!(eth_batch.len(), 2);
        assert_eq!(eth_batch.strategy, ExecutionStrategy::FlashLoan);
    }

    #[tokio::test]
    async fn cycle_executes_and_aggregates() {
        let s = scheduler(SchedulerConfig::default());
        let admitted = vec![
            evaluation("ETH/USDC", dec!(50), dec!(500)),
            evaluation("WBTC/USDC", dec!(80), dec!(500)),
        ];

        let report = s.run_cycle(admitted, &gas()).await;

        assert_eq!(report.opportunities_found, 2);
        assert_eq!(report.opportunities_executed, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.net_profit, dec!(130));
        assert!(report.fastest_execution.is_some());
    }

    #[tokio::test]
    async fn prefilter_drops_profit_below_gas_multiple() {
        let s = scheduler(SchedulerConfig::default());
        // Fresh gas cost: 100k units * 5 gwei * $2000 = $1; floor is $2.
        let admitted = vec![evaluation("ETH/USDC", dec!(1.50), dec!(500))];

        let report = s.run_cycle(admitted, &gas()).await;

        assert_eq!(report.opportunities_found, 1);
        assert_eq!(report.opportunities_executed, 0);
    }

    #[tokio::test]
    async fn only_top_n_by_net_profit_dispatch() {
        let mut config = SchedulerConfig::default();
        config.max_per_cycle = 1;
        let s = scheduler(config);
        let admitted = vec![
            evaluation("ETH/USDC", dec!(50), dec!(500)),
            evaluation("WBTC/USDC", dec!(80), dec!(500)),
        ];

        let report = s.run_cycle(admitted, &gas()).await;

        assert_eq!(report.opportunities_executed, 1);
        assert_eq!(report.net_profit, dec!(80));
    }
}
