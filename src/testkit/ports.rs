//! Deterministic collaborator doubles for engine tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{
    Amount, BatchReport, Chain, DexId, Evaluation, ExecutionResult, ExecutionStrategy,
    GasSnapshot, MempoolSnapshot, Opportunity, PriceQuote,
};
use crate::error::EngineError;
use crate::port::{
    BridgeProvider, BridgeQuote, GasOracle, HistoricalPattern, PatternStore, PriceFeed,
    ResultSink, TradeExecutor,
};

/// Feed that serves a fixed set of quotes, optionally failing per source.
pub struct ScriptedFeed {
    quotes: Vec<PriceQuote>,
    failing: Mutex<Vec<(Chain, DexId)>>,
}

impl ScriptedFeed {
    pub fn new(quotes: Vec<PriceQuote>) -> Self {
        Self {
            quotes,
            failing: Mutex::new(Vec::new()),
        }
    }

    /// Make every subsequent fetch for this source fail.
    pub fn fail_source(&self, chain: &Chain, dex: &DexId) {
        self.failing.lock().push((chain.clone(), dex.clone()));
    }
}

#[async_trait]
impl PriceFeed for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get_prices(&self, chain: &Chain, dex: &DexId) -> Result<Vec<PriceQuote>, EngineError> {
        if self
            .failing
            .lock()
            .iter()
            .any(|(c, d)| c == chain && d == dex)
        {
            return Err(EngineError::DataUnavailable {
                pair: "*".to_string(),
                reason: format!("scripted outage for {chain}:{dex}"),
            });
        }
        Ok(self
            .quotes
            .iter()
            .filter(|q| &q.chain == chain && &q.dex == dex)
            .cloned()
            .collect())
    }
}

/// Gas oracle returning the same snapshot for every chain.
pub struct StaticGasOracle {
    gas: GasSnapshot,
    mempool: MempoolSnapshot,
}

impl StaticGasOracle {
    pub fn new(gas: GasSnapshot, mempool: MempoolSnapshot) -> Self {
        Self { gas, mempool }
    }

    /// 20 gwei, $2000 native token, quiet mempool.
    pub fn calm() -> Self {
        Self::new(
            GasSnapshot {
                price_gwei: Decimal::from(20),
                native_token_usd: Decimal::from(2000),
                next_block_eta: Duration::from_secs(12),
            },
            MempoolSnapshot::default(),
        )
    }
}

#[async_trait]
impl GasOracle for StaticGasOracle {
    async fn gas_snapshot(&self, _chain: &Chain) -> Result<GasSnapshot, EngineError> {
        Ok(self.gas.clone())
    }

    async fn mempool_snapshot(&self, _chain: &Chain) -> Result<MempoolSnapshot, EngineError> {
        Ok(self.mempool.clone())
    }
}

/// Bridge with a flat fee for every route.
pub struct FixedBridge {
    pub fee_usd: Amount,
}

#[async_trait]
impl BridgeProvider for FixedBridge {
    fn name(&self) -> &str {
        "fixed_bridge"
    }

    async fn quote(
        &self,
        _source: &Chain,
        _target: &Chain,
        _token: &str,
        _amount: Amount,
    ) -> Result<BridgeQuote, EngineError> {
        Ok(BridgeQuote {
            fee_usd: self.fee_usd,
            eta_minutes: 5,
            reliability: Decimal::new(99, 2),
        })
    }
}

/// In-memory pattern store keyed by fingerprint string.
#[derive(Default)]
pub struct MemoryPatternStore {
    patterns: Mutex<Vec<HistoricalPattern>>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, fingerprint: &str, success: bool, profit_usd: Amount) {
        self.patterns.lock().push(HistoricalPattern {
            fingerprint: fingerprint.to_string(),
            success,
            profit_usd,
        });
    }

    pub fn len(&self) -> usize {
        self.patterns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.lock().is_empty()
    }
}

#[async_trait]
impl PatternStore for MemoryPatternStore {
    async fn store_pattern(&self, opportunity: &Opportunity, result: &ExecutionResult) {
        self.patterns.lock().push(HistoricalPattern {
            fingerprint: opportunity.fingerprint().as_str().to_string(),
            success: matches!(
                result.outcome,
                crate::domain::ExecutionOutcome::Success { .. }
            ),
            profit_usd: result.outcome.realized_profit(),
        });
    }

    async fn query_similar(&self, opportunity: &Opportunity) -> Vec<HistoricalPattern> {
        let key = opportunity.fingerprint().as_str();
        self.patterns
            .lock()
            .iter()
            .filter(|p| p.fingerprint == key)
            .cloned()
            .collect()
    }
}

/// Sink that captures everything recorded into it.
#[derive(Default)]
pub struct RecordingSink {
    pub results: Mutex<Vec<ExecutionResult>>,
    pub reports: Mutex<Vec<BatchReport>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn record(&self, result: &ExecutionResult) {
        self.results.lock().push(result.clone());
    }

    async fn record_report(&self, report: &BatchReport) {
        self.reports.lock().push(report.clone());
    }
}

/// What a `ScriptedExecutor` does with a trade.
#[derive(Debug, Clone)]
pub enum ExecutorBehavior {
    /// Succeed after the given delay with the evaluation's net profit.
    Succeed { delay: Duration },
    /// Fail after the given delay.
    Fail { delay: Duration },
}

/// Executor with a default behavior and optional per-fingerprint overrides.
///
/// Counts executions per fingerprint so idempotence tests can assert a
/// coalesced opportunity ran exactly once.
pub struct ScriptedExecutor {
    default: ExecutorBehavior,
    overrides: Mutex<HashMap<String, ExecutorBehavior>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedExecutor {
    pub fn new(default: ExecutorBehavior) -> Self {
        Self {
            default,
            overrides: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::new(ExecutorBehavior::Succeed {
            delay: Duration::from_millis(10),
        }))
    }

    pub fn behave(&self, fingerprint: &str, behavior: ExecutorBehavior) {
        self.overrides
            .lock()
            .insert(fingerprint.to_string(), behavior);
    }

    pub fn calls_for(&self, fingerprint: &str) -> usize {
        self.calls.lock().get(fingerprint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl TradeExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        evaluation: &Evaluation,
        _strategy: ExecutionStrategy,
    ) -> Result<ExecutionResult, EngineError> {
        let fingerprint = evaluation.opportunity.fingerprint().clone();
        let key = fingerprint.as_str().to_string();
        *self.calls.lock().entry(key.clone()).or_insert(0) += 1;

        let behavior = self
            .overrides
            .lock()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        match behavior {
            ExecutorBehavior::Succeed { delay } => {
                tokio::time::sleep(delay).await;
                Ok(ExecutionResult::success(
                    fingerprint,
                    evaluation.net_profit,
                    "0xscripted",
                    evaluation.gas_units,
                    delay,
                ))
            }
            ExecutorBehavior::Fail { delay } => {
                tokio::time::sleep(delay).await;
                Ok(ExecutionResult::failed(
                    fingerprint,
                    "scripted failure",
                    evaluation.gas_cost_usd,
                    evaluation.gas_units,
                    delay,
                ))
            }
        }
    }
}
