//! The scan-cycle engine.
//!
//! One orchestrator drives the whole pipeline each tick: snapshot → detect →
//! evaluate + plan → admit → schedule → record. Detection through planning
//! only reads the immutable snapshot, so opportunities are processed
//! concurrently; the scheduler owns all execution-side concurrency.

pub mod state;
pub mod ticker;

pub use state::EngineState;
pub use ticker::{shutdown_channel, Ticker};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::admission::AdmissionController;
use crate::detector::DetectorRegistry;
use crate::domain::{
    AdmissionDecision, Amount, BatchReport, Chain, DexId, Evaluation, FundingSource, GasSnapshot,
    LiquidityPool, MempoolSnapshot, Opportunity, PriceSnapshot, Verdict,
};
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::planner::RoutePlanner;
use crate::port::{BridgeProvider, FlashLoanProvider, GasOracle, PatternStore, PriceFeed};
use crate::scheduler::BatchScheduler;

/// Engine-level settings (everything not owned by a single component).
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Period between scan cycles.
    pub scan_interval: Duration,
    /// Quotes older than this are discarded at snapshot ingestion.
    pub staleness_window_secs: i64,
    /// Candidate funding amount per opportunity, in USD.
    pub trade_amount_usd: Amount,
    /// Trades at or below this amount are wallet-funded instead of borrowed.
    pub wallet_trade_cap: Amount,
    /// (chain, dex) pairs to poll for prices.
    pub sources: Vec<(Chain, DexId)>,
    /// Size of the rolling success window feeding admission.
    pub rolling_window: usize,
    /// Ceiling for the feed-loss retry backoff.
    pub max_backoff: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(5),
            staleness_window_secs: 30,
            trade_amount_usd: Decimal::from(10_000),
            wallet_trade_cap: Decimal::from(1000),
            sources: Vec::new(),
            rolling_window: 50,
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// The assembled arbitrage engine.
pub struct Engine {
    settings: EngineSettings,
    detectors: DetectorRegistry,
    evaluator: Evaluator,
    planner: RoutePlanner,
    admission: AdmissionController,
    scheduler: BatchScheduler,
    feeds: Vec<Arc<dyn PriceFeed>>,
    flash_providers: Vec<Arc<dyn FlashLoanProvider>>,
    bridge: Option<Arc<dyn BridgeProvider>>,
    gas_oracle: Arc<dyn GasOracle>,
    pattern_store: Option<Arc<dyn PatternStore>>,
    state: Arc<EngineState>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: EngineSettings,
        detectors: DetectorRegistry,
        evaluator: Evaluator,
        planner: RoutePlanner,
        admission: AdmissionController,
        scheduler: BatchScheduler,
        feeds: Vec<Arc<dyn PriceFeed>>,
        flash_providers: Vec<Arc<dyn FlashLoanProvider>>,
        bridge: Option<Arc<dyn BridgeProvider>>,
        gas_oracle: Arc<dyn GasOracle>,
        pattern_store: Option<Arc<dyn PatternStore>>,
    ) -> Self {
        let rolling_window = settings.rolling_window;
        Self {
            settings,
            detectors,
            evaluator,
            planner,
            admission,
            scheduler,
            feeds,
            flash_providers,
            bridge,
            gas_oracle,
            pattern_store,
            state: Arc::new(EngineState::new(rolling_window)),
        }
    }

    pub fn state(&self) -> &Arc<EngineState> {
        &self.state
    }

    /// Run scan cycles until shutdown is signalled.
    ///
    /// Total feed loss never terminates the loop; it backs off
    /// exponentially and retries.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ticker = Ticker::new(self.settings.scan_interval, shutdown.clone());
        let mut backoff = Duration::from_secs(1);
        let mut shutdown = shutdown;

        info!(
            sources = self.settings.sources.len(),
            detectors = self.detectors.len(),
            "Engine started"
        );

        while ticker.tick().await {
            match self.scan_cycle().await {
                Ok(report) => {
                    backoff = Duration::from_secs(1);
                    debug!(
                        found = report.opportunities_found,
                        executed = report.opportunities_executed,
                        "Cycle complete"
                    );
                }
                Err(Error::FeedsUnavailable(reason)) => {
                    warn!(reason = %reason, backoff_secs = backoff.as_secs(), "All feeds down, backing off");
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = shutdown.changed() => break,
                    }
                    backoff = (backoff * 2).min(self.settings.max_backoff);
                }
                Err(e) => {
                    warn!(error = %e, "Cycle failed");
                }
            }
        }

        info!("Engine stopped");
        Ok(())
    }

    /// One full detection-to-execution cycle.
    pub async fn scan_cycle(&self) -> Result<BatchReport> {
        let snapshot = self.fetch_snapshot().await?;
        let snapshot = snapshot.fresh_only(
            Utc::now(),
            chrono::Duration::seconds(self.settings.staleness_window_secs),
        );
        if snapshot.is_empty() {
            return Ok(BatchReport::empty(0));
        }

        let opportunities = self.detectors.detect_all(&snapshot);
        if opportunities.is_empty() {
            return Ok(BatchReport::empty(0));
        }
        debug!(count = opportunities.len(), "Opportunities detected");

        let conditions = self.fetch_conditions(&opportunities).await;
        let Some(primary) = self.primary_conditions(&conditions) else {
            return Err(Error::FeedsUnavailable(
                "no gas snapshot for any origin chain".to_string(),
            ));
        };

        // Evaluation and planning are read-only against the snapshot; run
        // every opportunity concurrently.
        let evaluations = join_all(
            opportunities
                .into_iter()
                .map(|opp| self.evaluate_one(opp, &snapshot, &conditions)),
        )
        .await;

        let detected = evaluations.len();
        let admitted = self.admit(evaluations, &conditions).await;
        let mut report = self.scheduler.run_cycle(admitted, &primary).await;
        // The scheduler only sees admitted work; report detection-level counts.
        report.opportunities_found = detected;
        self.state.absorb(&report);
        Ok(report)
    }

    /// Poll every configured (chain, dex) source on every feed.
    ///
    /// Partial failure is tolerated; only a fully dark feed set is an
    /// operator-visible error.
    async fn fetch_snapshot(&self) -> Result<PriceSnapshot> {
        let mut quotes = Vec::new();
        let mut failures = 0usize;
        let mut attempts = 0usize;

        for feed in &self.feeds {
            for (chain, dex) in &self.settings.sources {
                attempts += 1;
                match feed.get_prices(chain, dex).await {
                    Ok(mut batch) => quotes.append(&mut batch),
                    Err(e) => {
                        failures += 1;
                        debug!(feed = feed.name(), chain = %chain, dex = %dex, error = %e, "Feed fetch failed");
                    }
                }
            }
        }

        if quotes.is_empty() && failures > 0 && failures == attempts {
            return Err(Error::FeedsUnavailable(format!(
                "{failures} of {attempts} source fetches failed"
            )));
        }
        Ok(PriceSnapshot::new(quotes))
    }

    /// Gas and mempool snapshots per distinct origin chain.
    async fn fetch_conditions(
        &self,
        opportunities: &[Opportunity],
    ) -> HashMap<Chain, (GasSnapshot, MempoolSnapshot)> {
        let mut conditions = HashMap::new();
        for opp in opportunities {
            let chain = opp.origin_chain().clone();
            if conditions.contains_key(&chain) {
                continue;
            }
            let gas = match self.gas_oracle.gas_snapshot(&chain).await {
                Ok(gas) => gas,
                Err(e) => {
                    debug!(chain = %chain, error = %e, "Gas snapshot unavailable");
                    continue;
                }
            };
            let mempool = self
                .gas_oracle
                .mempool_snapshot(&chain)
                .await
                .unwrap_or_default();
            conditions.insert(chain, (gas, mempool));
        }
        conditions
    }

    /// Conditions of the first configured chain, falling back to any chain
    /// we have a snapshot for. Used for the scheduler's dispatch-time
    /// gas re-check.
    fn primary_conditions(
        &self,
        conditions: &HashMap<Chain, (GasSnapshot, MempoolSnapshot)>,
    ) -> Option<GasSnapshot> {
        if let Some((chain, _)) = self.settings.sources.first() {
            if let Some((gas, _)) = conditions.get(chain) {
                return Some(gas.clone());
            }
        }
        conditions.values().next().map(|(gas, _)| gas.clone())
    }

    /// Plan, fund, and evaluate a single opportunity. Never errors; every
    /// failure becomes a non-viable evaluation with a reason.
    async fn evaluate_one(
        &self,
        opportunity: Opportunity,
        snapshot: &PriceSnapshot,
        conditions: &HashMap<Chain, (GasSnapshot, MempoolSnapshot)>,
    ) -> Evaluation {
        let amount = self.settings.trade_amount_usd;
        let pair = opportunity.primary_pair().clone();
        let chain = opportunity.origin_chain().clone();

        let Some((gas, _)) = conditions.get(&chain) else {
            return Evaluation::not_viable(opportunity, amount, "no gas data for origin chain");
        };

        let pools: Vec<LiquidityPool> = snapshot
            .quotes_for(&pair)
            .into_iter()
            .map(|q| LiquidityPool {
                pool_id: format!("{}:{}", q.chain, q.dex),
                chain: q.chain.clone(),
                dex: q.dex.clone(),
                pair: q.pair.clone(),
                liquidity: q.liquidity,
            })
            .collect();

        let route = match self.planner.route_for(&pair, amount, &pools).await {
            Ok(route) => route,
            Err(e) => return Evaluation::not_viable(opportunity, amount, e.to_string()),
        };

        let funding = if amount <= self.settings.wallet_trade_cap {
            FundingSource::Wallet
        } else {
            let token = pair.base().unwrap_or("unknown");
            match self
                .planner
                .select_funding(token, amount, &chain, &self.flash_providers)
                .await
            {
                Ok(funding) => funding,
                Err(reason) => return Evaluation::not_viable(opportunity, amount, reason),
            }
        };

        let bridge_fee = match self.bridge_fee(&opportunity, amount).await {
            Ok(fee) => fee,
            Err(reason) => return Evaluation::not_viable(opportunity, amount, reason),
        };

        self.evaluator
            .evaluate(opportunity, amount, funding, Some(route), gas, bridge_fee)
    }

    /// Bridge fee for cross-chain opportunities, zero otherwise.
    async fn bridge_fee(
        &self,
        opportunity: &Opportunity,
        amount: Amount,
    ) -> std::result::Result<Amount, String> {
        if !opportunity.is_cross_chain() {
            return Ok(Amount::ZERO);
        }
        let Some(bridge) = &self.bridge else {
            return Err("cross-chain opportunity with no bridge provider".to_string());
        };
        let source = opportunity.origin_chain();
        let Some(target) = opportunity
            .legs()
            .iter()
            .map(|l| &l.chain)
            .find(|c| *c != source)
        else {
            return Ok(Amount::ZERO);
        };
        let token = opportunity.primary_pair().base().unwrap_or("unknown");

        match bridge.quote(source, target, token, amount).await {
            Ok(quote) => Ok(quote.fee_usd),
            Err(e) => Err(format!("bridge quote failed: {e}")),
        }
    }

    /// Run admission over the evaluations, honoring bounded waits.
    ///
    /// `Wait` verdicts sleep their bounded interval once, then get exactly
    /// one re-decision against refreshed conditions; a second `Wait`
    /// becomes a drop. Waits are capped at seconds, never open-ended.
    async fn admit(
        &self,
        evaluations: Vec<Evaluation>,
        conditions: &HashMap<Chain, (GasSnapshot, MempoolSnapshot)>,
    ) -> Vec<Evaluation> {
        let success_rate = self.state.success_rate();
        let mut admitted = Vec::new();
        let mut waiting: Vec<(Evaluation, Duration)> = Vec::new();

        for evaluation in evaluations {
            let decision = self.decide(&evaluation, conditions, success_rate).await;
            match decision.verdict {
                Verdict::Admit => admitted.push(evaluation),
                Verdict::Wait => {
                    let wait = decision.wait.unwrap_or(Duration::from_secs(1));
                    waiting.push((evaluation, wait));
                }
                Verdict::Reject => {
                    debug!(
                        fingerprint = %decision.fingerprint,
                        reason = %decision.reason,
                        "Rejected"
                    );
                }
            }
        }

        if !waiting.is_empty() {
            let pause = waiting.iter().map(|(_, w)| *w).max().unwrap_or_default();
            tokio::time::sleep(pause).await;

            let waited: Vec<Opportunity> = waiting
                .iter()
                .map(|(e, _)| e.opportunity.clone())
                .collect();
            let refreshed = self.fetch_conditions(&waited).await;
            for (evaluation, _) in waiting {
                let decision = self.decide(&evaluation, &refreshed, success_rate).await;
                if decision.verdict == Verdict::Admit {
                    admitted.push(evaluation);
                } else {
                    debug!(
                        fingerprint = %decision.fingerprint,
                        reason = %decision.reason,
                        "Dropped after bounded wait"
                    );
                }
            }
        }

        admitted
    }

    async fn decide(
        &self,
        evaluation: &Evaluation,
        conditions: &HashMap<Chain, (GasSnapshot, MempoolSnapshot)>,
        success_rate: Decimal,
    ) -> AdmissionDecision {
        let chain = evaluation.opportunity.origin_chain();
        let fallback = (
            GasSnapshot {
                price_gwei: Decimal::MAX,
                native_token_usd: Decimal::ZERO,
                next_block_eta: Duration::from_secs(12),
            },
            MempoolSnapshot::default(),
        );
        // Missing gas data lands in the Extreme tier and rejects.
        let (gas, mempool) = conditions.get(chain).unwrap_or(&fallback);

        let bias = self.pattern_bias(&evaluation.opportunity).await;
        self.admission
            .decide(evaluation, gas, mempool, success_rate, bias)
    }

    /// Historical success ratio for similar opportunities, if a pattern
    /// store is wired in and has any history.
    async fn pattern_bias(&self, opportunity: &Opportunity) -> Option<Decimal> {
        let store = self.pattern_store.as_ref()?;
        let patterns = store.query_similar(opportunity).await;
        if patterns.is_empty() {
            return None;
        }
        let hits = patterns.iter().filter(|p| p.success).count();
        Some(Decimal::from(hits) / Decimal::from(patterns.len()))
    }
}
