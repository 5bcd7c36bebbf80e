//! End-to-end scan cycle against deterministic collaborators.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use flashpath::admission::{AdmissionConfig, AdmissionController};
use flashpath::detector::{DetectorRegistry, SimpleArbitrage, SimpleArbitrageConfig};
use flashpath::domain::{Chain, DexId};
use flashpath::engine::{Engine, EngineSettings};
use flashpath::error::Error;
use flashpath::evaluator::{Evaluator, EvaluatorConfig};
use flashpath::planner::{PlannerConfig, RoutePlanner};
use flashpath::scheduler::{BatchScheduler, SchedulerConfig};
use flashpath::testkit::{
    quote_on, MemoryPatternStore, RecordingSink, ScriptedExecutor, ScriptedFeed, StaticGasOracle,
};

struct Fixture {
    feed: Arc<ScriptedFeed>,
    executor: Arc<ScriptedExecutor>,
    sink: Arc<RecordingSink>,
    pattern_store: Arc<MemoryPatternStore>,
    engine: Engine,
}

/// Engine over one ethereum source pair (uniswap_v3 + sushiswap) with calm
/// gas and an always-succeeding paper-style executor.
fn fixture(quotes: Vec<flashpath::domain::PriceQuote>) -> Fixture {
    let feed = Arc::new(ScriptedFeed::new(quotes));
    let executor = ScriptedExecutor::succeeding();
    let sink = Arc::new(RecordingSink::new());
    let pattern_store = Arc::new(MemoryPatternStore::new());

    let mut detectors = DetectorRegistry::new();
    detectors.register(Box::new(SimpleArbitrage::new(SimpleArbitrageConfig {
        min_spread_pct: dec!(0.002),
    })));

    let scheduler = BatchScheduler::new(
        SchedulerConfig::default(),
        executor.clone(),
        sink.clone(),
        Some(pattern_store.clone()),
    );

    let settings = EngineSettings {
        scan_interval: Duration::from_millis(50),
        trade_amount_usd: dec!(10000),
        wallet_trade_cap: dec!(1000),
        sources: vec![
            (Chain::from("ethereum"), DexId::from("uniswap_v3")),
            (Chain::from("ethereum"), DexId::from("sushiswap")),
        ],
        ..EngineSettings::default()
    };

    let engine = Engine::new(
        settings,
        detectors,
        Evaluator::new(EvaluatorConfig::default()),
        RoutePlanner::new(PlannerConfig::default()),
        AdmissionController::new(AdmissionConfig::default()),
        scheduler,
        vec![feed.clone()],
        vec![Arc::new(flashpath::provider::StaticTermsProvider::new(
            "aave_v3",
            dec!(0.0009),
            dec!(5000000),
            180_000,
        ))],
        None,
        Arc::new(StaticGasOracle::calm()),
        Some(pattern_store.clone()),
    );

    Fixture {
        feed,
        executor,
        sink,
        pattern_store,
        engine,
    }
}

fn spread_quotes() -> Vec<flashpath::domain::PriceQuote> {
    vec![
        quote_on("ethereum", "uniswap_v3", "ETH/USDC", dec!(2000), dec!(5000000)),
        quote_on("ethereum", "sushiswap", "ETH/USDC", dec!(2016), dec!(5000000)),
    ]
}

#[tokio::test]
async fn profitable_spread_flows_to_execution() {
    let f = fixture(spread_quotes());

    let report = f.engine.scan_cycle().await.unwrap();

    assert_eq!(report.opportunities_found, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert!(report.net_profit > Decimal::ZERO);

    // One result recorded, one pattern stored, session state updated.
    assert_eq!(f.sink.results.lock().len(), 1);
    assert_eq!(f.sink.reports.lock().len(), 1);
    assert_eq!(f.pattern_store.len(), 1);
    assert_eq!(f.engine.state().success_rate(), Decimal::ONE);
    assert_eq!(f.executor.total_calls(), 1);
}

#[tokio::test]
async fn flat_prices_detect_nothing() {
    let f = fixture(vec![
        quote_on("ethereum", "uniswap_v3", "ETH/USDC", dec!(2000), dec!(5000000)),
        quote_on("ethereum", "sushiswap", "ETH/USDC", dec!(2000), dec!(5000000)),
    ]);

    let report = f.engine.scan_cycle().await.unwrap();

    assert_eq!(report.opportunities_found, 0);
    assert_eq!(f.executor.total_calls(), 0);
    assert!(f.sink.results.lock().is_empty());
}

#[tokio::test]
async fn total_feed_loss_is_an_error_not_a_crash() {
    let f = fixture(spread_quotes());
    f.feed
        .fail_source(&Chain::from("ethereum"), &DexId::from("uniswap_v3"));
    f.feed
        .fail_source(&Chain::from("ethereum"), &DexId::from("sushiswap"));

    let err = f.engine.scan_cycle().await.unwrap_err();
    assert!(matches!(err, Error::FeedsUnavailable(_)));
}

#[tokio::test]
async fn partial_feed_loss_still_scans() {
    // Losing one venue removes the discrepancy but not the cycle.
    let f = fixture(spread_quotes());
    f.feed
        .fail_source(&Chain::from("ethereum"), &DexId::from("sushiswap"));

    let report = f.engine.scan_cycle().await.unwrap();
    assert_eq!(report.opportunities_found, 0);
}

#[tokio::test]
async fn thin_liquidity_never_reaches_the_executor() {
    // $10k trade into $100k pools needs ~9% impact; the 0.5% cap rejects it.
    let f = fixture(vec![
        quote_on("ethereum", "uniswap_v3", "ETH/USDC", dec!(2000), dec!(100000)),
        quote_on("ethereum", "sushiswap", "ETH/USDC", dec!(2016), dec!(100000)),
    ]);

    let report = f.engine.scan_cycle().await.unwrap();

    assert_eq!(report.opportunities_found, 1);
    assert_eq!(report.opportunities_executed, 0);
    assert_eq!(f.executor.total_calls(), 0);
}
