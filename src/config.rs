//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. Component sections map onto the
//! config structs each component owns, so every knob has a serde default and
//! a minimal file is enough to start the engine.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::admission::AdmissionConfig;
use crate::detector::simple::SimpleArbitrageConfig;
use crate::detector::triangular::TriangularConfig;
use crate::detector::{DetectorRegistry, SimpleArbitrage, TriangularArbitrage};
use crate::domain::{Amount, Chain, DexId, GasSnapshot, MempoolSnapshot, Pct};
use crate::engine::EngineSettings;
use crate::error::{ConfigError, Result};
use crate::evaluator::EvaluatorConfig;
use crate::planner::PlannerConfig;
use crate::port::{FlashLoanProvider, GasOracle, PriceFeed};
use crate::provider::{ConfiguredGasOracle, FileFeed, StaticTermsProvider};
use crate::scheduler::SchedulerConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub detectors: DetectorsConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Price feed wiring for the binary. Live DEX adapters plug in behind the
/// `PriceFeed` port; the built-in option is a JSON quotes file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedsConfig {
    /// Path to a JSON array of quotes, re-read each cycle.
    #[serde(default)]
    pub quotes_file: Option<std::path::PathBuf>,
}

/// Gas conditions for paper runs, served by `ConfiguredGasOracle`.
#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    #[serde(default = "default_gas_price_gwei")]
    pub price_gwei: Decimal,
    #[serde(default = "default_native_token_usd")]
    pub native_token_usd: Decimal,
    #[serde(default = "default_next_block_eta_secs")]
    pub next_block_eta_secs: u64,
    /// Mempool congestion fraction; 0.9 reads as heavily congested.
    #[serde(default)]
    pub congestion: Decimal,
}

fn default_gas_price_gwei() -> Decimal {
    Decimal::from(20)
}

fn default_native_token_usd() -> Decimal {
    Decimal::from(2000)
}

fn default_next_block_eta_secs() -> u64 {
    12
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            price_gwei: default_gas_price_gwei(),
            native_token_usd: default_native_token_usd(),
            next_block_eta_secs: default_next_block_eta_secs(),
            congestion: Decimal::ZERO,
        }
    }
}

/// Engine-level knobs: cadence, staleness, sizing, and price sources.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Quotes older than this never enter a cycle.
    #[serde(default = "default_staleness_window_secs")]
    pub staleness_window_secs: i64,
    /// Candidate trade size per opportunity, in USD.
    #[serde(default = "default_trade_amount_usd")]
    pub trade_amount_usd: Amount,
    /// At or below this amount the wallet funds the trade directly.
    #[serde(default = "default_wallet_trade_cap")]
    pub wallet_trade_cap: Amount,
    /// Rolling window of recent executions feeding admission floors.
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,
    /// Ceiling for the feed-loss retry backoff, in seconds.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// (chain, dex) pairs to poll each cycle.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub chain: String,
    pub dex: String,
}

fn default_scan_interval_secs() -> u64 {
    5
}

fn default_staleness_window_secs() -> i64 {
    30
}

fn default_trade_amount_usd() -> Amount {
    Decimal::from(10_000)
}

fn default_wallet_trade_cap() -> Amount {
    Decimal::from(1000)
}

fn default_rolling_window() -> usize {
    50
}

fn default_max_backoff_secs() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            staleness_window_secs: default_staleness_window_secs(),
            trade_amount_usd: default_trade_amount_usd(),
            wallet_trade_cap: default_wallet_trade_cap(),
            rolling_window: default_rolling_window(),
            max_backoff_secs: default_max_backoff_secs(),
            sources: Vec::new(),
        }
    }
}

/// Configuration for all detectors.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorsConfig {
    /// Enabled detector names.
    #[serde(default = "default_enabled_detectors")]
    pub enabled: Vec<String>,

    #[serde(default)]
    pub simple: SimpleArbitrageConfig,

    #[serde(default)]
    pub triangular: TriangularConfig,
}

fn default_enabled_detectors() -> Vec<String> {
    vec!["simple".to_string(), "triangular".to_string()]
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_detectors(),
            simple: SimpleArbitrageConfig::default(),
            triangular: TriangularConfig::default(),
        }
    }
}

/// Flash-loan provider terms, declared per provider in config rather than
/// hardcoded, so fee changes are an ops edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub flash_loan: Vec<FlashLoanProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlashLoanProviderConfig {
    pub name: String,
    /// Fee as a fraction of the borrowed amount (0.0009 = 9 bps).
    pub fee_pct: Pct,
    /// Maximum borrowable amount in USD.
    pub max_amount: Amount,
    /// Gas units for loan dispatch and repayment.
    #[serde(default = "default_provider_gas")]
    pub gas_estimate: u64,
}

fn default_provider_gas() -> u64 {
    180_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.sources.is_empty() {
            return Err(ConfigError::MissingField {
                field: "engine.sources",
            }
            .into());
        }
        if self.engine.trade_amount_usd <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "engine.trade_amount_usd",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.planner.max_slippage <= Decimal::ZERO || self.planner.max_slippage >= Decimal::ONE
        {
            return Err(ConfigError::InvalidValue {
                field: "planner.max_slippage",
                reason: "must be a fraction in (0, 1)".to_string(),
            }
            .into());
        }
        for floor in [
            self.admission.floor_ultra_low,
            self.admission.floor_low,
            self.admission.floor_medium,
            self.admission.floor_high,
        ] {
            if floor < Decimal::ZERO {
                return Err(ConfigError::InvalidValue {
                    field: "admission.floor_*",
                    reason: "profit floors cannot be negative".to_string(),
                }
                .into());
            }
        }
        for provider in &self.providers.flash_loan {
            if provider.name.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "providers.flash_loan.name",
                }
                .into());
            }
            if provider.fee_pct < Decimal::ZERO || provider.fee_pct >= Decimal::ONE {
                return Err(ConfigError::InvalidValue {
                    field: "providers.flash_loan.fee_pct",
                    reason: format!("{} is not a fraction in [0, 1)", provider.fee_pct),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            scan_interval: Duration::from_secs(self.engine.scan_interval_secs),
            staleness_window_secs: self.engine.staleness_window_secs,
            trade_amount_usd: self.engine.trade_amount_usd,
            wallet_trade_cap: self.engine.wallet_trade_cap,
            sources: self
                .engine
                .sources
                .iter()
                .map(|s| (Chain::from(s.chain.as_str()), DexId::from(s.dex.as_str())))
                .collect(),
            rolling_window: self.engine.rolling_window,
            max_backoff: Duration::from_secs(self.engine.max_backoff_secs),
        }
    }

    /// Build the detector registry from the enabled list.
    pub fn build_detectors(&self) -> DetectorRegistry {
        let mut registry = DetectorRegistry::new();
        for name in &self.detectors.enabled {
            match name.as_str() {
                "simple" => {
                    registry.register(Box::new(SimpleArbitrage::new(self.detectors.simple.clone())))
                }
                "triangular" => registry.register(Box::new(TriangularArbitrage::new(
                    self.detectors.triangular.clone(),
                ))),
                other => tracing::warn!(detector = other, "Unknown detector name, skipping"),
            }
        }
        registry
    }

    /// Instantiate the configured flash-loan providers.
    pub fn build_flash_providers(&self) -> Vec<Arc<dyn FlashLoanProvider>> {
        self.providers
            .flash_loan
            .iter()
            .map(|p| {
                Arc::new(StaticTermsProvider::new(
                    &p.name,
                    p.fee_pct,
                    p.max_amount,
                    p.gas_estimate,
                )) as Arc<dyn FlashLoanProvider>
            })
            .collect()
    }

    /// Instantiate the configured price feeds.
    pub fn build_feeds(&self) -> Vec<Arc<dyn PriceFeed>> {
        let mut feeds: Vec<Arc<dyn PriceFeed>> = Vec::new();
        if let Some(path) = &self.feeds.quotes_file {
            feeds.push(Arc::new(FileFeed::new(path)));
        }
        feeds
    }

    pub fn build_gas_oracle(&self) -> Arc<dyn GasOracle> {
        Arc::new(ConfiguredGasOracle::new(
            GasSnapshot {
                price_gwei: self.gas.price_gwei,
                native_token_usd: self.gas.native_token_usd,
                next_block_eta: Duration::from_secs(self.gas.next_block_eta_secs),
            },
            MempoolSnapshot {
                pending_tx_count: 0,
                congestion: self.gas.congestion,
            },
        ))
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            detectors: DetectorsConfig::default(),
            evaluator: EvaluatorConfig::default(),
            planner: PlannerConfig::default(),
            admission: AdmissionConfig::default(),
            scheduler: SchedulerConfig::default(),
            providers: ProvidersConfig::default(),
            feeds: FeedsConfig::default(),
            gas: GasConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
