//! Built-in collaborator implementations that need no network access.
//!
//! Live DEX, bridge, and RPC integrations sit behind the [`port`](crate::port)
//! traits. What lives here is everything the binary can run without them:
//! flash-loan providers with config-declared terms, a file-backed price feed,
//! a config-pinned gas oracle, and a paper executor.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use crate::domain::{
    Amount, Chain, DexId, Evaluation, ExecutionResult, ExecutionStrategy, FlashLoanQuote,
    GasSnapshot, MempoolSnapshot, Pct, PriceQuote,
};
use crate::error::EngineError;
use crate::port::{FlashLoanProvider, GasOracle, PriceFeed, TradeExecutor};

/// A provider whose fee, capacity, and gas overhead come from config.
///
/// A declined quote is a normal funding outcome, not an error.
#[derive(Debug, Clone)]
pub struct StaticTermsProvider {
    name: String,
    fee_pct: Pct,
    max_amount: Amount,
    gas_estimate: u64,
}

impl StaticTermsProvider {
    pub fn new(
        name: impl Into<String>,
        fee_pct: Pct,
        max_amount: Amount,
        gas_estimate: u64,
    ) -> Self {
        Self {
            name: name.into(),
            fee_pct,
            max_amount,
            gas_estimate,
        }
    }
}

#[async_trait]
impl FlashLoanProvider for StaticTermsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(&self, _token: &str, amount: Amount, _chain: &Chain) -> FlashLoanQuote {
        if self.max_amount <= Amount::ZERO {
            return FlashLoanQuote::declined(&self.name, "no capacity");
        }
        let funded = amount.min(self.max_amount);
        FlashLoanQuote {
            provider: self.name.clone(),
            fee_amount: funded * self.fee_pct,
            fee_pct: self.fee_pct,
            max_amount: self.max_amount,
            gas_estimate: self.gas_estimate,
            viable: true,
            reason: None,
        }
    }
}

/// Price feed backed by a JSON file of quotes.
///
/// The file holds a flat array of quotes and is re-read on every fetch, so
/// an external process can refresh it between cycles. Chain and DEX
/// filtering happens here, matching the per-source fetch contract.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PriceFeed for FileFeed {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_prices(&self, chain: &Chain, dex: &DexId) -> Result<Vec<PriceQuote>, EngineError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            EngineError::DataUnavailable {
                pair: "*".to_string(),
                reason: format!("cannot read {}: {e}", self.path.display()),
            }
        })?;
        let quotes: Vec<PriceQuote> =
            serde_json::from_str(&content).map_err(|e| EngineError::DataUnavailable {
                pair: "*".to_string(),
                reason: format!("malformed quotes file: {e}"),
            })?;
        Ok(quotes
            .into_iter()
            .filter(|q| &q.chain == chain && &q.dex == dex)
            .collect())
    }
}

/// Gas oracle returning values pinned in config.
///
/// Serves paper runs and environments without an RPC endpoint.
pub struct ConfiguredGasOracle {
    gas: GasSnapshot,
    mempool: MempoolSnapshot,
}

impl ConfiguredGasOracle {
    pub fn new(gas: GasSnapshot, mempool: MempoolSnapshot) -> Self {
        Self { gas, mempool }
    }
}

#[async_trait]
impl GasOracle for ConfiguredGasOracle {
    async fn gas_snapshot(&self, _chain: &Chain) -> Result<GasSnapshot, EngineError> {
        Ok(self.gas.clone())
    }

    async fn mempool_snapshot(&self, _chain: &Chain) -> Result<MempoolSnapshot, EngineError> {
        Ok(self.mempool.clone())
    }
}

/// Executor that records trades without submitting anything on-chain.
pub struct PaperExecutor;

#[async_trait]
impl TradeExecutor for PaperExecutor {
    async fn execute(
        &self,
        evaluation: &Evaluation,
        strategy: ExecutionStrategy,
    ) -> Result<ExecutionResult, EngineError> {
        let started = Instant::now();
        info!(
            fingerprint = %evaluation.opportunity.fingerprint(),
            strategy = ?strategy,
            amount = %evaluation.amount,
            net_profit = %evaluation.net_profit,
            "Paper trade"
        );
        Ok(ExecutionResult::success(
            evaluation.opportunity.fingerprint().clone(),
            evaluation.net_profit,
            "paper",
            evaluation.gas_units,
            started.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn quotes_fee_on_funded_share() {
        let provider = StaticTermsProvider::new("aave_v3", dec!(0.0009), dec!(50000), 180_000);
        let quote = provider
            .quote("ETH", dec!(100000), &Chain::from("ethereum"))
            .await;
        assert!(quote.viable);
        assert_eq!(quote.max_amount, dec!(50000));
        // Fee covers only what this provider can fund.
        assert_eq!(quote.fee_amount, dec!(45));
    }

    #[tokio::test]
    async fn zero_capacity_declines() {
        let provider = StaticTermsProvider::new("dry", dec!(0.0009), dec!(0), 180_000);
        let quote = provider
            .quote("ETH", dec!(100), &Chain::from("ethereum"))
            .await;
        assert!(!quote.viable);
    }

    #[tokio::test]
    async fn file_feed_filters_by_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.json");
        let quotes = vec![
            crate::testkit::quote("uniswap_v3", "ETH/USDC", dec!(2000)),
            crate::testkit::quote("sushiswap", "ETH/USDC", dec!(2010)),
        ];
        std::fs::write(&path, serde_json::to_string(&quotes).unwrap()).unwrap();

        let feed = FileFeed::new(&path);
        let got = feed
            .get_prices(&Chain::from("ethereum"), &DexId::from("uniswap_v3"))
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].price, dec!(2000));
    }

    #[tokio::test]
    async fn file_feed_missing_file_is_data_unavailable() {
        let feed = FileFeed::new("/nonexistent/quotes.json");
        let err = feed
            .get_prices(&Chain::from("ethereum"), &DexId::from("uniswap_v3"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable { .. }));
    }
}
