//! Price quotes and the per-cycle snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ids::{Chain, DexId, TokenPair};
use super::money::{Amount, Price};

/// A single observed price from one DEX on one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub chain: Chain,
    pub dex: DexId,
    pub pair: TokenPair,
    /// Quote token received per unit of base token.
    pub price: Price,
    /// Pool liquidity in USD available to trade against.
    pub liquidity: Amount,
    pub observed_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Whether the quote is still inside the staleness window at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, staleness_window: Duration) -> bool {
        now.signed_duration_since(self.observed_at) < staleness_window
    }

    /// A quote with a zero or negative price carries no information.
    pub fn is_usable(&self) -> bool {
        self.price > Price::ZERO
    }
}

/// Immutable collection of quotes gathered in one scan cycle.
///
/// Detection, evaluation, and planning only ever read from a snapshot, so
/// independent opportunities can be processed fully in parallel against it.
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    quotes: Vec<PriceQuote>,
}

impl PriceSnapshot {
    pub fn new(quotes: Vec<PriceQuote>) -> Self {
        Self { quotes }
    }

    /// Apply the staleness gate and drop unusable quotes.
    ///
    /// Stale or zero-priced data is skipped silently; the feed contract
    /// allows partial data and the caller enforces freshness.
    pub fn fresh_only(self, now: DateTime<Utc>, staleness_window: Duration) -> Self {
        Self {
            quotes: self
                .quotes
                .into_iter()
                .filter(|q| q.is_usable() && q.is_fresh(now, staleness_window))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn quotes(&self) -> &[PriceQuote] {
        &self.quotes
    }

    /// All quotes for a given token pair, across every chain and DEX.
    pub fn quotes_for(&self, pair: &TokenPair) -> Vec<&PriceQuote> {
        self.quotes.iter().filter(|q| &q.pair == pair).collect()
    }

    /// The best (highest) usable price for a pair, if any source quotes it.
    pub fn best_price_for(&self, pair: &TokenPair) -> Option<&PriceQuote> {
        self.quotes_for(pair)
            .into_iter()
            .max_by(|a, b| a.price.cmp(&b.price))
    }

    /// Distinct token pairs present in the snapshot, in stable order.
    pub fn pairs(&self) -> Vec<TokenPair> {
        let set: BTreeSet<&str> = self.quotes.iter().map(|q| q.pair.as_str()).collect();
        set.into_iter().map(TokenPair::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(dex: &str, price: Price, age_secs: i64) -> PriceQuote {
        PriceQuote {
            chain: Chain::from("ethereum"),
            dex: DexId::from(dex),
            pair: TokenPair::from("ETH/USDC"),
            price,
            liquidity: dec!(100000),
            observed_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn fresh_only_drops_stale_and_zero_priced_quotes() {
        let snapshot = PriceSnapshot::new(vec![
            quote("uniswap_v3", dec!(2565), 1),
            quote("sushiswap", dec!(2570), 120),
            quote("curve", dec!(0), 1),
        ]);

        let fresh = snapshot.fresh_only(Utc::now(), Duration::seconds(30));

        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh.quotes()[0].dex.as_str(), "uniswap_v3");
    }

    #[test]
    fn best_price_picks_highest() {
        let snapshot = PriceSnapshot::new(vec![
            quote("uniswap_v3", dec!(2565), 0),
            quote("sushiswap", dec!(2570), 0),
        ]);

        let best = snapshot.best_price_for(&TokenPair::from("ETH/USDC")).unwrap();
        assert_eq!(best.price, dec!(2570));
    }

    #[test]
    fn pairs_are_deduplicated() {
        let snapshot = PriceSnapshot::new(vec![
            quote("uniswap_v3", dec!(2565), 0),
            quote("sushiswap", dec!(2570), 0),
        ]);

        assert_eq!(snapshot.pairs(), vec![TokenPair::from("ETH/USDC")]);
    }
}
