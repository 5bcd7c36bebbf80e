//! Domain identifier types with proper encapsulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain identifier - newtype for type safety.
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain(String);

impl Chain {
    /// Create a new Chain from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the chain name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Chain {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Chain {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// DEX identifier - newtype for type safety.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DexId(String);

impl DexId {
    /// Create a new DexId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the DEX name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DexId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for DexId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Token pair in `BASE/QUOTE` notation, e.g. `ETH/USDC`.
///
/// The price of a pair is the amount of quote token received per unit
/// of base token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenPair(String);

impl TokenPair {
    /// Create a new TokenPair from a string.
    pub fn new(pair: impl Into<String>) -> Self {
        Self(pair.into())
    }

    /// Build a pair from base and quote symbols.
    pub fn from_symbols(base: &str, quote: &str) -> Self {
        Self(format!("{base}/{quote}"))
    }

    /// Get the pair as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base symbol (before the `/`), if well-formed.
    pub fn base(&self) -> Option<&str> {
        self.0.split_once('/').map(|(b, _)| b)
    }

    /// The quote symbol (after the `/`), if well-formed.
    pub fn quote(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, q)| q)
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TokenPair {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TokenPair {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Canonical key identifying a recurring opportunity shape.
///
/// Built from chain, token pair, and the participating DEX names sorted
/// lexicographically, so the same discrepancy observed in either direction
/// maps to one fingerprint. Used for per-cycle deduplication and for the
/// in-flight execution set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint for a two-leg opportunity between two DEXes.
    pub fn simple(chain: &Chain, pair: &TokenPair, buy_dex: &DexId, sell_dex: &DexId) -> Self {
        let (a, b) = if buy_dex.as_str() <= sell_dex.as_str() {
            (buy_dex, sell_dex)
        } else {
            (sell_dex, buy_dex)
        };
        Self(format!("{chain}:{pair}:{a}-{b}"))
    }

    /// Fingerprint for a triangular opportunity over a token triple.
    ///
    /// The triple is part of configuration and already canonical; the DEX
    /// names of the three legs are sorted so leg ordering does not matter.
    pub fn triangular(chain: &Chain, triple: &[&str; 3], dexes: &[&DexId; 3]) -> Self {
        let mut names: Vec<&str> = dexes.iter().map(|d| d.as_str()).collect();
        names.sort_unstable();
        Self(format!(
            "{chain}:tri:{}-{}-{}:{}",
            triple[0],
            triple[1],
            triple[2],
            names.join("-")
        ))
    }

    /// Get the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_fingerprint_is_direction_independent() {
        let chain = Chain::from("ethereum");
        let pair = TokenPair::from("ETH/USDC");
        let uni = DexId::from("uniswap_v3");
        let sushi = DexId::from("sushiswap");

        let forward = Fingerprint::simple(&chain, &pair, &uni, &sushi);
        let reverse = Fingerprint::simple(&chain, &pair, &sushi, &uni);

        assert_eq!(forward, reverse);
        assert_eq!(forward.as_str(), "ethereum:ETH/USDC:sushiswap-uniswap_v3");
    }

    #[test]
    fn triangular_fingerprint_sorts_dex_legs() {
        let chain = Chain::from("ethereum");
        let triple = ["ETH", "USDC", "WBTC"];
        let a = DexId::from("uniswap_v3");
        let b = DexId::from("curve");
        let c = DexId::from("balancer");

        let one = Fingerprint::triangular(&chain, &triple, &[&a, &b, &c]);
        let two = Fingerprint::triangular(&chain, &triple, &[&c, &a, &b]);

        assert_eq!(one, two);
    }

    #[test]
    fn token_pair_splits_base_and_quote() {
        let pair = TokenPair::from("ETH/USDC");
        assert_eq!(pair.base(), Some("ETH"));
        assert_eq!(pair.quote(), Some("USDC"));
    }
}
