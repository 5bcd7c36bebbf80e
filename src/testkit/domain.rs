//! Builders for domain primitives used across unit and integration tests.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    Amount, Chain, DexId, Evaluation, Fingerprint, FundingSource, Opportunity, OpportunityLeg,
    Pct, PriceQuote, TokenPair,
};

/// A fresh quote on ethereum with $100k of liquidity.
pub fn quote(dex: &str, pair: &str, price: Decimal) -> PriceQuote {
    quote_on("ethereum", dex, pair, price, Decimal::from(100_000))
}

pub fn quote_on(chain: &str, dex: &str, pair: &str, price: Decimal, liquidity: Amount) -> PriceQuote {
    PriceQuote {
        chain: Chain::from(chain),
        dex: DexId::from(dex),
        pair: TokenPair::from(pair),
        price,
        liquidity,
        observed_at: Utc::now(),
    }
}

/// A two-leg same-chain opportunity with the given gross spread.
pub fn simple_opportunity(pair: &str, gross_profit_pct: Pct) -> Opportunity {
    let chain = Chain::from("ethereum");
    let pair = TokenPair::from(pair);
    let buy = DexId::from("uniswap_v3");
    let sell = DexId::from("sushiswap");
    let price = Decimal::from(2000);

    Opportunity::builder()
        .fingerprint(Fingerprint::simple(&chain, &pair, &buy, &sell))
        .leg(OpportunityLeg {
            chain: chain.clone(),
            dex: buy,
            pair: pair.clone(),
            price,
        })
        .leg(OpportunityLeg {
            chain,
            dex: sell,
            pair,
            price: price * (Decimal::ONE + gross_profit_pct),
        })
        .gross_profit_pct(gross_profit_pct)
        .detected_at(Utc::now() - Duration::seconds(1))
        .build()
        .expect("two legs and a fingerprint")
}

/// A viable wallet-funded evaluation with the given net profit.
pub fn evaluation_with_profit(pair: &str, net_profit: Amount) -> Evaluation {
    let opportunity = simple_opportunity(pair, Decimal::new(5, 3));
    let amount = Decimal::from(1000);
    Evaluation {
        opportunity,
        amount,
        funding: FundingSource::Wallet,
        route: None,
        gross_profit: net_profit + Decimal::from(5),
        flash_loan_fee: Amount::ZERO,
        gas_cost_usd: Decimal::from(5),
        gas_units: 240_000,
        slippage_cost: Amount::ZERO,
        bridge_fee_usd: Amount::ZERO,
        net_profit,
        viable: true,
        reason: None,
    }
}
