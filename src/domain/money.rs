//! Monetary types for price and amount representation.
//!
//! All percentage-like values on the money path are `Decimal` fractions:
//! `0.005` means 0.5%. Floating point is never used for money arithmetic.

use rust_decimal::Decimal;

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Trade amount in USD, represented as a Decimal.
pub type Amount = Decimal;

/// Percentage expressed as a Decimal fraction (0.005 = 0.5%).
pub type Pct = Decimal;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pct_of_amount_has_no_drift() {
        let amount: Amount = dec!(50000);
        let spread: Pct = dec!(0.008);

        assert_eq!(amount * spread, dec!(400.000));
    }
}
