//! Bid/ask derivation around a mid-market base rate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Buy and sell rates derived together from one base rate and spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidAsk {
    /// Rate at which the desk buys the base currency.
    pub bid_rate: Decimal,
    /// Rate at which the desk sells the base currency.
    pub ask_rate: Decimal,
}

impl BidAsk {
    /// Absolute distance between the two sides.
    pub fn spread(&self) -> Decimal {
        self.ask_rate - self.bid_rate
    }

    pub fn mid(&self) -> Decimal {
        (self.bid_rate + self.ask_rate) / Decimal::TWO
    }
}

/// Split `total_spread` symmetrically around `base_rate`.
pub fn derive_bid_ask(base_rate: Decimal, total_spread: Decimal) -> BidAsk {
    let half = total_spread / Decimal::TWO;
    BidAsk {
        bid_rate: base_rate - half,
        ask_rate: base_rate + half,
    }
}

/// Spread as a percentage of the base rate; `0` for a non-positive base.
pub fn spread_percentage(base_rate: Decimal, total_spread: Decimal) -> Decimal {
    if base_rate <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    total_spread / base_rate * Decimal::ONE_HUNDRED
}

/// Spread in basis points; `0` for a non-positive base.
pub fn spread_bps(base_rate: Decimal, total_spread: Decimal) -> Decimal {
    spread_percentage(base_rate, total_spread) * Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_derive_bid_ask() {
        let rates = derive_bid_ask(dec!(1.0850), dec!(0.0100));

        assert_eq!(rates.bid_rate, dec!(1.0800));
        assert_eq!(rates.ask_rate, dec!(1.0900));
        assert_eq!(rates.spread(), dec!(0.0100));
        assert_eq!(rates.mid(), dec!(1.0850));
    }

    #[test]
    fn test_zero_spread_collapses_to_base() {
        let rates = derive_bid_ask(dec!(10.95), Decimal::ZERO);
        assert_eq!(rates.bid_rate, rates.ask_rate);
    }

    #[test]
    fn test_spread_percentage() {
        assert_eq!(spread_percentage(dec!(2), dec!(0.02)), dec!(1));
        assert_eq!(spread_bps(dec!(2), dec!(0.02)), dec!(100));
    }

    #[test]
    fn test_spread_percentage_guards_zero_base() {
        assert_eq!(spread_percentage(Decimal::ZERO, dec!(0.5)), Decimal::ZERO);
        assert_eq!(spread_percentage(dec!(-1), dec!(0.5)), Decimal::ZERO);
        assert_eq!(spread_bps(Decimal::ZERO, dec!(0.5)), Decimal::ZERO);
    }
}
