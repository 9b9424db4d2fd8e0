//! Commission calculation for a single tier.

use exchangedesk_common::Money;
use rust_decimal::Decimal;

use crate::error::{PricingError, PricingResult};
use crate::tier::{CommissionTier, CommissionType};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Commission owed on `amount` under `tier`'s formula.
///
/// Range membership is not checked here; resolve the tier first with
/// [`crate::resolution::select_tier`]. A tier without a formula charges `0`.
pub fn compute_commission(amount: Decimal, tier: &CommissionTier) -> PricingResult<Decimal> {
    let overflow = || PricingError::AmountOverflow(amount);
    let proportional = || {
        amount
            .checked_mul(tier.percentage)
            .map(|scaled| scaled / HUNDRED)
            .ok_or_else(overflow)
    };

    match tier.commission_type {
        Some(CommissionType::Fixed) => Ok(tier.fixed_amount),
        Some(CommissionType::Percentage) => proportional(),
        Some(CommissionType::PercentagePlusFixed) => proportional()?
            .checked_add(tier.fixed_amount)
            .ok_or_else(overflow),
        Some(CommissionType::PercentageWithMinimum) => Ok(proportional()?.max(tier.fixed_amount)),
        None => Ok(Decimal::ZERO),
    }
}

/// Commission in the tier's currency, rounded to its standard precision.
pub fn compute_commission_money(amount: Decimal, tier: &CommissionTier) -> PricingResult<Money> {
    let value = compute_commission(amount, tier)?;
    Ok(Money::new(value, tier.currency.clone()).round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchangedesk_common::Currency;
    use rust_decimal_macros::dec;

    fn tier(kind: Option<CommissionType>) -> CommissionTier {
        let mut tier = CommissionTier::new("t", "Test", dec!(0), None, Currency::usd())
            .with_percentage(dec!(2))
            .with_fixed_amount(dec!(5));
        tier.commission_type = kind;
        tier
    }

    #[test]
    fn test_fixed_ignores_amount() {
        let t = tier(Some(CommissionType::Fixed));
        assert_eq!(compute_commission(dec!(10), &t).unwrap(), dec!(5));
        assert_eq!(compute_commission(dec!(1000000), &t).unwrap(), dec!(5));
    }

    #[test]
    fn test_percentage() {
        let t = tier(Some(CommissionType::Percentage));
        assert_eq!(compute_commission(dec!(250), &t).unwrap(), dec!(5));
    }

    #[test]
    fn test_percentage_plus_fixed() {
        let t = tier(Some(CommissionType::PercentagePlusFixed));
        assert_eq!(compute_commission(dec!(250), &t).unwrap(), dec!(10));
    }

    #[test]
    fn test_percentage_with_minimum() {
        let t = tier(Some(CommissionType::PercentageWithMinimum));

        // 2% of 100 is 2, below the 5 minimum
        assert_eq!(compute_commission(dec!(100), &t).unwrap(), dec!(5));
        // 2% of 1000 is 20, above it
        assert_eq!(compute_commission(dec!(1000), &t).unwrap(), dec!(20));
    }

    #[test]
    fn test_undefined_type_charges_nothing() {
        let t = tier(None);
        assert_eq!(compute_commission(dec!(1000), &t).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_commission_money_rounds_to_currency() {
        let t = tier(Some(CommissionType::Percentage)).with_percentage(dec!(1.25));
        let fee = compute_commission_money(dec!(99.99), &t).unwrap();

        assert_eq!(fee.currency, Currency::usd());
        // 1.249875 rounds to 1.25
        assert_eq!(fee.value, dec!(1.25));
    }

    #[test]
    fn test_overflow_is_reported() {
        let t = tier(Some(CommissionType::Percentage)).with_percentage(dec!(50));

        assert_eq!(
            compute_commission(Decimal::MAX, &t),
            Err(PricingError::AmountOverflow(Decimal::MAX))
        );
        // A fixed fee never touches the amount.
        let fixed = tier(Some(CommissionType::Fixed));
        assert_eq!(compute_commission(Decimal::MAX, &fixed), Ok(dec!(5)));
    }
}
