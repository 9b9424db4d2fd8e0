//! Tier resolution for a transaction.

use rust_decimal::Decimal;
use std::cmp::Ordering;
use tracing::debug;

use crate::error::{PricingError, PricingResult};
use crate::tier::CommissionTier;

/// Pick the active tier covering `amount` for `transaction_type`.
///
/// Overlapping candidates resolve to the lowest `min_amount`, then the lowest
/// `order`, then the lowest id, so the result is deterministic even for a
/// collection that breaks the no-overlap invariant.
pub fn select_tier<'a>(
    tiers: &'a [CommissionTier],
    amount: Decimal,
    transaction_type: &str,
) -> PricingResult<&'a CommissionTier> {
    let selected = tiers
        .iter()
        .filter(|t| t.is_active && t.applies_to(transaction_type))
        .filter(|t| t.covers(amount))
        .min_by(|a, b| precedence(a, b));

    match selected {
        Some(tier) => {
            debug!(
                tier_id = %tier.id,
                amount = %amount,
                transaction_type,
                "Resolved commission tier"
            );
            Ok(tier)
        }
        None => Err(PricingError::NoTierFound {
            amount,
            transaction_type: transaction_type.to_string(),
        }),
    }
}

/// Ordering used for range resolution and sorting of a tier ladder.
pub(crate) fn precedence(a: &CommissionTier, b: &CommissionTier) -> Ordering {
    a.min_amount
        .cmp(&b.min_amount)
        .then(a.order.cmp(&b.order))
        .then_with(|| a.id.cmp(&b.id))
}
