//! Commission tier model.

use exchangedesk_common::{Currency, TierId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Transaction type value meaning "applies to every type".
pub const ALL_TRANSACTION_TYPES: &str = "all";

/// Selects the commission formula of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    /// `amount * percentage / 100`.
    Percentage,
    /// `fixed_amount`, independent of amount.
    Fixed,
    /// `amount * percentage / 100 + fixed_amount`.
    PercentagePlusFixed,
    /// `max(amount * percentage / 100, fixed_amount)`.
    PercentageWithMinimum,
}

/// A contiguous amount range with its own commission formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionTier {
    pub id: TierId,
    pub name: String,
    /// Inclusive lower bound.
    pub min_amount: Decimal,
    /// Upper bound; `None` marks the open-ended last tier.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    #[serde(default)]
    pub fixed_amount: Decimal,
    /// Proportional component on a 0-100 scale.
    #[serde(default)]
    pub percentage: Decimal,
    pub currency: Currency,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Display ordering hint. Ranges are resolved by `min_amount`.
    #[serde(default)]
    pub order: u32,
    /// `None` leaves the tier without a formula; it then charges nothing.
    #[serde(rename = "type", default)]
    pub commission_type: Option<CommissionType>,
    #[serde(default)]
    pub transaction_type: Option<String>,
}

fn default_active() -> bool {
    true
}

impl CommissionTier {
    /// Create an active percentage tier with zero fee values.
    pub fn new(
        id: impl Into<TierId>,
        name: impl Into<String>,
        min_amount: Decimal,
        max_amount: Option<Decimal>,
        currency: Currency,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            min_amount,
            max_amount,
            fixed_amount: Decimal::ZERO,
            percentage: Decimal::ZERO,
            currency,
            is_active: true,
            order: 0,
            commission_type: Some(CommissionType::Percentage),
            transaction_type: None,
        }
    }

    pub fn with_type(mut self, commission_type: CommissionType) -> Self {
        self.commission_type = Some(commission_type);
        self
    }

    pub fn with_percentage(mut self, percentage: Decimal) -> Self {
        self.percentage = percentage;
        self
    }

    pub fn with_fixed_amount(mut self, fixed_amount: Decimal) -> Self {
        self.fixed_amount = fixed_amount;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Restrict the tier to one transaction type.
    pub fn for_transaction_type(mut self, transaction_type: impl Into<String>) -> Self {
        self.transaction_type = Some(transaction_type.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether the tier applies to every transaction type.
    pub fn is_unrestricted(&self) -> bool {
        match &self.transaction_type {
            None => true,
            Some(t) => t.eq_ignore_ascii_case(ALL_TRANSACTION_TYPES),
        }
    }

    /// Whether the tier participates for the given transaction type.
    pub fn applies_to(&self, transaction_type: &str) -> bool {
        self.is_unrestricted()
            || self
                .transaction_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(transaction_type))
    }

    /// Whether `amount` falls within `[min_amount, max_amount]`.
    pub fn covers(&self, amount: Decimal) -> bool {
        self.min_amount <= amount && self.max_amount.map_or(true, |max| amount <= max)
    }

    pub fn is_open_ended(&self) -> bool {
        self.max_amount.is_none()
    }

    /// Span of the range, `None` for the open-ended tier.
    pub fn width(&self) -> Option<Decimal> {
        self.max_amount.map(|max| max - self.min_amount)
    }
}

/// A partial update applied to a draft tier.
///
/// Absent fields are left untouched. `max_amount` distinguishes "absent"
/// from an explicit `null`, which makes the draft open-ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub max_amount: Option<Option<Decimal>>,
    #[serde(default)]
    pub fixed_amount: Option<Decimal>,
    #[serde(default)]
    pub percentage: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(rename = "type", default)]
    pub commission_type: Option<CommissionType>,
    #[serde(default)]
    pub order: Option<u32>,
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TierPatch {
    /// Patch that only moves the upper bound.
    pub fn max_amount(max_amount: Option<Decimal>) -> Self {
        Self {
            max_amount: Some(max_amount),
            ..Default::default()
        }
    }

    /// Patch that only moves the lower bound.
    pub fn min_amount(min_amount: Decimal) -> Self {
        Self {
            min_amount: Some(min_amount),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, tier: &mut CommissionTier) {
        if let Some(name) = &self.name {
            tier.name = name.clone();
        }
        if let Some(min) = self.min_amount {
            tier.min_amount = min;
        }
        if let Some(max) = self.max_amount {
            tier.max_amount = max;
        }
        if let Some(fixed) = self.fixed_amount {
            tier.fixed_amount = fixed;
        }
        if let Some(pct) = self.percentage {
            tier.percentage = pct;
        }
        if let Some(currency) = &self.currency {
            tier.currency = currency.clone();
        }
        if let Some(kind) = self.commission_type {
            tier.commission_type = Some(kind);
        }
        if let Some(order) = self.order {
            tier.order = order;
        }
    }
}
