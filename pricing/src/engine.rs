//! Pricing engine facade: rates, tiers and commissions behind one entry point.

use chrono::{DateTime, Utc};
use exchangedesk_common::{Currency, CurrencyPair, Money, RateSettingId, TierId};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::commission::{compute_commission, compute_commission_money};
use crate::config::{MissingTierPolicy, PricingConfig};
use crate::error::{PricingError, PricingResult};
use crate::rate_book::{ExchangeRateSetting, RateBook};
use crate::store::TierStore;
use crate::tier::CommissionTier;

/// Which side of the rate to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSide {
    /// Desk buys the base currency from the customer.
    Bid,
    /// Desk sells the base currency to the customer.
    Ask,
    /// Mid-market rate.
    #[default]
    Mid,
}

impl RateSide {
    /// Get the rate value from a setting.
    pub fn get_rate(&self, setting: &ExchangeRateSetting) -> Decimal {
        match self {
            RateSide::Bid => setting.bid_rate(),
            RateSide::Ask => setting.ask_rate(),
            RateSide::Mid => setting.base_rate(),
        }
    }
}

/// Request to price a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Amount handed over by the customer.
    pub amount: Money,
    /// Currency paid out.
    pub target_currency: Currency,
    /// Selects the tier partition.
    pub transaction_type: String,
    #[serde(default)]
    pub rate_side: RateSide,
}

impl QuoteRequest {
    /// Create a new quote request at the mid rate.
    pub fn new(
        amount: Money,
        target_currency: Currency,
        transaction_type: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            target_currency,
            transaction_type: transaction_type.into(),
            rate_side: RateSide::Mid,
        }
    }

    /// Use bid rate (customer sells the base currency).
    pub fn at_bid(mut self) -> Self {
        self.rate_side = RateSide::Bid;
        self
    }

    /// Use ask rate (customer buys the base currency).
    pub fn at_ask(mut self) -> Self {
        self.rate_side = RateSide::Ask;
        self
    }
}

/// A priced transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    /// Company issuing the quote.
    pub issuer: String,
    pub transaction_type: String,
    pub amount: Money,
    pub rate_side: RateSide,
    /// `None` when no conversion was needed.
    pub rate_id: Option<RateSettingId>,
    pub applied_rate: Decimal,
    /// Amount paid out, rounded to the target currency.
    pub converted: Money,
    /// `None` when no tier matched and the policy allows it.
    pub tier_id: Option<TierId>,
    pub commission: Money,
    pub quoted_at: DateTime<Utc>,
}

/// The main pricing engine.
pub struct PricingEngine {
    tiers: TierStore,
    rates: RwLock<RateBook>,
    config: PricingConfig,
}

impl PricingEngine {
    /// Create an engine with empty tier and rate collections.
    pub fn new(config: PricingConfig) -> Self {
        Self {
            tiers: TierStore::new(config.tier_defaults()),
            rates: RwLock::new(RateBook::new(config.max_spread_bps)),
            config,
        }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Tier partitions, for seeding and editing.
    pub fn tiers(&self) -> &TierStore {
        &self.tiers
    }

    /// Read access to the rate book.
    pub fn with_rates<R>(&self, f: impl FnOnce(&RateBook) -> R) -> R {
        f(&*self.rates.read())
    }

    /// Exclusive access to the rate book, for editing sessions.
    pub fn with_rates_mut<R>(&self, f: impl FnOnce(&mut RateBook) -> R) -> R {
        f(&mut *self.rates.write())
    }

    pub fn insert_rate(&self, setting: ExchangeRateSetting) -> PricingResult<()> {
        self.rates.write().insert(setting)
    }

    /// Commission owed for `amount`, following the missing-tier policy.
    #[instrument(skip(self))]
    pub fn commission_for(
        &self,
        amount: Decimal,
        transaction_type: &str,
    ) -> PricingResult<Decimal> {
        match self.resolve_tier(amount, transaction_type)? {
            Some(tier) => compute_commission(amount, &tier),
            None => Ok(Decimal::ZERO),
        }
    }

    /// Price a transaction: rate, conversion, tier and commission.
    #[instrument(skip(self), fields(
        from_currency = %request.amount.currency,
        to_currency = %request.target_currency,
        amount = %request.amount.value,
        transaction_type = %request.transaction_type
    ))]
    pub fn quote(&self, request: QuoteRequest) -> PricingResult<Quote> {
        if !request.amount.is_positive() {
            return Err(PricingError::InvalidAmount(request.amount.value));
        }

        let (rate_id, applied_rate) = if request.amount.currency == request.target_currency {
            (None, Decimal::ONE)
        } else {
            let pair = CurrencyPair::new(
                request.amount.currency.clone(),
                request.target_currency.clone(),
            );
            let book = self.rates.read();
            let setting = book.active_rate(&pair)?;
            (Some(setting.id.clone()), request.rate_side.get_rate(setting))
        };

        let converted = request
            .amount
            .value
            .checked_mul(applied_rate)
            .map(|value| Money::new(value, request.target_currency.clone()).round())
            .ok_or(PricingError::AmountOverflow(request.amount.value))?;

        let tier = self.resolve_tier(request.amount.value, &request.transaction_type)?;
        let commission = match &tier {
            Some(tier) => compute_commission_money(request.amount.value, tier)?,
            None => Money::zero(request.amount.currency.clone()),
        };

        let quote = Quote {
            id: Uuid::now_v7(),
            issuer: self.config.company_name.clone(),
            transaction_type: request.transaction_type,
            amount: request.amount,
            rate_side: request.rate_side,
            rate_id,
            applied_rate,
            converted,
            tier_id: tier.map(|t| t.id),
            commission,
            quoted_at: Utc::now(),
        };

        info!(
            quote_id = %quote.id,
            applied_rate = %quote.applied_rate,
            converted = %quote.converted,
            commission = %quote.commission,
            "Quote issued"
        );

        Ok(quote)
    }

    fn resolve_tier(
        &self,
        amount: Decimal,
        transaction_type: &str,
    ) -> PricingResult<Option<CommissionTier>> {
        match self.tiers.select_tier(amount, transaction_type) {
            Ok(tier) => Ok(Some(tier)),
            Err(PricingError::NoTierFound { .. })
                if self.config.missing_tier == MissingTierPolicy::ZeroCommission =>
            {
                debug!(
                    amount = %amount,
                    transaction_type,
                    "No tier matched, charging zero commission"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
