//! Pricing engine error types.

use exchangedesk_common::{CurrencyPair, RateSettingId, TierId};
use rust_decimal::Decimal;
use thiserror::Error;

/// A user-correctable rejection raised while validating a draft.
///
/// Every variant names the offending entity and the competing values so the
/// caller can present it without re-deriving state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Draft minimum is not below its maximum.
    #[error("Tier '{tier}': minimum {min} must be below maximum {max}")]
    InvalidRange {
        tier: String,
        min: Decimal,
        max: Decimal,
    },

    /// Draft minimum falls inside the predecessor's range.
    #[error(
        "Tier '{tier}': minimum {min} overlaps tier '{predecessor}' which ends at {predecessor_max}"
    )]
    BoundaryOverlap {
        tier: String,
        min: Decimal,
        predecessor: String,
        predecessor_max: Decimal,
    },

    /// Draft maximum runs into the tier that starts after it.
    #[error(
        "Tier '{tier}': maximum {max} overlaps tier '{successor}' which starts at {successor_min}"
    )]
    SuccessorOverlap {
        tier: String,
        max: Decimal,
        successor: String,
        successor_min: Decimal,
    },

    /// Draft would sit above an unbounded tier.
    #[error("Tier '{tier}': minimum {min} lies above open-ended tier '{predecessor}'")]
    OpenEndedPredecessor {
        tier: String,
        min: Decimal,
        predecessor: String,
    },

    /// Draft is unbounded but other tiers start above it.
    #[error("Tier '{tier}' cannot be open-ended while tier '{successor}' follows it")]
    OpenEndedNotLast { tier: String, successor: String },

    /// Shifting boundaries would leave the representable range.
    #[error("Tier '{tier}': boundary {boundary} cannot be moved by {width}")]
    BoundaryOverflow {
        tier: String,
        boundary: Decimal,
        width: Decimal,
    },

    #[error("Rate {pair}: base rate {base_rate} must be positive")]
    NonPositiveBaseRate { pair: CurrencyPair, base_rate: Decimal },

    #[error("Rate {pair}: spread {total_spread} cannot be negative")]
    NegativeSpread {
        pair: CurrencyPair,
        total_spread: Decimal,
    },

    /// Spread is at least twice the base rate, so the bid would not be positive.
    #[error("Rate {pair}: spread {total_spread} leaves a non-positive bid at base {base_rate}")]
    NonPositiveBid {
        pair: CurrencyPair,
        base_rate: Decimal,
        total_spread: Decimal,
    },

    #[error("Rate {pair}: spread {spread_bps} bps exceeds maximum {max_bps} bps")]
    SpreadTooWide {
        pair: CurrencyPair,
        spread_bps: Decimal,
        max_bps: u32,
    },
}

/// Errors that can occur in the pricing engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Draft failed validation; nothing was mutated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Cannot append after an unbounded final tier.
    #[error("Cannot add a tier after open-ended tier '{tier}'; give it a maximum first")]
    OpenEndedCollection { tier: String },

    /// No active tier covers the amount for this transaction type.
    #[error(
        "No commission tier found for amount {amount} and transaction type '{transaction_type}'"
    )]
    NoTierFound {
        amount: Decimal,
        transaction_type: String,
    },

    #[error("Tier not found: {0}")]
    TierNotFound(TierId),

    /// No active rate for the currency pair.
    #[error("Rate not available for {0}")]
    RateNotFound(CurrencyPair),

    #[error("Rate setting not found: {0}")]
    RateSettingNotFound(RateSettingId),

    #[error("A rate setting for {0} already exists")]
    DuplicatePair(CurrencyPair),

    /// Draft operation without an open editing session.
    #[error("No editing session is open")]
    NoEditSession,

    /// A session is already open on another entity.
    #[error("An editing session is already open for {0}")]
    EditSessionOpen(String),

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Arithmetic on the amount left the representable range.
    #[error("Amount {0} is too large to price")]
    AmountOverflow(Decimal),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PricingError {
    /// Whether the user can fix this by correcting the draft.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            PricingError::Validation(_) | PricingError::OpenEndedCollection { .. }
        )
    }

    /// Get a stable error code for callers and metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            PricingError::Validation(v) => match v {
                ValidationError::InvalidRange { .. } => "INVALID_RANGE",
                ValidationError::BoundaryOverlap { .. } => "BOUNDARY_OVERLAP",
                ValidationError::SuccessorOverlap { .. } => "SUCCESSOR_OVERLAP",
                ValidationError::OpenEndedPredecessor { .. } => "OPEN_ENDED_PREDECESSOR",
                ValidationError::OpenEndedNotLast { .. } => "OPEN_ENDED_NOT_LAST",
                ValidationError::BoundaryOverflow { .. } => "BOUNDARY_OVERFLOW",
                ValidationError::NonPositiveBaseRate { .. } => "NON_POSITIVE_BASE_RATE",
                ValidationError::NegativeSpread { .. } => "NEGATIVE_SPREAD",
                ValidationError::NonPositiveBid { .. } => "NON_POSITIVE_BID",
                ValidationError::SpreadTooWide { .. } => "SPREAD_TOO_WIDE",
            },
            PricingError::OpenEndedCollection { .. } => "OPEN_ENDED_COLLECTION",
            PricingError::NoTierFound { .. } => "NO_TIER_FOUND",
            PricingError::TierNotFound(_) => "TIER_NOT_FOUND",
            PricingError::RateNotFound(_) => "RATE_NOT_FOUND",
            PricingError::RateSettingNotFound(_) => "RATE_SETTING_NOT_FOUND",
            PricingError::DuplicatePair(_) => "DUPLICATE_PAIR",
            PricingError::NoEditSession => "NO_EDIT_SESSION",
            PricingError::EditSessionOpen(_) => "EDIT_SESSION_OPEN",
            PricingError::InvalidAmount(_) => "INVALID_AMOUNT",
            PricingError::AmountOverflow(_) => "AMOUNT_OVERFLOW",
            PricingError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type for pricing operations.
pub type PricingResult<T> = Result<T, PricingError>;
