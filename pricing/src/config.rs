//! Pricing engine configuration.

use exchangedesk_common::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{PricingError, PricingResult};

/// What to do when no tier covers a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTierPolicy {
    /// Surface `NoTierFound` to the caller.
    Reject,
    /// Charge no commission.
    ZeroCommission,
}

impl FromStr for MissingTierPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(MissingTierPolicy::Reject),
            "zero" | "zero_commission" => Ok(MissingTierPolicy::ZeroCommission),
            other => Err(format!("Unknown missing tier policy: {}", other)),
        }
    }
}

/// Defaults applied to tiers created with "add new tier".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierDefaults {
    /// Width of a freshly appended tier above its minimum.
    pub width: Decimal,
    /// Currency the new tier's fixed amount is denominated in.
    pub currency: Currency,
}

impl Default for TierDefaults {
    fn default() -> Self {
        Self {
            width: Decimal::from(500),
            currency: Currency::usd(),
        }
    }
}

/// Main pricing configuration.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Company name shown on quotes.
    pub company_name: String,
    /// Default currency for new tiers.
    pub default_currency: Currency,
    /// Width of a freshly appended tier.
    pub new_tier_width: Decimal,
    /// Maximum allowed rate spread in basis points.
    pub max_spread_bps: u32,
    /// Policy when no tier matches a transaction.
    pub missing_tier: MissingTierPolicy,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            company_name: "ExchangeDesk".to_string(),
            default_currency: Currency::usd(),
            new_tier_width: Decimal::from(500),
            max_spread_bps: 500, // 5% max spread
            missing_tier: MissingTierPolicy::Reject,
        }
    }
}

impl PricingConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("DESK_COMPANY_NAME") {
            config.company_name = name;
        }

        if let Ok(currency) = std::env::var("DESK_DEFAULT_CURRENCY") {
            config.default_currency = Currency::new(currency);
        }

        if let Ok(width) = std::env::var("DESK_NEW_TIER_WIDTH") {
            if let Ok(width) = width.parse() {
                config.new_tier_width = width;
            }
        }

        if let Ok(bps) = std::env::var("DESK_MAX_SPREAD_BPS") {
            if let Ok(bps) = bps.parse() {
                config.max_spread_bps = bps;
            }
        }

        if let Ok(policy) = std::env::var("DESK_MISSING_TIER_POLICY") {
            if let Ok(policy) = policy.parse() {
                config.missing_tier = policy;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> PricingResult<()> {
        if self.default_currency.is_empty() {
            return Err(PricingError::Configuration(
                "Default currency cannot be empty".to_string(),
            ));
        }

        if self.new_tier_width <= Decimal::ZERO {
            return Err(PricingError::Configuration(
                "New tier width must be positive".to_string(),
            ));
        }

        if self.max_spread_bps == 0 {
            return Err(PricingError::Configuration(
                "Maximum spread cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Defaults handed to each tier editor.
    pub fn tier_defaults(&self) -> TierDefaults {
        TierDefaults {
            width: self.new_tier_width,
            currency: self.default_currency.clone(),
        }
    }
}
