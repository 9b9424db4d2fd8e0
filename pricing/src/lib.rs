//! ExchangeDesk Pricing Engine
//!
//! Commission tiers and exchange-rate pricing for a multi-agency
//! currency-exchange back office.
//!
//! # Features
//!
//! - Commission calculation over four tier formulas
//! - Bid/ask derivation from a base rate and a symmetric spread
//! - Tier resolution for a transaction amount and type
//! - Tier-set editing with overlap validation and boundary cascade
//! - Exchange-rate editing with atomic repricing
//!
//! # Example
//!
//! ```rust,ignore
//! use exchangedesk_pricing::{PricingEngine, PricingConfig, QuoteRequest};
//! use exchangedesk_common::{Currency, Money};
//! use rust_decimal_macros::dec;
//!
//! let config = PricingConfig::from_env();
//! config.validate()?;
//!
//! let engine = PricingEngine::new(config);
//! engine.tiers().seed(tiers)?;
//! engine.insert_rate(rate)?;
//!
//! let request = QuoteRequest::new(
//!     Money::new(dec!(250.00), Currency::usd()),
//!     Currency::eur(),
//!     "transfer",
//! );
//! let quote = engine.quote(request)?;
//! ```

pub mod commission;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod rate_book;
pub mod resolution;
pub mod spread;
pub mod store;
pub mod tier;

pub use commission::{compute_commission, compute_commission_money};
pub use config::{MissingTierPolicy, PricingConfig, TierDefaults};
pub use editor::{EditSession, TierEditor, TierEvent, TierOutcome};
pub use engine::{PricingEngine, Quote, QuoteRequest, RateSide};
pub use error::{PricingError, PricingResult, ValidationError};
pub use rate_book::{ExchangeRateSetting, RateBook};
pub use resolution::select_tier;
pub use spread::{derive_bid_ask, spread_bps, spread_percentage, BidAsk};
pub use store::{PartitionKey, TierStore};
pub use tier::{CommissionTier, CommissionType, TierPatch};
