//! Exchange-rate settings and their editing session.

use chrono::{DateTime, Utc};
use exchangedesk_common::{Currency, CurrencyPair, RateSettingId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PricingError, PricingResult, ValidationError};
use crate::spread::{derive_bid_ask, spread_bps, spread_percentage, BidAsk};

/// Pricing for one directed currency pair.
///
/// `bid_rate` and `ask_rate` are derived from `base_rate` and `total_spread`
/// and only change through [`ExchangeRateSetting::reprice`], so both sides
/// always come from the same inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RateSettingRecord")]
pub struct ExchangeRateSetting {
    pub id: RateSettingId,
    pub from_currency: Currency,
    pub to_currency: Currency,
    base_rate: Decimal,
    total_spread: Decimal,
    bid_rate: Decimal,
    ask_rate: Decimal,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
}

/// Stored shape of a rate setting; derived sides are recomputed on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateSettingRecord {
    id: RateSettingId,
    from_currency: Currency,
    to_currency: Currency,
    base_rate: Decimal,
    total_spread: Decimal,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default = "Utc::now")]
    last_updated: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl From<RateSettingRecord> for ExchangeRateSetting {
    fn from(record: RateSettingRecord) -> Self {
        let mut setting = ExchangeRateSetting::new(
            record.id,
            record.from_currency,
            record.to_currency,
            record.base_rate,
            record.total_spread,
        );
        setting.is_active = record.is_active;
        setting.last_updated = record.last_updated;
        setting
    }
}

impl ExchangeRateSetting {
    /// Create an active setting priced from `base_rate` and `total_spread`.
    pub fn new(
        id: impl Into<RateSettingId>,
        from_currency: Currency,
        to_currency: Currency,
        base_rate: Decimal,
        total_spread: Decimal,
    ) -> Self {
        let sides = derive_bid_ask(base_rate, total_spread);
        Self {
            id: id.into(),
            from_currency,
            to_currency,
            base_rate,
            total_spread,
            bid_rate: sides.bid_rate,
            ask_rate: sides.ask_rate,
            is_active: true,
            last_updated: Utc::now(),
        }
    }

    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from_currency.clone(), self.to_currency.clone())
    }

    pub fn base_rate(&self) -> Decimal {
        self.base_rate
    }

    pub fn total_spread(&self) -> Decimal {
        self.total_spread
    }

    pub fn bid_rate(&self) -> Decimal {
        self.bid_rate
    }

    pub fn ask_rate(&self) -> Decimal {
        self.ask_rate
    }

    pub fn sides(&self) -> BidAsk {
        BidAsk {
            bid_rate: self.bid_rate,
            ask_rate: self.ask_rate,
        }
    }

    /// Spread as a percentage of the base rate, for display.
    pub fn spread_percentage(&self) -> Decimal {
        spread_percentage(self.base_rate, self.total_spread)
    }

    /// Set new inputs and recompute both sides.
    pub fn reprice(&mut self, base_rate: Decimal, total_spread: Decimal) -> BidAsk {
        let sides = derive_bid_ask(base_rate, total_spread);
        self.base_rate = base_rate;
        self.total_spread = total_spread;
        self.bid_rate = sides.bid_rate;
        self.ask_rate = sides.ask_rate;
        sides
    }
}

/// Check a setting's inputs against the rate rules and the spread cap.
pub fn validate_rate(
    setting: &ExchangeRateSetting,
    max_spread_bps: u32,
) -> Result<(), ValidationError> {
    let pair = setting.pair();

    if setting.base_rate <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveBaseRate {
            pair,
            base_rate: setting.base_rate,
        });
    }

    if setting.total_spread < Decimal::ZERO {
        return Err(ValidationError::NegativeSpread {
            pair,
            total_spread: setting.total_spread,
        });
    }

    if setting.bid_rate <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveBid {
            pair,
            base_rate: setting.base_rate,
            total_spread: setting.total_spread,
        });
    }

    let bps = spread_bps(setting.base_rate, setting.total_spread);
    if bps > Decimal::from(max_spread_bps) {
        return Err(ValidationError::SpreadTooWide {
            pair,
            spread_bps: bps,
            max_bps: max_spread_bps,
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Default)]
enum RateSession {
    #[default]
    Idle,
    Editing {
        id: RateSettingId,
        draft: ExchangeRateSetting,
    },
}

/// Collection of exchange-rate settings with one editing session.
#[derive(Debug, Clone)]
pub struct RateBook {
    settings: Vec<ExchangeRateSetting>,
    session: RateSession,
    max_spread_bps: u32,
}

impl RateBook {
    /// Create an empty rate book enforcing `max_spread_bps`.
    pub fn new(max_spread_bps: u32) -> Self {
        Self {
            settings: Vec::new(),
            session: RateSession::Idle,
            max_spread_bps,
        }
    }

    pub fn settings(&self) -> &[ExchangeRateSetting] {
        &self.settings
    }

    pub fn get(&self, id: &RateSettingId) -> Option<&ExchangeRateSetting> {
        self.settings.iter().find(|s| &s.id == id)
    }

    pub fn find_by_pair(&self, pair: &CurrencyPair) -> Option<&ExchangeRateSetting> {
        self.settings.iter().find(|s| &s.pair() == pair)
    }

    /// Add a setting for a pair not yet in the book.
    pub fn insert(&mut self, setting: ExchangeRateSetting) -> PricingResult<()> {
        let pair = setting.pair();
        if self.find_by_pair(&pair).is_some() {
            return Err(PricingError::DuplicatePair(pair));
        }

        validate_rate(&setting, self.max_spread_bps)?;

        debug!(pair = %pair, bid = %setting.bid_rate, ask = %setting.ask_rate, "Rate added");
        self.settings.push(setting);
        Ok(())
    }

    /// The active setting for `pair`.
    pub fn active_rate(&self, pair: &CurrencyPair) -> PricingResult<&ExchangeRateSetting> {
        self.settings
            .iter()
            .find(|s| s.is_active && &s.pair() == pair)
            .ok_or_else(|| PricingError::RateNotFound(pair.clone()))
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.session, RateSession::Editing { .. })
    }

    pub fn draft(&self) -> Option<&ExchangeRateSetting> {
        match &self.session {
            RateSession::Editing { draft, .. } => Some(draft),
            RateSession::Idle => None,
        }
    }

    /// Open a session with a copy of the setting as draft.
    pub fn begin_edit(&mut self, id: &RateSettingId) -> PricingResult<ExchangeRateSetting> {
        if let RateSession::Editing { id: open, .. } = &self.session {
            return Err(PricingError::EditSessionOpen(open.to_string()));
        }

        let draft = self
            .get(id)
            .cloned()
            .ok_or_else(|| PricingError::RateSettingNotFound(id.clone()))?;

        self.session = RateSession::Editing {
            id: id.clone(),
            draft: draft.clone(),
        };
        Ok(draft)
    }

    /// Reprice the draft; both sides move together.
    pub fn update_draft(
        &mut self,
        base_rate: Decimal,
        total_spread: Decimal,
    ) -> PricingResult<BidAsk> {
        match &mut self.session {
            RateSession::Editing { draft, .. } => Ok(draft.reprice(base_rate, total_spread)),
            RateSession::Idle => Err(PricingError::NoEditSession),
        }
    }

    pub fn cancel_edit(&mut self) -> PricingResult<()> {
        match std::mem::take(&mut self.session) {
            RateSession::Editing { .. } => Ok(()),
            RateSession::Idle => Err(PricingError::NoEditSession),
        }
    }

    /// Validate and commit the draft, stamping `last_updated`.
    pub fn save(&mut self) -> PricingResult<ExchangeRateSetting> {
        let (id, mut draft) = match &self.session {
            RateSession::Editing { id, draft } => (id.clone(), draft.clone()),
            RateSession::Idle => return Err(PricingError::NoEditSession),
        };

        if let Err(rejection) = validate_rate(&draft, self.max_spread_bps) {
            warn!(rate_id = %id, reason = %rejection, "Rate save rejected");
            return Err(rejection.into());
        }

        let slot = self
            .settings
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PricingError::RateSettingNotFound(id.clone()))?;

        draft.last_updated = Utc::now();
        *slot = draft.clone();
        self.session = RateSession::Idle;

        info!(
            rate_id = %id,
            pair = %draft.pair(),
            base = %draft.base_rate,
            bid = %draft.bid_rate,
            ask = %draft.ask_rate,
            "Rate saved"
        );
        Ok(draft)
    }

    /// Flip `is_active`, returning the new value.
    pub fn toggle_active(&mut self, id: &RateSettingId) -> PricingResult<bool> {
        let setting = self
            .settings
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| PricingError::RateSettingNotFound(id.clone()))?;

        setting.is_active = !setting.is_active;
        Ok(setting.is_active)
    }
}
