//! Desk controller.

use anyhow::{bail, ensure};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use exchangedesk_common::{Currency, CurrencyPair, Money};
use exchangedesk_pricing::{
    ExchangeRateSetting, PartitionKey, PricingEngine, PricingError, PricingResult, Quote,
    QuoteRequest, RateSide, TierOutcome,
};

use crate::metrics::DeskMetrics;
use crate::scenario::{AssertCondition, Scenario, ScenarioStep};

/// Drives an engine through scenarios and random traffic.
pub struct DeskController {
    engine: PricingEngine,
    rng: StdRng,
    metrics: DeskMetrics,
}

impl DeskController {
    /// Create a controller; a seed makes random traffic reproducible.
    pub fn new(engine: PricingEngine, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            engine,
            rng,
            metrics: DeskMetrics::new(),
        }
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &DeskMetrics {
        &self.metrics
    }

    /// Run every step in order, stopping at the first failed step.
    pub fn run_scenario(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        for (index, step) in scenario.steps.iter().enumerate() {
            debug!(step = index, ?step, "Executing step");
            self.execute_step(step)
                .map_err(|e| e.context(format!("step {} of scenario {}", index, scenario.name)))?;
        }

        info!(steps = scenario.steps.len(), "Scenario passed: {}", scenario.name);
        Ok(())
    }

    fn execute_step(&mut self, step: &ScenarioStep) -> anyhow::Result<()> {
        match step {
            ScenarioStep::Quote {
                amount,
                from,
                to,
                transaction_type,
                side,
            } => {
                let mut request = QuoteRequest::new(
                    Money::new(*amount, from.clone()),
                    to.clone(),
                    transaction_type.clone(),
                );
                request.rate_side = *side;

                if let Err(e) = self.quote(request) {
                    warn!(code = e.error_code(), "Quote rejected: {}", e);
                }
                Ok(())
            }
            ScenarioStep::Tier {
                partition,
                event,
                expect_error,
            } => {
                let key = PartitionKey::new(partition);
                let result = self.engine.tiers().apply(&key, event.clone());
                if let Some(outcome) = expect_outcome(result, expect_error.as_deref())? {
                    if matches!(outcome, TierOutcome::Saved { .. }) {
                        self.metrics.record_edit();
                    }
                    debug!(partition = %key, ?outcome, "Tier event applied");
                }
                Ok(())
            }
            ScenarioStep::EditRate {
                from,
                to,
                base_rate,
                total_spread,
                expect_error,
            } => {
                let pair = CurrencyPair::new(from.clone(), to.clone());
                let result = self.edit_rate(&pair, *base_rate, *total_spread);
                if expect_outcome(result, expect_error.as_deref())?.is_some() {
                    self.metrics.record_edit();
                }
                Ok(())
            }
            ScenarioStep::Assert { condition } => self.check(condition),
        }
    }

    /// Price a request and record the result.
    pub fn quote(&mut self, request: QuoteRequest) -> PricingResult<Quote> {
        match self.engine.quote(request) {
            Ok(quote) => {
                self.metrics.record_quote(&quote);
                Ok(quote)
            }
            Err(e) => {
                self.metrics.record_rejection(&e);
                Err(e)
            }
        }
    }

    /// Reprice a pair in one edit session. A rejected draft is discarded.
    fn edit_rate(
        &self,
        pair: &CurrencyPair,
        base_rate: Decimal,
        total_spread: Decimal,
    ) -> PricingResult<ExchangeRateSetting> {
        self.engine.with_rates_mut(|book| {
            let id = book
                .find_by_pair(pair)
                .map(|s| s.id.clone())
                .ok_or_else(|| PricingError::RateNotFound(pair.clone()))?;

            book.begin_edit(&id)?;
            book.update_draft(base_rate, total_spread)?;
            match book.save() {
                Ok(saved) => Ok(saved),
                Err(e) => {
                    book.cancel_edit()?;
                    Err(e)
                }
            }
        })
    }

    fn check(&self, condition: &AssertCondition) -> anyhow::Result<()> {
        match condition {
            AssertCondition::TierBounds {
                partition,
                tier_id,
                min_amount,
                max_amount,
            } => {
                let key = PartitionKey::new(partition);
                let tiers = self.engine.tiers().tiers_in(&key);
                let Some(tier) = tiers.iter().find(|t| &t.id == tier_id) else {
                    bail!("tier {} not found in partition {}", tier_id, key);
                };
                ensure!(
                    tier.min_amount == *min_amount && tier.max_amount == *max_amount,
                    "tier {} spans [{}, {:?}], expected [{}, {:?}]",
                    tier_id,
                    tier.min_amount,
                    tier.max_amount,
                    min_amount,
                    max_amount
                );
            }
            AssertCondition::CommissionEquals {
                transaction_type,
                amount,
                commission,
            } => {
                let actual = self.engine.commission_for(*amount, transaction_type)?;
                ensure!(
                    actual == *commission,
                    "commission on {} ({}) is {}, expected {}",
                    amount,
                    transaction_type,
                    actual,
                    commission
                );
            }
            AssertCondition::QuoteFails {
                amount,
                from,
                to,
                transaction_type,
                code,
            } => {
                let request = QuoteRequest::new(
                    Money::new(*amount, from.clone()),
                    to.clone(),
                    transaction_type.clone(),
                );
                match self.engine.quote(request) {
                    Ok(quote) => bail!("expected {} but quote {} was issued", code, quote.id),
                    Err(e) => ensure!(
                        e.error_code() == code,
                        "expected {}, quote failed with {}",
                        code,
                        e.error_code()
                    ),
                }
            }
            AssertCondition::RateSides {
                from,
                to,
                bid_rate,
                ask_rate,
            } => {
                let pair = CurrencyPair::new(from.clone(), to.clone());
                let sides = self
                    .engine
                    .with_rates(|book| book.active_rate(&pair).map(|s| s.sides()))?;
                ensure!(
                    sides.bid_rate == *bid_rate && sides.ask_rate == *ask_rate,
                    "{} is {}/{}, expected {}/{}",
                    pair,
                    sides.bid_rate,
                    sides.ask_rate,
                    bid_rate,
                    ask_rate
                );
            }
        }

        debug!(?condition, "Assertion held");
        Ok(())
    }

    /// Issue `count` random quotes over the installed tiers and rates.
    pub fn run_random_quotes(&mut self, count: usize) -> anyhow::Result<()> {
        let mut transaction_types: Vec<String> = self
            .engine
            .tiers()
            .partition_keys()
            .into_iter()
            .filter(|k| !k.is_all())
            .map(String::from)
            .collect();
        if transaction_types.is_empty() {
            transaction_types.push(PartitionKey::all().to_string());
        }

        let mut routes: Vec<(Currency, Currency)> = self.engine.with_rates(|book| {
            book.settings()
                .iter()
                .filter(|s| s.is_active)
                .map(|s| (s.from_currency.clone(), s.to_currency.clone()))
                .collect()
        });
        let home = self.engine.config().default_currency.clone();
        routes.push((home.clone(), home));

        info!(
            count,
            transaction_types = transaction_types.len(),
            routes = routes.len(),
            "Generating random quotes"
        );

        const SIDES: [RateSide; 3] = [RateSide::Bid, RateSide::Ask, RateSide::Mid];

        for _ in 0..count {
            let transaction_type = transaction_types
                .choose(&mut self.rng)
                .cloned()
                .unwrap_or_default();
            let (from, to) = match routes.choose(&mut self.rng) {
                Some(route) => route.clone(),
                None => bail!("no quote routes available"),
            };
            let amount = Decimal::new(self.rng.gen_range(100..1_000_000), 2);

            let mut request = QuoteRequest::new(Money::new(amount, from), to, transaction_type);
            request.rate_side = SIDES[self.rng.gen_range(0..SIDES.len())];

            if let Err(e) = self.quote(request) {
                debug!(code = e.error_code(), "Random quote rejected: {}", e);
            }
        }

        Ok(())
    }
}

/// Match a step's result against its expected error code, if any.
fn expect_outcome<T>(
    result: PricingResult<T>,
    expected: Option<&str>,
) -> anyhow::Result<Option<T>> {
    match (result, expected) {
        (Ok(value), None) => Ok(Some(value)),
        (Ok(_), Some(code)) => bail!("expected {} but the step succeeded", code),
        (Err(e), Some(code)) if e.error_code() == code => {
            debug!(code, "Step failed as expected");
            Ok(None)
        }
        (Err(e), _) => Err(e.into()),
    }
}
