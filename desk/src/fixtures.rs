//! Seed data for the desk.

use std::fs;
use std::path::Path;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use exchangedesk_common::Currency;
use exchangedesk_pricing::{
    CommissionTier, CommissionType, ExchangeRateSetting, PricingEngine,
};

/// Tiers and rates loaded into an engine at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskFixtures {
    #[serde(default)]
    pub tiers: Vec<CommissionTier>,
    #[serde(default)]
    pub rates: Vec<ExchangeRateSetting>,
}

impl DeskFixtures {
    /// Read fixtures from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading fixtures from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing fixtures in {}", path.display()))
    }

    /// Transfer and exchange ladders with three rates out of USD and EUR.
    pub fn builtin() -> Self {
        let usd = Currency::usd();
        let tier = |id: &str, name: &str, min: i64, max: Option<i64>| {
            CommissionTier::new(
                id,
                name,
                Decimal::from(min),
                max.map(Decimal::from),
                usd.clone(),
            )
        };

        let tiers = vec![
            tier("tr-1", "Transfer small", 0, Some(100))
                .with_type(CommissionType::Fixed)
                .with_fixed_amount(Decimal::from(3))
                .with_order(1)
                .for_transaction_type("transfer"),
            tier("tr-2", "Transfer medium", 100, Some(500))
                .with_type(CommissionType::PercentagePlusFixed)
                .with_percentage(Decimal::ONE)
                .with_fixed_amount(Decimal::TWO)
                .with_order(2)
                .for_transaction_type("transfer"),
            tier("tr-3", "Transfer large", 500, None)
                .with_type(CommissionType::PercentageWithMinimum)
                .with_percentage(Decimal::new(5, 1))
                .with_fixed_amount(Decimal::TEN)
                .with_order(3)
                .for_transaction_type("transfer"),
            tier("ex-1", "Exchange retail", 0, Some(1000))
                .with_percentage(Decimal::new(15, 1))
                .with_order(1)
                .for_transaction_type("exchange"),
            tier("ex-2", "Exchange wholesale", 1000, None)
                .with_type(CommissionType::PercentageWithMinimum)
                .with_percentage(Decimal::ONE)
                .with_fixed_amount(Decimal::from(20))
                .with_order(2)
                .for_transaction_type("exchange"),
        ];

        let rates = vec![
            ExchangeRateSetting::new(
                "usd-eur",
                usd.clone(),
                Currency::eur(),
                Decimal::new(92, 2),
                Decimal::new(2, 2),
            ),
            ExchangeRateSetting::new(
                "eur-usd",
                Currency::eur(),
                usd.clone(),
                Decimal::new(10850, 4),
                Decimal::new(100, 4),
            ),
            ExchangeRateSetting::new(
                "usd-gbp",
                usd.clone(),
                Currency::gbp(),
                Decimal::new(79, 2),
                Decimal::new(1, 2),
            ),
        ];

        Self { tiers, rates }
    }

    /// Seed `engine` with every tier and rate.
    pub fn install(self, engine: &PricingEngine) -> anyhow::Result<()> {
        let tier_count = self.tiers.len();
        let rate_count = self.rates.len();

        engine
            .tiers()
            .seed(self.tiers)
            .context("seeding commission tiers")?;
        for rate in self.rates {
            let pair = rate.pair();
            engine
                .insert_rate(rate)
                .with_context(|| format!("installing rate {}", pair))?;
        }

        info!(tiers = tier_count, rates = rate_count, "Fixtures installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchangedesk_pricing::{PartitionKey, PricingConfig};
    use rust_decimal_macros::dec;

    #[test]
    fn test_builtin_installs_cleanly() {
        let engine = PricingEngine::new(PricingConfig::default());
        DeskFixtures::builtin().install(&engine).unwrap();

        assert_eq!(engine.tiers().len(), 5);
        assert_eq!(
            engine.tiers().partition_keys(),
            vec![PartitionKey::new("exchange"), PartitionKey::new("transfer")]
        );
        assert_eq!(engine.with_rates(|book| book.settings().len()), 3);
    }

    #[test]
    fn test_fixtures_parse_from_json() {
        let raw = r#"{
            "tiers": [
                {"id": "a", "name": "A", "minAmount": "0", "maxAmount": "250",
                 "fixedAmount": "1", "percentage": "0", "currency": "usd",
                 "order": 1, "type": "fixed"}
            ],
            "rates": [
                {"id": "r", "fromCurrency": "USD", "toCurrency": "EUR",
                 "baseRate": "1.0850", "totalSpread": "0.0100"}
            ]
        }"#;

        let fixtures: DeskFixtures = serde_json::from_str(raw).unwrap();

        assert_eq!(fixtures.tiers[0].max_amount, Some(dec!(250)));
        assert_eq!(fixtures.tiers[0].currency, Currency::usd());
        assert_eq!(fixtures.rates[0].bid_rate(), dec!(1.0800));
        assert_eq!(fixtures.rates[0].ask_rate(), dec!(1.0900));
        assert!(fixtures.rates[0].is_active);
    }

    #[test]
    fn test_install_rejects_invalid_ladder() {
        let engine = PricingEngine::new(PricingConfig::default());
        let fixtures = DeskFixtures {
            tiers: vec![
                CommissionTier::new("a", "A", dec!(0), None, Currency::usd()),
                CommissionTier::new("b", "B", dec!(100), None, Currency::usd()),
            ],
            rates: Vec::new(),
        };

        let err = fixtures.install(&engine).unwrap_err();

        assert!(format!("{:#}", err).contains("open-ended"));
        assert!(engine.tiers().is_empty());
    }
}
