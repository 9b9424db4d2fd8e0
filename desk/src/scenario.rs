//! Desk scenarios.

use std::fs;
use std::path::Path;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use exchangedesk_common::{Currency, TierId};
use exchangedesk_pricing::{RateSide, TierEvent, TierPatch};

/// A scripted run against the desk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
///
/// Steps that can fail carry `expect_error`: when set, the step must fail
/// with that error code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Price a transaction.
    Quote {
        amount: Decimal,
        from: Currency,
        to: Currency,
        transaction_type: String,
        #[serde(default)]
        side: RateSide,
    },
    /// Send an editor event to one tier partition.
    Tier {
        partition: String,
        event: TierEvent,
        #[serde(default)]
        expect_error: Option<String>,
    },
    /// Reprice an exchange rate through an edit session.
    EditRate {
        from: Currency,
        to: Currency,
        base_rate: Decimal,
        total_spread: Decimal,
        #[serde(default)]
        expect_error: Option<String>,
    },
    /// Assert a condition.
    Assert { condition: AssertCondition },
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertCondition {
    /// A tier has exactly these bounds.
    TierBounds {
        partition: String,
        tier_id: TierId,
        min_amount: Decimal,
        max_amount: Option<Decimal>,
    },
    /// Commission charged on an amount.
    CommissionEquals {
        transaction_type: String,
        amount: Decimal,
        commission: Decimal,
    },
    /// A quote fails with the given error code.
    QuoteFails {
        amount: Decimal,
        from: Currency,
        to: Currency,
        transaction_type: String,
        code: String,
    },
    /// Current bid and ask of a pair.
    RateSides {
        from: Currency,
        to: Currency,
        bid_rate: Decimal,
        ask_rate: Decimal,
    },
}

impl Scenario {
    /// Load a built-in scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "cascade" => Ok(Self::cascade()),
            "quote-desk" => Ok(Self::quote_desk()),
            "rate-update" => Ok(Self::rate_update()),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Load a scenario from a JSON file.
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading scenario from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing scenario in {}", path.display()))
    }

    /// Widen the first transfer tier and watch the ladder slide up.
    fn cascade() -> Self {
        let transfer = || "transfer".to_string();
        Self {
            name: "cascade".to_string(),
            description: "Boundary cascade and overlap rejection on the transfer ladder"
                .to_string(),
            steps: vec![
                ScenarioStep::Tier {
                    partition: transfer(),
                    event: TierEvent::BeginEdit(TierId::new("tr-1")),
                    expect_error: None,
                },
                ScenarioStep::Tier {
                    partition: transfer(),
                    event: TierEvent::UpdateDraft(TierPatch::max_amount(Some(Decimal::from(150)))),
                    expect_error: None,
                },
                ScenarioStep::Tier {
                    partition: transfer(),
                    event: TierEvent::Save,
                    expect_error: None,
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::TierBounds {
                        partition: transfer(),
                        tier_id: TierId::new("tr-2"),
                        min_amount: Decimal::from(150),
                        max_amount: Some(Decimal::from(550)),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::TierBounds {
                        partition: transfer(),
                        tier_id: TierId::new("tr-3"),
                        min_amount: Decimal::from(550),
                        max_amount: None,
                    },
                },
                // Pull tier 2 below tier 1's new maximum.
                ScenarioStep::Tier {
                    partition: transfer(),
                    event: TierEvent::BeginEdit(TierId::new("tr-2")),
                    expect_error: None,
                },
                ScenarioStep::Tier {
                    partition: transfer(),
                    event: TierEvent::UpdateDraft(TierPatch::min_amount(Decimal::from(120))),
                    expect_error: None,
                },
                ScenarioStep::Tier {
                    partition: transfer(),
                    event: TierEvent::Save,
                    expect_error: Some("BOUNDARY_OVERLAP".to_string()),
                },
                ScenarioStep::Tier {
                    partition: transfer(),
                    event: TierEvent::CancelEdit,
                    expect_error: None,
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::TierBounds {
                        partition: transfer(),
                        tier_id: TierId::new("tr-2"),
                        min_amount: Decimal::from(150),
                        max_amount: Some(Decimal::from(550)),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::CommissionEquals {
                        transaction_type: transfer(),
                        amount: Decimal::from(120),
                        commission: Decimal::from(3),
                    },
                },
            ],
        }
    }

    /// Quotes across both ladders, including the rejections.
    fn quote_desk() -> Self {
        Self {
            name: "quote-desk".to_string(),
            description: "Quotes across transfer and exchange tiers".to_string(),
            steps: vec![
                ScenarioStep::Quote {
                    amount: Decimal::from(50),
                    from: Currency::usd(),
                    to: Currency::usd(),
                    transaction_type: "transfer".to_string(),
                    side: RateSide::Mid,
                },
                ScenarioStep::Quote {
                    amount: Decimal::from(250),
                    from: Currency::usd(),
                    to: Currency::eur(),
                    transaction_type: "transfer".to_string(),
                    side: RateSide::Ask,
                },
                ScenarioStep::Quote {
                    amount: Decimal::from(5000),
                    from: Currency::usd(),
                    to: Currency::gbp(),
                    transaction_type: "exchange".to_string(),
                    side: RateSide::Bid,
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::CommissionEquals {
                        transaction_type: "transfer".to_string(),
                        amount: Decimal::from(250),
                        commission: Decimal::new(450, 2),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::CommissionEquals {
                        transaction_type: "transfer".to_string(),
                        amount: Decimal::from(1000),
                        commission: Decimal::TEN,
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::CommissionEquals {
                        transaction_type: "exchange".to_string(),
                        amount: Decimal::from(400),
                        commission: Decimal::from(6),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::QuoteFails {
                        amount: Decimal::from(100),
                        from: Currency::usd(),
                        to: Currency::usd(),
                        transaction_type: "payout".to_string(),
                        code: "NO_TIER_FOUND".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::QuoteFails {
                        amount: Decimal::from(100),
                        from: Currency::usd(),
                        to: Currency::jpy(),
                        transaction_type: "transfer".to_string(),
                        code: "RATE_NOT_FOUND".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::QuoteFails {
                        amount: Decimal::ZERO,
                        from: Currency::usd(),
                        to: Currency::eur(),
                        transaction_type: "transfer".to_string(),
                        code: "INVALID_AMOUNT".to_string(),
                    },
                },
            ],
        }
    }

    /// Reprice EUR/USD and check both sides moved together.
    fn rate_update() -> Self {
        Self {
            name: "rate-update".to_string(),
            description: "Atomic bid/ask repricing with spread validation".to_string(),
            steps: vec![
                ScenarioStep::Assert {
                    condition: AssertCondition::RateSides {
                        from: Currency::eur(),
                        to: Currency::usd(),
                        bid_rate: Decimal::new(10800, 4),
                        ask_rate: Decimal::new(10900, 4),
                    },
                },
                ScenarioStep::EditRate {
                    from: Currency::eur(),
                    to: Currency::usd(),
                    base_rate: Decimal::new(10920, 4),
                    total_spread: Decimal::new(60, 4),
                    expect_error: None,
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::RateSides {
                        from: Currency::eur(),
                        to: Currency::usd(),
                        bid_rate: Decimal::new(10890, 4),
                        ask_rate: Decimal::new(10950, 4),
                    },
                },
                ScenarioStep::EditRate {
                    from: Currency::eur(),
                    to: Currency::usd(),
                    base_rate: Decimal::new(10920, 4),
                    total_spread: Decimal::new(-10, 4),
                    expect_error: Some("NEGATIVE_SPREAD".to_string()),
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::RateSides {
                        from: Currency::eur(),
                        to: Currency::usd(),
                        bid_rate: Decimal::new(10890, 4),
                        ask_rate: Decimal::new(10950, 4),
                    },
                },
                ScenarioStep::Quote {
                    amount: Decimal::from(1000),
                    from: Currency::eur(),
                    to: Currency::usd(),
                    transaction_type: "exchange".to_string(),
                    side: RateSide::Ask,
                },
            ],
        }
    }
}
