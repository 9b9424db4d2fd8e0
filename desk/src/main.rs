//! ExchangeDesk Desk
//!
//! Runs pricing scenarios and synthetic quote traffic against a seeded engine.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod fixtures;
mod metrics;
mod scenario;

use controller::DeskController;
use exchangedesk_pricing::{PricingConfig, PricingEngine};
use fixtures::DeskFixtures;
use scenario::Scenario;

/// ExchangeDesk Desk CLI
#[derive(Parser, Debug)]
#[command(name = "desk")]
#[command(about = "ExchangeDesk pricing desk and scenario runner")]
struct Args {
    /// JSON file with tiers and rates (built-in fixtures when omitted)
    #[arg(short, long)]
    fixtures: Option<PathBuf>,

    /// Built-in scenario to run
    #[arg(short, long)]
    scenario: Option<String>,

    /// Scenario JSON file to run
    #[arg(long)]
    scenario_file: Option<PathBuf>,

    /// Number of random quotes to issue
    #[arg(long, default_value = "0")]
    random_quotes: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = PricingConfig::from_env();
    config.validate().context("invalid configuration")?;

    info!("Starting ExchangeDesk Desk");
    info!("Company: {}", config.company_name);
    info!("Missing tier policy: {:?}", config.missing_tier);

    let engine = PricingEngine::new(config);
    let fixtures = match &args.fixtures {
        Some(path) => DeskFixtures::load(path)?,
        None => DeskFixtures::builtin(),
    };
    fixtures.install(&engine)?;

    let mut controller = DeskController::new(engine, args.seed);

    if let Some(name) = &args.scenario {
        let scenario = Scenario::load(name)?;
        controller.run_scenario(&scenario)?;
    }

    if let Some(path) = &args.scenario_file {
        let scenario = Scenario::load_file(path)?;
        controller.run_scenario(&scenario)?;
    }

    if args.random_quotes > 0 {
        controller.run_random_quotes(args.random_quotes)?;
    }

    for (partition, tiers) in controller.engine().tiers().snapshot() {
        for tier in tiers {
            info!(
                partition = %partition,
                tier_id = %tier.id,
                min_amount = %tier.min_amount,
                max_amount = ?tier.max_amount,
                is_active = tier.is_active,
                "Tier"
            );
        }
    }

    let metrics = controller.metrics();
    info!("Desk run complete");
    info!("Quotes issued: {}", metrics.quotes_issued);
    info!("Quotes rejected: {}", metrics.quotes_rejected);
    info!("Rejection rate: {:.2}%", metrics.rejection_rate() * 100.0);
    info!("Edits saved: {}", metrics.edits_saved);
    for (code, count) in &metrics.rejections {
        info!("Rejected with {}: {}", code, count);
    }
    for (currency, total) in &metrics.commission_totals {
        info!("Commission charged in {}: {}", currency, total);
    }

    Ok(())
}
