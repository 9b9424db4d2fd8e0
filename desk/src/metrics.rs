//! Desk run metrics.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use exchangedesk_pricing::{PricingError, Quote};

/// Counters collected over one desk run.
#[derive(Debug, Clone, Default)]
pub struct DeskMetrics {
    /// Quotes issued.
    pub quotes_issued: u64,
    /// Quotes rejected.
    pub quotes_rejected: u64,
    /// Rejections keyed by error code.
    pub rejections: BTreeMap<&'static str, u64>,
    /// Commission charged, keyed by currency code.
    pub commission_totals: BTreeMap<String, Decimal>,
    /// Tier and rate edits that were saved.
    pub edits_saved: u64,
}

impl DeskMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issued quote.
    pub fn record_quote(&mut self, quote: &Quote) {
        self.quotes_issued += 1;
        *self
            .commission_totals
            .entry(quote.commission.currency.code().to_string())
            .or_default() += quote.commission.value;
    }

    /// Record a rejected quote.
    pub fn record_rejection(&mut self, error: &PricingError) {
        self.quotes_rejected += 1;
        *self.rejections.entry(error.error_code()).or_default() += 1;
    }

    pub fn record_edit(&mut self) {
        self.edits_saved += 1;
    }

    pub fn total_quotes(&self) -> u64 {
        self.quotes_issued + self.quotes_rejected
    }

    /// Share of quote attempts that were rejected.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_quotes();
        if total == 0 {
            return 0.0;
        }

        self.quotes_rejected as f64 / total as f64
    }
}
