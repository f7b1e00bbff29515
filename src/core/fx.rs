//! Currency conversion table and rate provider abstraction.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, warn};

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Spot rate such that `amount_from * rate = amount_to`.
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// A set of conversion rates anchored to one base currency: one base unit
/// equals `rates[target]` target units. Cross rates between two non-base
/// currencies derive through the base.
#[derive(Debug, Clone)]
pub struct FxRateTable {
    base: String,
    rates: HashMap<String, f64>,
}

impl FxRateTable {
    pub fn new(base: &str, rates: HashMap<String, f64>) -> Self {
        let mut rates = rates;
        rates.insert(base.to_string(), 1.0);
        Self {
            base: base.to_string(),
            rates,
        }
    }

    /// A table with no rates. Every conversion through it degrades to
    /// identity, which models the missing-table case.
    pub fn empty(base: &str) -> Self {
        Self::new(base, HashMap::new())
    }

    pub fn rate_from_base(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    /// Converts `amount` between two currencies. Same-currency conversion is
    /// an exact identity. A missing rate degrades to returning the amount
    /// unconverted; the aggregate becomes less accurate but never fails.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        if from == to {
            return amount;
        }

        let rate_to = if to == self.base {
            Some(1.0)
        } else {
            self.rates.get(to).copied()
        };
        let rate_from = if from == self.base {
            Some(1.0)
        } else {
            self.rates.get(from).copied()
        };

        match (rate_from, rate_to) {
            (Some(rf), Some(rt)) if rf != 0.0 => {
                let converted = amount * rt / rf;
                debug!("Converted {amount} {from} -> {converted} {to} via base {}", self.base);
                converted
            }
            _ => {
                warn!("No FX rate for {from} -> {to}; returning amount unconverted");
                amount
            }
        }
    }

    /// Builds a table by fetching `base -> currency` rates one pair at a
    /// time. A failed pair is logged and left absent; conversions through it
    /// will degrade to identity.
    pub async fn fetch(
        provider: &dyn RateProvider,
        base: &str,
        currencies: &[String],
    ) -> Self {
        let mut rates = HashMap::new();
        for currency in currencies {
            if currency == base || rates.contains_key(currency) {
                continue;
            }
            match provider.get_rate(base, currency).await {
                Ok(rate) => {
                    debug!("Fetched rate {base} -> {currency}: {rate}");
                    rates.insert(currency.clone(), rate);
                }
                Err(e) => {
                    warn!("Rate fetch failed for {base} -> {currency}: {e}");
                }
            }
        }
        Self::new(base, rates)
    }
}
