//! Aggregates lot ledgers across portfolios into a reporting-currency view.

use crate::core::fx::FxRateTable;
use crate::core::ledger::{self, PnlBreakdown};
use crate::core::model::{Holding, Lot, Portfolio};
use crate::core::quote::QuoteSnapshot;
use std::collections::BTreeMap;
use tracing::debug;

/// One valued position. Monetary fields are in the report's currency;
/// `native_price` stays in the instrument currency. `None` fields mean the
/// quote was unavailable and the row contributes nothing to totals.
#[derive(Debug, Clone)]
pub struct PositionValue {
    pub symbol: String,
    pub display_name: Option<String>,
    pub quantity: f64,
    pub native_currency: String,
    pub native_price: Option<f64>,
    pub price: Option<f64>,
    pub value: Option<f64>,
    pub day_change: Option<f64>,
    pub realized: f64,
    pub unrealized: Option<f64>,
    pub weight: Option<f64>,
    pub oversold: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValuationReport {
    pub name: String,
    pub currency: String,
    /// Market value of open positions, excluding cash.
    pub total_value: f64,
    pub day_change: f64,
    pub day_change_pct: f64,
    /// Realized plus unrealized gain, including realized P&L of positions
    /// that have since been closed.
    pub total_gain: f64,
    pub cash_total: f64,
    pub positions: Vec<PositionValue>,
}

/// A symbol's merged lot history plus the metadata used to value it.
struct SymbolGroup {
    symbol: String,
    display_name: Option<String>,
    currency: String,
    lots: Vec<Lot>,
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn group_from_holding(holding: &Holding) -> SymbolGroup {
    SymbolGroup {
        symbol: holding.symbol.clone(),
        display_name: holding.display_name.clone(),
        currency: holding.resolved_currency().to_string(),
        lots: holding.lots.clone(),
    }
}

/// Values a single portfolio on its own, regardless of its tracking flag.
pub fn value_portfolio(
    portfolio: &Portfolio,
    quotes: &QuoteSnapshot,
    fx: &FxRateTable,
    reporting_currency: &str,
) -> ValuationReport {
    let groups = portfolio
        .holdings
        .values()
        .filter(|h| !h.archived)
        .map(group_from_holding)
        .collect();
    let cash_total = fx.convert(
        portfolio.cash_balance,
        &portfolio.base_currency,
        reporting_currency,
    );
    value_groups(&portfolio.name, groups, cash_total, quotes, fx, reporting_currency)
}

/// Values all tracked portfolios as one book: lots are merged per symbol
/// across portfolios before computing quantity and value.
pub fn value_combined(
    portfolios: &[Portfolio],
    quotes: &QuoteSnapshot,
    fx: &FxRateTable,
    reporting_currency: &str,
) -> ValuationReport {
    let tracked: Vec<&Portfolio> = portfolios.iter().filter(|p| p.tracking_enabled).collect();

    let mut merged: BTreeMap<String, SymbolGroup> = BTreeMap::new();
    for portfolio in &tracked {
        for holding in portfolio.holdings.values().filter(|h| !h.archived) {
            merged
                .entry(holding.symbol.clone())
                .and_modify(|group| group.lots.extend(holding.lots.iter().cloned()))
                .or_insert_with(|| group_from_holding(holding));
        }
    }

    let cash_total = tracked
        .iter()
        .map(|p| fx.convert(p.cash_balance, &p.base_currency, reporting_currency))
        .sum();

    value_groups(
        "Combined",
        merged.into_values().collect(),
        cash_total,
        quotes,
        fx,
        reporting_currency,
    )
}

fn value_groups(
    name: &str,
    groups: Vec<SymbolGroup>,
    cash_total: f64,
    quotes: &QuoteSnapshot,
    fx: &FxRateTable,
    reporting_currency: &str,
) -> ValuationReport {
    let mut positions = Vec::new();
    let mut total_value = 0.0;
    let mut total_day_change = 0.0;
    let mut total_gain = 0.0;

    for group in groups {
        let quote = quotes.get(&group.symbol);

        // Realized P&L does not depend on the mark, so a missing quote still
        // yields quantity and realized figures.
        let native_mark = quote.map(|q| sanitize(q.last)).unwrap_or(0.0);
        let pnl: PnlBreakdown = ledger::compute_pnl(&group.lots, native_mark);
        let realized = fx.convert(pnl.realized, &group.currency, reporting_currency);
        total_gain += realized;

        if pnl.quantity <= 0.0 {
            debug!("Excluding {} from valuation: no open quantity", group.symbol);
            continue;
        }

        let mut position = PositionValue {
            symbol: group.symbol.clone(),
            display_name: group.display_name,
            quantity: pnl.quantity,
            native_currency: group.currency.clone(),
            native_price: None,
            price: None,
            value: None,
            day_change: None,
            realized,
            unrealized: None,
            weight: None,
            oversold: pnl.oversold,
            error: None,
        };

        match quote {
            Some(quote) => {
                // Convert at the per-unit level before multiplying by
                // quantity; native totals are never summed across
                // currencies.
                let price = fx.convert(native_mark, &group.currency, reporting_currency);
                let avg_cost = fx.convert(pnl.avg_cost, &group.currency, reporting_currency);
                let unit_change =
                    fx.convert(sanitize(quote.change), &group.currency, reporting_currency);

                let value = pnl.quantity * price;
                let day_change = pnl.quantity * unit_change;
                let unrealized = pnl.quantity * (price - avg_cost);

                position.native_price = Some(quote.last);
                position.price = Some(price);
                position.value = Some(value);
                position.day_change = Some(day_change);
                position.unrealized = Some(unrealized);

                total_value += value;
                total_day_change += day_change;
                total_gain += unrealized;
            }
            None => {
                position.error = Some(format!("No quote available for {}", group.symbol));
            }
        }

        positions.push(position);
    }

    for position in &mut positions {
        if let Some(value) = position.value {
            if total_value > 0.0 {
                position.weight = Some((value / total_value) * 100.0);
            }
        }
    }

    let previous_value = total_value - total_day_change;
    let day_change_pct = if previous_value > 0.0 {
        (total_day_change / previous_value) * 100.0
    } else {
        0.0
    };

    ValuationReport {
        name: name.to_string(),
        currency: reporting_currency.to_string(),
        total_value,
        day_change: total_day_change,
        day_change_pct,
        total_gain,
        cash_total,
        positions,
    }
}
