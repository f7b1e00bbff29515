pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::bucket::{self, Granularity};
use crate::core::config::AppConfig;
use crate::core::fx::FxRateTable;
use crate::core::history::{self, Balances};
use crate::core::model::AccountKind;
use crate::core::quote::QuoteCache;
use crate::core::state::{AppState, StateManager};
use crate::core::valuation;
use crate::providers::yahoo::{YahooQuoteProvider, YahooRateProvider};
use crate::store::disk::DiskStore;
use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Summary,
    History { days: u32, granularity: Granularity },
}

/// Symbols to refresh: every non-archived holding of every tracked
/// portfolio.
fn tracked_symbols(state: &AppState) -> Vec<String> {
    let mut symbols = BTreeSet::new();
    for portfolio in state.portfolios.iter().filter(|p| p.tracking_enabled) {
        for holding in portfolio.holdings.values().filter(|h| !h.archived) {
            symbols.insert(holding.symbol.clone());
        }
    }
    symbols.into_iter().collect()
}

/// Currencies the FX table must cover: holding currencies, portfolio base
/// currencies and account currencies.
fn needed_currencies(state: &AppState) -> Vec<String> {
    let mut currencies = BTreeSet::new();
    for portfolio in &state.portfolios {
        currencies.insert(portfolio.base_currency.clone());
        for holding in portfolio.holdings.values() {
            currencies.insert(holding.resolved_currency().to_string());
        }
    }
    for account in &state.accounts {
        currencies.insert(account.currency.clone());
    }
    currencies.into_iter().collect()
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("folio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = Arc::new(DiskStore::open(&config.data_dir()?)?);
    let manager = StateManager::load(store).await?;
    let state = manager.state();

    let base_url = config
        .providers
        .yahoo
        .as_ref()
        .map_or(DEFAULT_YAHOO_URL, |p| &p.base_url);
    let quote_provider = Arc::new(YahooQuoteProvider::new(base_url));
    let rate_provider = YahooRateProvider::new(base_url);
    let quote_cache = QuoteCache::new(
        quote_provider,
        Duration::from_millis(config.quote_delay_ms),
    );

    let symbols = tracked_symbols(state);
    let pb = cli::ui::new_progress_bar(symbols.len() as u64, true);
    pb.set_message("Refreshing quotes...");
    let quotes = quote_cache.refresh(&symbols, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    let fx = FxRateTable::fetch(&rate_provider, &config.currency, &needed_currencies(state)).await;

    match command {
        AppCommand::Summary => {
            let tracked: Vec<_> = state
                .portfolios
                .iter()
                .filter(|p| p.tracking_enabled)
                .collect();

            for portfolio in &tracked {
                let report = valuation::value_portfolio(portfolio, &quotes, &fx, &config.currency);
                println!("{}", cli::summary::render_report(&report));
                cli::ui::print_separator();
            }

            let combined = valuation::value_combined(&state.portfolios, &quotes, &fx, &config.currency);
            if tracked.len() != 1 {
                println!("{}", cli::summary::render_report(&combined));
            }
            let net = combined.total_value + combined.cash_total;
            println!(
                "\nNet investable assets ({}): {}",
                config.currency,
                cli::ui::style_text(&format!("{net:.2}"), cli::ui::StyleType::TotalValue)
            );
        }
        AppCommand::History { days, granularity } => {
            let combined = valuation::value_combined(&state.portfolios, &quotes, &fx, &config.currency);

            let mut balances = Balances {
                cash: combined.cash_total,
                investments: combined.total_value,
                debt: 0.0,
            };
            for account in &state.accounts {
                let converted = fx.convert(account.balance, &account.currency, &config.currency);
                match account.kind {
                    AccountKind::Cash => balances.cash += converted,
                    AccountKind::Credit => balances.debt += converted,
                    AccountKind::Investment | AccountKind::Retirement => {
                        balances.investments += converted
                    }
                }
            }

            let today = chrono::Local::now().date_naive();
            let series = history::reconstruct(balances, &state.transactions, days, today);
            let bucketed = bucket::aggregate(&series, granularity);

            println!(
                "Net worth, last {days} days by {granularity} ({}):\n",
                config.currency
            );
            println!("{}", cli::history::render_series(&bucketed, &config.currency));
        }
    }

    Ok(())
}
