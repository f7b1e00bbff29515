//! Domain types shared across the valuation and reconstruction engines.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotSide {
    Buy,
    Sell,
}

/// A single buy or sell execution record. Prices and fees are in the
/// instrument's own currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: String,
    pub side: LotSide,
    pub quantity: f64,
    pub price: f64,
    #[serde(default)]
    pub fee: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Equity,
    Etf,
    Fund,
    Bond,
    Crypto,
    Other,
}

/// The aggregate position in one instrument, composed of lots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub instrument_type: InstrumentType,
    /// Explicit instrument currency. When absent it is inferred from the
    /// symbol suffix (see `core::symbology`).
    #[serde(default)]
    pub currency: Option<String>,
    pub lots: Vec<Lot>,
    #[serde(default)]
    pub archived: bool,
}

impl Holding {
    /// Net quantity across all lots. Well-formed input never goes negative.
    pub fn net_quantity(&self) -> f64 {
        self.lots.iter().fold(0.0, |acc, lot| match lot.side {
            LotSide::Buy => acc + lot.quantity,
            LotSide::Sell => acc - lot.quantity,
        })
    }

    /// Instrument currency: explicit metadata first, suffix inference second.
    pub fn resolved_currency(&self) -> &str {
        self.currency
            .as_deref()
            .unwrap_or_else(|| crate::core::symbology::currency_for_symbol(&self.symbol))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashEventKind {
    Deposit,
    Withdrawal,
}

/// An append-only record of cash moving in or out of a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashEvent {
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: CashEventKind,
}

fn default_tracking() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub base_currency: String,
    #[serde(default)]
    pub holdings: BTreeMap<String, Holding>,
    /// Cash balance in `base_currency`. Adjusted by cash events and by trade
    /// settlement (the latter without an event).
    #[serde(default)]
    pub cash_balance: f64,
    #[serde(default)]
    pub cash_events: Vec<CashEvent>,
    /// Untracked portfolios keep their data but are excluded from aggregate
    /// totals.
    #[serde(default = "default_tracking")]
    pub tracking_enabled: bool,
}

impl Portfolio {
    pub fn new(id: &str, name: &str, base_currency: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            base_currency: base_currency.to_string(),
            holdings: BTreeMap::new(),
            cash_balance: 0.0,
            cash_events: Vec::new(),
            tracking_enabled: true,
        }
    }
}

/// Kind of an external account a transaction can touch. Closed set: the
/// reconstruction engine matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Cash,
    Credit,
    Investment,
    Retirement,
}

/// A non-lot balance: bank cash, credit-card debt, an externally-held
/// retirement fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub kind: AccountKind,
    pub balance: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Income,
    Expense,
}

/// One entry of the raw transaction history. The kind of the touched account
/// is denormalized onto the transaction at entry time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub flow: Flow,
    pub account: AccountKind,
    #[serde(default)]
    pub memo: Option<String>,
}
