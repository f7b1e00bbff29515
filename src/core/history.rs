//! Backward reconstruction of a net-worth series from a forward transaction
//! log.
//!
//! No historical ledger is persisted. The series is derived by starting from
//! observed current balances and walking the transaction log backward,
//! reversing each transaction's effect. Investment value is held constant
//! except where investment-account deposits or withdrawals shift it; price
//! appreciation is not modeled retroactively. That is a known approximation
//! of this model, not a defect.

use crate::core::model::{AccountKind, Flow, Transaction};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Aggregate balances at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Balances {
    pub cash: f64,
    pub investments: f64,
    pub debt: f64,
}

/// One day of the derived net-worth series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthPoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub investments: f64,
    pub debt: f64,
    pub label: Option<String>,
}

impl NetWorthPoint {
    pub fn net(&self) -> f64 {
        self.cash + self.investments - self.debt
    }
}

/// Removes a transaction's effect from the running balances, stepping the
/// state one transaction back in time. The match is exhaustive so a new
/// account kind cannot be silently ignored.
fn reverse(balances: &mut Balances, txn: &Transaction) {
    let amount = if txn.amount.is_finite() { txn.amount } else { 0.0 };
    match (txn.account, txn.flow) {
        // On a credit account an expense grew the debt, income paid it down.
        (AccountKind::Credit, Flow::Expense) => balances.debt -= amount,
        (AccountKind::Credit, Flow::Income) => balances.debt += amount,
        // On a cash account the signs run the other way.
        (AccountKind::Cash, Flow::Expense) => balances.cash += amount,
        (AccountKind::Cash, Flow::Income) => balances.cash -= amount,
        // Deposits into investment-like accounts raised the invested value;
        // withdrawals lowered it.
        (AccountKind::Investment | AccountKind::Retirement, Flow::Income) => {
            balances.investments -= amount
        }
        (AccountKind::Investment | AccountKind::Retirement, Flow::Expense) => {
            balances.investments += amount
        }
    }
}

/// Derives the daily {cash, investments, debt} series for the `days_back`
/// days ending at `today`.
///
/// Two passes: transactions are first indexed by calendar day, then the days
/// are walked newest to oldest. The snapshot for day `d` is the state after
/// reversing every transaction dated later than `d`, i.e. the end-of-day
/// state. Days without transactions carry the nearest later value backward.
///
/// The output always holds exactly `days_back + 1` points, ordered oldest to
/// newest; `days_back == 0` yields a single point equal to the current
/// state.
pub fn reconstruct(
    current: Balances,
    transactions: &[Transaction],
    days_back: u32,
    today: NaiveDate,
) -> Vec<NetWorthPoint> {
    let mut by_day: HashMap<NaiveDate, Vec<&Transaction>> = HashMap::new();
    for txn in transactions {
        if txn.date > today {
            debug!("Skipping future-dated transaction {} on {}", txn.id, txn.date);
            continue;
        }
        by_day.entry(txn.date).or_default().push(txn);
    }

    let mut balances = current;
    let mut points = Vec::with_capacity(days_back as usize + 1);
    points.push(point_for(today, &balances));

    for offset in 1..=days_back {
        // Leaving day `d + 1` on the way back: reverse its transactions so
        // the running state becomes the end of day `d`.
        let day = today - Duration::days(offset as i64);
        if let Some(day_txns) = by_day.get(&(day + Duration::days(1))) {
            for txn in day_txns {
                reverse(&mut balances, txn);
            }
        }
        points.push(point_for(day, &balances));
    }

    points.reverse();
    points
}

fn point_for(date: NaiveDate, balances: &Balances) -> NetWorthPoint {
    NetWorthPoint {
        date,
        cash: balances.cash,
        investments: balances.investments,
        debt: balances.debt,
        label: None,
    }
}
