//! Weighted-average cost basis and P&L over a lot history.

use crate::core::model::{Lot, LotSide};
use tracing::debug;

/// Result of running a lot history against a mark price. All figures are in
/// the instrument's own currency.
#[derive(Debug, Clone, PartialEq)]
pub struct PnlBreakdown {
    pub quantity: f64,
    pub avg_cost: f64,
    pub realized: f64,
    pub unrealized: f64,
    /// Set when a sell disposed more than the quantity held at that point.
    /// The running quantity is clamped at zero instead of going negative.
    pub oversold: bool,
}

/// Treats partially populated numeric input as zero rather than letting a
/// NaN poison the whole computation.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Computes quantity, average cost and realized/unrealized P&L from a lot
/// history using weighted-average cost basis (not FIFO lot matching).
///
/// Lots are processed by date; same-day lots keep their insertion order.
/// Pure function: no I/O, deterministic for a given input.
pub fn compute_pnl(lots: &[Lot], mark_price: f64) -> PnlBreakdown {
    let mut ordered: Vec<&Lot> = lots.iter().collect();
    ordered.sort_by_key(|lot| lot.date);

    let mark_price = sanitize(mark_price);
    let mut quantity = 0.0_f64;
    let mut cost = 0.0_f64;
    let mut realized = 0.0_f64;
    let mut oversold = false;

    for lot in ordered {
        let lot_qty = sanitize(lot.quantity);
        let lot_price = sanitize(lot.price);
        let lot_fee = sanitize(lot.fee);

        match lot.side {
            LotSide::Buy => {
                cost += lot_qty * lot_price + lot_fee;
                quantity += lot_qty;
            }
            LotSide::Sell => {
                let avg = if quantity > 0.0 { cost / quantity } else { 0.0 };
                let sold = if lot_qty > quantity {
                    debug!(
                        "Sell of {lot_qty} exceeds held quantity {quantity} (lot {}); clamping",
                        lot.id
                    );
                    oversold = true;
                    quantity
                } else {
                    lot_qty
                };
                realized += sold * (lot_price - avg) - lot_fee;
                quantity -= sold;
                cost -= avg * sold;
            }
        }
    }

    let avg_cost = if quantity > 0.0 { cost / quantity } else { 0.0 };
    let unrealized = quantity * (mark_price - avg_cost);

    PnlBreakdown {
        quantity,
        avg_cost,
        realized,
        unrealized,
        oversold,
    }
}
