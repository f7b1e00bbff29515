//! The application state tree and its single mutation gateway.
//!
//! `StateManager` owns the state; every mutation goes through one of its
//! methods and is followed by a full-replace persist of the whole tree.
//! There is a single logical writer, so no lock guards the store itself; a
//! multi-writer backend would need an explicit mutation queue instead.

use crate::core::model::{
    Account, CashEvent, CashEventKind, Holding, Lot, Portfolio, Transaction,
};
use crate::store::StateStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

pub const STATE_KEY: &str = "state";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub portfolios: Vec<Portfolio>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Upgrades a legacy single-portfolio tree to the multi-portfolio shape.
///
/// The legacy root was one portfolio inlined at the top level: a `holdings`
/// map plus `cash` and `currency` scalars. Returns the (possibly rewritten)
/// tree and whether it changed; running it on an already-migrated tree is a
/// no-op.
fn migrate_legacy(value: Value) -> (Value, bool) {
    match value {
        Value::Object(root)
            if root.contains_key("holdings") && !root.contains_key("portfolios") =>
        {
            let holdings = root.get("holdings").cloned().unwrap_or_else(|| json!({}));
            let cash = root.get("cash").cloned().unwrap_or_else(|| json!(0.0));
            let currency = root
                .get("currency")
                .cloned()
                .unwrap_or_else(|| json!("USD"));
            let cash_events = root
                .get("cash_events")
                .cloned()
                .unwrap_or_else(|| json!([]));

            let migrated = json!({
                "portfolios": [{
                    "id": "default",
                    "name": "Portfolio",
                    "base_currency": currency,
                    "holdings": holdings,
                    "cash_balance": cash,
                    "cash_events": cash_events,
                    "tracking_enabled": true,
                }],
                "accounts": [],
                "transactions": [],
            });
            (migrated, true)
        }
        other => (other, false),
    }
}

pub struct StateManager {
    store: Arc<dyn StateStore>,
    state: AppState,
}

impl StateManager {
    /// Loads the state tree, running the legacy migration when needed. A
    /// migrated tree is re-persisted immediately.
    pub async fn load(store: Arc<dyn StateStore>) -> Result<Self> {
        let manager = match store.load(STATE_KEY).await? {
            Some(raw) => {
                let (raw, migrated) = migrate_legacy(raw);
                let state: AppState =
                    serde_json::from_value(raw).context("Failed to parse state tree")?;
                let manager = Self { store, state };
                if migrated {
                    info!("Migrated legacy single-portfolio state");
                    manager.persist().await?;
                }
                manager
            }
            None => {
                debug!("No persisted state; starting empty");
                Self {
                    store,
                    state: AppState::default(),
                }
            }
        };
        Ok(manager)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Full-replace write of the entire state tree.
    async fn persist(&self) -> Result<()> {
        let value = serde_json::to_value(&self.state)?;
        self.store.save(STATE_KEY, &value).await
    }

    pub async fn add_portfolio(&mut self, portfolio: Portfolio) -> Result<()> {
        self.state.portfolios.push(portfolio);
        self.persist().await
    }

    pub async fn set_tracking(&mut self, portfolio_id: &str, enabled: bool) -> Result<()> {
        let portfolio = self.portfolio_mut(portfolio_id)?;
        portfolio.tracking_enabled = enabled;
        self.persist().await
    }

    pub async fn remove_portfolio(&mut self, portfolio_id: &str) -> Result<()> {
        self.state.portfolios.retain(|p| p.id != portfolio_id);
        self.persist().await
    }

    /// Adds a lot, creating the holding on first use.
    pub async fn add_lot(
        &mut self,
        portfolio_id: &str,
        holding_template: Holding,
        lot: Lot,
    ) -> Result<()> {
        let portfolio = self.portfolio_mut(portfolio_id)?;
        let holding = portfolio
            .holdings
            .entry(holding_template.symbol.clone())
            .or_insert_with(|| Holding {
                lots: Vec::new(),
                ..holding_template
            });
        holding.lots.push(lot);
        self.persist().await
    }

    /// Replaces a lot in place, keyed by its id. This is the only way a lot
    /// changes after creation.
    pub async fn update_lot(&mut self, portfolio_id: &str, symbol: &str, lot: Lot) -> Result<()> {
        let portfolio = self.portfolio_mut(portfolio_id)?;
        let holding = portfolio
            .holdings
            .get_mut(symbol)
            .with_context(|| format!("No holding {symbol} in portfolio {portfolio_id}"))?;
        let slot = holding
            .lots
            .iter_mut()
            .find(|l| l.id == lot.id)
            .with_context(|| format!("No lot {} under {symbol}", lot.id))?;
        *slot = lot;
        self.persist().await
    }

    /// Removes a lot by id. A holding whose last lot is removed disappears.
    pub async fn remove_lot(&mut self, portfolio_id: &str, symbol: &str, lot_id: &str) -> Result<()> {
        let portfolio = self.portfolio_mut(portfolio_id)?;
        if let Some(holding) = portfolio.holdings.get_mut(symbol) {
            holding.lots.retain(|lot| lot.id != lot_id);
            if holding.lots.is_empty() {
                portfolio.holdings.remove(symbol);
                debug!("Holding {symbol} removed: no lots left");
            }
        }
        self.persist().await
    }

    /// Archives or restores a holding. Archived holdings keep their lots but
    /// drop out of valuation and quote refresh.
    pub async fn set_holding_archived(
        &mut self,
        portfolio_id: &str,
        symbol: &str,
        archived: bool,
    ) -> Result<()> {
        let portfolio = self.portfolio_mut(portfolio_id)?;
        let holding = portfolio
            .holdings
            .get_mut(symbol)
            .with_context(|| format!("No holding {symbol} in portfolio {portfolio_id}"))?;
        holding.archived = archived;
        self.persist().await
    }

    /// Records a deposit or withdrawal: appends to the event log and moves
    /// the balance.
    pub async fn record_cash_event(&mut self, portfolio_id: &str, event: CashEvent) -> Result<()> {
        let portfolio = self.portfolio_mut(portfolio_id)?;
        match event.kind {
            CashEventKind::Deposit => portfolio.cash_balance += event.amount,
            CashEventKind::Withdrawal => portfolio.cash_balance -= event.amount,
        }
        portfolio.cash_events.push(event);
        self.persist().await
    }

    /// Adjusts cash without an event, e.g. trade settlement.
    pub async fn settle_cash(&mut self, portfolio_id: &str, delta: f64) -> Result<()> {
        let portfolio = self.portfolio_mut(portfolio_id)?;
        portfolio.cash_balance += delta;
        self.persist().await
    }

    pub async fn add_account(&mut self, account: Account) -> Result<()> {
        self.state.accounts.push(account);
        self.persist().await
    }

    pub async fn add_transaction(&mut self, transaction: Transaction) -> Result<()> {
        self.state.transactions.push(transaction);
        self.persist().await
    }

    fn portfolio_mut(&mut self, portfolio_id: &str) -> Result<&mut Portfolio> {
        self.state
            .portfolios
            .iter_mut()
            .find(|p| p.id == portfolio_id)
            .with_context(|| format!("No portfolio with id {portfolio_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{InstrumentType, LotSide};
    use crate::store::memory::MemoryStore;
    use chrono::NaiveDate;

    fn holding_template(symbol: &str) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            display_name: None,
            instrument_type: InstrumentType::Equity,
            currency: None,
            lots: Vec::new(),
            archived: false,
        }
    }

    fn lot(id: &str) -> Lot {
        Lot {
            id: id.to_string(),
            side: LotSide::Buy,
            quantity: 10.0,
            price: 100.0,
            fee: 0.0,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    async fn manager_with_portfolio() -> (Arc<MemoryStore>, StateManager) {
        let store = Arc::new(MemoryStore::new());
        let mut manager = StateManager::load(store.clone()).await.unwrap();
        manager
            .add_portfolio(Portfolio::new("p1", "Main", "USD"))
            .await
            .unwrap();
        (store, manager)
    }

    #[tokio::test]
    async fn test_empty_store_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        let manager = StateManager::load(store).await.unwrap();
        assert!(manager.state().portfolios.is_empty());
    }

    #[tokio::test]
    async fn test_mutation_persists_full_tree() {
        let (store, mut manager) = manager_with_portfolio().await;
        manager
            .add_lot("p1", holding_template("AAPL"), lot("l1"))
            .await
            .unwrap();

        // A fresh manager over the same store sees the mutation.
        let reloaded = StateManager::load(store).await.unwrap();
        assert_eq!(reloaded.state().portfolios[0].holdings["AAPL"].lots.len(), 1);
    }

    #[tokio::test]
    async fn test_holding_disappears_with_last_lot() {
        let (_store, mut manager) = manager_with_portfolio().await;
        manager
            .add_lot("p1", holding_template("AAPL"), lot("l1"))
            .await
            .unwrap();
        manager.remove_lot("p1", "AAPL", "l1").await.unwrap();

        assert!(
            !manager.state().portfolios[0]
                .holdings
                .contains_key("AAPL")
        );
    }

    #[tokio::test]
    async fn test_update_lot_replaces_by_id() {
        let (_store, mut manager) = manager_with_portfolio().await;
        manager
            .add_lot("p1", holding_template("AAPL"), lot("l1"))
            .await
            .unwrap();

        let mut edited = lot("l1");
        edited.quantity = 25.0;
        manager.update_lot("p1", "AAPL", edited).await.unwrap();

        let lots = &manager.state().portfolios[0].holdings["AAPL"].lots;
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].quantity, 25.0);

        let missing = manager.update_lot("p1", "AAPL", lot("nope")).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_archive_and_restore_holding() {
        let (store, mut manager) = manager_with_portfolio().await;
        manager
            .add_lot("p1", holding_template("AAPL"), lot("l1"))
            .await
            .unwrap();
        manager.set_holding_archived("p1", "AAPL", true).await.unwrap();

        // Lots survive archival, and the flag persists.
        let reloaded = StateManager::load(store).await.unwrap();
        let holding = &reloaded.state().portfolios[0].holdings["AAPL"];
        assert!(holding.archived);
        assert_eq!(holding.lots.len(), 1);

        manager.set_holding_archived("p1", "AAPL", false).await.unwrap();
        assert!(!manager.state().portfolios[0].holdings["AAPL"].archived);
    }

    #[tokio::test]
    async fn test_cash_event_appends_and_moves_balance() {
        let (_store, mut manager) = manager_with_portfolio().await;
        manager
            .record_cash_event(
                "p1",
                CashEvent {
                    date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    amount: 500.0,
                    kind: CashEventKind::Deposit,
                },
            )
            .await
            .unwrap();
        manager.settle_cash("p1", -120.0).await.unwrap();

        let portfolio = &manager.state().portfolios[0];
        assert_eq!(portfolio.cash_balance, 380.0);
        // Settlement moved the balance without an event.
        assert_eq!(portfolio.cash_events.len(), 1);
    }

    #[tokio::test]
    async fn test_tracking_flag_and_removal() {
        let (store, mut manager) = manager_with_portfolio().await;
        manager.set_tracking("p1", false).await.unwrap();
        assert!(!manager.state().portfolios[0].tracking_enabled);

        manager.remove_portfolio("p1").await.unwrap();
        assert!(manager.state().portfolios.is_empty());

        let reloaded = StateManager::load(store).await.unwrap();
        assert!(reloaded.state().portfolios.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_portfolio_errors() {
        let (_store, mut manager) = manager_with_portfolio().await;
        let result = manager.settle_cash("nope", 1.0).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_legacy_state_is_migrated_and_repersisted() {
        let store = Arc::new(MemoryStore::new());
        let legacy = json!({
            "holdings": {
                "AAPL": {
                    "symbol": "AAPL",
                    "instrument_type": "equity",
                    "lots": [{
                        "id": "l1",
                        "side": "buy",
                        "quantity": 10.0,
                        "price": 100.0,
                        "date": "2024-01-01",
                    }],
                }
            },
            "cash": 250.0,
            "currency": "SGD",
        });
        store.save(STATE_KEY, &legacy).await.unwrap();

        let manager = StateManager::load(store.clone()).await.unwrap();
        let portfolio = &manager.state().portfolios[0];
        assert_eq!(portfolio.id, "default");
        assert_eq!(portfolio.base_currency, "SGD");
        assert_eq!(portfolio.cash_balance, 250.0);
        assert_eq!(portfolio.holdings["AAPL"].lots.len(), 1);

        // The migrated tree was written back in the new shape.
        let persisted = store.load(STATE_KEY).await.unwrap().unwrap();
        assert!(persisted.get("portfolios").is_some());
        assert!(persisted.get("holdings").is_none());

        // Loading again is a no-op: already migrated.
        let again = StateManager::load(store).await.unwrap();
        assert_eq!(again.state().portfolios.len(), 1);
    }

    #[test]
    fn test_migration_is_idempotent_on_new_shape() {
        let new_shape = json!({"portfolios": [], "accounts": [], "transactions": []});
        let (value, changed) = migrate_legacy(new_shape.clone());
        assert!(!changed);
        assert_eq!(value, new_shape);
    }
}
