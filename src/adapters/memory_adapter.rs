//! In-memory ledger adapter.
//!
//! All state sits behind one mutex, so each operation sees and leaves a
//! consistent wallet/holdings/transactions triple.

use chrono::{Local, NaiveDateTime};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::domain::error::FolioError;
use crate::domain::holding::{demo_snapshots, Holding, NewHolding};
use crate::domain::money::validate_amount;
use crate::domain::trading::{plan_add, plan_buy, plan_sell, with_quantity, BuyOrder, SellOrder};
use crate::domain::transaction::{sort_newest_first, NewTransaction, Transaction};
use crate::domain::wallet::Wallet;
use crate::ports::ledger_port::LedgerPort;

#[derive(Debug)]
struct LedgerState {
    wallet: Wallet,
    holdings: Vec<Holding>,
    transactions: Vec<Transaction>,
    next_holding_id: i64,
    next_transaction_id: i64,
}

impl LedgerState {
    fn holding_index(&self, id: i64) -> Result<usize, FolioError> {
        self.holdings
            .iter()
            .position(|h| h.id == id)
            .ok_or(FolioError::HoldingNotFound { id })
    }

    fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.holdings
            .iter()
            .position(|h| h.symbol.eq_ignore_ascii_case(symbol.trim()))
    }

    fn insert_holding(&mut self, mut holding: Holding) -> Holding {
        holding.id = self.next_holding_id;
        self.next_holding_id += 1;
        self.holdings.push(holding.clone());
        holding
    }

    fn record(&mut self, transaction: NewTransaction) -> Transaction {
        let stored = transaction.into_transaction(self.next_transaction_id);
        self.next_transaction_id += 1;
        self.transactions.push(stored.clone());
        stored
    }
}

pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                wallet: Wallet::new(initial_balance),
                holdings: Vec::new(),
                transactions: Vec::new(),
                next_holding_id: 1,
                next_transaction_id: 1,
            }),
        }
    }

    /// Ledger pre-loaded with the demo portfolio. The wallet is not charged for it.
    pub fn with_demo_data(initial_balance: f64) -> Self {
        let ledger = Self::new(initial_balance);
        let today = Local::now().date_naive();
        if let Ok(mut state) = ledger.state.lock() {
            for snapshot in demo_snapshots() {
                let holding = Holding::from_snapshot(0, &snapshot, today);
                state.insert_holding(holding);
            }
        }
        ledger
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, FolioError> {
        self.state.lock().map_err(|_| FolioError::Database {
            reason: "ledger lock poisoned".to_string(),
        })
    }
}

impl LedgerPort for MemoryLedger {
    fn wallet_balance(&self) -> Result<f64, FolioError> {
        Ok(self.lock()?.wallet.balance)
    }

    fn deposit(&self, amount: f64) -> Result<f64, FolioError> {
        let balance = self.lock()?.wallet.credit(amount)?;
        info!(amount, balance, "wallet deposit");
        Ok(balance)
    }

    fn withdraw(&self, amount: f64) -> Result<f64, FolioError> {
        let balance = self.lock()?.wallet.debit(amount)?;
        info!(amount, balance, "wallet withdrawal");
        Ok(balance)
    }

    fn list_holdings(&self) -> Result<Vec<Holding>, FolioError> {
        Ok(self.lock()?.holdings.clone())
    }

    fn get_holding(&self, id: i64) -> Result<Holding, FolioError> {
        let state = self.lock()?;
        let index = state.holding_index(id)?;
        Ok(state.holdings[index].clone())
    }

    fn find_holding(&self, symbol: &str) -> Result<Option<Holding>, FolioError> {
        let state = self.lock()?;
        Ok(state.symbol_index(symbol).map(|i| state.holdings[i].clone()))
    }

    fn add_holding(&self, request: NewHolding, now: NaiveDateTime) -> Result<Holding, FolioError> {
        let plan = plan_add(request, now)?;
        let mut state = self.lock()?;
        if state.symbol_index(&plan.holding.symbol).is_some() {
            return Err(FolioError::invalid(
                "symbol",
                format!("{} already held", plan.holding.symbol),
            ));
        }
        state.wallet.debit(plan.cost)?;
        let stored = state.insert_holding(plan.holding);
        info!(symbol = %stored.symbol, id = stored.id, cost = plan.cost, "holding added");
        Ok(stored)
    }

    fn remove_holding(&self, id: i64) -> Result<(), FolioError> {
        let mut state = self.lock()?;
        let index = state.holding_index(id)?;
        let removed = state.holdings.remove(index);
        info!(symbol = %removed.symbol, id, "holding removed");
        Ok(())
    }

    fn update_quantity(&self, id: i64, quantity: f64) -> Result<Holding, FolioError> {
        validate_amount("quantity", quantity)?;
        let mut state = self.lock()?;
        let index = state.holding_index(id)?;
        let updated = with_quantity(&state.holdings[index], quantity);
        state.holdings[index] = updated.clone();
        debug!(id, quantity, "holding quantity updated");
        Ok(updated)
    }

    fn update_current_price(&self, symbol: &str, price: f64) -> Result<Holding, FolioError> {
        validate_amount("price", price)?;
        let mut state = self.lock()?;
        let index = state
            .symbol_index(symbol)
            .ok_or_else(|| FolioError::SymbolNotFound {
                symbol: symbol.trim().to_uppercase(),
            })?;
        state.holdings[index].current_price = price;
        info!(symbol = %state.holdings[index].symbol, price, "current price updated");
        Ok(state.holdings[index].clone())
    }

    fn buy(&self, order: &BuyOrder, now: NaiveDateTime) -> Result<Holding, FolioError> {
        let mut state = self.lock()?;
        let existing = state.symbol_index(&order.symbol);
        let plan = plan_buy(existing.map(|i| &state.holdings[i]), order, now)?;
        state.wallet.debit(plan.cost)?;

        let stored = match existing {
            Some(index) => {
                state.holdings[index] = plan.holding.clone();
                plan.holding
            }
            None => state.insert_holding(plan.holding),
        };
        state.record(plan.transaction);
        info!(
            symbol = %stored.symbol,
            quantity = order.quantity,
            price = order.price,
            cost = plan.cost,
            "buy executed"
        );
        Ok(stored)
    }

    fn sell(&self, order: &SellOrder, now: NaiveDateTime) -> Result<Option<Holding>, FolioError> {
        order.validate()?;
        let mut state = self.lock()?;
        let index = state
            .symbol_index(&order.symbol)
            .ok_or_else(|| FolioError::SymbolNotFound {
                symbol: order.normalized_symbol(),
            })?;
        let plan = plan_sell(&state.holdings[index], order, now)?;
        if plan.proceeds > 0.0 {
            state.wallet.credit(plan.proceeds)?;
        }

        match &plan.remaining {
            Some(remaining) => state.holdings[index] = remaining.clone(),
            None => {
                state.holdings.remove(index);
            }
        }
        state.record(plan.transaction);
        info!(
            symbol = %order.normalized_symbol(),
            quantity = order.quantity,
            proceeds = plan.proceeds,
            closed = plan.remaining.is_none(),
            "sell executed"
        );
        Ok(plan.remaining)
    }

    fn append_transaction(&self, transaction: NewTransaction) -> Result<Transaction, FolioError> {
        Ok(self.lock()?.record(transaction))
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, FolioError> {
        let mut log = self.lock()?.transactions.clone();
        sort_newest_first(&mut log);
        Ok(log)
    }

    fn transactions_for_symbol(&self, symbol: &str) -> Result<Vec<Transaction>, FolioError> {
        let mut log: Vec<Transaction> = self
            .lock()?
            .transactions
            .iter()
            .filter(|t| t.symbol.eq_ignore_ascii_case(symbol.trim()))
            .cloned()
            .collect();
        sort_newest_first(&mut log);
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset_type::AssetType;
    use crate::domain::transaction::TransactionKind;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 3)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn order(symbol: &str, quantity: f64, price: f64) -> BuyOrder {
        BuyOrder {
            symbol: symbol.into(),
            company_name: format!("{symbol} Inc."),
            quantity,
            price,
            asset_type: AssetType::Stocks,
        }
    }

    #[test]
    fn demo_data_has_five_holdings_and_untouched_wallet() {
        let ledger = MemoryLedger::with_demo_data(250_000.0);
        let holdings = ledger.list_holdings().unwrap();
        assert_eq!(holdings.len(), 5);
        assert_eq!(holdings[0].id, 1);
        assert_eq!(holdings[4].symbol, "BTC");
        assert_relative_eq!(ledger.wallet_balance().unwrap(), 250_000.0);
    }

    #[test]
    fn buy_then_sell_round_trip_through_wallet() {
        let ledger = MemoryLedger::new(10_000.0);
        let bought = ledger.buy(&order("msft", 10.0, 300.0), at(9)).unwrap();
        assert_eq!(bought.symbol, "MSFT");
        assert_relative_eq!(ledger.wallet_balance().unwrap(), 7_000.0);

        ledger.update_current_price("MSFT", 350.0).unwrap();
        let remaining = ledger
            .sell(&SellOrder { symbol: "msft".into(), quantity: 4.0 }, at(10))
            .unwrap()
            .unwrap();
        assert_relative_eq!(remaining.quantity, 6.0);
        assert_relative_eq!(ledger.wallet_balance().unwrap(), 8_400.0);

        let closed = ledger
            .sell(&SellOrder { symbol: "MSFT".into(), quantity: 6.0 }, at(11))
            .unwrap();
        assert!(closed.is_none());
        assert!(ledger.list_holdings().unwrap().is_empty());

        let log = ledger.list_transactions().unwrap();
        let kinds: Vec<_> = log.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [TransactionKind::Sell, TransactionKind::Sell, TransactionKind::Buy]
        );
    }

    #[test]
    fn buy_without_funds_changes_nothing() {
        let ledger = MemoryLedger::new(100.0);
        let result = ledger.buy(&order("AAPL", 1.0, 150.0), at(9));
        assert!(matches!(result, Err(FolioError::InsufficientFunds { .. })));
        assert!(ledger.list_holdings().unwrap().is_empty());
        assert!(ledger.list_transactions().unwrap().is_empty());
        assert_relative_eq!(ledger.wallet_balance().unwrap(), 100.0);
    }

    #[test]
    fn second_buy_merges_into_existing_holding() {
        let ledger = MemoryLedger::new(10_000.0);
        let first = ledger.buy(&order("AAPL", 10.0, 100.0), at(9)).unwrap();
        let second = ledger.buy(&order("aapl", 10.0, 200.0), at(10)).unwrap();
        assert_eq!(first.id, second.id);
        assert_relative_eq!(second.buy_price, 150.0);
        assert_eq!(ledger.list_holdings().unwrap().len(), 1);
    }

    #[test]
    fn sell_unknown_symbol_is_not_found() {
        let ledger = MemoryLedger::new(0.0);
        let result = ledger.sell(&SellOrder { symbol: "ZZZ".into(), quantity: 1.0 }, at(9));
        assert!(matches!(result, Err(FolioError::SymbolNotFound { .. })));
    }

    #[test]
    fn oversell_keeps_wallet_and_holding() {
        let ledger = MemoryLedger::new(1_000.0);
        ledger.buy(&order("AAPL", 2.0, 100.0), at(9)).unwrap();
        let result = ledger.sell(&SellOrder { symbol: "AAPL".into(), quantity: 3.0 }, at(10));
        assert!(matches!(result, Err(FolioError::InsufficientQuantity { .. })));
        assert_relative_eq!(ledger.wallet_balance().unwrap(), 800.0);
        assert_relative_eq!(ledger.find_holding("AAPL").unwrap().unwrap().quantity, 2.0);
        assert_eq!(ledger.list_transactions().unwrap().len(), 1);
    }

    #[test]
    fn add_and_remove_holding() {
        let ledger = MemoryLedger::new(5_000.0);
        let added = ledger
            .add_holding(
                NewHolding {
                    company_name: "Gold ETF".into(),
                    symbol: "gld".into(),
                    quantity: 10.0,
                    buy_price: 200.0,
                    current_price: None,
                    asset_type: AssetType::Commodities,
                    listing: Default::default(),
                },
                at(9),
            )
            .unwrap();
        assert_relative_eq!(ledger.wallet_balance().unwrap(), 3_000.0);
        assert_eq!(ledger.get_holding(added.id).unwrap().symbol, "GLD");

        ledger.remove_holding(added.id).unwrap();
        assert!(matches!(
            ledger.get_holding(added.id),
            Err(FolioError::HoldingNotFound { .. })
        ));
        assert!(matches!(
            ledger.remove_holding(added.id),
            Err(FolioError::HoldingNotFound { .. })
        ));
    }

    #[test]
    fn add_holding_rejects_held_symbol() {
        let ledger = MemoryLedger::new(5_000.0);
        ledger.buy(&order("AAPL", 1.0, 100.0), at(9)).unwrap();
        let result = ledger.add_holding(
            NewHolding {
                company_name: "Apple".into(),
                symbol: "aapl".into(),
                quantity: 1.0,
                buy_price: 100.0,
                current_price: None,
                asset_type: AssetType::Stocks,
                listing: Default::default(),
            },
            at(10),
        );
        assert!(matches!(result, Err(FolioError::InvalidAmount { .. })));
        assert_relative_eq!(ledger.wallet_balance().unwrap(), 4_900.0);
        assert_eq!(ledger.list_holdings().unwrap().len(), 1);
    }

    #[test]
    fn update_quantity_recomputes_buying_value() {
        let ledger = MemoryLedger::new(5_000.0);
        let h = ledger.buy(&order("AAPL", 10.0, 100.0), at(9)).unwrap();
        let updated = ledger.update_quantity(h.id, 20.0).unwrap();
        assert_relative_eq!(updated.buying_value, 2_000.0);
        assert!(ledger.update_quantity(h.id, 0.0).is_err());
        assert!(ledger.update_quantity(999, 1.0).is_err());
    }

    #[test]
    fn transactions_filtered_by_symbol_newest_first() {
        let ledger = MemoryLedger::new(0.0);
        for (hour, symbol) in [(9, "AAPL"), (10, "TSLA"), (11, "AAPL")] {
            ledger
                .append_transaction(NewTransaction::new(symbol, 1.0, 10.0, TransactionKind::Buy, at(hour)))
                .unwrap();
        }
        let aapl = ledger.transactions_for_symbol("aapl").unwrap();
        assert_eq!(aapl.len(), 2);
        assert_eq!(aapl[0].timestamp, at(11));
    }
}
