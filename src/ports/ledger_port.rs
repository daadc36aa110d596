//! Ledger access port trait: wallet, holdings and the transaction log.

use chrono::NaiveDateTime;

use crate::domain::error::FolioError;
use crate::domain::holding::{Holding, NewHolding};
use crate::domain::trading::{BuyOrder, SellOrder};
use crate::domain::transaction::{NewTransaction, Transaction};

/// Storage for one user's wallet, holdings and transactions.
///
/// `buy`, `sell` and `add_holding` are atomic: the wallet movement, the
/// holding change and the transaction record are applied together or not at all.
pub trait LedgerPort: Send + Sync {
    fn wallet_balance(&self) -> Result<f64, FolioError>;

    /// Returns the new balance.
    fn deposit(&self, amount: f64) -> Result<f64, FolioError>;

    /// Returns the new balance. Fails with `InsufficientFunds` when the balance is too low.
    fn withdraw(&self, amount: f64) -> Result<f64, FolioError>;

    fn list_holdings(&self) -> Result<Vec<Holding>, FolioError>;

    fn get_holding(&self, id: i64) -> Result<Holding, FolioError>;

    fn find_holding(&self, symbol: &str) -> Result<Option<Holding>, FolioError>;

    /// Pays `buy_price * quantity` from the wallet and stores the holding.
    fn add_holding(&self, request: NewHolding, now: NaiveDateTime) -> Result<Holding, FolioError>;

    /// Deletes a holding without touching the wallet.
    fn remove_holding(&self, id: i64) -> Result<(), FolioError>;

    fn update_quantity(&self, id: i64, quantity: f64) -> Result<Holding, FolioError>;

    fn update_current_price(&self, symbol: &str, price: f64) -> Result<Holding, FolioError>;

    fn buy(&self, order: &BuyOrder, now: NaiveDateTime) -> Result<Holding, FolioError>;

    /// Returns the remaining holding, or `None` when the position was closed.
    fn sell(&self, order: &SellOrder, now: NaiveDateTime) -> Result<Option<Holding>, FolioError>;

    fn append_transaction(&self, transaction: NewTransaction) -> Result<Transaction, FolioError>;

    /// Newest first.
    fn list_transactions(&self) -> Result<Vec<Transaction>, FolioError>;

    /// Newest first.
    fn transactions_for_symbol(&self, symbol: &str) -> Result<Vec<Transaction>, FolioError>;
}
