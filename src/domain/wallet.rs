//! Wallet ledger: a single cash balance with an insufficient-funds guard.

use super::error::FolioError;
use super::money::validate_amount;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wallet {
    pub balance: f64,
}

impl Wallet {
    pub fn new(balance: f64) -> Self {
        Wallet { balance }
    }

    /// Add cash, returning the new balance.
    pub fn credit(&mut self, amount: f64) -> Result<f64, FolioError> {
        let amount = validate_amount("amount", amount)?;
        self.balance += amount;
        Ok(self.balance)
    }

    /// Remove cash, returning the new balance. The balance is left untouched on error.
    pub fn debit(&mut self, amount: f64) -> Result<f64, FolioError> {
        let amount = validate_amount("amount", amount)?;
        if self.balance < amount {
            return Err(FolioError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }
}

/// Cash versus invested split shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub total_balance: f64,
    pub total_used: f64,
    pub available_balance: f64,
}

impl WalletSummary {
    /// Buys are already paid out of `cash_balance`, so it is the available
    /// figure as-is. Reporting cash as the total and cash minus holdings as
    /// available would count the holdings twice.
    pub fn new(cash_balance: f64, portfolio_value: f64) -> Self {
        WalletSummary {
            total_balance: cash_balance + portfolio_value,
            total_used: portfolio_value,
            available_balance: cash_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn credit_increases_balance() {
        let mut wallet = Wallet::new(250_000.0);
        assert_relative_eq!(wallet.credit(500.0).unwrap(), 250_500.0);
    }

    #[test]
    fn debit_decreases_balance() {
        let mut wallet = Wallet::new(1000.0);
        assert_relative_eq!(wallet.debit(400.0).unwrap(), 600.0);
        assert_relative_eq!(wallet.debit(600.0).unwrap(), 0.0);
    }

    #[test]
    fn debit_over_balance_is_rejected() {
        let mut wallet = Wallet::new(100.0);
        match wallet.debit(100.01) {
            Err(FolioError::InsufficientFunds { balance, requested }) => {
                assert_relative_eq!(balance, 100.0);
                assert_relative_eq!(requested, 100.01);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_relative_eq!(wallet.balance, 100.0);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut wallet = Wallet::new(100.0);
        assert!(matches!(
            wallet.credit(-5.0),
            Err(FolioError::InvalidAmount { .. })
        ));
        assert!(matches!(
            wallet.debit(0.0),
            Err(FolioError::InvalidAmount { .. })
        ));
        assert_relative_eq!(wallet.balance, 100.0);
    }

    #[test]
    fn summary_splits_cash_and_holdings() {
        let summary = WalletSummary::new(1000.0, 4000.0);
        assert_relative_eq!(summary.total_balance, 5000.0);
        assert_relative_eq!(summary.total_used, 4000.0);
        assert_relative_eq!(summary.available_balance, 1000.0);
    }

    proptest! {
        #[test]
        fn balance_never_goes_negative(
            start in 0.0f64..1_000_000.0,
            ops in prop::collection::vec((any::<bool>(), 0.01f64..50_000.0), 0..40),
        ) {
            let mut wallet = Wallet::new(start);
            for (is_credit, amount) in ops {
                let before = wallet.balance;
                let result = if is_credit { wallet.credit(amount) } else { wallet.debit(amount) };
                match result {
                    Ok(balance) => prop_assert_eq!(balance, wallet.balance),
                    Err(_) => prop_assert_eq!(before, wallet.balance),
                }
                prop_assert!(wallet.balance >= 0.0);
            }
        }
    }
}
