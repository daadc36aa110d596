//! Append-only buy/sell transaction log records.

use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

use super::error::FolioError;

/// Storage and display format for transaction timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Buy => "BUY",
            TransactionKind::Sell => "SELL",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TransactionKind::Buy),
            "SELL" => Ok(TransactionKind::Sell),
            other => Err(FolioError::DataFormat {
                reason: format!("unknown transaction type {other:?}"),
            }),
        }
    }
}

impl<'de> serde::Deserialize<'de> for TransactionKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Serialised with the dashboard's field names: `transactionId`, `buyPrice`
/// (the trade price for either kind) and `transactionDate`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "transactionId")]
    pub id: i64,
    pub symbol: String,
    pub quantity: f64,
    #[serde(rename = "buyPrice")]
    pub price: f64,
    #[serde(rename = "transactionType")]
    pub kind: TransactionKind,
    #[serde(rename = "transactionDate")]
    pub timestamp: NaiveDateTime,
}

impl Transaction {
    pub fn total_value(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Timestamps are kept to whole seconds, the precision the ledgers store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    pub kind: TransactionKind,
    pub timestamp: NaiveDateTime,
}

impl NewTransaction {
    pub fn new(symbol: &str, quantity: f64, price: f64, kind: TransactionKind, timestamp: NaiveDateTime) -> Self {
        NewTransaction {
            symbol: symbol.trim().to_uppercase(),
            quantity,
            price,
            kind,
            timestamp: whole_seconds(timestamp),
        }
    }

    pub fn into_transaction(self, id: i64) -> Transaction {
        Transaction {
            id,
            symbol: self.symbol,
            quantity: self.quantity,
            price: self.price,
            kind: self.kind,
            timestamp: whole_seconds(self.timestamp),
        }
    }
}

fn whole_seconds(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp.with_nanosecond(0).unwrap_or(timestamp)
}

/// Newest first; ties broken by the later id.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}
