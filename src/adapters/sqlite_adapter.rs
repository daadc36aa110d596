//! SQLite ledger adapter.
//!
//! Multi-step operations (buy, sell, add) run inside a single
//! `BEGIN IMMEDIATE` transaction, so the wallet, the holding and the
//! transaction log never disagree, even with several pooled connections.

use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use crate::domain::asset_type::AssetType;
use crate::domain::error::FolioError;
use crate::domain::holding::{Holding, HoldingSnapshot, Listing, NewHolding};
use crate::domain::money::validate_amount;
use crate::domain::trading::{plan_add, plan_buy, plan_sell, with_quantity, BuyOrder, SellOrder};
use crate::domain::transaction::{NewTransaction, Transaction, TransactionKind, TIMESTAMP_FORMAT};
use crate::domain::wallet::Wallet;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

const DATE_FORMAT: &str = "%Y-%m-%d";

const HOLDING_COLUMNS: &str = "id, company_name, symbol, quantity, buy_price, current_price, \
                               buying_value, asset_type, purchase_date, currency, exchange, industry";

pub struct SqliteLedger {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> FolioError {
    FolioError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> FolioError {
    FolioError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_error<E>(text: &str, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(text.len(), rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_holding(row: &Row<'_>) -> rusqlite::Result<Holding> {
    let asset_type: String = row.get(7)?;
    let date_str: String = row.get(8)?;
    let purchase_date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .map_err(|e| conversion_error(&date_str, e))?;
    Ok(Holding {
        id: row.get(0)?,
        company_name: row.get(1)?,
        symbol: row.get(2)?,
        quantity: row.get(3)?,
        buy_price: row.get(4)?,
        current_price: row.get(5)?,
        buying_value: row.get(6)?,
        asset_type: AssetType::parse(&asset_type),
        purchase_date,
        listing: Listing {
            currency: row.get(9)?,
            exchange: row.get(10)?,
            industry: row.get(11)?,
        },
    })
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let kind_str: String = row.get(4)?;
    let kind = kind_str
        .parse::<TransactionKind>()
        .map_err(|e| conversion_error(&kind_str, e))?;
    let ts_str: String = row.get(5)?;
    let timestamp = NaiveDateTime::parse_from_str(&ts_str, TIMESTAMP_FORMAT)
        .map_err(|e| conversion_error(&ts_str, e))?;
    Ok(Transaction {
        id: row.get(0)?,
        symbol: row.get(1)?,
        quantity: row.get(2)?,
        price: row.get(3)?,
        kind,
        timestamp,
    })
}

fn read_wallet(conn: &Connection) -> Result<Wallet, FolioError> {
    conn.query_row("SELECT balance FROM wallet WHERE id = 1", [], |row| row.get(0))
        .optional()
        .map_err(query_error)?
        .map(Wallet::new)
        .ok_or_else(|| FolioError::Database {
            reason: "wallet not initialised; run `folio init` first".to_string(),
        })
}

fn write_wallet(conn: &Connection, wallet: &Wallet) -> Result<(), FolioError> {
    conn.execute(
        "UPDATE wallet SET balance = ?1 WHERE id = 1",
        params![wallet.balance],
    )
    .map_err(query_error)?;
    Ok(())
}

fn holding_by_id(conn: &Connection, id: i64) -> Result<Option<Holding>, FolioError> {
    conn.query_row(
        &format!("SELECT {HOLDING_COLUMNS} FROM holdings WHERE id = ?1"),
        params![id],
        row_to_holding,
    )
    .optional()
    .map_err(query_error)
}

fn holding_by_symbol(conn: &Connection, symbol: &str) -> Result<Option<Holding>, FolioError> {
    conn.query_row(
        &format!("SELECT {HOLDING_COLUMNS} FROM holdings WHERE symbol = ?1"),
        params![symbol.trim().to_uppercase()],
        row_to_holding,
    )
    .optional()
    .map_err(query_error)
}

fn insert_holding(conn: &Connection, holding: &Holding) -> Result<Holding, FolioError> {
    conn.execute(
        "INSERT INTO holdings (company_name, symbol, quantity, buy_price, current_price,
                               buying_value, asset_type, purchase_date,
                               currency, exchange, industry)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            holding.company_name,
            holding.symbol,
            holding.quantity,
            holding.buy_price,
            holding.current_price,
            holding.buying_value,
            holding.asset_type.label(),
            holding.purchase_date.format(DATE_FORMAT).to_string(),
            holding.listing.currency,
            holding.listing.exchange,
            holding.listing.industry,
        ],
    )
    .map_err(query_error)?;
    Ok(Holding {
        id: conn.last_insert_rowid(),
        ..holding.clone()
    })
}

fn update_holding(conn: &Connection, holding: &Holding) -> Result<(), FolioError> {
    conn.execute(
        "UPDATE holdings
         SET quantity = ?2, buy_price = ?3, current_price = ?4, buying_value = ?5
         WHERE id = ?1",
        params![
            holding.id,
            holding.quantity,
            holding.buy_price,
            holding.current_price,
            holding.buying_value,
        ],
    )
    .map_err(query_error)?;
    Ok(())
}

fn insert_transaction(conn: &Connection, transaction: NewTransaction) -> Result<Transaction, FolioError> {
    conn.execute(
        "INSERT INTO transactions (symbol, quantity, price, kind, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            transaction.symbol,
            transaction.quantity,
            transaction.price,
            transaction.kind.as_str(),
            transaction.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .map_err(query_error)?;
    Ok(transaction.into_transaction(conn.last_insert_rowid()))
}

fn query_transactions(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<Transaction>, FolioError> {
    let mut stmt = conn.prepare(sql).map_err(query_error)?;
    let rows = stmt
        .query_map(args, row_to_transaction)
        .map_err(query_error)?;

    let mut transactions = Vec::new();
    for row in rows {
        transactions.push(row.map_err(query_error)?);
    }
    Ok(transactions)
}

impl SqliteLedger {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FolioError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| FolioError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|c| c.execute_batch("PRAGMA journal_mode = WAL;"));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        debug!(path = %db_path, pool_size, "sqlite ledger opened");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, FolioError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, FolioError> {
        self.pool.get().map_err(pool_error)
    }

    /// Run `f` inside an immediate transaction, committing only on success.
    fn atomically<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, FolioError>,
    ) -> Result<T, FolioError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_error)?;
        let value = f(&tx)?;
        tx.commit().map_err(query_error)?;
        Ok(value)
    }

    /// Create the tables and the wallet row. An existing wallet keeps its balance.
    pub fn initialize_schema(&self, initial_balance: f64) -> Result<(), FolioError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS wallet (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                balance REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS holdings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_name TEXT NOT NULL,
                symbol TEXT NOT NULL UNIQUE,
                quantity REAL NOT NULL,
                buy_price REAL NOT NULL,
                current_price REAL NOT NULL,
                buying_value REAL NOT NULL,
                asset_type TEXT NOT NULL,
                purchase_date TEXT NOT NULL,
                currency TEXT,
                exchange TEXT,
                industry TEXT
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                quantity REAL NOT NULL,
                price REAL NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('BUY', 'SELL')),
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_symbol ON transactions(symbol);
            CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp);",
        )
        .map_err(query_error)?;

        conn.execute(
            "INSERT OR IGNORE INTO wallet (id, balance) VALUES (1, ?1)",
            params![initial_balance],
        )
        .map_err(query_error)?;

        Ok(())
    }

    /// Load holdings from aggregate-value snapshots without charging the wallet.
    /// Symbols already held are skipped. Returns the number inserted.
    pub fn seed_snapshots(
        &self,
        snapshots: &[HoldingSnapshot],
        purchase_date: NaiveDate,
    ) -> Result<usize, FolioError> {
        self.atomically(|conn| {
            let mut inserted = 0;
            for snapshot in snapshots {
                if holding_by_symbol(conn, &snapshot.symbol)?.is_some() {
                    continue;
                }
                insert_holding(conn, &Holding::from_snapshot(0, snapshot, purchase_date))?;
                inserted += 1;
            }
            info!(inserted, "seeded holdings from snapshots");
            Ok(inserted)
        })
    }
}

impl LedgerPort for SqliteLedger {
    fn wallet_balance(&self) -> Result<f64, FolioError> {
        Ok(read_wallet(&*self.conn()?)?.balance)
    }

    fn deposit(&self, amount: f64) -> Result<f64, FolioError> {
        let balance = self.atomically(|conn| {
            let mut wallet = read_wallet(conn)?;
            let balance = wallet.credit(amount)?;
            write_wallet(conn, &wallet)?;
            Ok(balance)
        })?;
        info!(amount, balance, "wallet deposit");
        Ok(balance)
    }

    fn withdraw(&self, amount: f64) -> Result<f64, FolioError> {
        let balance = self.atomically(|conn| {
            let mut wallet = read_wallet(conn)?;
            let balance = wallet.debit(amount)?;
            write_wallet(conn, &wallet)?;
            Ok(balance)
        })?;
        info!(amount, balance, "wallet withdrawal");
        Ok(balance)
    }

    fn list_holdings(&self) -> Result<Vec<Holding>, FolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {HOLDING_COLUMNS} FROM holdings ORDER BY id"))
            .map_err(query_error)?;
        let rows = stmt.query_map([], row_to_holding).map_err(query_error)?;

        let mut holdings = Vec::new();
        for row in rows {
            holdings.push(row.map_err(query_error)?);
        }
        Ok(holdings)
    }

    fn get_holding(&self, id: i64) -> Result<Holding, FolioError> {
        holding_by_id(&*self.conn()?, id)?.ok_or(FolioError::HoldingNotFound { id })
    }

    fn find_holding(&self, symbol: &str) -> Result<Option<Holding>, FolioError> {
        holding_by_symbol(&*self.conn()?, symbol)
    }

    fn add_holding(&self, request: NewHolding, now: NaiveDateTime) -> Result<Holding, FolioError> {
        let plan = plan_add(request, now)?;
        let stored = self.atomically(|conn| {
            if holding_by_symbol(conn, &plan.holding.symbol)?.is_some() {
                return Err(FolioError::invalid("symbol", format!("{} already held", plan.holding.symbol)));
            }
            let mut wallet = read_wallet(conn)?;
            wallet.debit(plan.cost)?;
            write_wallet(conn, &wallet)?;
            insert_holding(conn, &plan.holding)
        })?;
        info!(symbol = %stored.symbol, id = stored.id, cost = plan.cost, "holding added");
        Ok(stored)
    }

    fn remove_holding(&self, id: i64) -> Result<(), FolioError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM holdings WHERE id = ?1", params![id])
            .map_err(query_error)?;
        if removed == 0 {
            return Err(FolioError::HoldingNotFound { id });
        }
        info!(id, "holding removed");
        Ok(())
    }

    fn update_quantity(&self, id: i64, quantity: f64) -> Result<Holding, FolioError> {
        validate_amount("quantity", quantity)?;
        self.atomically(|conn| {
            let current = holding_by_id(conn, id)?.ok_or(FolioError::HoldingNotFound { id })?;
            let updated = with_quantity(&current, quantity);
            update_holding(conn, &updated)?;
            debug!(id, quantity, "holding quantity updated");
            Ok(updated)
        })
    }

    fn update_current_price(&self, symbol: &str, price: f64) -> Result<Holding, FolioError> {
        validate_amount("price", price)?;
        self.atomically(|conn| {
            let mut holding =
                holding_by_symbol(conn, symbol)?.ok_or_else(|| FolioError::SymbolNotFound {
                    symbol: symbol.trim().to_uppercase(),
                })?;
            holding.current_price = price;
            update_holding(conn, &holding)?;
            info!(symbol = %holding.symbol, price, "current price updated");
            Ok(holding)
        })
    }

    fn buy(&self, order: &BuyOrder, now: NaiveDateTime) -> Result<Holding, FolioError> {
        let (stored, cost) = self.atomically(|conn| {
            let existing = holding_by_symbol(conn, &order.symbol)?;
            let plan = plan_buy(existing.as_ref(), order, now)?;

            let mut wallet = read_wallet(conn)?;
            wallet.debit(plan.cost)?;
            write_wallet(conn, &wallet)?;

            let stored = if plan.is_new {
                insert_holding(conn, &plan.holding)?
            } else {
                update_holding(conn, &plan.holding)?;
                plan.holding
            };
            insert_transaction(conn, plan.transaction)?;
            Ok((stored, plan.cost))
        })?;
        info!(
            symbol = %stored.symbol,
            quantity = order.quantity,
            price = order.price,
            cost,
            "buy executed"
        );
        Ok(stored)
    }

    fn sell(&self, order: &SellOrder, now: NaiveDateTime) -> Result<Option<Holding>, FolioError> {
        order.validate()?;
        let (remaining, proceeds) = self.atomically(|conn| {
            let holding = holding_by_symbol(conn, &order.symbol)?.ok_or_else(|| {
                FolioError::SymbolNotFound {
                    symbol: order.normalized_symbol(),
                }
            })?;
            let plan = plan_sell(&holding, order, now)?;

            if plan.proceeds > 0.0 {
                let mut wallet = read_wallet(conn)?;
                wallet.credit(plan.proceeds)?;
                write_wallet(conn, &wallet)?;
            }

            match &plan.remaining {
                Some(remaining) => update_holding(conn, remaining)?,
                None => {
                    conn.execute("DELETE FROM holdings WHERE id = ?1", params![holding.id])
                        .map_err(query_error)?;
                }
            }
            insert_transaction(conn, plan.transaction)?;
            Ok((plan.remaining, plan.proceeds))
        })?;
        info!(
            symbol = %order.normalized_symbol(),
            quantity = order.quantity,
            proceeds,
            closed = remaining.is_none(),
            "sell executed"
        );
        Ok(remaining)
    }

    fn append_transaction(&self, transaction: NewTransaction) -> Result<Transaction, FolioError> {
        insert_transaction(&*self.conn()?, transaction)
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, FolioError> {
        query_transactions(
            &*self.conn()?,
            "SELECT id, symbol, quantity, price, kind, timestamp
             FROM transactions
             ORDER BY timestamp DESC, id DESC",
            [],
        )
    }

    fn transactions_for_symbol(&self, symbol: &str) -> Result<Vec<Transaction>, FolioError> {
        query_transactions(
            &*self.conn()?,
            "SELECT id, symbol, quantity, price, kind, timestamp
             FROM transactions
             WHERE symbol = ?1
             ORDER BY timestamp DESC, id DESC",
            params![symbol.trim().to_uppercase()],
        )
    }
}
