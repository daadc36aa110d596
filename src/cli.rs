//! CLI definition and dispatch.

use chrono::Local;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

use crate::adapters::csv_adapter::{read_snapshots, CsvMarketData};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_adapter::MemoryLedger;
use crate::domain::asset_type::AssetType;
use crate::domain::config_validation::{
    initial_balance, owner_name, performers_count, storage_backend, validate_config,
    StorageBackend,
};
use crate::domain::error::FolioError;
use crate::domain::holding::{demo_snapshots, Holding, HoldingSnapshot, HoldingView};
use crate::domain::money::{format_currency, format_percentage};
use crate::domain::portfolio::{self, AllocationSlice, BreakdownSlice, Performers, PortfolioSummary};
use crate::domain::trading::{BuyOrder, SellOrder};
use crate::domain::transaction::{Transaction, TIMESTAMP_FORMAT};
use crate::domain::wallet::WalletSummary;
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "folio", about = "Portfolio dashboard backend: wallet, holdings and analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the JSON API server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the ledger schema and wallet, optionally loading holdings
    Init {
        #[arg(short, long)]
        config: PathBuf,
        /// Holdings snapshot CSV to load
        #[arg(long, conflicts_with = "demo")]
        seed: Option<PathBuf>,
        /// Load the five-asset demo portfolio
        #[arg(long)]
        demo: bool,
    },
    /// Show or move wallet cash
    Wallet {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        json: bool,
        #[command(subcommand)]
        action: Option<WalletAction>,
    },
    /// List holdings with derived values
    Holdings {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Buy into a position, paying from the wallet
    Buy {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Company name; defaults to the symbol
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "Stocks")]
        asset_type: String,
        #[arg(long)]
        json: bool,
    },
    /// Sell from a position at its current price
    Sell {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        json: bool,
    },
    /// Portfolio summary, allocation, breakdown and performers
    Summary {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Transaction log, newest first
    Transactions {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum WalletAction {
    Balance,
    Deposit { amount: f64 },
    Withdraw { amount: f64 },
    Summary,
}

pub fn run(cli: Cli) -> ExitCode {
    let is_serve = matches!(cli.command, Command::Serve { .. });
    init_tracing(if is_serve {
        "folio=info,tower_http=info"
    } else {
        "folio=warn"
    });

    let result = match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::Init { config, seed, demo } => run_init(&config, seed.as_deref(), demo),
        Command::Wallet {
            config,
            json,
            action,
        } => run_wallet(&config, action.unwrap_or(WalletAction::Balance), json),
        Command::Holdings { config, json } => run_holdings(&config, json),
        Command::Buy {
            config,
            symbol,
            name,
            quantity,
            price,
            asset_type,
            json,
        } => {
            let order = BuyOrder {
                company_name: name.unwrap_or_else(|| symbol.trim().to_uppercase()),
                symbol,
                quantity,
                price,
                asset_type: AssetType::parse(&asset_type),
            };
            run_buy(&config, &order, json)
        }
        Command::Sell {
            config,
            symbol,
            quantity,
            json,
        } => run_sell(&config, &SellOrder { symbol, quantity }, json),
        Command::Summary { config, json } => run_summary(&config, json),
        Command::Transactions {
            config,
            symbol,
            json,
        } => run_transactions(&config, symbol.as_deref(), json),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides `default_filter`.
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FolioError> {
    eprintln!("Loading config from {}", path.display());
    let config = FileConfigAdapter::from_file(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Open the configured ledger. SQLite ledgers get their schema created on first use;
/// the memory ledger starts from the demo portfolio.
pub fn open_ledger(config: &dyn ConfigPort) -> Result<Arc<dyn LedgerPort>, FolioError> {
    let balance = initial_balance(config);
    match storage_backend(config)? {
        StorageBackend::Memory => {
            debug!("using in-memory ledger with demo holdings");
            Ok(Arc::new(MemoryLedger::with_demo_data(balance)))
        }
        StorageBackend::Sqlite => open_sqlite(config, balance),
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &dyn ConfigPort, balance: f64) -> Result<Arc<dyn LedgerPort>, FolioError> {
    use crate::adapters::sqlite_adapter::SqliteLedger;

    let ledger = SqliteLedger::from_config(config)?;
    ledger.initialize_schema(balance)?;
    Ok(Arc::new(ledger))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &dyn ConfigPort, _balance: f64) -> Result<Arc<dyn LedgerPort>, FolioError> {
    Err(sqlite_disabled())
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_disabled() -> FolioError {
    FolioError::ConfigInvalid {
        section: "storage".into(),
        key: "backend".into(),
        reason: "this build has no sqlite support; use backend = memory".into(),
    }
}

/// Price history source, when `[market] history_dir` is set.
pub fn market_data(config: &dyn ConfigPort) -> Option<Arc<dyn MarketDataPort>> {
    config
        .get_string("market", "history_dir")
        .map(|dir| dir.trim().to_string())
        .filter(|dir| !dir.is_empty())
        .map(|dir| Arc::new(CsvMarketData::new(PathBuf::from(dir))) as Arc<dyn MarketDataPort>)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), FolioError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| FolioError::DataFormat {
        reason: format!("JSON encoding failed: {e}"),
    })?;
    println!("{text}");
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), FolioError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState};
        use crate::domain::config_validation::listen_addr;
        use tracing::info;

        let config = load_config(config_path)?;
        let addr = listen_addr(&config)?;
        let state = AppState {
            ledger: open_ledger(&config)?,
            market_data: market_data(&config),
            owner_name: owner_name(&config),
            performers_count: performers_count(&config),
        };
        let router = build_router(state);

        eprintln!("Starting web server on {addr}");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "listening");
            axum::serve(listener, router).await
        })?;
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(FolioError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "this build has no web support".into(),
        })
    }
}

fn run_init(config_path: &Path, seed: Option<&Path>, demo: bool) -> Result<(), FolioError> {
    let config = load_config(config_path)?;

    let snapshots: Vec<HoldingSnapshot> = match (seed, demo) {
        (Some(path), _) => read_snapshots(path)?,
        (None, true) => demo_snapshots(),
        (None, false) => Vec::new(),
    };

    match storage_backend(&config)? {
        StorageBackend::Memory => {
            eprintln!("Memory backend keeps no state between runs; nothing to initialise");
            Ok(())
        }
        StorageBackend::Sqlite => init_sqlite(&config, &snapshots),
    }
}

#[cfg(feature = "sqlite")]
fn init_sqlite(config: &dyn ConfigPort, snapshots: &[HoldingSnapshot]) -> Result<(), FolioError> {
    use crate::adapters::sqlite_adapter::SqliteLedger;

    let ledger = SqliteLedger::from_config(config)?;
    ledger.initialize_schema(initial_balance(config))?;
    eprintln!(
        "Ledger ready, wallet balance {}",
        format_currency(ledger.wallet_balance()?)
    );

    if !snapshots.is_empty() {
        let inserted = ledger.seed_snapshots(snapshots, Local::now().date_naive())?;
        eprintln!(
            "Seeded {inserted} of {} holdings ({} already present)",
            snapshots.len(),
            snapshots.len() - inserted
        );
    }
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn init_sqlite(_config: &dyn ConfigPort, _snapshots: &[HoldingSnapshot]) -> Result<(), FolioError> {
    Err(sqlite_disabled())
}

fn wallet_summary(ledger: &dyn LedgerPort) -> Result<WalletSummary, FolioError> {
    let cash = ledger.wallet_balance()?;
    let invested = portfolio::total_value(&ledger.list_holdings()?);
    Ok(WalletSummary::new(cash, invested))
}

fn run_wallet(config_path: &Path, action: WalletAction, json: bool) -> Result<(), FolioError> {
    let config = load_config(config_path)?;
    let ledger = open_ledger(&config)?;

    if action == WalletAction::Summary {
        let summary = wallet_summary(ledger.as_ref())?;
        if json {
            return print_json(&summary);
        }
        print!("{}", render_wallet_summary(&summary));
        return Ok(());
    }

    let balance = match action {
        WalletAction::Deposit { amount } => ledger.deposit(amount)?,
        WalletAction::Withdraw { amount } => ledger.withdraw(amount)?,
        WalletAction::Balance | WalletAction::Summary => ledger.wallet_balance()?,
    };
    if json {
        print_json(&serde_json::json!({ "balance": balance }))
    } else {
        println!("{}", format_currency(balance));
        Ok(())
    }
}

fn run_holdings(config_path: &Path, json: bool) -> Result<(), FolioError> {
    let config = load_config(config_path)?;
    let holdings = open_ledger(&config)?.list_holdings()?;
    if json {
        let views: Vec<HoldingView> = holdings.into_iter().map(HoldingView::from).collect();
        return print_json(&views);
    }
    print!("{}", render_holdings(&holdings));
    Ok(())
}

fn print_holding(holding: Option<Holding>, json: bool) -> Result<(), FolioError> {
    let view = holding.map(HoldingView::from);
    if json {
        return print_json(&view);
    }
    match view {
        Some(v) => print!("{}", render_holdings(std::slice::from_ref(&v.holding))),
        None => println!("Position closed"),
    }
    Ok(())
}

fn run_buy(config_path: &Path, order: &BuyOrder, json: bool) -> Result<(), FolioError> {
    let config = load_config(config_path)?;
    let ledger = open_ledger(&config)?;
    let holding = ledger.buy(order, Local::now().naive_local())?;
    eprintln!(
        "Bought {} {} for {}, wallet balance {}",
        order.quantity,
        holding.symbol,
        format_currency(order.cost()),
        format_currency(ledger.wallet_balance()?)
    );
    print_holding(Some(holding), json)
}

fn run_sell(config_path: &Path, order: &SellOrder, json: bool) -> Result<(), FolioError> {
    let config = load_config(config_path)?;
    let ledger = open_ledger(&config)?;
    let remaining = ledger.sell(order, Local::now().naive_local())?;
    eprintln!(
        "Sold {} {}, wallet balance {}",
        order.quantity,
        order.normalized_symbol(),
        format_currency(ledger.wallet_balance()?)
    );
    print_holding(remaining, json)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryReport {
    summary: PortfolioSummary,
    wallet: WalletSummary,
    allocation: Vec<AllocationSlice>,
    breakdown: Vec<BreakdownSlice>,
    performers: Performers,
}

fn run_summary(config_path: &Path, json: bool) -> Result<(), FolioError> {
    let config = load_config(config_path)?;
    let ledger = open_ledger(&config)?;
    let holdings = ledger.list_holdings()?;

    let report = SummaryReport {
        summary: portfolio::summarize(&owner_name(&config), &holdings),
        wallet: wallet_summary(ledger.as_ref())?,
        allocation: portfolio::allocation(&holdings),
        breakdown: portfolio::breakdown(&holdings),
        performers: portfolio::performers(&holdings, performers_count(&config)),
    };

    if json {
        return print_json(&report);
    }
    let allocation: Vec<_> = report
        .allocation
        .iter()
        .map(|s| (&s.asset_type, s.value))
        .collect();
    let breakdown: Vec<_> = report
        .breakdown
        .iter()
        .map(|s| (&s.asset_type, s.value))
        .collect();

    print!("{}", render_summary(&report.summary, &report.wallet));
    print!("{}", render_slices("Allocation (current value)", &allocation));
    print!("{}", render_slices("Breakdown (invested)", &breakdown));
    print!("{}", render_performers(&report.performers));
    Ok(())
}

fn run_transactions(config_path: &Path, symbol: Option<&str>, json: bool) -> Result<(), FolioError> {
    let config = load_config(config_path)?;
    let ledger = open_ledger(&config)?;
    let transactions = match symbol {
        Some(s) => ledger.transactions_for_symbol(s)?,
        None => ledger.list_transactions()?,
    };
    if json {
        return print_json(&transactions);
    }
    print!("{}", render_transactions(&transactions));
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), FolioError> {
    let config = load_config(config_path)?;
    let backend = storage_backend(&config)?;
    eprintln!("Config OK");
    eprintln!("  Storage:     {backend:?}");
    eprintln!("  Owner:       {}", owner_name(&config));
    eprintln!(
        "  Initial:     {}",
        format_currency(initial_balance(&config))
    );
    eprintln!("  Performers:  {}", performers_count(&config));
    if let Some(dir) = config.get_string("market", "history_dir") {
        eprintln!("  History dir: {}", dir.trim());
    }
    Ok(())
}

pub fn render_holdings(holdings: &[Holding]) -> String {
    if holdings.is_empty() {
        return "No holdings\n".to_string();
    }
    let mut out = format!(
        "{:<4} {:<8} {:<24} {:>12} {:>14} {:>14} {:>14} {:>9} {:<12}\n",
        "ID", "SYMBOL", "NAME", "QTY", "UNIT PRICE", "VALUE", "P/L", "CHANGE", "TYPE"
    );
    for h in holdings {
        let _ = writeln!(
            out,
            "{:<4} {:<8} {:<24} {:>12} {:>14} {:>14} {:>14} {:>9} {:<12}",
            h.id,
            h.symbol,
            truncate(&h.company_name, 24),
            h.quantity,
            format_currency(h.unit_price()),
            format_currency(h.current_value()),
            format_currency(h.profit_loss()),
            format_percentage(h.percentage_change()),
            h.asset_type,
        );
    }
    let _ = writeln!(
        out,
        "Total value: {}",
        format_currency(portfolio::total_value(holdings))
    );
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}~")
    }
}

pub fn render_wallet_summary(summary: &WalletSummary) -> String {
    format!(
        "Total:     {}\nInvested:  {}\nAvailable: {}\n",
        format_currency(summary.total_balance),
        format_currency(summary.total_used),
        format_currency(summary.available_balance)
    )
}

pub fn render_summary(summary: &PortfolioSummary, wallet: &WalletSummary) -> String {
    format!(
        "Portfolio of {}\n  Value:     {}\n  Invested:  {}\n  Gain:      {} ({})\n  Cash:      {}\n",
        summary.user_name,
        format_currency(summary.portfolio_value),
        format_currency(summary.total_invested),
        format_currency(summary.total_gain),
        format_percentage(summary.gain_percentage),
        format_currency(wallet.available_balance)
    )
}

fn render_slices(title: &str, slices: &[(&AssetType, f64)]) -> String {
    let mut out = format!("{title}\n");
    for (asset_type, value) in slices {
        let _ = writeln!(out, "  {:<14} {:>14}", asset_type.label(), format_currency(*value));
    }
    out
}

fn render_performers(performers: &Performers) -> String {
    let mut out = String::new();
    for (title, entries) in [
        ("Top performers", &performers.top_performers),
        ("Lowest performers", &performers.lowest_performers),
    ] {
        let _ = writeln!(out, "{title}");
        for p in entries {
            let _ = writeln!(
                out,
                "  {:<8} {:>14} {:>9}",
                p.symbol,
                format_currency(p.current_value),
                format_percentage(p.percentage_change)
            );
        }
    }
    out
}

pub fn render_transactions(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "No transactions\n".to_string();
    }
    let mut out = format!(
        "{:<19}  {:<4} {:<8} {:>12} {:>14} {:>14}\n",
        "TIME", "TYPE", "SYMBOL", "QTY", "PRICE", "TOTAL"
    );
    for t in transactions {
        let _ = writeln!(
            out,
            "{:<19}  {:<4} {:<8} {:>12} {:>14} {:>14}",
            t.timestamp.format(TIMESTAMP_FORMAT),
            t.kind.as_str(),
            t.symbol,
            t.quantity,
            format_currency(t.price),
            format_currency(t.total_value())
        );
    }
    out
}
