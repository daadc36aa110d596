//! CSV adapters: per-symbol price history and holding snapshot imports.

use crate::domain::asset_type::AssetType;
use crate::domain::error::FolioError;
use crate::domain::holding::{HoldingSnapshot, Listing};
use crate::domain::money::{parse_currency, parse_percentage};
use crate::domain::price_point::PricePoint;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Reads `<SYMBOL>.csv` files with a `date,close[,nav]` header.
pub struct CsvMarketData {
    base_path: PathBuf,
}

impl CsvMarketData {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.csv", symbol.trim().to_uppercase()))
    }
}

fn format_error(path: &Path, e: impl std::fmt::Display) -> FolioError {
    FolioError::DataFormat {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn optional_text(field: Option<&str>) -> Option<String> {
    field.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

fn optional_price(path: &Path, field: Option<&str>, column: &str) -> Result<Option<f64>, FolioError> {
    match field.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|e| format_error(path, format!("invalid {column} value {text:?}: {e}"))),
    }
}

impl MarketDataPort for CsvMarketData {
    fn price_history(&self, symbol: &str) -> Result<Vec<PricePoint>, FolioError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| format_error(&path, e))?;
        let headers = rdr.headers().map_err(|e| format_error(&path, e))?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        let date_idx = column("date").ok_or_else(|| format_error(&path, "missing date column"))?;
        let close_idx = column("close");
        let nav_idx = column("nav");

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| format_error(&path, e))?;

            let date_str = record.get(date_idx).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .map_err(|e| format_error(&path, format!("invalid date {date_str:?}: {e}")))?;

            points.push(PricePoint {
                date,
                close: optional_price(&path, close_idx.and_then(|i| record.get(i)), "close")?,
                nav: optional_price(&path, nav_idx.and_then(|i| record.get(i)), "nav")?,
            });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

/// Read holding snapshots from a CSV with the columns
/// `company_name,symbol,quantity,current_value,percentage_change,asset_type`,
/// optionally followed by `currency,exchange,industry`.
///
/// Values may carry display formatting (`"$1,850.00"`, `"+23.33%"`).
pub fn read_snapshots(path: &Path) -> Result<Vec<HoldingSnapshot>, FolioError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| format_error(path, e))?;

    let mut snapshots = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format_error(path, e))?;
        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .ok_or_else(|| format_error(path, format!("row {}: missing {name} column", line + 1)))
        };

        let symbol = field(1, "symbol")?;
        if symbol.is_empty() {
            return Err(format_error(path, format!("row {}: empty symbol", line + 1)));
        }
        let quantity: f64 = field(2, "quantity")?
            .replace(',', "")
            .parse()
            .map_err(|e| format_error(path, format!("row {}: invalid quantity: {e}", line + 1)))?;
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(format_error(
                path,
                format!("row {}: quantity must be positive, got {quantity}", line + 1),
            ));
        }
        let current_value = parse_currency(field(3, "current_value")?)?;
        let percentage_change = parse_percentage(field(4, "percentage_change")?)?;
        if !(current_value.is_finite() && current_value >= 0.0) || !percentage_change.is_finite() {
            return Err(format_error(path, format!("row {}: value out of range", line + 1)));
        }

        snapshots.push(HoldingSnapshot {
            company_name: field(0, "company_name")?.to_string(),
            symbol: symbol.to_uppercase(),
            quantity,
            current_value,
            percentage_change,
            asset_type: AssetType::parse(record.get(5).unwrap_or_default()),
            listing: Listing {
                currency: optional_text(record.get(6)),
                exchange: optional_text(record.get(7)),
                industry: optional_text(record.get(8)),
            },
        });
    }
    Ok(snapshots)
}
