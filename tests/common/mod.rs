#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use folio::domain::asset_type::AssetType;
use folio::domain::error::FolioError;
use folio::domain::holding::Holding;
use folio::domain::price_point::PricePoint;
use folio::domain::trading::{BuyOrder, SellOrder};
use folio::ports::market_data_port::MarketDataPort;
use std::collections::HashMap;
use std::io::Write;

pub struct MockMarketData {
    pub histories: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            histories: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[(&str, f64)]) -> Self {
        let points = closes
            .iter()
            .map(|(d, close)| PricePoint {
                date: parse_date(d),
                close: Some(*close),
                nav: None,
            })
            .collect();
        self.histories.insert(symbol.to_string(), points);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn price_history(&self, symbol: &str) -> Result<Vec<PricePoint>, FolioError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(FolioError::DataFormat {
                reason: reason.clone(),
            });
        }
        Ok(self.histories.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    date(2025, 3, day).and_hms_opt(hour, 0, 0).unwrap()
}

pub fn buy_order(symbol: &str, quantity: f64, price: f64) -> BuyOrder {
    BuyOrder {
        symbol: symbol.to_string(),
        company_name: format!("{symbol} Holdings"),
        quantity,
        price,
        asset_type: AssetType::Stocks,
    }
}

pub fn sell_order(symbol: &str, quantity: f64) -> SellOrder {
    SellOrder {
        symbol: symbol.to_string(),
        quantity,
    }
}

pub fn make_holding(id: i64, symbol: &str, quantity: f64, buy: f64, current: f64) -> Holding {
    Holding {
        id,
        company_name: format!("{symbol} Holdings"),
        symbol: symbol.to_string(),
        quantity,
        buy_price: buy,
        current_price: current,
        buying_value: buy * quantity,
        asset_type: AssetType::Stocks,
        purchase_date: date(2025, 1, 2),
        listing: Default::default(),
    }
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub const SNAPSHOT_CSV: &str = "\
company_name,symbol,quantity,current_value,percentage_change,asset_type
Apple Inc.,AAPL,10,\"$1,850.00\",+23.33%,Stocks
Tesla Inc.,TSLA,5,\"$1,200.00\",-5.12%,Stocks
Bitcoin,BTC,0.5,\"$31,000.00\",+106.67%,Crypto
";
