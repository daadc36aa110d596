//! Holdings (positions) and the figures derived from them.

use chrono::NaiveDate;

use super::asset_type::AssetType;
use super::error::FolioError;
use super::money::validate_amount;

/// Quantities closer than this are treated as equal.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Optional market metadata carried alongside a position.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Listing {
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: i64,
    pub company_name: String,
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub current_price: f64,
    pub buying_value: f64,
    pub asset_type: AssetType,
    pub purchase_date: NaiveDate,
    #[serde(flatten)]
    pub listing: Listing,
}

impl Holding {
    pub fn current_value(&self) -> f64 {
        self.current_price * self.quantity
    }

    /// Aggregate value divided by quantity; zero for an empty position.
    pub fn unit_price(&self) -> f64 {
        if self.quantity.abs() < QUANTITY_EPSILON {
            0.0
        } else {
            self.current_value() / self.quantity
        }
    }

    /// Cost basis. Falls back to `buy_price * quantity` when no buying value was recorded.
    pub fn invested(&self) -> f64 {
        if self.buying_value == 0.0 {
            self.buy_price * self.quantity
        } else {
            self.buying_value
        }
    }

    pub fn profit_loss(&self) -> f64 {
        self.current_value() - self.invested()
    }

    pub fn percentage_change(&self) -> f64 {
        let invested = self.invested();
        if invested == 0.0 {
            0.0
        } else {
            self.profit_loss() / invested * 100.0
        }
    }

    /// Build a holding from the aggregate-value model, back-computing its cost basis.
    pub fn from_snapshot(id: i64, snapshot: &HoldingSnapshot, purchase_date: NaiveDate) -> Self {
        let unit_price = if snapshot.quantity.abs() < QUANTITY_EPSILON {
            0.0
        } else {
            snapshot.current_value / snapshot.quantity
        };
        let cost = back_computed_cost(snapshot.current_value, snapshot.percentage_change);
        let buy_price = if snapshot.quantity.abs() < QUANTITY_EPSILON {
            0.0
        } else {
            cost / snapshot.quantity
        };
        Holding {
            id,
            company_name: snapshot.company_name.clone(),
            symbol: snapshot.symbol.to_uppercase(),
            quantity: snapshot.quantity,
            buy_price,
            current_price: unit_price,
            buying_value: cost,
            asset_type: snapshot.asset_type.clone(),
            purchase_date,
            listing: snapshot.listing.clone(),
        }
    }
}

/// Recover the amount originally invested from a current value and its percentage change.
pub fn back_computed_cost(current_value: f64, percentage_change: f64) -> f64 {
    let factor = 1.0 + percentage_change / 100.0;
    if factor.abs() < QUANTITY_EPSILON {
        0.0
    } else {
        current_value / factor
    }
}

/// A holding as reported by a dashboard: aggregate value plus percentage change.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingSnapshot {
    pub company_name: String,
    pub symbol: String,
    pub quantity: f64,
    pub current_value: f64,
    pub percentage_change: f64,
    pub asset_type: AssetType,
    #[serde(flatten)]
    pub listing: Listing,
}

/// Request to add a holding directly, paid from the wallet.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHolding {
    pub company_name: String,
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default = "default_asset_type")]
    pub asset_type: AssetType,
    #[serde(flatten)]
    pub listing: Listing,
}

fn default_asset_type() -> AssetType {
    AssetType::Stocks
}

impl NewHolding {
    pub fn validate(&self) -> Result<(), FolioError> {
        if self.symbol.trim().is_empty() {
            return Err(FolioError::invalid("symbol", "<empty>"));
        }
        validate_amount("quantity", self.quantity)?;
        validate_amount("buyPrice", self.buy_price)?;
        if let Some(price) = self.current_price {
            validate_amount("currentPrice", price)?;
        }
        Ok(())
    }

    pub fn cost(&self) -> f64 {
        self.buy_price * self.quantity
    }

    pub fn into_holding(self, id: i64, purchase_date: NaiveDate) -> Holding {
        let buying_value = self.cost();
        Holding {
            id,
            company_name: self.company_name,
            symbol: self.symbol.trim().to_uppercase(),
            quantity: self.quantity,
            buy_price: self.buy_price,
            current_price: self.current_price.unwrap_or(self.buy_price),
            buying_value,
            asset_type: self.asset_type,
            purchase_date,
            listing: self.listing,
        }
    }
}

/// Holding plus derived figures, the shape served to dashboards.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    #[serde(flatten)]
    pub holding: Holding,
    pub unit_price: f64,
    pub current_value: f64,
    pub invested_value: f64,
    pub profit_loss: f64,
    pub percentage_change: f64,
}

impl From<Holding> for HoldingView {
    fn from(holding: Holding) -> Self {
        HoldingView {
            unit_price: holding.unit_price(),
            current_value: holding.current_value(),
            invested_value: holding.invested(),
            profit_loss: holding.profit_loss(),
            percentage_change: holding.percentage_change(),
            holding,
        }
    }
}

/// The five-asset demo portfolio.
pub fn demo_snapshots() -> Vec<HoldingSnapshot> {
    let snap = |name: &str, symbol: &str, quantity, value, pct, asset_type| HoldingSnapshot {
        company_name: name.to_string(),
        symbol: symbol.to_string(),
        quantity,
        current_value: value,
        percentage_change: pct,
        asset_type,
        listing: Listing::default(),
    };
    vec![
        snap("Apple Inc.", "AAPL", 10.0, 1850.0, 23.33, AssetType::Stocks),
        snap("Tesla Inc.", "TSLA", 5.0, 1200.0, -5.12, AssetType::Stocks),
        snap("Vanguard 500", "VOO", 20.0, 9000.0, 18.42, AssetType::MutualFunds),
        snap("Gold ETF", "GLD", 50.0, 10750.0, 26.47, AssetType::Commodities),
        snap("Bitcoin", "BTC", 0.5, 31000.0, 106.67, AssetType::Crypto),
    ]
}
