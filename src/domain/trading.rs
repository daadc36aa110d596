//! Buy/sell planning.
//!
//! Each `plan_*` function is pure: it computes the wallet movement, the new
//! holding state and the transaction record for an order, and leaves applying
//! them atomically to the ledger adapter.

use chrono::NaiveDateTime;

use super::asset_type::AssetType;
use super::error::FolioError;
use super::holding::{Holding, Listing, NewHolding, QUANTITY_EPSILON};
use super::money::validate_amount;
use super::transaction::{NewTransaction, TransactionKind};

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyOrder {
    pub symbol: String,
    pub company_name: String,
    pub quantity: f64,
    pub price: f64,
    pub asset_type: AssetType,
}

impl BuyOrder {
    pub fn validate(&self) -> Result<(), FolioError> {
        if self.symbol.trim().is_empty() {
            return Err(FolioError::invalid("symbol", "<empty>"));
        }
        validate_amount("quantity", self.quantity)?;
        validate_amount("price", self.price)?;
        Ok(())
    }

    pub fn normalized_symbol(&self) -> String {
        self.symbol.trim().to_uppercase()
    }

    pub fn cost(&self) -> f64 {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct SellOrder {
    pub symbol: String,
    pub quantity: f64,
}

impl SellOrder {
    pub fn validate(&self) -> Result<(), FolioError> {
        if self.symbol.trim().is_empty() {
            return Err(FolioError::invalid("symbol", "<empty>"));
        }
        validate_amount("quantity", self.quantity)?;
        Ok(())
    }

    pub fn normalized_symbol(&self) -> String {
        self.symbol.trim().to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyPlan {
    /// Updated or new holding. A new holding carries id 0 until stored.
    pub holding: Holding,
    pub is_new: bool,
    pub cost: f64,
    pub transaction: NewTransaction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellPlan {
    /// `None` when the whole position is sold.
    pub remaining: Option<Holding>,
    pub proceeds: f64,
    pub transaction: NewTransaction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddPlan {
    pub holding: Holding,
    pub cost: f64,
}

/// Buying into an existing position averages the buy price by cost.
pub fn plan_buy(
    existing: Option<&Holding>,
    order: &BuyOrder,
    now: NaiveDateTime,
) -> Result<BuyPlan, FolioError> {
    order.validate()?;
    let symbol = order.normalized_symbol();
    let cost = order.cost();

    let (holding, is_new) = match existing {
        Some(current) => {
            let quantity = current.quantity + order.quantity;
            let total_cost = current.invested() + cost;
            let holding = Holding {
                quantity,
                buy_price: total_cost / quantity,
                buying_value: total_cost,
                current_price: order.price,
                ..current.clone()
            };
            (holding, false)
        }
        None => {
            let holding = Holding {
                id: 0,
                company_name: order.company_name.clone(),
                symbol: symbol.clone(),
                quantity: order.quantity,
                buy_price: order.price,
                current_price: order.price,
                buying_value: cost,
                asset_type: order.asset_type.clone(),
                purchase_date: now.date(),
                listing: Listing::default(),
            };
            (holding, true)
        }
    };

    Ok(BuyPlan {
        holding,
        is_new,
        cost,
        transaction: NewTransaction::new(&symbol, order.quantity, order.price, TransactionKind::Buy, now),
    })
}

/// Sales settle at the holding's current price.
pub fn plan_sell(
    holding: &Holding,
    order: &SellOrder,
    now: NaiveDateTime,
) -> Result<SellPlan, FolioError> {
    order.validate()?;
    if order.quantity > holding.quantity + QUANTITY_EPSILON {
        return Err(FolioError::InsufficientQuantity {
            symbol: holding.symbol.clone(),
            available: holding.quantity,
            requested: order.quantity,
        });
    }

    let proceeds = holding.current_price * order.quantity;
    let remaining_quantity = holding.quantity - order.quantity;
    let remaining = if remaining_quantity.abs() < QUANTITY_EPSILON {
        None
    } else {
        Some(with_quantity(holding, remaining_quantity))
    };

    Ok(SellPlan {
        remaining,
        proceeds,
        transaction: NewTransaction::new(
            &holding.symbol,
            order.quantity,
            holding.current_price,
            TransactionKind::Sell,
            now,
        ),
    })
}

pub fn plan_add(request: NewHolding, now: NaiveDateTime) -> Result<AddPlan, FolioError> {
    request.validate()?;
    let cost = request.cost();
    Ok(AddPlan {
        holding: request.into_holding(0, now.date()),
        cost,
    })
}

/// Re-size a position; its buying value follows the average buy price.
pub fn with_quantity(holding: &Holding, quantity: f64) -> Holding {
    Holding {
        quantity,
        buying_value: holding.buy_price * quantity,
        ..holding.clone()
    }
}
