//! HTTP request handlers for web adapter.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::asset_type::AssetType;
use crate::domain::holding::{Holding, HoldingView, NewHolding};
use crate::domain::money::validate_amount;
use crate::domain::portfolio::{
    self, AllocationSlice, BreakdownSlice, PerformancePoint, Performers, PortfolioSummary,
};
use crate::domain::trading::{BuyOrder, SellOrder};
use crate::domain::transaction::{NewTransaction, Transaction, TransactionKind};
use crate::domain::wallet::WalletSummary;

use super::{AppState, WebError};

type ApiResult<T> = Result<Json<T>, WebError>;

// Extractors are taken as `Result` so malformed input renders through `WebError`.
type QueryInput<T> = Result<Query<T>, QueryRejection>;
type JsonInput<T> = Result<Json<T>, JsonRejection>;
type PathInput<T> = Result<Path<T>, PathRejection>;

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Debug, serde::Deserialize)]
pub struct AmountQuery {
    pub amount: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct QuantityQuery {
    pub quantity: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct PriceQuery {
    pub price: f64,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyQuery {
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub quantity: f64,
    pub price: f64,
    #[serde(default)]
    pub asset_type: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct SellQuery {
    pub symbol: String,
    pub quantity: f64,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub symbol: String,
    pub quantity: f64,
    #[serde(rename = "buyPrice", alias = "price")]
    pub price: f64,
    pub transaction_type: TransactionKind,
    /// Defaults to the time the request is handled.
    #[serde(default, rename = "transactionDate", alias = "timestamp")]
    pub timestamp: Option<RequestTime>,
}

/// A full timestamp, or a bare date taken as midnight.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(untagged)]
pub enum RequestTime {
    At(NaiveDateTime),
    On(NaiveDate),
}

impl RequestTime {
    fn naive(self) -> NaiveDateTime {
        match self {
            RequestTime::At(at) => at,
            RequestTime::On(day) => day.and_time(chrono::NaiveTime::MIN),
        }
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route")
}

// Wallet

pub async fn wallet_balance(State(state): State<Arc<AppState>>) -> ApiResult<f64> {
    Ok(Json(state.ledger.wallet_balance()?))
}

pub async fn wallet_add(
    State(state): State<Arc<AppState>>,
    query: QueryInput<AmountQuery>,
) -> ApiResult<f64> {
    let Query(query) = query?;
    Ok(Json(state.ledger.deposit(query.amount)?))
}

pub async fn wallet_deduct(
    State(state): State<Arc<AppState>>,
    query: QueryInput<AmountQuery>,
) -> ApiResult<f64> {
    let Query(query) = query?;
    Ok(Json(state.ledger.withdraw(query.amount)?))
}

pub async fn wallet_summary(State(state): State<Arc<AppState>>) -> ApiResult<WalletSummary> {
    let cash = state.ledger.wallet_balance()?;
    let invested = portfolio::total_value(&state.ledger.list_holdings()?);
    Ok(Json(WalletSummary::new(cash, invested)))
}

// Holdings

pub async fn list_holdings(State(state): State<Arc<AppState>>) -> ApiResult<Vec<HoldingView>> {
    let holdings = state.ledger.list_holdings()?;
    Ok(Json(holdings.into_iter().map(HoldingView::from).collect()))
}

pub async fn get_holding(
    State(state): State<Arc<AppState>>,
    id: PathInput<i64>,
) -> ApiResult<HoldingView> {
    let Path(id) = id?;
    Ok(Json(state.ledger.get_holding(id)?.into()))
}

pub async fn add_holding(
    State(state): State<Arc<AppState>>,
    request: JsonInput<NewHolding>,
) -> ApiResult<HoldingView> {
    let Json(request) = request?;
    Ok(Json(state.ledger.add_holding(request, now())?.into()))
}

pub async fn remove_holding(
    State(state): State<Arc<AppState>>,
    id: PathInput<i64>,
) -> ApiResult<&'static str> {
    let Path(id) = id?;
    state.ledger.remove_holding(id)?;
    Ok(Json("Asset removed successfully"))
}

pub async fn update_quantity(
    State(state): State<Arc<AppState>>,
    id: PathInput<i64>,
    query: QueryInput<QuantityQuery>,
) -> ApiResult<HoldingView> {
    let Query(query) = query?;
    let Path(id) = id?;
    Ok(Json(state.ledger.update_quantity(id, query.quantity)?.into()))
}

pub async fn profit_loss(State(state): State<Arc<AppState>>, id: PathInput<i64>) -> ApiResult<f64> {
    let Path(id) = id?;
    Ok(Json(state.ledger.get_holding(id)?.profit_loss()))
}

pub async fn profit_loss_percentage(
    State(state): State<Arc<AppState>>,
    id: PathInput<i64>,
) -> ApiResult<f64> {
    let Path(id) = id?;
    Ok(Json(state.ledger.get_holding(id)?.percentage_change()))
}

pub async fn total_value(State(state): State<Arc<AppState>>) -> ApiResult<f64> {
    Ok(Json(portfolio::total_value(&state.ledger.list_holdings()?)))
}

pub async fn update_price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    query: QueryInput<PriceQuery>,
) -> ApiResult<HoldingView> {
    let Query(query) = query?;
    Ok(Json(
        state
            .ledger
            .update_current_price(&symbol, query.price)?
            .into(),
    ))
}

pub async fn buy(
    State(state): State<Arc<AppState>>,
    query: QueryInput<BuyQuery>,
) -> ApiResult<HoldingView> {
    let Query(query) = query?;
    let symbol = query.symbol.trim().to_uppercase();
    let order = BuyOrder {
        company_name: query
            .company_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| symbol.clone()),
        symbol,
        quantity: query.quantity,
        price: query.price,
        asset_type: AssetType::parse(query.asset_type.as_deref().unwrap_or_default()),
    };
    Ok(Json(state.ledger.buy(&order, now())?.into()))
}

pub async fn sell(
    State(state): State<Arc<AppState>>,
    query: QueryInput<SellQuery>,
) -> ApiResult<Option<HoldingView>> {
    let Query(query) = query?;
    let order = SellOrder {
        symbol: query.symbol,
        quantity: query.quantity,
    };
    Ok(Json(state.ledger.sell(&order, now())?.map(HoldingView::from)))
}

// Portfolio analytics

pub async fn portfolio_summary(State(state): State<Arc<AppState>>) -> ApiResult<PortfolioSummary> {
    let holdings = state.ledger.list_holdings()?;
    Ok(Json(portfolio::summarize(&state.owner_name, &holdings)))
}

pub async fn portfolio_performance(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<PerformancePoint>> {
    let Some(market_data) = &state.market_data else {
        debug!("no market data configured; empty performance curve");
        return Ok(Json(Vec::new()));
    };

    let holdings = state.ledger.list_holdings()?;
    let mut histories = HashMap::new();
    for holding in &holdings {
        match market_data.price_history(&holding.symbol) {
            Ok(history) if !history.is_empty() => {
                histories.insert(holding.symbol.clone(), history);
            }
            Ok(_) => debug!(symbol = %holding.symbol, "no price history"),
            Err(e) => warn!(symbol = %holding.symbol, error = %e, "skipping unreadable price history"),
        }
    }
    Ok(Json(portfolio::performance_curve(&holdings, &histories)))
}

pub async fn portfolio_allocation(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<AllocationSlice>> {
    Ok(Json(portfolio::allocation(&state.ledger.list_holdings()?)))
}

pub async fn portfolio_breakdown(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<BreakdownSlice>> {
    Ok(Json(portfolio::breakdown(&state.ledger.list_holdings()?)))
}

pub async fn portfolio_performers(State(state): State<Arc<AppState>>) -> ApiResult<Performers> {
    let holdings: Vec<Holding> = state.ledger.list_holdings()?;
    Ok(Json(portfolio::performers(&holdings, state.performers_count)))
}

// Transactions

pub async fn add_transaction(
    State(state): State<Arc<AppState>>,
    request: JsonInput<TransactionRequest>,
) -> ApiResult<Transaction> {
    let Json(request) = request?;
    if request.symbol.trim().is_empty() {
        return Err(WebError::bad_request("symbol must not be empty"));
    }
    validate_amount("quantity", request.quantity)?;
    validate_amount("price", request.price)?;

    let transaction = NewTransaction::new(
        &request.symbol,
        request.quantity,
        request.price,
        request.transaction_type,
        request.timestamp.map_or_else(now, RequestTime::naive),
    );
    Ok(Json(state.ledger.append_transaction(transaction)?))
}

pub async fn list_transactions(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Transaction>> {
    Ok(Json(state.ledger.list_transactions()?))
}

pub async fn transactions_for_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Vec<Transaction>> {
    Ok(Json(state.ledger.transactions_for_symbol(&symbol)?))
}
