//! Web server adapter.
//!
//! JSON API over the ledger: wallet, holdings, portfolio analytics and the
//! transaction log.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::ports::ledger_port::LedgerPort;
use crate::ports::market_data_port::MarketDataPort;

pub struct AppState {
    pub ledger: Arc<dyn LedgerPort>,
    /// Price history for the performance curve; `None` serves an empty curve.
    pub market_data: Option<Arc<dyn MarketDataPort>>,
    pub owner_name: String,
    pub performers_count: usize,
}

pub fn build_router(state: AppState) -> Router {
    let wallet = Router::new()
        .route("/balance", get(handlers::wallet_balance))
        .route("/add", post(handlers::wallet_add))
        .route("/deduct", post(handlers::wallet_deduct))
        .route("/summary", get(handlers::wallet_summary));

    let pms = Router::new()
        .route("/all", get(handlers::list_holdings))
        .route("/add", post(handlers::add_holding))
        .route("/remove/{id}", delete(handlers::remove_holding))
        .route("/update-quantity/{id}", put(handlers::update_quantity))
        .route("/pl/{id}", get(handlers::profit_loss))
        .route("/pl-percentage/{id}", get(handlers::profit_loss_percentage))
        .route("/total-value", get(handlers::total_value))
        .route("/update-price/{symbol}", put(handlers::update_price))
        .route("/buy", post(handlers::buy))
        .route("/sell", post(handlers::sell))
        .route("/{id}", get(handlers::get_holding));

    let portfolio = Router::new()
        .route("/summary", get(handlers::portfolio_summary))
        .route("/performance", get(handlers::portfolio_performance))
        .route("/allocation", get(handlers::portfolio_allocation))
        .route("/breakdown", get(handlers::portfolio_breakdown))
        .route("/performers", get(handlers::portfolio_performers));

    let transactions = Router::new()
        .route("/add", post(handlers::add_transaction))
        .route("/all", get(handlers::list_transactions))
        .route("/symbol/{symbol}", get(handlers::transactions_for_symbol));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/dashboard/wallet-summary", get(handlers::wallet_summary))
        .nest("/wallet", wallet)
        .nest("/api/pms", pms)
        .nest("/api/portfolio", portfolio)
        .nest("/transactions", transactions)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}
