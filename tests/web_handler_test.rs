#![cfg(feature = "web")]
//! Web handler integration tests.
//!
//! Tests cover:
//! - Wallet balance, deposit, withdrawal and summary endpoints
//! - Holding CRUD, buy/sell and price updates under /api/pms
//! - Portfolio analytics under /api/portfolio
//! - Transaction log endpoints
//! - Error responses: status codes and `{"error": ...}` bodies

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use folio::adapters::memory_adapter::MemoryLedger;
use folio::adapters::web::{AppState, build_router};
use folio::ports::ledger_port::LedgerPort;
use folio::ports::market_data_port::MarketDataPort;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use common::*;

fn create_test_app_with(
    ledger: Arc<MemoryLedger>,
    market_data: Option<Arc<dyn MarketDataPort>>,
) -> Router {
    let state = AppState {
        ledger,
        market_data,
        owner_name: "Test Owner".to_string(),
        performers_count: 2,
    };
    build_router(state)
}

fn create_test_app() -> (Router, Arc<MemoryLedger>) {
    let ledger = Arc::new(MemoryLedger::new(10_000.0));
    (create_test_app_with(ledger.clone(), None), ledger)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = create_test_app();
        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (app, _) = create_test_app();
        let (status, body) = get(&app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }
}

mod wallet_tests {
    use super::*;

    #[tokio::test]
    async fn balance_add_and_deduct() {
        let (app, _) = create_test_app();

        let (status, body) = get(&app, "/wallet/balance").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(10000.0));

        let (status, body) = send(&app, "POST", "/wallet/add?amount=500", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(10500.0));

        let (status, body) = send(&app, "POST", "/wallet/deduct?amount=1500", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(9000.0));
    }

    #[tokio::test]
    async fn overdraw_is_rejected_with_message() {
        let (app, ledger) = create_test_app();
        let (status, body) = send(&app, "POST", "/wallet/deduct?amount=20000", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "insufficient balance: have 10000.00, need 20000.00"
        );
        assert_eq!(ledger.wallet_balance().unwrap(), 10_000.0);
    }

    #[tokio::test]
    async fn non_numeric_amount_is_json_400() {
        let (app, ledger) = create_test_app();
        let (status, body) = send(&app, "POST", "/wallet/add?amount=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("amount"));

        let (status, body) = send(&app, "POST", "/wallet/deduct", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(ledger.wallet_balance().unwrap(), 10_000.0);
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let (app, _) = create_test_app();
        let (status, body) = send(&app, "POST", "/wallet/add?amount=-5", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("amount"));
    }

    #[tokio::test]
    async fn summary_splits_cash_and_holdings() {
        let (app, ledger) = create_test_app();
        ledger.buy(&buy_order("AAPL", 10.0, 150.0), at(1, 9)).unwrap();

        for uri in ["/wallet/summary", "/dashboard/wallet-summary"] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body,
                json!({
                    "totalBalance": 10000.0,
                    "totalUsed": 1500.0,
                    "availableBalance": 8500.0
                })
            );
        }
    }
}

mod holding_tests {
    use super::*;

    #[tokio::test]
    async fn buy_creates_holding_with_derived_fields() {
        let (app, ledger) = create_test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/pms/buy?symbol=aapl&companyName=Apple%20Inc.&quantity=10&price=150&assetType=stock",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "AAPL");
        assert_eq!(body["companyName"], "Apple Inc.");
        assert_eq!(body["assetType"], "Stocks");
        assert_eq!(body["currentValue"], json!(1500.0));
        assert_eq!(body["unitPrice"], json!(150.0));
        assert_eq!(ledger.wallet_balance().unwrap(), 8_500.0);
    }

    #[tokio::test]
    async fn buy_beyond_balance_is_rejected() {
        let (app, ledger) = create_test_app();
        let (status, _) = send(&app, "POST", "/api/pms/buy?symbol=AAPL&quantity=100&price=150", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(ledger.list_holdings().unwrap().is_empty());
        assert!(ledger.list_transactions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_and_get_by_id() {
        let (app, ledger) = create_test_app();
        let h = ledger.buy(&buy_order("TSLA", 2.0, 200.0), at(1, 9)).unwrap();

        let (status, body) = get(&app, "/api/pms/all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = get(&app, &format!("/api/pms/{}", h.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "TSLA");

        let (status, body) = get(&app, "/api/pms/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "asset not found with id 999");
    }

    #[tokio::test]
    async fn price_update_drives_profit_loss() {
        let (app, ledger) = create_test_app();
        let h = ledger.buy(&buy_order("VOO", 4.0, 100.0), at(1, 9)).unwrap();

        let (status, body) = send(&app, "PUT", "/api/pms/update-price/voo?price=125", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currentPrice"], json!(125.0));

        let (_, pl) = get(&app, &format!("/api/pms/pl/{}", h.id)).await;
        assert_eq!(pl, json!(100.0));
        let (_, pct) = get(&app, &format!("/api/pms/pl-percentage/{}", h.id)).await;
        assert_eq!(pct, json!(25.0));
        let (_, total) = get(&app, "/api/pms/total-value").await;
        assert_eq!(total, json!(500.0));
    }

    #[tokio::test]
    async fn price_update_for_unknown_symbol_is_404() {
        let (app, _) = create_test_app();
        let (status, _) = send(&app, "PUT", "/api/pms/update-price/XYZ?price=1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sell_partial_then_all() {
        let (app, ledger) = create_test_app();
        ledger.buy(&buy_order("GLD", 10.0, 100.0), at(1, 9)).unwrap();

        let (status, body) = send(&app, "POST", "/api/pms/sell?symbol=GLD&quantity=4", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], json!(6.0));

        let (status, body) = send(&app, "POST", "/api/pms/sell?symbol=GLD&quantity=6", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
        assert_eq!(ledger.wallet_balance().unwrap(), 10_000.0);
    }

    #[tokio::test]
    async fn selling_unknown_symbol_is_404() {
        let (app, _) = create_test_app();
        let (status, body) = send(&app, "POST", "/api/pms/sell?symbol=GLD&quantity=1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("GLD"));
    }

    #[tokio::test]
    async fn incomplete_add_and_bad_id_are_json_400() {
        let (app, ledger) = create_test_app();
        let (status, body) = send(&app, "POST", "/api/pms/add", Some(json!({ "symbol": "A" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("missing field"));

        let (status, body) = get(&app, "/api/pms/pl/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(ledger.list_holdings().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversell_is_rejected() {
        let (app, ledger) = create_test_app();
        ledger.buy(&buy_order("GLD", 1.0, 100.0), at(1, 9)).unwrap();
        let (status, body) = send(&app, "POST", "/api/pms/sell?symbol=GLD&quantity=2", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("cannot sell more"));
        assert_eq!(ledger.find_holding("GLD").unwrap().unwrap().quantity, 1.0);
    }

    #[tokio::test]
    async fn add_update_quantity_and_remove() {
        let (app, ledger) = create_test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/pms/add",
            Some(json!({
                "companyName": "Bitcoin",
                "symbol": "btc",
                "quantity": 0.5,
                "buyPrice": 40000.0,
                "assetType": "Cryptocurrency"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = send(
            &app,
            "POST",
            "/api/pms/add",
            Some(json!({
                "companyName": "Bitcoin",
                "symbol": "btc",
                "quantity": 0.25,
                "buyPrice": 16000.0,
                "assetType": "Cryptocurrency"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["assetType"], "Crypto");
        assert_eq!(created["symbol"], "BTC");
        assert_eq!(ledger.wallet_balance().unwrap(), 6_000.0);
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(&app, "PUT", &format!("/api/pms/update-quantity/{id}?quantity=0.5"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], json!(0.5));

        let (status, body) = send(&app, "DELETE", &format!("/api/pms/remove/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("Asset removed successfully"));
        assert!(ledger.list_holdings().unwrap().is_empty());
        assert_eq!(ledger.wallet_balance().unwrap(), 6_000.0);

        let (status, _) = send(&app, "DELETE", &format!("/api/pms/remove/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod portfolio_tests {
    use super::*;

    fn seeded() -> (Router, Arc<MemoryLedger>) {
        let (app, ledger) = create_test_app();
        ledger.buy(&buy_order("AAPL", 10.0, 100.0), at(1, 9)).unwrap();
        ledger.buy(&buy_order("TSLA", 5.0, 200.0), at(1, 10)).unwrap();
        ledger.update_current_price("AAPL", 120.0).unwrap();
        ledger.update_current_price("TSLA", 180.0).unwrap();
        (app, ledger)
    }

    #[tokio::test]
    async fn summary_uses_owner_and_totals() {
        let (app, _) = seeded();
        let (status, body) = get(&app, "/api/portfolio/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userName"], "Test Owner");
        assert_eq!(body["portfolioValue"], json!(2100.0));
        assert_eq!(body["totalInvested"], json!(2000.0));
        assert_eq!(body["totalGain"], json!(100.0));
        assert_eq!(body["gainPercentage"], json!(5.0));
    }

    #[tokio::test]
    async fn allocation_and_breakdown() {
        let (app, _) = seeded();
        let (_, allocation) = get(&app, "/api/portfolio/allocation").await;
        assert_eq!(allocation, json!([{ "assetType": "Stocks", "value": 2100.0 }]));

        let (_, breakdown) = get(&app, "/api/portfolio/breakdown").await;
        assert_eq!(breakdown, json!([{ "type": "Stocks", "value": 2000.0 }]));
    }

    #[tokio::test]
    async fn empty_breakdown_lists_standard_classes() {
        let (app, _) = create_test_app();
        let (_, breakdown) = get(&app, "/api/portfolio/breakdown").await;
        let types: Vec<_> = breakdown
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(types, ["Stocks", "Mutual Funds", "Crypto", "Commodities"]);
    }

    #[tokio::test]
    async fn performers_respect_configured_count() {
        let (app, ledger) = seeded();
        ledger.buy(&buy_order("VOO", 1.0, 100.0), at(1, 11)).unwrap();

        let (status, body) = get(&app, "/api/portfolio/performers").await;
        assert_eq!(status, StatusCode::OK);
        let top = body["topPerformers"].as_array().unwrap();
        let low = body["lowestPerformers"].as_array().unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0]["symbol"], "AAPL");
        assert_eq!(low[0]["symbol"], "TSLA");
    }

    #[tokio::test]
    async fn performance_without_market_data_is_empty() {
        let (app, _) = seeded();
        let (status, body) = get(&app, "/api/portfolio/performance").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn performance_sums_available_histories() {
        let ledger = Arc::new(MemoryLedger::new(10_000.0));
        ledger.buy(&buy_order("AAPL", 2.0, 100.0), at(1, 9)).unwrap();
        ledger.buy(&buy_order("TSLA", 1.0, 50.0), at(1, 9)).unwrap();
        let market = MockMarketData::new()
            .with_closes("AAPL", &[("2025-01-02", 100.0), ("2025-01-03", 110.4)])
            .with_error("TSLA", "corrupt file");
        let market: Arc<dyn MarketDataPort> = Arc::new(market);
        let app = create_test_app_with(ledger, Some(market));

        let (status, body) = get(&app, "/api/portfolio/performance").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "date": "2025-01-02", "value": 200 },
                { "date": "2025-01-03", "value": 221 }
            ])
        );
    }
}

mod transaction_tests {
    use super::*;

    #[tokio::test]
    async fn trades_are_logged_newest_first() {
        let (app, ledger) = create_test_app();
        ledger.buy(&buy_order("AAPL", 1.0, 100.0), at(1, 9)).unwrap();
        ledger.sell(&sell_order("AAPL", 1.0), at(2, 9)).unwrap();

        let (status, body) = get(&app, "/transactions/all").await;
        assert_eq!(status, StatusCode::OK);
        let kinds: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["transactionType"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(kinds, ["SELL", "BUY"]);
        assert_eq!(body[0]["transactionDate"], "2025-03-02T09:00:00");
        assert_eq!(body[0]["buyPrice"], json!(100.0));
    }

    #[tokio::test]
    async fn add_and_filter_by_symbol() {
        let (app, _) = create_test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/transactions/add",
            Some(json!({
                "symbol": "msft",
                "quantity": 3.0,
                "price": 10.5,
                "transactionType": "BUY",
                "timestamp": "2025-03-01T09:00:00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "MSFT");
        assert!(body["transactionId"].as_i64().unwrap() > 0);

        let (_, filtered) = get(&app, "/transactions/symbol/msft").await;
        assert_eq!(filtered.as_array().unwrap().len(), 1);
        let (_, other) = get(&app, "/transactions/symbol/AAPL").await;
        assert_eq!(other, json!([]));
    }

    #[tokio::test]
    async fn add_accepts_dashboard_body_shape() {
        let (app, _) = create_test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/transactions/add",
            Some(json!({
                "symbol": "AAPL",
                "quantity": 2,
                "buyPrice": 150.0,
                "transactionDate": "2025-01-02",
                "transactionType": "buy"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["buyPrice"], json!(150.0));
        assert_eq!(body["transactionType"], "BUY");
        assert_eq!(body["transactionDate"], "2025-01-02T00:00:00");
    }

    #[tokio::test]
    async fn added_transaction_matches_listed_record() {
        let (app, _) = create_test_app();
        let (status, created) = send(
            &app,
            "POST",
            "/transactions/add",
            Some(json!({
                "symbol": "VOO",
                "quantity": 1.0,
                "buyPrice": 400.0,
                "transactionType": "SELL"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, listed) = get(&app, "/transactions/all").await;
        assert_eq!(listed, json!([created]));
    }

    #[tokio::test]
    async fn malformed_body_is_json_400() {
        let (app, _) = create_test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/transactions/add",
            Some(json!({ "symbol": "AAPL", "transactionType": "HOLD" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn add_rejects_zero_quantity() {
        let (app, _) = create_test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/transactions/add",
            Some(json!({
                "symbol": "MSFT",
                "quantity": 0.0,
                "price": 10.5,
                "transactionType": "SELL"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
