//! Portfolio aggregation: totals, allocation, breakdown, performers and the
//! performance curve.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::asset_type::AssetType;
use super::holding::Holding;
use super::price_point::PricePoint;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub user_name: String,
    pub portfolio_value: f64,
    pub total_invested: f64,
    pub total_gain: f64,
    pub gain_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSlice {
    pub asset_type: AssetType,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BreakdownSlice {
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformerEntry {
    pub id: i64,
    pub company_name: String,
    pub symbol: String,
    pub current_value: f64,
    pub percentage_change: f64,
    pub asset_type: AssetType,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performers {
    pub top_performers: Vec<PerformerEntry>,
    pub lowest_performers: Vec<PerformerEntry>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub value: i64,
}

pub fn total_value(holdings: &[Holding]) -> f64 {
    holdings.iter().map(Holding::current_value).sum()
}

pub fn total_invested(holdings: &[Holding]) -> f64 {
    holdings.iter().map(Holding::invested).sum()
}

pub fn summarize(owner: &str, holdings: &[Holding]) -> PortfolioSummary {
    let portfolio_value = total_value(holdings);
    let total_invested = total_invested(holdings);
    let total_gain = portfolio_value - total_invested;
    let gain_percentage = if total_invested > 0.0 {
        total_gain / total_invested * 100.0
    } else {
        0.0
    };
    PortfolioSummary {
        user_name: owner.to_string(),
        portfolio_value,
        total_invested,
        total_gain,
        gain_percentage,
    }
}

fn bucket_by_type(holdings: &[Holding], value: impl Fn(&Holding) -> f64) -> Vec<(AssetType, f64)> {
    let mut buckets: HashMap<AssetType, f64> = HashMap::new();
    for holding in holdings {
        *buckets.entry(holding.asset_type.clone()).or_insert(0.0) += value(holding);
    }
    let mut sorted: Vec<_> = buckets.into_iter().collect();
    sorted.sort_by(|(a, _), (b, _)| a.sort_key().cmp(&b.sort_key()));
    sorted
}

/// Current value per asset class.
pub fn allocation(holdings: &[Holding]) -> Vec<AllocationSlice> {
    bucket_by_type(holdings, Holding::current_value)
        .into_iter()
        .map(|(asset_type, value)| AllocationSlice { asset_type, value })
        .collect()
}

/// Invested value per asset class. Zero buckets are dropped, unless every
/// bucket is zero, in which case the four standard classes are all reported.
pub fn breakdown(holdings: &[Holding]) -> Vec<BreakdownSlice> {
    let slices: Vec<BreakdownSlice> = bucket_by_type(holdings, Holding::invested)
        .into_iter()
        .filter(|(_, value)| *value > 0.0)
        .map(|(asset_type, value)| BreakdownSlice { asset_type, value })
        .collect();

    if slices.is_empty() {
        return AssetType::CANONICAL
            .iter()
            .map(|t| BreakdownSlice {
                asset_type: t.clone(),
                value: 0.0,
            })
            .collect();
    }
    slices
}

/// Best `n` by percentage change, and worst `n` listed worst first.
pub fn performers(holdings: &[Holding], n: usize) -> Performers {
    let mut ranked: Vec<PerformerEntry> = holdings
        .iter()
        .map(|h| PerformerEntry {
            id: h.id,
            company_name: h.company_name.clone(),
            symbol: h.symbol.clone(),
            current_value: h.current_value(),
            percentage_change: h.percentage_change(),
            asset_type: h.asset_type.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| b.percentage_change.total_cmp(&a.percentage_change));

    let top_performers = ranked.iter().take(n).cloned().collect();
    let lowest_performers = ranked.iter().rev().take(n).cloned().collect();
    Performers {
        top_performers,
        lowest_performers,
    }
}

/// Daily portfolio value from each holding's price history.
///
/// Holdings without a history entry are skipped; dates are the union of all
/// histories and each value is rounded to whole currency units.
pub fn performance_curve(
    holdings: &[Holding],
    histories: &HashMap<String, Vec<PricePoint>>,
) -> Vec<PerformancePoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for holding in holdings {
        let Some(history) = histories.get(&holding.symbol) else {
            continue;
        };
        for point in history {
            if let Some(price) = point.valuation_price() {
                *by_date.entry(point.date).or_insert(0.0) += price * holding.quantity;
            }
        }
    }
    by_date
        .into_iter()
        .map(|(date, value)| PerformancePoint {
            date,
            value: value.round() as i64,
        })
        .collect()
}
