//! Daily price history records.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Option<f64>,
    /// Net asset value, reported for mutual funds.
    pub nav: Option<f64>,
}

impl PricePoint {
    /// NAV when reported, otherwise close. `None` when neither is present.
    pub fn valuation_price(&self) -> Option<f64> {
        self.nav.or(self.close)
    }
}
