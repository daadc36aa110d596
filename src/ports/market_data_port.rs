//! Market data access port trait.

use crate::domain::error::FolioError;
use crate::domain::price_point::PricePoint;

pub trait MarketDataPort: Send + Sync {
    /// Daily history in ascending date order. An unknown symbol yields an empty history.
    fn price_history(&self, symbol: &str) -> Result<Vec<PricePoint>, FolioError>;
}
