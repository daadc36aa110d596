//! Asset classes and the normalisation of free-form asset type labels.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AssetType {
    Stocks,
    MutualFunds,
    Crypto,
    Commodities,
    Other(String),
}

impl AssetType {
    /// The standard classes, in breakdown order.
    pub const CANONICAL: [AssetType; 4] = [
        AssetType::Stocks,
        AssetType::MutualFunds,
        AssetType::Crypto,
        AssetType::Commodities,
    ];

    /// Normalise a label. Blank labels count as stocks.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "stock" | "stocks" => AssetType::Stocks,
            "fund" | "mutual fund" | "mutual funds" => AssetType::MutualFunds,
            "crypto" | "cryptocurrency" => AssetType::Crypto,
            "commodity" | "commodities" => AssetType::Commodities,
            _ => AssetType::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AssetType::Stocks => "Stocks",
            AssetType::MutualFunds => "Mutual Funds",
            AssetType::Crypto => "Crypto",
            AssetType::Commodities => "Commodities",
            AssetType::Other(label) => label,
        }
    }

    /// Sort key: canonical classes first, other labels alphabetically after.
    pub fn sort_key(&self) -> (usize, &str) {
        let rank = Self::CANONICAL
            .iter()
            .position(|t| t == self)
            .unwrap_or(Self::CANONICAL.len());
        (rank, self.label())
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl From<String> for AssetType {
    fn from(label: String) -> Self {
        AssetType::parse(&label)
    }
}

impl From<AssetType> for String {
    fn from(asset_type: AssetType) -> Self {
        asset_type.label().to_string()
    }
}
