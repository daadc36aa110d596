//! Domain error types.

/// Top-level error type for folio.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("asset not found with id {id}")]
    HoldingNotFound { id: i64 },

    #[error("asset not found with symbol {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("insufficient balance: have {balance:.2}, need {requested:.2}")]
    InsufficientFunds { balance: f64, requested: f64 },

    #[error("cannot sell more than owned quantity of {symbol}: available {available}, requested {requested}")]
    InsufficientQuantity {
        symbol: String,
        available: f64,
        requested: f64,
    },

    #[error("invalid {field}: {value}")]
    InvalidAmount { field: String, value: String },

    #[error("malformed data: {reason}")]
    DataFormat { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FolioError {
    pub fn invalid(field: &str, value: impl ToString) -> Self {
        FolioError::InvalidAmount {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// True for errors caused by the caller's request rather than the system.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            FolioError::InsufficientFunds { .. }
                | FolioError::InsufficientQuantity { .. }
                | FolioError::InvalidAmount { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FolioError::HoldingNotFound { .. } | FolioError::SymbolNotFound { .. }
        )
    }
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        let code: u8 = match err {
            FolioError::Io(_) => 1,
            FolioError::ConfigParse { .. }
            | FolioError::ConfigMissing { .. }
            | FolioError::ConfigInvalid { .. } => 2,
            FolioError::Database { .. }
            | FolioError::DatabaseQuery { .. }
            | FolioError::DataFormat { .. } => 3,
            FolioError::InsufficientFunds { .. }
            | FolioError::InsufficientQuantity { .. }
            | FolioError::InvalidAmount { .. } => 4,
            FolioError::HoldingNotFound { .. } | FolioError::SymbolNotFound { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
