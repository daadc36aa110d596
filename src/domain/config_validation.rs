//! Configuration validation.
//!
//! Validates every config field before the ledger is opened or the server starts.

use std::net::SocketAddr;

use crate::domain::error::FolioError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_INITIAL_BALANCE: f64 = 250_000.0;
pub const DEFAULT_OWNER_NAME: &str = "Alex Johnson";
pub const DEFAULT_PERFORMERS_COUNT: i64 = 3;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Which `LedgerPort` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_storage(config)?;
    validate_initial_balance(config)?;
    validate_performers_count(config)?;
    validate_owner_name(config)?;
    validate_listen(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> FolioError {
    FolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

pub fn storage_backend(config: &dyn ConfigPort) -> Result<StorageBackend, FolioError> {
    match config
        .get_string("storage", "backend")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("") | Some("sqlite") => Ok(StorageBackend::Sqlite),
        Some("memory") => Ok(StorageBackend::Memory),
        Some(_) => Err(invalid("storage", "backend", "backend must be sqlite or memory")),
    }
}

fn validate_storage(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if storage_backend(config)? == StorageBackend::Sqlite {
        let path = config.get_string("sqlite", "path").unwrap_or_default();
        if path.trim().is_empty() {
            return Err(FolioError::ConfigMissing {
                section: "sqlite".to_string(),
                key: "path".to_string(),
            });
        }
        if config.get_int("sqlite", "pool_size", 4) < 1 {
            return Err(invalid("sqlite", "pool_size", "pool_size must be at least 1"));
        }
    }
    Ok(())
}

fn validate_initial_balance(config: &dyn ConfigPort) -> Result<(), FolioError> {
    let value = initial_balance(config);
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(
            "wallet",
            "initial_balance",
            "initial_balance must be non-negative",
        ));
    }
    Ok(())
}

fn validate_performers_count(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if config.get_int("portfolio", "performers_count", DEFAULT_PERFORMERS_COUNT) < 1 {
        return Err(invalid(
            "portfolio",
            "performers_count",
            "performers_count must be at least 1",
        ));
    }
    Ok(())
}

fn validate_owner_name(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(name) = config.get_string("portfolio", "owner_name") {
        if name.trim().is_empty() {
            return Err(invalid("portfolio", "owner_name", "owner_name must not be blank"));
        }
    }
    Ok(())
}

fn validate_listen(config: &dyn ConfigPort) -> Result<(), FolioError> {
    listen_addr(config).map(|_| ())
}

pub fn initial_balance(config: &dyn ConfigPort) -> f64 {
    config.get_double("wallet", "initial_balance", DEFAULT_INITIAL_BALANCE)
}

pub fn owner_name(config: &dyn ConfigPort) -> String {
    config.get_string_or("portfolio", "owner_name", DEFAULT_OWNER_NAME)
}

pub fn performers_count(config: &dyn ConfigPort) -> usize {
    config
        .get_int("portfolio", "performers_count", DEFAULT_PERFORMERS_COUNT)
        .max(1) as usize
}

pub fn listen_addr(config: &dyn ConfigPort) -> Result<SocketAddr, FolioError> {
    config
        .get_string_or("web", "listen", DEFAULT_LISTEN)
        .parse()
        .map_err(|_| invalid("web", "listen", "listen must be an ip:port address"))
}
