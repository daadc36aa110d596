//! folio: portfolio dashboard backend: wallet ledger, holdings, portfolio
//! analytics and a transaction log.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
