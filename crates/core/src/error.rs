//! Recoverable errors surfaced by dashboard operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    #[error("invalid index: from={from}, to={to}, len={len}")]
    InvalidIndex { from: usize, to: usize, len: usize },

    #[error("strategy index {index} out of range (len={len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("a strategy request is already in flight")]
    AlreadyInFlight,

    #[error("advisory provider failure: {0}")]
    ProviderFailure(String),

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("portfolio must contain at least one symbol")]
    EmptyPortfolio,
}

pub type Result<T> = std::result::Result<T, DashboardError>;
