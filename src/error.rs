use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::route::RouteError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

/// Per-opportunity engine errors.
///
/// Every variant is contained to the opportunity that produced it; none of
/// these abort a batch or the scan loop. `DataUnavailable`, `RouteInfeasible`,
/// and `AdmissionRejected` are expected outcomes, not operational faults.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("price data unavailable for {pair}: {reason}")]
    DataUnavailable { pair: String, reason: String },

    #[error("flash loan quote failed from {provider}: {reason}")]
    QuoteFailed { provider: String, reason: String },

    #[error("cannot allocate {requested} under slippage cap {max_slippage}")]
    RouteInfeasible {
        requested: Decimal,
        max_slippage: Decimal,
    },

    #[error("admission rejected: {reason}")]
    AdmissionRejected { reason: String },

    #[error("execution deadline exceeded after {elapsed_ms}ms")]
    ExecutionTimeout { elapsed_ms: u64 },

    #[error("execution failed: {reason}")]
    ExecutionFailed { reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("all price feeds unreachable: {0}")]
    FeedsUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
