//! Error types for the trading service

use thiserror::Error;

/// A single rejected field in an order request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field (e.g. "price")
    pub field: &'static str,
    /// Human-readable reason
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Service-wide error type
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TradingError {
    pub fn parse(msg: impl Into<String>) -> Self {
        TradingError::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        TradingError::Config(msg.into())
    }
}

/// Result type alias for trading operations
pub type TradingResult<T> = Result<T, TradingError>;
