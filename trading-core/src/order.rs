//! Order data structures

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TradingError, ValidationError};

/// Kind of trading order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Executed immediately at the current market price
    Market,
    /// Executed at the specified price or better
    Limit,
    /// Becomes a market order once a trigger price is reached
    Stop,
    /// Becomes a limit order once a trigger price is reached
    StopLimit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
            OrderType::StopLimit => "STOP_LIMIT",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            "STOP" => Ok(OrderType::Stop),
            "STOP_LIMIT" => Ok(OrderType::StopLimit),
            _ => Err(TradingError::parse(format!("Unknown order type: {}", s))),
        }
    }
}

/// Lifecycle state of an order
///
/// Any status may follow any other; fills are decided outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Submitted but not processed
    #[default]
    Pending,
    /// Completely executed
    Filled,
    /// Partially executed
    PartiallyFilled,
    /// Cancelled by the client
    Cancelled,
    /// Rejected by the venue
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Filled => "FILLED",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "FILLED" => Ok(OrderStatus::Filled),
            "PARTIALLY_FILLED" => Ok(OrderStatus::PartiallyFilled),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "REJECTED" => Ok(OrderStatus::Rejected),
            _ => Err(TradingError::parse(format!("Unknown order status: {}", s))),
        }
    }
}

/// A stored trading order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier
    pub id: i64,

    /// Instrument symbol (e.g. "AAPL")
    pub symbol: String,

    /// Limit/reference price, always positive
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Number of units, always positive
    pub quantity: i64,

    pub order_type: OrderType,

    pub status: OrderStatus,

    /// When the order was created
    pub created_at: DateTime<Utc>,

    /// When the order was last mutated (`None` until the first update)
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Minimal view carried by real-time events
    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            id: self.id,
            symbol: self.symbol.clone(),
            status: self.status,
        }
    }
}

/// Request body for creating an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i64,
    pub order_type: OrderType,
}

impl NewOrder {
    /// Check field constraints, reporting every offending field
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.symbol.trim().is_empty() {
            errors.push(ValidationError::new("symbol", "symbol must not be empty"));
        }
        if self.price <= Decimal::ZERO {
            errors.push(ValidationError::new("price", "ensure this value is greater than 0"));
        }
        if self.quantity <= 0 {
            errors.push(ValidationError::new(
                "quantity",
                "ensure this value is greater than 0",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Request body for updating an order's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: OrderStatus,
}

/// The order fields pushed to real-time listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: i64,
    pub symbol: String,
    pub status: OrderStatus,
}
