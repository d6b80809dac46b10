//! Core types for the trading order service
//!
//! This crate defines the shared data structures used across the service:
//! orders and their lifecycle enums, the real-time wire protocol, and errors.

pub mod error;
pub mod order;
pub mod websocket;

pub use error::{TradingError, TradingResult, ValidationError};
pub use order::{NewOrder, Order, OrderSnapshot, OrderStatus, OrderType, OrderUpdate};
pub use websocket::{ClientMessage, OrderEvent};
