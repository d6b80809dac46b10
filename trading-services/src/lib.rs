//! Business logic services for the trading order service
//!
//! This crate provides order persistence and the real-time subscription
//! layer that fans order events out to WebSocket clients.

pub mod order_storage;
pub mod websocket;

pub use order_storage::{OrderPage, OrderStorage, OrderStorageError};
pub use websocket::{
    spawn_dispatcher, ClientHandle, ClientId, OrderNotifier, SubscriptionManager, WebSocketState,
};
