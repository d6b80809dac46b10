//! WebSocket infrastructure for real-time order updates
//!
//! This module provides the connection registry, the per-connection session
//! handler, and the queue that carries order events from the HTTP write path
//! to the broadcaster.

mod dispatch;
mod handler;
mod subscription;

pub use dispatch::{spawn_dispatcher, OrderNotifier, DEFAULT_EVENT_QUEUE_CAPACITY};
pub use handler::{WebSocketState, DEFAULT_CLIENT_QUEUE_CAPACITY, DEFAULT_SEND_TIMEOUT};
pub use subscription::{ClientHandle, ClientId, SubscriptionManager};
