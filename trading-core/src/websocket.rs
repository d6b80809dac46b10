//! WebSocket message types for real-time order updates
//!
//! These types define the protocol between the server and real-time clients.

use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderSnapshot};

// ============================================================================
// Client -> Server Messages
// ============================================================================

/// Control messages sent from client to server
///
/// Anything that does not parse into one of these is ignored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Add symbols to the connection's interest set
    Subscribe { symbols: Vec<String> },
    /// Remove symbols from the connection's interest set
    Unsubscribe { symbols: Vec<String> },
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

/// Order event pushed to interested clients
///
/// Serialized as `{"type": "NEW_ORDER", "data": {"id", "symbol", "status"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    /// An order was created
    NewOrder(OrderSnapshot),
    /// An order's status was changed
    StatusUpdate(OrderSnapshot),
}

impl OrderEvent {
    pub fn new_order(order: &Order) -> Self {
        OrderEvent::NewOrder(order.snapshot())
    }

    pub fn status_update(order: &Order) -> Self {
        OrderEvent::StatusUpdate(order.snapshot())
    }

    pub fn snapshot(&self) -> &OrderSnapshot {
        match self {
            OrderEvent::NewOrder(snapshot) | OrderEvent::StatusUpdate(snapshot) => snapshot,
        }
    }

    /// Symbol used for subscription filtering
    pub fn symbol(&self) -> &str {
        &self.snapshot().symbol
    }
}
