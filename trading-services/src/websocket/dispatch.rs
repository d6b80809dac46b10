//! Post-commit order notifications
//!
//! HTTP handlers push events through an [`OrderNotifier`] after the write has
//! been persisted; a single dispatch task drains the queue into the
//! [`SubscriptionManager`] so fan-out never delays the HTTP response.

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trading_core::OrderEvent;

use super::subscription::SubscriptionManager;

/// Default capacity of the event queue between handlers and the dispatcher
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;

/// Cloneable, non-blocking handle for publishing order events
#[derive(Debug, Clone)]
pub struct OrderNotifier {
    tx: mpsc::Sender<OrderEvent>,
}

impl OrderNotifier {
    /// Create a notifier and the receiving end for [`spawn_dispatcher`]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OrderEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue an event without waiting. Dropped with a warning if the
    /// queue is full or the dispatcher has stopped.
    pub fn notify(&self, event: OrderEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Event queue full, dropping update for order {}",
                    event.snapshot().id
                );
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    "Dispatcher stopped, dropping update for order {}",
                    event.snapshot().id
                );
            }
        }
    }
}

/// Spawn the loop that hands queued events to the subscription manager
///
/// Runs until every [`OrderNotifier`] has been dropped.
pub fn spawn_dispatcher(
    subscriptions: Arc<SubscriptionManager>,
    mut rx: mpsc::Receiver<OrderEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Order event dispatcher started");
        while let Some(event) = rx.recv().await {
            debug!("Dispatching {:?}", event);
            subscriptions.broadcast(&event);
        }
        info!("Order event dispatcher stopped");
    })
}
