//! Subscription manager for WebSocket connections
//!
//! Tracks every live connection together with its symbol-interest set and
//! fans order events out to the connections that asked for them.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use trading_core::OrderEvent;

/// Unique identifier for a WebSocket client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// A connection as seen by the registry: its id and its outbound queue
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: ClientId,
    outbox: mpsc::Sender<OrderEvent>,
}

impl ClientHandle {
    pub fn new(id: ClientId, outbox: mpsc::Sender<OrderEvent>) -> Self {
        Self { id, outbox }
    }
}

/// Registry entry. An empty `symbols` set means "every symbol".
struct Subscriber {
    symbols: HashSet<String>,
    outbox: mpsc::Sender<OrderEvent>,
}

impl Subscriber {
    fn wants(&self, symbol: &str) -> bool {
        self.symbols.is_empty() || self.symbols.contains(symbol)
    }
}

/// Manages subscriptions and message broadcasting
pub struct SubscriptionManager {
    /// Next client ID to assign
    next_client_id: AtomicU64,
    /// Map of client ID -> interest set and outbound queue
    clients: Mutex<HashMap<ClientId, Subscriber>>,
}

impl SubscriptionManager {
    /// Create a new subscription manager
    pub fn new() -> Self {
        Self {
            next_client_id: AtomicU64::new(1),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Generate a new unique client ID
    pub fn new_client_id(&self) -> ClientId {
        ClientId(self.next_client_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Add a connection with an initial interest set (empty = all symbols)
    ///
    /// Registering an id that is already present replaces its entry.
    pub fn register<I, S>(&self, client: &ClientHandle, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols: HashSet<String> = symbols.into_iter().map(Into::into).collect();
        debug!("Client {} registered with {} symbol(s)", client.id, symbols.len());

        self.clients.lock().insert(
            client.id,
            Subscriber {
                symbols,
                outbox: client.outbox.clone(),
            },
        );
    }

    /// Remove a connection. Unknown ids are ignored.
    pub fn unregister(&self, client_id: ClientId) {
        if self.clients.lock().remove(&client_id).is_some() {
            info!("Client {} removed from subscriptions", client_id);
        }
    }

    /// Add symbols to a connection's interest set
    ///
    /// An unknown connection is registered with exactly `symbols`, so it
    /// becomes symbol-filtered rather than receiving everything.
    pub fn subscribe<I, S>(&self, client: &ClientHandle, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut clients = self.clients.lock();
        let entry = clients.entry(client.id).or_insert_with(|| Subscriber {
            symbols: HashSet::new(),
            outbox: client.outbox.clone(),
        });
        entry.symbols.extend(symbols.into_iter().map(Into::into));

        debug!("Client {} subscribed to {:?}", client.id, entry.symbols);
    }

    /// Remove symbols from a connection's interest set
    pub fn unsubscribe<I, S>(&self, client_id: ClientId, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut clients = self.clients.lock();
        if let Some(entry) = clients.get_mut(&client_id) {
            for symbol in symbols {
                entry.symbols.remove(symbol.as_ref());
            }
            debug!("Client {} now subscribed to {:?}", client_id, entry.symbols);
        }
    }

    /// Deliver an event to every interested connection
    ///
    /// Never blocks: a full queue drops the event for that client, a closed
    /// queue unregisters the client.
    pub fn broadcast(&self, event: &OrderEvent) {
        let symbol = event.symbol();
        let mut clients = self.clients.lock();
        let mut closed = Vec::new();
        let mut delivered = 0usize;

        for (client_id, subscriber) in clients.iter() {
            if !subscriber.wants(symbol) {
                continue;
            }

            match subscriber.outbox.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Client {} is lagging, dropped {} update", client_id, symbol);
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("Client {} is gone, dropping from subscriptions", client_id);
                    closed.push(*client_id);
                }
            }
        }

        for client_id in closed {
            clients.remove(&client_id);
        }

        debug!("Broadcast {} update to {} client(s)", symbol, delivered);
    }

    /// Current interest set of a connection, if registered
    pub fn interests(&self, client_id: ClientId) -> Option<HashSet<String>> {
        self.clients
            .lock()
            .get(&client_id)
            .map(|subscriber| subscriber.symbols.clone())
    }

    /// Number of connections an event for `symbol` would reach
    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.clients
            .lock()
            .values()
            .filter(|subscriber| subscriber.wants(symbol))
            .count()
    }

    /// Get total number of connected clients
    pub fn total_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("total_clients", &self.total_clients())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::{OrderSnapshot, OrderStatus};

    fn event(id: i64, symbol: &str) -> OrderEvent {
        OrderEvent::NewOrder(OrderSnapshot {
            id,
            symbol: symbol.to_string(),
            status: OrderStatus::Pending,
        })
    }

    fn client(
        manager: &SubscriptionManager,
        capacity: usize,
    ) -> (ClientHandle, mpsc::Receiver<OrderEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientHandle::new(manager.new_client_id(), tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<OrderEvent>) -> Vec<String> {
        let mut symbols = Vec::new();
        while let Ok(event) = rx.try_recv() {
            symbols.push(event.symbol().to_string());
        }
        symbols
    }

    #[test]
    fn test_empty_interest_set_receives_everything() {
        let manager = SubscriptionManager::new();
        let (handle, mut rx) = client(&manager, 16);
        manager.register(&handle, Vec::<String>::new());

        manager.broadcast(&event(1, "AAPL"));
        manager.broadcast(&event(2, "MSFT"));

        assert_eq!(drain(&mut rx), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_filtered_client_receives_only_its_symbols() {
        let manager = SubscriptionManager::new();
        let (handle, mut rx) = client(&manager, 16);
        manager.register(&handle, ["AAPL"]);

        manager.broadcast(&event(1, "AAPL"));
        manager.broadcast(&event(2, "MSFT"));
        assert_eq!(drain(&mut rx), vec!["AAPL"]);

        manager.subscribe(&handle, ["MSFT"]);
        manager.unsubscribe(handle.id, ["AAPL"]);
        manager.broadcast(&event(3, "AAPL"));
        manager.broadcast(&event(4, "MSFT"));
        assert_eq!(drain(&mut rx), vec!["MSFT"]);
    }

    #[test]
    fn test_unsubscribing_last_symbol_reverts_to_all() {
        let manager = SubscriptionManager::new();
        let (handle, mut rx) = client(&manager, 16);
        manager.register(&handle, ["AAPL"]);

        manager.unsubscribe(handle.id, ["AAPL"]);
        assert_eq!(manager.interests(handle.id), Some(HashSet::new()));

        manager.broadcast(&event(1, "TSLA"));
        assert_eq!(drain(&mut rx), vec!["TSLA"]);
    }

    #[test]
    fn test_subscribe_on_unknown_client_registers_filtered() {
        let manager = SubscriptionManager::new();
        let (handle, mut rx) = client(&manager, 16);

        manager.subscribe(&handle, ["MSFT"]);
        assert_eq!(manager.total_clients(), 1);

        manager.broadcast(&event(1, "AAPL"));
        manager.broadcast(&event(2, "MSFT"));
        assert_eq!(drain(&mut rx), vec!["MSFT"]);
    }

    #[test]
    fn test_unsubscribe_unknown_client_is_noop() {
        let manager = SubscriptionManager::new();
        manager.unsubscribe(ClientId(42), ["AAPL"]);
        assert_eq!(manager.total_clients(), 0);
        assert!(manager.interests(ClientId(42)).is_none());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let manager = SubscriptionManager::new();
        let (handle, mut rx) = client(&manager, 16);
        manager.register(&handle, Vec::<String>::new());

        manager.unregister(handle.id);
        manager.unregister(handle.id);
        manager.unregister(ClientId(999));
        assert_eq!(manager.total_clients(), 0);

        manager.broadcast(&event(1, "AAPL"));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_closed_client_is_unregistered_without_affecting_others() {
        let manager = SubscriptionManager::new();
        let (gone, gone_rx) = client(&manager, 16);
        let (alive, mut alive_rx) = client(&manager, 16);
        manager.register(&gone, Vec::<String>::new());
        manager.register(&alive, Vec::<String>::new());

        drop(gone_rx);
        manager.broadcast(&event(1, "AAPL"));

        assert_eq!(drain(&mut alive_rx), vec!["AAPL"]);
        assert_eq!(manager.total_clients(), 1);
        assert!(manager.interests(gone.id).is_none());
    }

    #[test]
    fn test_lagging_client_drops_events_but_stays_registered() {
        let manager = SubscriptionManager::new();
        let (slow, mut slow_rx) = client(&manager, 1);
        manager.register(&slow, Vec::<String>::new());

        manager.broadcast(&event(1, "AAPL"));
        manager.broadcast(&event(2, "AAPL"));

        assert_eq!(drain(&mut slow_rx).len(), 1);
        assert_eq!(manager.total_clients(), 1);
    }

    #[test]
    fn test_subscriber_count() {
        let manager = SubscriptionManager::new();
        let (all, _all_rx) = client(&manager, 4);
        let (aapl, _aapl_rx) = client(&manager, 4);
        manager.register(&all, Vec::<String>::new());
        manager.register(&aapl, ["AAPL"]);

        assert_eq!(manager.subscriber_count("AAPL"), 2);
        assert_eq!(manager.subscriber_count("MSFT"), 1);
    }
}
