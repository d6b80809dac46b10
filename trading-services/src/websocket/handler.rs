//! WebSocket connection handler
//!
//! Handles individual WebSocket connections: registers the session, applies
//! subscribe/unsubscribe control messages, and writes order events out.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use trading_core::{ClientMessage, OrderEvent};

use super::subscription::{ClientHandle, ClientId, SubscriptionManager};

/// Default capacity of each client's outbound queue
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 100;

/// Default bound on a single socket write
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for WebSocket handlers
#[derive(Clone)]
pub struct WebSocketState {
    /// Subscription manager
    pub subscriptions: Arc<SubscriptionManager>,
    client_queue_capacity: usize,
    send_timeout: Duration,
}

impl WebSocketState {
    /// Create new WebSocket state around a shared subscription manager
    pub fn new(subscriptions: Arc<SubscriptionManager>) -> Self {
        Self {
            subscriptions,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_client_queue_capacity(mut self, capacity: usize) -> Self {
        self.client_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Handle a new WebSocket connection until it closes
    ///
    /// The session is registered with no symbol filter. It is unregistered
    /// when the peer closes, the stream errors, or a write fails or times out.
    pub async fn handle_connection<Tx, Rx, E>(&self, ws_sender: Tx, mut ws_receiver: Rx)
    where
        Tx: Sink<Message> + Unpin + Send + 'static,
        Tx::Error: Display + Send,
        Rx: Stream<Item = Result<Message, E>> + Unpin + Send,
        E: Display + Send,
    {
        let client_id = self.subscriptions.new_client_id();
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<OrderEvent>(self.client_queue_capacity);
        let client = ClientHandle::new(client_id, outgoing_tx);

        self.subscriptions.register(&client, HashSet::<String>::new());
        info!("New WebSocket connection: {}", client_id);

        // Task: Send outgoing events to WebSocket
        let mut send_task = tokio::spawn(forward_events(
            client_id,
            outgoing_rx,
            ws_sender,
            self.send_timeout,
        ));

        // Receive and process incoming messages
        let subscriptions = Arc::clone(&self.subscriptions);
        let recv_loop = async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(Message::Close(_)) => {
                        debug!("Received close from {}", client_id);
                        break;
                    }
                    Ok(msg) => Self::handle_message(&client, msg, &subscriptions),
                    Err(e) => {
                        debug!("WebSocket error for {}: {}", client_id, e);
                        break;
                    }
                }
            }
        };

        // Wait for either side to finish (connection closed)
        tokio::select! {
            _ = &mut send_task => {}
            _ = recv_loop => {}
        }
        send_task.abort();

        self.subscriptions.unregister(client_id);
        info!("WebSocket connection closed: {}", client_id);
    }

    /// Apply a single inbound frame. Malformed input is ignored.
    fn handle_message(client: &ClientHandle, msg: Message, subscriptions: &SubscriptionManager) {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Subscribe { symbols }) => {
                    subscriptions.subscribe(client, symbols);
                }
                Ok(ClientMessage::Unsubscribe { symbols }) => {
                    subscriptions.unsubscribe(client.id, symbols);
                }
                Err(e) => {
                    debug!("Ignoring message from {}: {}", client.id, e);
                }
            },
            Message::Binary(_) => {
                debug!("Ignoring binary message from {}", client.id);
            }
            // Ping/pong are answered by the transport
            _ => {}
        }
    }
}

/// Drain a client's queue into its socket, one bounded write per event
async fn forward_events<Tx>(
    client_id: ClientId,
    mut outgoing_rx: mpsc::Receiver<OrderEvent>,
    mut ws_sender: Tx,
    send_timeout: Duration,
) where
    Tx: Sink<Message> + Unpin,
    Tx::Error: Display + Send,
{
    while let Some(event) = outgoing_rx.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(j) => j,
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                continue;
            }
        };

        match tokio::time::timeout(send_timeout, ws_sender.send(Message::Text(json.into()))).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Failed to send to {}: {}", client_id, e);
                break;
            }
            Err(_) => {
                warn!("Send to {} timed out after {:?}", client_id, send_timeout);
                break;
            }
        }
    }
}

impl std::fmt::Debug for WebSocketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketState")
            .field("subscriptions", &self.subscriptions)
            .field("client_queue_capacity", &self.client_queue_capacity)
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::{unbounded, UnboundedSender};
    use trading_core::{OrderSnapshot, OrderStatus};

    type Inbound = Result<Message, std::io::Error>;

    fn event(id: i64, symbol: &str) -> OrderEvent {
        OrderEvent::NewOrder(OrderSnapshot {
            id,
            symbol: symbol.to_string(),
            status: OrderStatus::Pending,
        })
    }

    fn text(raw: &str) -> Inbound {
        Ok(Message::Text(raw.to_string().into()))
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    /// Start a session over in-memory channels
    fn start_session(
        state: &WebSocketState,
    ) -> (
        UnboundedSender<Inbound>,
        futures::channel::mpsc::UnboundedReceiver<Message>,
        tokio::task::JoinHandle<()>,
    ) {
        let (inbound_tx, inbound_rx) = unbounded::<Inbound>();
        let (outbound_tx, outbound_rx) = unbounded::<Message>();
        let state = state.clone();
        let session = tokio::spawn(async move {
            state.handle_connection(outbound_tx, inbound_rx).await;
        });
        (inbound_tx, outbound_rx, session)
    }

    #[tokio::test]
    async fn test_session_registers_unfiltered_and_applies_subscriptions() {
        let state = WebSocketState::new(Arc::new(SubscriptionManager::new()));
        let subscriptions = Arc::clone(&state.subscriptions);
        let (inbound, mut outbound, session) = start_session(&state);

        wait_for(|| subscriptions.total_clients() == 1).await;
        assert_eq!(subscriptions.subscriber_count("ANY"), 1);

        inbound
            .unbounded_send(text(r#"{"action":"subscribe","symbols":["MSFT"]}"#))
            .unwrap();
        wait_for(|| subscriptions.subscriber_count("AAPL") == 0).await;

        subscriptions.broadcast(&event(1, "AAPL"));
        subscriptions.broadcast(&event(2, "MSFT"));

        let msg = outbound.next().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        assert_eq!(value["type"], "NEW_ORDER");
        assert_eq!(value["data"]["symbol"], "MSFT");
        assert_eq!(value["data"]["id"], 2);

        drop(inbound);
        session.await.unwrap();
        assert_eq!(subscriptions.total_clients(), 0);
    }

    #[tokio::test]
    async fn test_malformed_messages_are_ignored() {
        let state = WebSocketState::new(Arc::new(SubscriptionManager::new()));
        let subscriptions = Arc::clone(&state.subscriptions);
        let (inbound, _outbound, session) = start_session(&state);

        for raw in [
            "not json",
            r#"{"action":"dance"}"#,
            r#"{"action":"subscribe"}"#,
            r#"{"symbols":["AAPL"]}"#,
        ] {
            inbound.unbounded_send(text(raw)).unwrap();
        }
        inbound
            .unbounded_send(Ok(Message::Binary(vec![1u8, 2, 3].into())))
            .unwrap();
        inbound
            .unbounded_send(text(r#"{"action":"subscribe","symbols":["TSLA"]}"#))
            .unwrap();

        // Still connected, and the valid message after the junk was applied
        wait_for(|| subscriptions.subscriber_count("AAPL") == 0).await;
        assert_eq!(subscriptions.total_clients(), 1);
        assert_eq!(subscriptions.subscriber_count("TSLA"), 1);

        inbound.unbounded_send(Ok(Message::Close(None))).unwrap();
        session.await.unwrap();
        assert_eq!(subscriptions.total_clients(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_unregisters() {
        let state = WebSocketState::new(Arc::new(SubscriptionManager::new()));
        let subscriptions = Arc::clone(&state.subscriptions);
        let (inbound, _outbound, session) = start_session(&state);

        wait_for(|| subscriptions.total_clients() == 1).await;
        inbound
            .unbounded_send(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            )))
            .unwrap();

        session.await.unwrap();
        assert_eq!(subscriptions.total_clients(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_ends_session() {
        let state = WebSocketState::new(Arc::new(SubscriptionManager::new()));
        let subscriptions = Arc::clone(&state.subscriptions);
        let (inbound, outbound, session) = start_session(&state);

        wait_for(|| subscriptions.total_clients() == 1).await;
        drop(outbound);
        subscriptions.broadcast(&event(1, "AAPL"));

        session.await.unwrap();
        assert_eq!(subscriptions.total_clients(), 0);
        drop(inbound);
    }

    #[tokio::test]
    async fn test_stalled_write_times_out_and_ends_session() {
        let state = WebSocketState::new(Arc::new(SubscriptionManager::new()))
            .with_send_timeout(Duration::from_millis(50));
        let subscriptions = Arc::clone(&state.subscriptions);

        // A socket whose writes never complete
        let stalled = Box::pin(futures::sink::unfold((), |_, _msg: Message| {
            futures::future::pending::<Result<(), std::io::Error>>()
        }));
        let (inbound, inbound_rx) = unbounded::<Inbound>();
        let session_state = state.clone();
        let session = tokio::spawn(async move {
            session_state.handle_connection(stalled, inbound_rx).await;
        });

        wait_for(|| subscriptions.total_clients() == 1).await;
        subscriptions.broadcast(&event(1, "AAPL"));

        // The peer is still connected; only the write timeout can end the session
        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session should end after the write times out")
            .unwrap();
        assert_eq!(subscriptions.total_clients(), 0);
        drop(inbound);
    }
}
