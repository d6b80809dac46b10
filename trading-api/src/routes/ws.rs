//! WebSocket route handler
//!
//! Upgrades `/ws/orders` and hands the socket to the shared session handler.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{future, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;
use tracing::info;

use crate::AppState;

/// Create WebSocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws/orders", get(ws_handler))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();

    // Adapt axum frames to the tungstenite frames the session handler speaks
    let receiver = receiver.map(|msg| msg.map(into_tungstenite));
    let sender = Box::pin(sender.with(|msg: tungstenite::Message| {
        future::ready(Ok::<_, axum::Error>(into_axum(msg)))
    }));

    state.ws_state.handle_connection(sender, receiver).await;
}

fn into_tungstenite(msg: Message) -> tungstenite::Message {
    match msg {
        Message::Text(text) => tungstenite::Message::Text(text.to_string().into()),
        Message::Binary(data) => tungstenite::Message::Binary(data.to_vec().into()),
        Message::Ping(data) => tungstenite::Message::Ping(data.to_vec().into()),
        Message::Pong(data) => tungstenite::Message::Pong(data.to_vec().into()),
        Message::Close(_) => tungstenite::Message::Close(None),
    }
}

fn into_axum(msg: tungstenite::Message) -> Message {
    match msg {
        tungstenite::Message::Text(text) => Message::Text(text.to_string().into()),
        tungstenite::Message::Ping(data) => Message::Ping(data.to_vec().into()),
        tungstenite::Message::Pong(data) => Message::Pong(data.to_vec().into()),
        tungstenite::Message::Close(_) => Message::Close(None),
        other => Message::Binary(other.into_data().to_vec().into()),
    }
}
