//! Trading order API
//!
//! REST endpoints for creating and querying orders, plus a WebSocket feed
//! that pushes order events to subscribed clients.

pub mod config;
pub mod error;
mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use trading_services::{
    spawn_dispatcher, OrderNotifier, OrderStorage, SubscriptionManager, WebSocketState,
};

pub use config::ServerConfig;
pub use error::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderStorage>,
    pub notifier: OrderNotifier,
    pub ws_state: Arc<WebSocketState>,
}

impl AppState {
    /// Wire the storage to a fresh subscription manager and start the
    /// event dispatcher. Must be called inside a Tokio runtime.
    pub fn new(orders: Arc<OrderStorage>, config: &ServerConfig) -> Self {
        let subscriptions = Arc::new(SubscriptionManager::new());

        let (notifier, event_rx) = OrderNotifier::channel(config.event_queue_capacity);
        spawn_dispatcher(Arc::clone(&subscriptions), event_rx);

        let ws_state = WebSocketState::new(subscriptions)
            .with_client_queue_capacity(config.client_queue_capacity)
            .with_send_timeout(config.send_timeout);

        Self {
            orders,
            notifier,
            ws_state: Arc::new(ws_state),
        }
    }
}

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(routes::api_routes())
        .merge(routes::ws_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
