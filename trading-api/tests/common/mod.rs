#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use trading_api::{app, AppState, ServerConfig};
use trading_services::OrderStorage;

/// A running server on an ephemeral port
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
}

impl TestServer {
    pub async fn start() -> Self {
        let orders = Arc::new(OrderStorage::new_in_memory().unwrap());
        let state = AppState::new(orders, &ServerConfig::default());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let router = app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws/orders", self.addr)
    }
}

/// Poll `condition` until it holds, failing the test after ~2 seconds
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
