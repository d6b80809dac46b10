//! API route definitions

mod health;
mod orders;
pub mod ws;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::AppState;

/// Create all REST routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .merge(orders::routes())
        .merge(health::routes())
}

/// Create WebSocket routes (separate from REST)
pub fn ws_routes() -> Router<AppState> {
    ws::routes()
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Trading API" }))
}
