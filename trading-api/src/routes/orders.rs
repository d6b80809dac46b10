//! Order endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use trading_core::{NewOrder, Order, OrderEvent, OrderUpdate};

use crate::{
    error::{parse_body, ApiError},
    AppState,
};

/// Query parameters for listing orders
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Number of orders to skip
    #[serde(default)]
    pub skip: u32,
    /// Maximum number of orders to return
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// Response for listing orders. `count` is the size of this page.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
    pub count: usize,
}

/// Create order routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order).patch(update_order_status))
}

/// Create a new PENDING order and announce it
async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let new_order: NewOrder = parse_body(payload)?;

    let order = state.orders.create(&new_order)?;
    info!("Created order {} ({} {})", order.id, order.symbol, order.order_type);

    state.notifier.notify(OrderEvent::new_order(&order));
    Ok((StatusCode::CREATED, Json(order)))
}

/// List a page of orders
async fn list_orders(
    State(state): State<AppState>,
    params: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let Query(params) = params?;

    let page = state.orders.list(params.skip, params.limit)?;
    let count = page.orders.len();

    Ok(Json(OrdersResponse {
        orders: page.orders,
        count,
    }))
}

/// Fetch a single order
async fn get_order(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.orders.get(id)?))
}

/// Overwrite an order's status and announce the change
async fn update_order_status(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    let update: OrderUpdate = parse_body(payload)?;

    let order = state.orders.update_status(id, update.status)?;
    info!("Order {} status set to {}", order.id, order.status);

    state.notifier.notify(OrderEvent::status_update(&order));
    Ok(Json(order))
}
