//! HTTP error responses

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::error;
use trading_services::OrderStorageError;

/// One field-level problem in a rejected request
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Where the problem is, e.g. `["body", "price"]`
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    fn new(loc: &[&str], msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("Order not found")]
    OrderNotFound,

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": errors })))
                    .into_response()
            }
            ApiError::OrderNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "Order not found" })),
            )
                .into_response(),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": message })),
            )
                .into_response(),
        }
    }
}

impl From<OrderStorageError> for ApiError {
    fn from(err: OrderStorageError) -> Self {
        match err {
            OrderStorageError::NotFound(_) => ApiError::OrderNotFound,
            OrderStorageError::Validation(errors) => ApiError::Validation(
                errors
                    .into_iter()
                    .map(|e| FieldError::new(&["body", e.field], e.message, "value_error"))
                    .collect(),
            ),
            other => {
                error!("Order storage failure: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(vec![FieldError::new(
            &["body"],
            rejection.body_text(),
            "json_invalid",
        )])
    }
}

/// Decode a JSON request body into `T`, naming the offending field on failure
///
/// Syntax and content-type problems are reported against the whole body.
pub fn parse_body<T: DeserializeOwned>(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(value) = payload?;
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err.path().to_string();
        let msg = err.inner().to_string();
        // Missing fields surface at the parent; serde names them in the message
        let field = match path.as_str() {
            "." => missing_field(&msg),
            other => Some(other),
        };
        let loc: Vec<&str> = std::iter::once("body").chain(field).collect();
        ApiError::Validation(vec![FieldError::new(&loc, msg.as_str(), "value_error")])
    })
}

fn missing_field(msg: &str) -> Option<&str> {
    msg.strip_prefix("missing field `")?.strip_suffix('`')
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(vec![FieldError::new(
            &["query"],
            rejection.body_text(),
            "query_invalid",
        )])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(vec![FieldError::new(
            &["path", "order_id"],
            rejection.body_text(),
            "int_parsing",
        )])
    }
}
