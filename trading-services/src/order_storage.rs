//! Order Storage Service
//!
//! SQLite-based persistence for trading orders.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use trading_core::{NewOrder, Order, OrderStatus, OrderType, ValidationError};

const ORDER_COLUMNS: &str =
    "id, symbol, price, quantity, order_type, status, created_at, updated_at";

/// One page of orders plus the number of orders in the store
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: usize,
}

/// Order storage service using SQLite
pub struct OrderStorage {
    conn: Mutex<Connection>,
}

impl OrderStorage {
    /// Create a new OrderStorage instance
    ///
    /// Creates the database file and tables if they don't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, OrderStorageError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OrderStorageError::Io(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory OrderStorage (useful for testing)
    pub fn new_in_memory() -> Result<Self, OrderStorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, OrderStorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                price TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                order_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                created_at INTEGER NOT NULL,
                updated_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_orders_symbol
            ON orders(symbol);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Validate and store a new order with status PENDING
    pub fn create(&self, new_order: &NewOrder) -> Result<Order, OrderStorageError> {
        new_order.validate().map_err(OrderStorageError::Validation)?;

        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO orders (symbol, price, quantity, order_type, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                new_order.symbol,
                new_order.price.to_string(),
                new_order.quantity,
                new_order.order_type.as_str(),
                OrderStatus::Pending.as_str(),
                Utc::now().timestamp_millis(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        fetch_order(&conn, id)?.ok_or(OrderStorageError::NotFound(id))
    }

    /// Get a single order by id
    pub fn get(&self, id: i64) -> Result<Order, OrderStorageError> {
        let conn = self.conn.lock();
        fetch_order(&conn, id)?.ok_or(OrderStorageError::NotFound(id))
    }

    /// List orders by ascending id
    pub fn list(&self, offset: u32, limit: u32) -> Result<OrderPage, OrderStorageError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM orders ORDER BY id ASC LIMIT ?1 OFFSET ?2",
            ORDER_COLUMNS
        ))?;
        let orders = stmt
            .query_map(params![limit, offset], row_to_order)?
            .collect::<Result<Vec<_>, _>>()?;

        let total = count_orders(&conn)?;

        Ok(OrderPage { orders, total })
    }

    /// Total number of stored orders
    pub fn count(&self) -> Result<usize, OrderStorageError> {
        let conn = self.conn.lock();
        count_orders(&conn)
    }

    /// Overwrite an order's status and stamp `updated_at`
    ///
    /// No transition rules are enforced.
    pub fn update_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderStorageError> {
        let conn = self.conn.lock();

        let changed = conn.execute(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().timestamp_millis(), id],
        )?;
        if changed == 0 {
            return Err(OrderStorageError::NotFound(id));
        }

        fetch_order(&conn, id)?.ok_or(OrderStorageError::NotFound(id))
    }
}

fn fetch_order(conn: &Connection, id: i64) -> Result<Option<Order>, OrderStorageError> {
    let order = conn
        .query_row(
            &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS),
            params![id],
            row_to_order,
        )
        .optional()?;
    Ok(order)
}

fn count_orders(conn: &Connection) -> Result<usize, OrderStorageError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
    Ok(count as usize)
}

fn row_to_order(row: &Row<'_>) -> rusqlite::Result<Order> {
    let price: String = row.get(2)?;
    let order_type: String = row.get(4)?;
    let status: String = row.get(5)?;
    let created_at: i64 = row.get(6)?;
    let updated_at: Option<i64> = row.get(7)?;

    Ok(Order {
        id: row.get(0)?,
        symbol: row.get(1)?,
        price: Decimal::from_str(&price).map_err(|e| conversion_error(2, e))?,
        quantity: row.get(3)?,
        order_type: OrderType::from_str(&order_type).map_err(|e| conversion_error(4, e))?,
        status: OrderStatus::from_str(&status).map_err(|e| conversion_error(5, e))?,
        created_at: timestamp(6, created_at)?,
        updated_at: updated_at.map(|ms| timestamp(7, ms)).transpose()?,
    })
}

fn timestamp(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Errors that can occur during order storage operations
#[derive(Debug, thiserror::Error)]
pub enum OrderStorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Order {0} not found")]
    NotFound(i64),

    #[error("Invalid order: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
