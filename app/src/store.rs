// ==============================================================================
// store.rs - Paged Table Store Interface
// ==============================================================================
// Description: Capability surface of the remote tabular data service
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Rows are requested in pages of this size
pub const PAGE_SIZE: usize = 10_000;

/// Inserts and deletes are sent in batches of this size
pub const BATCH_SIZE: usize = 1_000;

/// A single table row as exchanged with the data service
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Errors raised by a table store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request for {table} failed: {source}")]
    Http {
        table: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} on {table} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        table: String,
        status: u16,
        body: String,
    },

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Failed to decode row from {table}: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode row for {table}: {details}")]
    Encode { table: String, details: String },
}

/// Paginated read / batched write access to named tables
///
/// Callers never issue calls concurrently; each call completes before the
/// next one starts.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Total number of rows in `table`
    async fn count(&self, table: &str) -> Result<usize, StoreError>;

    /// Up to `page_size` rows starting at `offset`
    async fn read_page(&self, table: &str, page_size: usize, offset: usize) -> Result<Vec<Row>, StoreError>;

    /// Delete the rows with the given ids
    async fn delete_batch(&self, table: &str, ids: &[String]) -> Result<(), StoreError>;

    /// Insert the given rows
    async fn insert_batch(&self, table: &str, rows: &[Row]) -> Result<(), StoreError>;
}

/// Offsets `0, page_size, 2 * page_size, ...` covering `total` rows
pub fn page_offsets(total: usize, page_size: usize) -> impl Iterator<Item = usize> {
    let pages = if page_size == 0 { 0 } else { total.div_ceil(page_size) };
    (0..pages).map(move |page| page * page_size)
}

/// Encode a serializable value as a row object
pub fn encode_row<T: Serialize>(table: &str, value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(row)) => Ok(row),
        Ok(other) => Err(StoreError::Encode {
            table: table.to_string(),
            details: format!("expected an object, got {}", other),
        }),
        Err(e) => Err(StoreError::Encode {
            table: table.to_string(),
            details: e.to_string(),
        }),
    }
}

/// In-memory store that records every call, for tests
#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum StoreCall {
        Count(String),
        Read { table: String, page_size: usize, offset: usize },
        Delete { table: String, ids: usize },
        Insert { table: String, rows: usize },
    }

    #[derive(Default)]
    pub struct MemoryStore {
        tables: Mutex<HashMap<String, Vec<Row>>>,
        calls: Mutex<Vec<StoreCall>>,
        failing_inserts: Mutex<Option<String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_table(self, table: &str, rows: Vec<serde_json::Value>) -> Self {
            let rows = rows
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::Object(row) => row,
                    other => panic!("test rows must be objects, got {}", other),
                })
                .collect();
            self.tables.lock().unwrap().insert(table.to_string(), rows);
            self
        }

        pub fn fail_inserts_into(self, table: &str) -> Self {
            *self.failing_inserts.lock().unwrap() = Some(table.to_string());
            self
        }

        pub fn rows(&self, table: &str) -> Vec<Row> {
            self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
        }

        pub fn calls(&self) -> Vec<StoreCall> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: StoreCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl TableStore for MemoryStore {
        async fn count(&self, table: &str) -> Result<usize, StoreError> {
            self.log(StoreCall::Count(table.to_string()));
            Ok(self.tables.lock().unwrap().get(table).map_or(0, |rows| rows.len()))
        }

        async fn read_page(&self, table: &str, page_size: usize, offset: usize) -> Result<Vec<Row>, StoreError> {
            self.log(StoreCall::Read { table: table.to_string(), page_size, offset });
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .get(table)
                .map(|rows| rows.iter().skip(offset).take(page_size).cloned().collect())
                .unwrap_or_default())
        }

        async fn delete_batch(&self, table: &str, ids: &[String]) -> Result<(), StoreError> {
            self.log(StoreCall::Delete { table: table.to_string(), ids: ids.len() });
            if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
                rows.retain(|row| {
                    let id = row.get("id").and_then(|v| v.as_str()).unwrap_or_default();
                    !ids.iter().any(|i| i == id)
                });
            }
            Ok(())
        }

        async fn insert_batch(&self, table: &str, rows: &[Row]) -> Result<(), StoreError> {
            self.log(StoreCall::Insert { table: table.to_string(), rows: rows.len() });
            if self.failing_inserts.lock().unwrap().as_deref() == Some(table) {
                return Err(StoreError::Status {
                    operation: "insert",
                    table: table.to_string(),
                    status: 500,
                    body: "simulated failure".to_string(),
                });
            }
            self.tables
                .lock()
                .unwrap()
                .entry(table.to_string())
                .or_default()
                .extend(rows.iter().cloned());
            Ok(())
        }
    }
}
