//! Tabular store backend trait.
//!
//! The store talks to its backing service through two operations: insert a
//! row, query rows. `AirtableBackend` is the production implementation;
//! tests swap in in-memory fakes.

use async_trait::async_trait;
use serde_json::{Map, Value};

use eventloom_shared::Result;

/// A row as the backing store returns it.
#[derive(Debug, Clone)]
pub struct TableRow {
    /// Store-assigned row identifier.
    pub id: String,
    /// Column name to value.
    pub fields: Map<String, Value>,
}

/// Query parameters for a table read.
#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    /// Backend-native filter expression, if any.
    pub filter: Option<String>,
    /// Column to sort by, if any.
    pub sort_field: Option<String>,
    /// Sort direction when `sort_field` is set.
    pub sort_desc: bool,
    /// Row cap, if any.
    pub max_records: Option<u32>,
}

/// Trait for tabular storage services.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Insert a row into `table` and return the store-assigned id.
    async fn insert(&self, table: &str, fields: &Map<String, Value>) -> Result<String>;

    /// Query rows from `table`.
    async fn query(&self, table: &str, query: &TableQuery) -> Result<Vec<TableRow>>;
}
