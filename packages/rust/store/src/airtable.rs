//! Airtable-backed tabular store.
//!
//! Rows live in one base, one table per record kind. Inserts are
//! `POST /v0/{base}/{table}` with a `fields` object; reads are
//! `GET /v0/{base}/{table}` with `filterByFormula`, `sort`, and
//! `maxRecords` query parameters.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use eventloom_shared::{PipelineError, Result};

use crate::backend::{TableBackend, TableQuery, TableRow};

const USER_AGENT: &str = concat!("eventloom/", env!("CARGO_PKG_VERSION"));

/// How much of an error body to keep in store error messages.
const ERROR_SNIPPET_CHARS: usize = 200;

/// Tabular backend talking to the Airtable REST API.
pub struct AirtableBackend {
    client: reqwest::Client,
    endpoint: String,
    base_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    records: Vec<RowJson>,
}

#[derive(Debug, Deserialize)]
struct RowJson {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl AirtableBackend {
    /// Create a backend for one base at `endpoint`.
    pub fn new(
        endpoint: impl Into<String>,
        base_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::store(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            base_id: base_id.into(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/v0/{}/{}", self.endpoint, self.base_id, table)
    }
}

#[async_trait]
impl TableBackend for AirtableBackend {
    async fn insert(&self, table: &str, fields: &Map<String, Value>) -> Result<String> {
        let response = self
            .client
            .post(self.table_url(table))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| PipelineError::store(format!("insert request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::store(format!(
                "insert into {table} failed with HTTP {status}: {}",
                snippet(&body)
            )));
        }

        let created: InsertResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::store(format!("unexpected insert response: {e}")))?;

        debug!(table, id = %created.id, "row inserted");
        Ok(created.id)
    }

    async fn query(&self, table: &str, query: &TableQuery) -> Result<Vec<TableRow>> {
        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(filter) = &query.filter {
            params.push(("filterByFormula".into(), filter.clone()));
        }
        if let Some(field) = &query.sort_field {
            params.push(("sort[0][field]".into(), field.clone()));
            params.push((
                "sort[0][direction]".into(),
                if query.sort_desc { "desc" } else { "asc" }.into(),
            ));
        }
        if let Some(max) = query.max_records {
            params.push(("maxRecords".into(), max.to_string()));
        }

        let response = self
            .client
            .get(self.table_url(table))
            .bearer_auth(&self.api_key)
            .query(&params)
            .send()
            .await
            .map_err(|e| PipelineError::store(format!("query request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::store(format!(
                "query of {table} failed with HTTP {status}: {}",
                snippet(&body)
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::store(format!("unexpected query response: {e}")))?;

        debug!(table, rows = parsed.records.len(), "query returned");

        Ok(parsed
            .records
            .into_iter()
            .map(|r| TableRow {
                id: r.id,
                fields: r.fields,
            })
            .collect())
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(ERROR_SNIPPET_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
