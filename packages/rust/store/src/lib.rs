//! Record persistence over a tabular backing store.
//!
//! `RecordStore` appends validated records as rows with a fixed column
//! mapping, lists recent rows by creation window, and answers a minimal
//! liveness probe. Rows are append-only: duplicate submissions produce
//! duplicate rows, and corrections require a new submission.

pub mod airtable;
pub mod backend;

pub use airtable::AirtableBackend;
pub use backend::{TableBackend, TableQuery, TableRow};

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use eventloom_shared::{
    DEFAULT_CONFIDENCE, EventRecord, Record, RecordId, RecordKind, Result, StoredRecord,
    UpdateRecord, parse_flexible_timestamp,
};

/// Moderation status assigned to newly stored events.
pub const INITIAL_EVENT_STATUS: &str = "pending";

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Table names for the two record kinds.
#[derive(Debug, Clone)]
pub struct TableNames {
    pub events: String,
    pub updates: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            events: "Events".into(),
            updates: "Updates".into(),
        }
    }
}

/// Persists validated records and lists recent ones.
pub struct RecordStore {
    backend: Arc<dyn TableBackend>,
    tables: TableNames,
}

impl RecordStore {
    /// Create a store over the given tabular backend.
    pub fn new(backend: Arc<dyn TableBackend>, tables: TableNames) -> Self {
        Self { backend, tables }
    }

    fn table_for(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::Event => &self.tables.events,
            RecordKind::Update => &self.tables.updates,
        }
    }

    /// Append `record` as a new row and return the store-assigned id.
    ///
    /// The row's CreatedAt is set here, at save time. Every call creates a
    /// new row; there is no dedup on source URL.
    #[instrument(skip_all, fields(kind = %record.kind()))]
    pub async fn save(&self, record: &Record) -> Result<RecordId> {
        let now = Utc::now();
        let fields = row_fields(record, now);
        let table = self.table_for(record.kind());

        let id = self.backend.insert(table, &fields).await?;
        info!(table, id = %id, "record stored");
        Ok(RecordId(id))
    }

    /// List records created within `[now - days_back, now]`, newest first.
    ///
    /// Rows the backend returns are re-filtered and re-sorted locally, and
    /// rows that cannot be read back as records are skipped with a warning.
    #[instrument(skip_all, fields(kind = %kind, days_back))]
    pub async fn recent(&self, kind: RecordKind, days_back: i64) -> Result<Vec<StoredRecord>> {
        let now = Utc::now();
        let cutoff = now - Duration::days(days_back);

        let query = TableQuery {
            filter: Some(format!(
                "IS_AFTER({{CreatedAt}}, '{}')",
                cutoff.format("%Y-%m-%dT%H:%M:%SZ")
            )),
            sort_field: Some("CreatedAt".into()),
            sort_desc: true,
            max_records: None,
        };

        let rows = self.backend.query(self.table_for(kind), &query).await?;

        let mut records: Vec<(DateTime<Utc>, StoredRecord)> = Vec::new();
        for row in rows {
            match parse_row(&row, kind) {
                Some((created_at, stored)) => {
                    if created_at >= cutoff && created_at <= now {
                        records.push((created_at, stored));
                    }
                }
                None => {
                    warn!(id = %row.id, "skipping row that does not read back as a record");
                }
            }
        }

        records.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(records.into_iter().map(|(_, stored)| stored).collect())
    }

    /// Minimal read probe for liveness reporting.
    pub async fn health_check(&self) -> bool {
        let query = TableQuery {
            max_records: Some(1),
            ..TableQuery::default()
        };

        match self.backend.query(&self.tables.events, &query).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "store health check failed");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Build the column map for `record`.
///
/// Column names are a compatibility contract with the backing base:
/// events get Title, Description, Start, End, Location, SourceURL,
/// CreatedAt, Status; updates get Content, Timestamp, RequesterId,
/// CreatedAt. End is omitted when the event has no end time.
fn row_fields(record: &Record, now: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();

    match record {
        Record::Event(event) => {
            fields.insert("Title".into(), Value::String(event.title.clone()));
            fields.insert("Description".into(), Value::String(event.description.clone()));
            fields.insert("Start".into(), Value::String(event.start_time.to_rfc3339()));
            if let Some(end) = event.end_time {
                fields.insert("End".into(), Value::String(end.to_rfc3339()));
            }
            fields.insert("Location".into(), Value::String(event.location.clone()));
            fields.insert(
                "SourceURL".into(),
                Value::String(event.source_url.to_string()),
            );
            fields.insert("CreatedAt".into(), Value::String(now.to_rfc3339()));
            fields.insert("Status".into(), Value::String(INITIAL_EVENT_STATUS.into()));
        }
        Record::Update(update) => {
            fields.insert("Content".into(), Value::String(update.content.clone()));
            fields.insert(
                "Timestamp".into(),
                Value::String(update.submitted_at.to_rfc3339()),
            );
            fields.insert(
                "RequesterId".into(),
                Value::String(update.requested_by.clone()),
            );
            fields.insert("CreatedAt".into(), Value::String(now.to_rfc3339()));
        }
    }

    fields
}

/// Read a backend row back into a record, or `None` if it is malformed.
fn parse_row(row: &TableRow, kind: RecordKind) -> Option<(DateTime<Utc>, StoredRecord)> {
    let created_at = time_field(&row.fields, "CreatedAt")?;

    let record = match kind {
        RecordKind::Event => Record::Event(EventRecord {
            title: text_field(&row.fields, "Title")?,
            description: text_field(&row.fields, "Description").unwrap_or_default(),
            start_time: time_field(&row.fields, "Start")?,
            end_time: time_field(&row.fields, "End"),
            location: text_field(&row.fields, "Location").unwrap_or_default(),
            source_url: text_field(&row.fields, "SourceURL")
                .and_then(|raw| url::Url::parse(&raw).ok())?,
            confidence: DEFAULT_CONFIDENCE,
            created_at,
        }),
        RecordKind::Update => Record::Update(UpdateRecord {
            content: text_field(&row.fields, "Content")?,
            source_url: None,
            requested_by: text_field(&row.fields, "RequesterId").unwrap_or_default(),
            submitted_at: time_field(&row.fields, "Timestamp").unwrap_or(created_at),
            created_at,
        }),
    };

    Some((
        created_at,
        StoredRecord {
            id: RecordId(row.id.clone()),
            record,
        },
    ))
}

fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn time_field(fields: &Map<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    text_field(fields, name).and_then(|raw| parse_flexible_timestamp(&raw))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use eventloom_shared::PipelineError;
    use url::Url;

    use super::*;

    /// In-memory backend that records inserts and serves preseeded rows.
    /// Ignores filters so the store's own windowing is what gets tested.
    struct FakeTable {
        rows: Mutex<Vec<TableRow>>,
        inserts: Mutex<Vec<(String, Map<String, Value>)>>,
        fail: bool,
    }

    impl FakeTable {
        fn empty() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                inserts: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn with_rows(rows: Vec<TableRow>) -> Self {
            Self {
                rows: Mutex::new(rows),
                inserts: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                inserts: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn inserts(&self) -> Vec<(String, Map<String, Value>)> {
            self.inserts.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl TableBackend for FakeTable {
        async fn insert(&self, table: &str, fields: &Map<String, Value>) -> Result<String> {
            if self.fail {
                return Err(PipelineError::store("insert failed with HTTP 503"));
            }
            let mut inserts = self.inserts.lock().expect("lock");
            inserts.push((table.to_string(), fields.clone()));
            Ok(format!("rec{}", inserts.len()))
        }

        async fn query(&self, _table: &str, _query: &TableQuery) -> Result<Vec<TableRow>> {
            if self.fail {
                return Err(PipelineError::store("query failed with HTTP 503"));
            }
            Ok(self.rows.lock().expect("lock").clone())
        }
    }

    fn sample_event(end_time: Option<DateTime<Utc>>) -> EventRecord {
        EventRecord {
            title: "Community Picnic".into(),
            description: "Annual picnic in the park.".into(),
            start_time: Utc::now() + Duration::days(3),
            end_time,
            location: "City Park".into(),
            source_url: Url::parse("https://example.com/picnic").expect("valid url"),
            confidence: 0.9,
            created_at: Utc::now(),
        }
    }

    fn sample_update() -> UpdateRecord {
        UpdateRecord {
            content: "Library hours extended through September.".into(),
            source_url: Some(Url::parse("https://example.com/library").expect("valid url")),
            requested_by: "user-42".into(),
            submitted_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    fn update_row(id: &str, content: Option<&str>, created_at: DateTime<Utc>) -> TableRow {
        let mut fields = Map::new();
        if let Some(content) = content {
            fields.insert("Content".into(), Value::String(content.into()));
        }
        fields.insert("Timestamp".into(), Value::String(created_at.to_rfc3339()));
        fields.insert("RequesterId".into(), Value::String("user-1".into()));
        fields.insert("CreatedAt".into(), Value::String(created_at.to_rfc3339()));
        TableRow {
            id: id.into(),
            fields,
        }
    }

    #[tokio::test]
    async fn save_event_writes_exact_columns() {
        let backend = Arc::new(FakeTable::empty());
        let store = RecordStore::new(backend.clone(), TableNames::default());

        let end = Utc::now() + Duration::days(3) + Duration::hours(2);
        store
            .save(&Record::Event(sample_event(Some(end))))
            .await
            .expect("save succeeds");

        let inserts = backend.inserts();
        assert_eq!(inserts.len(), 1);
        let (table, fields) = &inserts[0];
        assert_eq!(table, "Events");

        let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "CreatedAt",
                "Description",
                "End",
                "Location",
                "SourceURL",
                "Start",
                "Status",
                "Title"
            ]
        );
        assert_eq!(fields["Status"], INITIAL_EVENT_STATUS);
        assert_eq!(fields["SourceURL"], "https://example.com/picnic");
    }

    #[tokio::test]
    async fn save_event_omits_end_when_absent() {
        let backend = Arc::new(FakeTable::empty());
        let store = RecordStore::new(backend.clone(), TableNames::default());

        store
            .save(&Record::Event(sample_event(None)))
            .await
            .expect("save succeeds");

        let (_, fields) = &backend.inserts()[0];
        assert!(!fields.contains_key("End"));
    }

    #[tokio::test]
    async fn save_update_writes_exact_columns() {
        let backend = Arc::new(FakeTable::empty());
        let store = RecordStore::new(backend.clone(), TableNames::default());

        store
            .save(&Record::Update(sample_update()))
            .await
            .expect("save succeeds");

        let (table, fields) = &backend.inserts()[0];
        assert_eq!(table, "Updates");

        let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["Content", "CreatedAt", "RequesterId", "Timestamp"]);
        assert_eq!(fields["RequesterId"], "user-42");
    }

    #[tokio::test]
    async fn save_returns_backend_id() {
        let store = RecordStore::new(Arc::new(FakeTable::empty()), TableNames::default());
        let id = store
            .save(&Record::Update(sample_update()))
            .await
            .expect("save succeeds");
        assert_eq!(id.to_string(), "rec1");
    }

    #[tokio::test]
    async fn save_surfaces_backend_failure() {
        let store = RecordStore::new(Arc::new(FakeTable::failing()), TableNames::default());
        let err = store
            .save(&Record::Update(sample_update()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Store(_)));
    }

    #[tokio::test]
    async fn recent_keeps_only_rows_in_window_newest_first() {
        let now = Utc::now();
        let backend = Arc::new(FakeTable::with_rows(vec![
            update_row("rec-old", Some("eight days ago"), now - Duration::days(8)),
            update_row("rec-mid", Some("six days ago"), now - Duration::days(6)),
            update_row("rec-new", Some("yesterday"), now - Duration::days(1)),
        ]));
        let store = RecordStore::new(backend, TableNames::default());

        let records = store
            .recent(RecordKind::Update, 7)
            .await
            .expect("recent succeeds");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.to_string(), "rec-new");
        assert_eq!(records[1].id.to_string(), "rec-mid");
    }

    #[tokio::test]
    async fn recent_excludes_future_rows() {
        let now = Utc::now();
        let backend = Arc::new(FakeTable::with_rows(vec![
            update_row("rec-future", Some("from tomorrow"), now + Duration::days(1)),
            update_row("rec-now", Some("today"), now - Duration::hours(1)),
        ]));
        let store = RecordStore::new(backend, TableNames::default());

        let records = store
            .recent(RecordKind::Update, 7)
            .await
            .expect("recent succeeds");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.to_string(), "rec-now");
    }

    #[tokio::test]
    async fn recent_skips_malformed_rows() {
        let now = Utc::now();
        let backend = Arc::new(FakeTable::with_rows(vec![
            update_row("rec-bad", None, now - Duration::days(1)),
            update_row("rec-good", Some("still fine"), now - Duration::days(2)),
        ]));
        let store = RecordStore::new(backend, TableNames::default());

        let records = store
            .recent(RecordKind::Update, 7)
            .await
            .expect("recent succeeds");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.to_string(), "rec-good");
    }

    #[tokio::test]
    async fn recent_rehydrates_events_with_default_confidence() {
        let now = Utc::now();
        let mut fields = Map::new();
        fields.insert("Title".into(), Value::String("Picnic".into()));
        fields.insert("Description".into(), Value::String("In the park.".into()));
        fields.insert(
            "Start".into(),
            Value::String((now + Duration::days(2)).to_rfc3339()),
        );
        fields.insert("Location".into(), Value::String("City Park".into()));
        fields.insert(
            "SourceURL".into(),
            Value::String("https://example.com/picnic".into()),
        );
        fields.insert("CreatedAt".into(), Value::String(now.to_rfc3339()));
        fields.insert("Status".into(), Value::String("pending".into()));

        let backend = Arc::new(FakeTable::with_rows(vec![TableRow {
            id: "rec-ev".into(),
            fields,
        }]));
        let store = RecordStore::new(backend, TableNames::default());

        let records = store
            .recent(RecordKind::Event, 7)
            .await
            .expect("recent succeeds");

        assert_eq!(records.len(), 1);
        match &records[0].record {
            Record::Event(event) => {
                assert_eq!(event.title, "Picnic");
                assert!(event.end_time.is_none());
                assert_eq!(event.confidence, DEFAULT_CONFIDENCE);
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_check_reflects_backend_reachability() {
        let healthy = RecordStore::new(Arc::new(FakeTable::empty()), TableNames::default());
        assert!(healthy.health_check().await);

        let broken = RecordStore::new(Arc::new(FakeTable::failing()), TableNames::default());
        assert!(!broken.health_check().await);
    }
}
