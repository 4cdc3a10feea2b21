//! Core domain types for the eventloom pipeline.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Confidence attached to extracted records when the model supplies none.
///
/// Advisory only; nothing enforces a floor on it.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

// ---------------------------------------------------------------------------
// SubmissionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for submission identifiers (time-sortable).
///
/// Used for log correlation only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    /// Generate a new time-sortable submission identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SubmissionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// RecordKind
// ---------------------------------------------------------------------------

/// The two record kinds a submission can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Event,
    Update,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Event => "event",
            RecordKind::Update => "update",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "event" => Ok(RecordKind::Event),
            "update" => Ok(RecordKind::Update),
            other => Err(format!("unknown record kind '{other}': expected 'event' or 'update'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// One user-initiated request to turn a URL into a persisted record.
///
/// Created per incoming request, never persisted; its lifetime is one
/// pipeline run. The URL stays a raw string here because validation is the
/// fetch stage's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub kind: RecordKind,
    pub url: String,
    /// Opaque id of whoever asked for this run.
    pub requested_by: String,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(kind: RecordKind, url: impl Into<String>, requested_by: impl Into<String>) -> Self {
        Self {
            id: SubmissionId::new(),
            kind,
            url: url.into(),
            requested_by: requested_by.into(),
            submitted_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// FetchedContent
// ---------------------------------------------------------------------------

/// Normalized output of the fetch stage.
///
/// Both rendering strategies are adapted into this one shape; nothing
/// downstream sees strategy-specific data. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedContent {
    /// The validated form of the submitted URL.
    pub source_url: Url,
    /// Readable text of the page (markdown-ish).
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A validated community event extracted from a page.
///
/// `start_time <= end_time` is NOT guaranteed: the model's output is
/// untrusted and ordering is deliberately not enforced anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub location: String,
    /// Always the submitted URL, never a model-echoed one.
    pub source_url: Url,
    /// Model-supplied certainty in [0, 1]; advisory only, not persisted.
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// A validated community announcement extracted from a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub content: String,
    /// Present on freshly extracted records; absent when rehydrated from a
    /// stored row (the update table keeps no source column).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<Url>,
    /// Carried because the persisted row includes a RequesterId column.
    pub requested_by: String,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Either record kind, as produced by extraction and consumed by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Event(EventRecord),
    Update(UpdateRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Event(_) => RecordKind::Event,
            Record::Update(_) => RecordKind::Update,
        }
    }
}

/// Store-assigned row identifier returned from a save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record together with the identifier the store assigned to its row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: Record,
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parse a model- or store-supplied timestamp leniently into UTC.
///
/// Accepts RFC 3339 with offset or trailing `Z`, a naive
/// `YYYY-MM-DDTHH:MM:SS` (assumed UTC, optional fractional seconds, `T` or
/// space separator), and a bare `YYYY-MM-DD` (midnight UTC). Anything else
/// is `None`; callers decide whether that is an error.
pub fn parse_flexible_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    None
}
