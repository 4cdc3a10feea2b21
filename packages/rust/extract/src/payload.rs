//! Model response envelope and strict schema validation.
//!
//! The envelope is deserialized leniently (every field optional) and then
//! re-validated strictly, independent of the model's self-reported success.
//! Only records that pass validation may reach the store.

use chrono::Utc;
use serde::Deserialize;
use url::Url;

use eventloom_shared::{
    DEFAULT_CONFIDENCE, EventRecord, ExtractionFailureKind, PipelineError, Result, Submission,
    UpdateRecord, parse_flexible_timestamp,
};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Envelope every extraction response must follow.
#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub event: Option<EventPayload>,
    #[serde(default)]
    pub update: Option<UpdatePayload>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Event fields as the model reports them. All optional; validation decides.
#[derive(Debug, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub event_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Model-echoed URL. Accepted in the payload, never used.
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Update fields as the model reports them.
#[derive(Debug, Deserialize)]
pub struct UpdatePayload {
    #[serde(default)]
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an event payload into an `EventRecord`.
///
/// `source_url` is the originally submitted URL; any URL the model echoed is
/// discarded. The record's timestamps stay exactly as the model reported
/// them, parsed but unordered (start after end is possible and allowed).
pub fn validate_event(
    payload: &EventPayload,
    source_url: &Url,
    confidence: Option<f64>,
) -> Result<EventRecord> {
    let title = required_text(&payload.event_title, "event_title")?;
    let description = required_text(&payload.description, "description")?;
    let location = required_text(&payload.location, "location")?;

    let raw_start = required_text(&payload.start_datetime, "start_datetime")?;
    let start_time = parse_flexible_timestamp(&raw_start).ok_or_else(|| {
        PipelineError::extraction(
            ExtractionFailureKind::SchemaInvalid,
            format!("start_datetime '{raw_start}' is not a recognizable timestamp"),
        )
    })?;

    let end_time = match normalize_optional(&payload.end_datetime) {
        None => None,
        Some(raw) => Some(parse_flexible_timestamp(raw).ok_or_else(|| {
            PipelineError::extraction(
                ExtractionFailureKind::SchemaInvalid,
                format!("end_datetime '{raw}' is not a recognizable timestamp"),
            )
        })?),
    };

    Ok(EventRecord {
        title,
        description,
        start_time,
        end_time,
        location,
        source_url: source_url.clone(),
        confidence: clamp_confidence(confidence),
        created_at: Utc::now(),
    })
}

/// Validate an update payload into an `UpdateRecord`.
pub fn validate_update(
    payload: &UpdatePayload,
    submission: &Submission,
    source_url: &Url,
) -> Result<UpdateRecord> {
    let content = required_text(&payload.content, "content")?;

    Ok(UpdateRecord {
        content,
        source_url: Some(source_url.clone()),
        requested_by: submission.requested_by.clone(),
        submitted_at: submission.submitted_at,
        created_at: Utc::now(),
    })
}

/// Require a non-empty text field; the literal string "null" counts as absent.
fn required_text(field: &Option<String>, name: &str) -> Result<String> {
    match normalize_optional(field) {
        Some(value) => Ok(value.to_string()),
        None => Err(PipelineError::extraction(
            ExtractionFailureKind::SchemaInvalid,
            format!("required field '{name}' is missing"),
        )),
    }
}

/// Treat empty strings and the literal "null" (which models sometimes emit
/// instead of JSON null) as absent.
fn normalize_optional(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

/// Clamp a model-supplied confidence into [0, 1], defaulting when absent
/// or non-finite.
fn clamp_confidence(raw: Option<f64>) -> f64 {
    match raw {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use eventloom_shared::RecordKind;

    use super::*;

    fn full_event_payload() -> EventPayload {
        EventPayload {
            event_title: Some("Tech Conference 2026".into()),
            description: Some("Annual technology conference.".into()),
            start_datetime: Some("2026-06-15T09:00:00".into()),
            end_datetime: Some("2026-06-15T17:00:00".into()),
            location: Some("Convention Center".into()),
            source_url: Some("https://model-invented.example/evil".into()),
        }
    }

    fn submitted_url() -> Url {
        Url::parse("https://example.com/conf").expect("valid url")
    }

    #[test]
    fn valid_event_passes() {
        let record = validate_event(&full_event_payload(), &submitted_url(), Some(0.92))
            .expect("valid payload");

        assert_eq!(record.title, "Tech Conference 2026");
        assert_eq!(record.location, "Convention Center");
        assert!(record.end_time.is_some());
        assert_eq!(record.confidence, 0.92);
    }

    #[test]
    fn model_echoed_url_is_discarded() {
        let record =
            validate_event(&full_event_payload(), &submitted_url(), None).expect("valid payload");
        assert_eq!(record.source_url.as_str(), "https://example.com/conf");
    }

    #[test]
    fn missing_location_is_schema_invalid() {
        let mut payload = full_event_payload();
        payload.location = None;

        let err = validate_event(&payload, &submitted_url(), None).unwrap_err();
        match err {
            PipelineError::Extraction { kind, message } => {
                assert_eq!(kind, ExtractionFailureKind::SchemaInvalid);
                assert!(message.contains("location"));
            }
            other => panic!("expected extraction error, got {other}"),
        }
    }

    #[test]
    fn literal_null_title_is_missing() {
        let mut payload = full_event_payload();
        payload.event_title = Some("null".into());

        let err = validate_event(&payload, &submitted_url(), None).unwrap_err();
        assert!(err.to_string().contains("event_title"));
    }

    #[test]
    fn garbage_start_is_schema_invalid() {
        let mut payload = full_event_payload();
        payload.start_datetime = Some("whenever works".into());

        let err = validate_event(&payload, &submitted_url(), None).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Extraction {
                kind: ExtractionFailureKind::SchemaInvalid,
                ..
            }
        ));
    }

    #[test]
    fn absent_end_time_is_allowed() {
        let mut payload = full_event_payload();
        payload.end_datetime = None;
        let record = validate_event(&payload, &submitted_url(), None).expect("valid payload");
        assert!(record.end_time.is_none());

        payload.end_datetime = Some("null".into());
        let record = validate_event(&payload, &submitted_url(), None).expect("valid payload");
        assert!(record.end_time.is_none());
    }

    #[test]
    fn garbage_end_time_is_schema_invalid() {
        let mut payload = full_event_payload();
        payload.end_datetime = Some("sometime later".into());
        assert!(validate_event(&payload, &submitted_url(), None).is_err());
    }

    #[test]
    fn end_before_start_is_not_rejected() {
        let mut payload = full_event_payload();
        payload.start_datetime = Some("2026-06-15T17:00:00".into());
        payload.end_datetime = Some("2026-06-15T09:00:00".into());

        let record = validate_event(&payload, &submitted_url(), None).expect("valid payload");
        assert!(record.end_time.expect("end present") < record.start_time);
    }

    #[test]
    fn confidence_defaults_and_clamps() {
        let payload = full_event_payload();
        let url = submitted_url();

        let defaulted = validate_event(&payload, &url, None).expect("valid");
        assert_eq!(defaulted.confidence, DEFAULT_CONFIDENCE);

        let clamped_high = validate_event(&payload, &url, Some(1.7)).expect("valid");
        assert_eq!(clamped_high.confidence, 1.0);

        let clamped_low = validate_event(&payload, &url, Some(-0.2)).expect("valid");
        assert_eq!(clamped_low.confidence, 0.0);

        let nan = validate_event(&payload, &url, Some(f64::NAN)).expect("valid");
        assert_eq!(nan.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn update_requires_content() {
        let submission = Submission::new(RecordKind::Update, "https://example.com/news", "user-1");
        let payload = UpdatePayload { content: None };

        let err = validate_update(&payload, &submission, &submitted_url()).unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn update_carries_submission_identity() {
        let submission = Submission::new(RecordKind::Update, "https://example.com/news", "user-7");
        let payload = UpdatePayload {
            content: Some("Road closure on Main St this weekend.".into()),
        };

        let record =
            validate_update(&payload, &submission, &submitted_url()).expect("valid payload");
        assert_eq!(record.requested_by, "user-7");
        assert_eq!(record.submitted_at, submission.submitted_at);
        assert_eq!(
            record.source_url.as_ref().map(Url::as_str),
            Some("https://example.com/conf")
        );
    }
}
