//! Structured extraction: fetched page text to a validated record via one
//! language-model completion.
//!
//! The extractor makes a single completion call per submission (no internal
//! retry) and walks the response through a fixed protocol: empty response,
//! unparseable JSON, model-declared failure, missing record, strict schema
//! validation. Only step five passing yields a record, and its source URL is
//! always the submitted one, never a model-echoed URL.

pub mod completion;
pub mod openai;
pub mod payload;
pub mod prompt;

pub use completion::CompletionBackend;
pub use openai::{CompletionOptions, OpenAiCompletion};

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use eventloom_shared::{
    ExtractionFailureKind, FetchedContent, PipelineError, Record, RecordKind, Result, Submission,
};

use crate::payload::ResponseEnvelope;

/// Explanation used when the model declines without supplying one.
pub const DEFAULT_DECLINE_REASON: &str = "the model could not extract a record from the page";

// ---------------------------------------------------------------------------
// StructuredExtractor
// ---------------------------------------------------------------------------

/// Extracts structured records from fetched content.
pub struct StructuredExtractor {
    backend: Arc<dyn CompletionBackend>,
}

impl StructuredExtractor {
    /// Create an extractor over the given completion backend.
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Extract a record of the submission's kind from fetched content.
    #[instrument(skip_all, fields(kind = %submission.kind, url = %content.source_url))]
    pub async fn extract(
        &self,
        content: &FetchedContent,
        submission: &Submission,
    ) -> Result<Record> {
        let system = prompt::system_prompt(submission.kind, Utc::now().date_naive());
        let user = prompt::user_prompt(content);

        let response = self.backend.complete(&system, &user).await?;
        let record = parse_response(&response, submission, content)?;

        info!(kind = %submission.kind, "record extracted");
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Response protocol
// ---------------------------------------------------------------------------

/// Decode and validate a raw model response.
///
/// Checks run in a fixed order so each failure class stays distinct:
/// empty response, unparseable JSON, model-declared failure, missing nested
/// record, then strict schema validation regardless of the model's
/// self-reported success.
fn parse_response(raw: &str, submission: &Submission, content: &FetchedContent) -> Result<Record> {
    let trimmed = strip_code_fence(raw.trim());

    if trimmed.is_empty() {
        return Err(PipelineError::extraction(
            ExtractionFailureKind::EmptyModelResponse,
            "model returned an empty response",
        ));
    }

    let envelope: ResponseEnvelope = serde_json::from_str(trimmed).map_err(|e| {
        warn!(error = %e, "model response is not valid JSON");
        PipelineError::extraction(
            ExtractionFailureKind::UnparseableResponse,
            format!("model response is not valid JSON: {e}"),
        )
    })?;

    if !envelope.success {
        let reason = envelope
            .error
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DECLINE_REASON.to_string());
        return Err(PipelineError::extraction(
            ExtractionFailureKind::ModelReportedFailure,
            reason,
        ));
    }

    match submission.kind {
        RecordKind::Event => {
            let event = envelope
                .event
                .as_ref()
                .ok_or_else(|| missing_record("event"))?;
            let record = payload::validate_event(event, &content.source_url, envelope.confidence)?;
            Ok(Record::Event(record))
        }
        RecordKind::Update => {
            let update = envelope
                .update
                .as_ref()
                .ok_or_else(|| missing_record("update"))?;
            let record = payload::validate_update(update, submission, &content.source_url)?;
            Ok(Record::Update(record))
        }
    }
}

fn missing_record(kind: &str) -> PipelineError {
    PipelineError::extraction(
        ExtractionFailureKind::SchemaInvalid,
        format!("no {kind} record found in model response"),
    )
}

/// Strip a markdown code fence wrapper, if the model added one.
fn strip_code_fence(raw: &str) -> &str {
    let Some(inner) = raw.strip_prefix("```") else {
        return raw;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
