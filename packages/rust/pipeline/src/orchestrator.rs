//! Pipeline orchestration: Fetch, Extract, Store, in that order.
//!
//! One submission moves through a fixed linear state machine. Any stage
//! failure short-circuits the rest; a panic inside a stage is contained at
//! this boundary and surfaced as an opaque unexpected error. Submissions
//! share nothing, so callers may run any number of them concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use eventloom_extract::StructuredExtractor;
use eventloom_fetch::ContentFetcher;
use eventloom_shared::{
    PipelineError, Record, RecordId, RecordKind, Result, Submission, SubmissionId,
};
use eventloom_store::RecordStore;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// States a submission moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Fetching,
    Extracting,
    Storing,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Received => "received",
            PipelineState::Fetching => "fetching",
            PipelineState::Extracting => "extracting",
            PipelineState::Storing => "storing",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Successful result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Identifier of the submission that produced this outcome.
    pub submission_id: SubmissionId,
    /// Store-assigned id of the persisted row.
    pub record_id: RecordId,
    /// The record as it was persisted.
    pub record: Record,
    /// Wall-clock time from submission to terminal state.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs submissions through the three-stage pipeline.
///
/// Owns handles to the stage components; all of them are internally
/// thread-safe, so one `Pipeline` serves concurrent submissions.
pub struct Pipeline {
    fetcher: Arc<ContentFetcher>,
    extractor: Arc<StructuredExtractor>,
    store: Arc<RecordStore>,
}

impl Pipeline {
    /// Assemble a pipeline from its stage components.
    pub fn new(
        fetcher: Arc<ContentFetcher>,
        extractor: Arc<StructuredExtractor>,
        store: Arc<RecordStore>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
        }
    }

    /// Run one submission to a terminal state.
    ///
    /// On success the outcome carries the stored record, its id, and the run
    /// duration. On failure the error message names the stage that failed.
    /// Callers never observe a raw panic from a stage.
    #[instrument(skip(self), fields(kind = %kind, url = raw_url, requester = requester_id))]
    pub async fn run(
        &self,
        kind: RecordKind,
        raw_url: &str,
        requester_id: &str,
    ) -> Result<PipelineOutcome> {
        let started = Instant::now();
        let submission = Submission::new(kind, raw_url, requester_id);
        let submission_id = submission.id;

        info!(id = %submission_id, state = %PipelineState::Received, "submission received");

        let fetcher = self.fetcher.clone();
        let extractor = self.extractor.clone();
        let store = self.store.clone();

        // Stages run in their own task so a panic is caught as a JoinError
        // instead of unwinding into the caller.
        let handle = tokio::spawn(run_stages(fetcher, extractor, store, submission));

        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                if join_err.is_panic() {
                    error!(id = %submission_id, "pipeline stage panicked");
                } else {
                    error!(id = %submission_id, error = %join_err, "pipeline task aborted");
                }
                Err(PipelineError::unexpected("pipeline stage failed abnormally"))
            }
        };

        match result {
            Ok((record_id, record)) => {
                let elapsed = started.elapsed();
                info!(
                    id = %submission_id,
                    record_id = %record_id,
                    state = %PipelineState::Completed,
                    elapsed_ms = elapsed.as_millis(),
                    "pipeline completed"
                );
                Ok(PipelineOutcome {
                    submission_id,
                    record_id,
                    record,
                    elapsed,
                })
            }
            Err(e) => {
                warn!(
                    id = %submission_id,
                    state = %PipelineState::Failed,
                    stage = e.stage().map(|s| s.as_str()).unwrap_or("none"),
                    error = %e,
                    "pipeline failed"
                );
                Err(e)
            }
        }
    }
}

/// The three stages, strictly sequential; each consumes the previous output.
async fn run_stages(
    fetcher: Arc<ContentFetcher>,
    extractor: Arc<StructuredExtractor>,
    store: Arc<RecordStore>,
    submission: Submission,
) -> Result<(RecordId, Record)> {
    debug!(state = %PipelineState::Fetching, "entering stage");
    let content = fetcher.fetch(&submission.url).await?;

    debug!(state = %PipelineState::Extracting, "entering stage");
    let record = extractor.extract(&content, &submission).await?;

    debug!(state = %PipelineState::Storing, "entering stage");
    let record_id = store.save(&record).await?;

    Ok((record_id, record))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
