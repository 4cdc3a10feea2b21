//! Error types for eventloom.
//!
//! Library crates use [`PipelineError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Stage failures carry a `kind` discriminant instead of forming an error
//! subclass hierarchy, so callers can match on what went wrong without
//! string inspection.

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Discriminants
// ---------------------------------------------------------------------------

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Extract,
    Store,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Store => "store",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a content fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeFailureKind {
    /// The rendering backend did not answer within the time ceiling.
    Timeout,
    /// The target page does not exist (404-equivalent).
    NotFound,
    /// The target refused the request (403-equivalent or bot detection).
    Blocked,
    /// The target or backend errored server-side (5xx-equivalent).
    ServerError,
    /// The page rendered to nothing usable.
    EmptyContent,
}

/// How handling of a model response failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFailureKind {
    /// The model returned no content at all.
    EmptyModelResponse,
    /// The model returned content that is not valid JSON.
    UnparseableResponse,
    /// The JSON parsed but the nested record fails strict schema checks.
    SchemaInvalid,
    /// The model itself declared it could not extract a record.
    ModelReportedFailure,
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Top-level error type for all eventloom operations.
///
/// Every variant terminates the current submission with a descriptive
/// message; none of them should crash the process.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed input rejected before any network call.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Content fetch failure. Always carries the target domain so messages
    /// can point the user at an alternative source platform.
    #[error("fetch: {message}")]
    Scrape {
        kind: ScrapeFailureKind,
        domain: String,
        message: String,
    },

    /// Model response handling failure.
    #[error("extract: {message}")]
    Extraction {
        kind: ExtractionFailureKind,
        message: String,
    },

    /// Tabular store read/write failure.
    #[error("store: {0}")]
    Store(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Anything that maps to no taxonomy class. Callers see an opaque
    /// message; the detail goes to the log, not the user.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a fetch failure tagged with its kind and target domain.
    pub fn scrape(
        kind: ScrapeFailureKind,
        domain: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Scrape {
            kind,
            domain: domain.into(),
            message: msg.into(),
        }
    }

    /// Create an extraction failure tagged with its kind.
    pub fn extraction(kind: ExtractionFailureKind, msg: impl Into<String>) -> Self {
        Self::Extraction {
            kind,
            message: msg.into(),
        }
    }

    /// Create a store error from any displayable message.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an opaque unexpected error.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The stage this error is attributed to, when it belongs to one.
    ///
    /// Validation happens inside the fetch stage (pre-network), so it maps
    /// to `Fetch`; config, I/O, and unexpected errors belong to no stage.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Validation { .. } | Self::Scrape { .. } => Some(Stage::Fetch),
            Self::Extraction { .. } => Some(Stage::Extract),
            Self::Store(_) => Some(Stage::Store),
            Self::Config { .. } | Self::Io { .. } | Self::Unexpected(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PipelineError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = PipelineError::validation("not an http(s) URL");
        assert_eq!(err.to_string(), "validation error: not an http(s) URL");
    }

    #[test]
    fn stage_tagged_variants_prefix_their_stage() {
        let err = PipelineError::scrape(
            ScrapeFailureKind::NotFound,
            "example.test",
            "page not found at example.test",
        );
        assert!(err.to_string().starts_with("fetch: "));

        let err = PipelineError::extraction(
            ExtractionFailureKind::UnparseableResponse,
            "model response is not valid JSON",
        );
        assert!(err.to_string().starts_with("extract: "));

        let err = PipelineError::store("HTTP 503");
        assert_eq!(err.to_string(), "store: HTTP 503");
    }

    #[test]
    fn stage_attribution() {
        assert_eq!(
            PipelineError::validation("bad url").stage(),
            Some(Stage::Fetch)
        );
        assert_eq!(
            PipelineError::scrape(ScrapeFailureKind::Timeout, "a.test", "slow").stage(),
            Some(Stage::Fetch)
        );
        assert_eq!(
            PipelineError::extraction(ExtractionFailureKind::SchemaInvalid, "no title").stage(),
            Some(Stage::Extract)
        );
        assert_eq!(PipelineError::store("down").stage(), Some(Stage::Store));
        assert_eq!(PipelineError::unexpected("boom").stage(), None);
    }

    #[test]
    fn scrape_error_retains_domain() {
        let err = PipelineError::scrape(
            ScrapeFailureKind::EmptyContent,
            "example.test",
            "no content found at example.test",
        );
        match err {
            PipelineError::Scrape { kind, domain, .. } => {
                assert_eq!(kind, ScrapeFailureKind::EmptyContent);
                assert_eq!(domain, "example.test");
            }
            other => panic!("expected Scrape, got {other:?}"),
        }
    }
}
