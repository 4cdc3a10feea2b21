//! Rendering backend trait and wire-level error classification.
//!
//! A backend turns a URL into readable page text. Two production
//! implementations exist (`BrowserBackend`, `ReaderBackend`); tests swap in
//! scripted fakes. The fetcher stays strategy-agnostic behind this trait.

use async_trait::async_trait;
use url::Url;

// ---------------------------------------------------------------------------
// Rendered page
// ---------------------------------------------------------------------------

/// Readable output of a rendering backend.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// Page body as markdown-ish text.
    pub text: String,
    /// Page title, when the backend could recover one.
    pub title: Option<String>,
    /// Meta description, when present.
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Wire-level failure from a rendering backend.
///
/// Backends report what happened on the network; `ContentFetcher` maps this
/// onto the user-facing scrape taxonomy with the target domain attached.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// The request exceeded the configured deadline.
    #[error("request timed out")]
    Timeout,

    /// The upstream answered with a non-success HTTP status.
    #[error("HTTP status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Connection-level failure (DNS, TLS, refused, reset).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Classify a reqwest error into a `RenderError`.
pub(crate) fn classify_transport(err: reqwest::Error) -> RenderError {
    if err.is_timeout() {
        RenderError::Timeout
    } else if let Some(status) = err.status() {
        RenderError::Status {
            status: status.as_u16(),
        }
    } else {
        RenderError::Transport(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Trait for page rendering strategies.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Render the page at `url` into readable text.
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError>;

    /// Short backend name for tracing.
    fn name(&self) -> &'static str;
}
