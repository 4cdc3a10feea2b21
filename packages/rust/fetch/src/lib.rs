//! Content fetching: resolve a URL to readable page text.
//!
//! `ContentFetcher` validates the URL before any network call, delegates
//! rendering to an interchangeable backend (headless browser or hosted
//! HTML-to-markdown conversion), and normalizes both backend shapes and
//! backend failures into one `FetchedContent` / scrape-error contract.

pub mod backend;
pub mod browser;
pub mod content;
pub mod reader;

pub use backend::{RenderBackend, RenderError, RenderedPage};
pub use browser::BrowserBackend;
pub use reader::ReaderBackend;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use eventloom_shared::{FetchedContent, PipelineError, Result, ScrapeFailureKind};

/// Sentinel some rendering services emit instead of an error when a page
/// yields nothing renderable.
pub const NO_CONTENT_SENTINEL: &str = "## No content found.";

/// Scraping-friendly platforms suggested when a page cannot be read.
const FRIENDLY_PLATFORMS: &str = "lu.ma or eventbrite";

// ---------------------------------------------------------------------------
// ContentFetcher
// ---------------------------------------------------------------------------

/// Fetches a URL and returns its readable text content.
pub struct ContentFetcher {
    backend: Arc<dyn RenderBackend>,
}

impl ContentFetcher {
    /// Create a fetcher over the given rendering backend.
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self { backend }
    }

    /// Fetch `raw_url` and return its readable content.
    ///
    /// Malformed URLs are rejected before any network call. Backend failures
    /// and degenerate outputs (the no-content sentinel, login walls) come
    /// back as scrape errors carrying the target domain.
    #[instrument(skip_all, fields(url = %raw_url, backend = self.backend.name()))]
    pub async fn fetch(&self, raw_url: &str) -> Result<FetchedContent> {
        let url = validate_url(raw_url)?;
        let domain = host_of(&url);

        debug!(%domain, "rendering page");
        let page = self
            .backend
            .render(&url)
            .await
            .map_err(|e| scrape_error(e, &domain))?;

        let text = page.text.trim();
        if text.is_empty() || text.starts_with(NO_CONTENT_SENTINEL) {
            warn!(%domain, "render produced no content");
            return Err(PipelineError::scrape(
                ScrapeFailureKind::EmptyContent,
                &domain,
                format!(
                    "no content found at {domain}. The page may be empty or require \
                     scripts to render. Try an event platform like {FRIENDLY_PLATFORMS} instead."
                ),
            ));
        }

        if content::looks_like_login_wall(text) {
            warn!(%domain, "page is gated behind a login");
            return Err(PipelineError::scrape(
                ScrapeFailureKind::Blocked,
                &domain,
                format!(
                    "{domain} requires a login to view this page. Try a public \
                     event platform like {FRIENDLY_PLATFORMS} instead."
                ),
            ));
        }

        info!(%domain, chars = text.len(), "page fetched");

        Ok(FetchedContent {
            source_url: url,
            body: text.to_string(),
            title: page.title,
            description: page.description,
            fetched_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// URL validation
// ---------------------------------------------------------------------------

/// Parse and validate a submitted URL. Runs before any network call.
fn validate_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::validation("URL is empty"));
    }

    let url = Url::parse(trimmed)
        .map_err(|_| PipelineError::validation(format!("'{trimmed}' is not a valid URL")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(PipelineError::validation(format!(
                "unsupported URL scheme '{other}'; only http and https are allowed"
            )));
        }
    }

    if url.host_str().is_none() {
        return Err(PipelineError::validation(format!("'{trimmed}' has no host")));
    }

    Ok(url)
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or("unknown host").to_string()
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map a wire-level render failure onto the scrape taxonomy, keeping the
/// target domain in the message so callers can show actionable guidance.
fn scrape_error(err: RenderError, domain: &str) -> PipelineError {
    match err {
        RenderError::Timeout => PipelineError::scrape(
            ScrapeFailureKind::Timeout,
            domain,
            format!("timed out fetching {domain}. The site may be slow; try again in a few minutes."),
        ),
        RenderError::Status { status: 404 } | RenderError::Status { status: 410 } => {
            PipelineError::scrape(
                ScrapeFailureKind::NotFound,
                domain,
                format!("page not found at {domain}. Check that the URL is correct and still live."),
            )
        }
        RenderError::Status { status } if status >= 500 => PipelineError::scrape(
            ScrapeFailureKind::ServerError,
            domain,
            format!("{domain} returned a server error (HTTP {status}). Try again later."),
        ),
        RenderError::Status { status } => PipelineError::scrape(
            ScrapeFailureKind::Blocked,
            domain,
            format!(
                "{domain} refused the request (HTTP {status}). The site may block scrapers; \
                 try a friendlier platform like {FRIENDLY_PLATFORMS} instead."
            ),
        ),
        RenderError::Transport(msg) => PipelineError::scrape(
            ScrapeFailureKind::ServerError,
            domain,
            format!("could not reach {domain}: {msg}. Try again later."),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
