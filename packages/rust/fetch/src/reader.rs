//! Hosted HTML-to-markdown rendering backend.
//!
//! Delegates rendering to an external conversion service queried as
//! `GET {endpoint}/{page_url}`. The service answers with a short text
//! preamble (`Title:`, `Description:`) followed by a `Markdown Content:`
//! marker and the page body.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::backend::{RenderBackend, RenderError, RenderedPage, classify_transport};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("eventloom/", env!("CARGO_PKG_VERSION"));

/// Marker separating the metadata preamble from the page body.
const BODY_MARKER: &str = "Markdown Content:";

/// Backend that delegates rendering to a hosted conversion service.
pub struct ReaderBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl ReaderBackend {
    /// Create a reader backend against `endpoint` with a per-request deadline.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RenderError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RenderBackend for ReaderBackend {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let request_url = format!("{}/{}", self.endpoint, url);
        debug!(%url, "requesting hosted conversion");

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify_transport)?;
        Ok(parse_envelope(&body))
    }

    fn name(&self) -> &'static str {
        "reader"
    }
}

/// Split the service's text envelope into metadata and body.
///
/// Without the body marker, the whole response is treated as body text.
fn parse_envelope(raw: &str) -> RenderedPage {
    let mut page = RenderedPage::default();

    let body = match raw.split_once(BODY_MARKER) {
        Some((preamble, rest)) => {
            for line in preamble.lines() {
                if let Some(title) = line.strip_prefix("Title:") {
                    let title = title.trim();
                    if !title.is_empty() {
                        page.title = Some(title.to_string());
                    }
                } else if let Some(desc) = line.strip_prefix("Description:") {
                    let desc = desc.trim();
                    if !desc.is_empty() {
                        page.description = Some(desc.to_string());
                    }
                }
            }
            rest
        }
        None => raw,
    };

    page.text = body.trim().to_string();
    page
}
