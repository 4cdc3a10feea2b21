//! Headless-browser rendering backend.
//!
//! Drives an external browser service: `POST {endpoint}/content` with a JSON
//! body naming the target URL returns the fully rendered HTML, which is then
//! reduced to markdown locally. Used for script-heavy pages the hosted
//! conversion service cannot render.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::backend::{RenderBackend, RenderError, RenderedPage, classify_transport};
use crate::content;

const USER_AGENT: &str = concat!("eventloom/", env!("CARGO_PKG_VERSION"));

/// Backend that renders pages through a headless browser service.
pub struct BrowserBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl BrowserBackend {
    /// Create a browser backend against `endpoint` with a per-request deadline.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
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
impl RenderBackend for BrowserBackend {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let request_url = format!("{}/content", self.endpoint);
        debug!(%url, "requesting browser render");

        let response = self
            .client
            .post(&request_url)
            .json(&serde_json::json!({ "url": url.as_str() }))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(classify_transport)?;
        Ok(content::reduce_html(&html))
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
