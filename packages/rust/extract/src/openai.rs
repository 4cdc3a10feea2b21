//! OpenAI-backed completion provider, via the `rig` framework.

use async_trait::async_trait;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::debug;

use eventloom_shared::{PipelineError, Result};

use crate::completion::CompletionBackend;

/// Sampling options for extraction completions.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Model id, e.g. "gpt-4o".
    pub model: String,
    /// Sampling temperature. Extraction wants low values.
    pub temperature: f64,
    /// Completion token cap.
    pub max_tokens: u64,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            temperature: 0.1,
            max_tokens: 1024,
        }
    }
}

/// Completion backend talking to the OpenAI API.
#[derive(Clone)]
pub struct OpenAiCompletion {
    client: openai::Client,
    opts: CompletionOptions,
}

impl OpenAiCompletion {
    /// Create a backend with the given API key and sampling options.
    pub fn new(api_key: &str, opts: CompletionOptions) -> Self {
        Self {
            client: openai::Client::new(api_key),
            opts,
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletion {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        debug!(
            model = %self.opts.model,
            prompt_chars = user_prompt.len(),
            "requesting completion"
        );

        let agent = self
            .client
            .agent(&self.opts.model)
            .preamble(system_prompt)
            .temperature(self.opts.temperature)
            .max_tokens(self.opts.max_tokens)
            .additional_params(serde_json::json!({
                "response_format": { "type": "json_object" }
            }))
            .build();

        let response = agent
            .prompt(user_prompt)
            .await
            .map_err(|e| PipelineError::unexpected(format!("completion call failed: {e}")))?;

        debug!(response_chars = response.len(), "completion received");
        Ok(response)
    }
}
