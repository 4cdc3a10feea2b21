//! Completion backend trait.
//!
//! One method: system prompt plus user prompt in, raw model text out. No
//! streaming, no tool calling. Tests substitute scripted fakes.

use async_trait::async_trait;

use eventloom_shared::Result;

/// Trait for language-model completion providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run a single completion and return the raw response text.
    ///
    /// Transport or provider failures are not extraction outcomes; they
    /// surface as unexpected errors.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
