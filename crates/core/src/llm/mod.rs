pub mod error;
pub mod json;
pub mod openai;
pub mod prompt;

use crate::domain::decision::Decision;

/// The two conversation turns sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionPrompt {
    pub system: String,
    pub user: String,
}

#[async_trait::async_trait]
pub trait DecisionClient: Send + Sync {
    /// One call, no retries. Upstream failures surface as
    /// [`error::UpstreamError`] inside the `anyhow` chain.
    async fn decide(&self, prompt: DecisionPrompt) -> anyhow::Result<Decision>;
}
