//! Hosted language-model access: submit a prompt, receive text.

pub mod messages;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{error::Result, retry::RetryPolicy};

pub use messages::MessagesClient;

/// Seam between the assistant and whichever hosted model answers prompts.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a system instruction and a user prompt, returning the reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    /// Identifier used in logs.
    fn model_name(&self) -> &str;
}

/// A model client paired with the retry policy applied to its calls.
#[derive(Clone)]
pub struct Model {
    client: Arc<dyn ModelClient>,
    retry: RetryPolicy,
}

impl Model {
    pub fn new(client: Arc<dyn ModelClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn name(&self) -> &str {
        self.client.model_name()
    }

    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        debug!(
            model = self.client.model_name(),
            prompt_chars = prompt.len(),
            "calling model"
        );
        let client = &self.client;
        self.retry
            .run("model", || async move { client.complete(system, prompt).await })
            .await
    }
}
