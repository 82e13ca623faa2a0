//! Client for a hosted Messages-style completion endpoint.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ModelClient;
use crate::{
    config::Settings,
    error::{AssistantError, Result},
};

const API_VERSION: &str = "2023-06-01";

pub struct MessagesClient {
    http: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "is_blank")]
    system: &'a str,
    messages: [Message<'a>; 1],
}

fn is_blank(text: &&str) -> bool {
    text.trim().is_empty()
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesClient {
    /// Build a client from configuration; the API key is mandatory.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings
            .model_api_key
            .as_deref()
            .context("MODEL_API_KEY not set")?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(api_key).context("MODEL_API_KEY is not a valid header")?,
        );
        headers.insert("anthropic-version", header::HeaderValue::from_static(API_VERSION));
        let http = Client::builder()
            .user_agent(concat!("ctgov-assistant/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(settings.model_timeout())
            .build()?;
        info!(model = %settings.model_id, base = %settings.model_base_url, "model client ready");
        Ok(Self {
            http,
            endpoint: format!("{}/v1/messages", settings.model_base_url.trim_end_matches('/')),
            model: settings.model_id.clone(),
            max_tokens: settings.model_max_tokens,
        })
    }
}

#[async_trait]
impl ModelClient for MessagesClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AssistantError::model_call(format!("request timed out: {e}"))
                } else {
                    AssistantError::model_call(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::ModelCall {
                message: format!("model service answered {status}: {body}"),
                status: Some(status.as_u16()),
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::model_call(format!("unreadable model response: {e}")))?;

        if parsed.stop_reason.as_deref() == Some("max_tokens") {
            warn!(model = %self.model, "model reply truncated at max_tokens");
        }

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(AssistantError::model_call("model returned no text"));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
