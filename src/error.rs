//! Error taxonomy shared by the query, registry and summary layers.

use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T, E = AssistantError> = std::result::Result<T, E>;

/// Failures that surface to the CLI and HTTP layers as user-visible messages.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Hosted model unreachable, rate-limited or answered with an error status.
    #[error("model call failed: {message}")]
    ModelCall {
        message: String,
        status: Option<u16>,
    },
    /// Model output did not parse as the expected structured format.
    #[error("model output could not be parsed: {0}")]
    ModelOutputParse(String),
    /// Registry unreachable, answered non-2xx, or returned an unreadable body.
    #[error("registry request failed: {0}")]
    RegistryCall(#[from] RegistryFailure),
    /// Page-follow guard tripped before the registry stopped returning tokens.
    #[error("registry pagination stopped after {pages} pages: {detail}")]
    RegistryPaginationExhausted { pages: usize, detail: String },
    /// Search criteria or summary selection cannot form a request.
    #[error("invalid input: {0}")]
    UserInput(String),
    #[error("unknown prompt template `{0}`")]
    UnknownTemplate(String),
    #[error("template `{template}` has no value bound for `{{{placeholder}}}`")]
    MissingBinding {
        template: &'static str,
        placeholder: String,
    },
    /// The retry policy gave up on a transient failure.
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AssistantError>,
    },
}

/// Registry failure detail, kept apart so callers can tell them apart.
#[derive(Debug, Error)]
pub enum RegistryFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("registry answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

impl AssistantError {
    pub fn model_call(message: impl Into<String>) -> Self {
        Self::ModelCall {
            message: message.into(),
            status: None,
        }
    }

    /// Transient failures may be retried; retrying anything else reproduces it.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ModelCall { status, .. } => match status {
                Some(code) => *code == 429 || *code == 408 || *code >= 500,
                None => true,
            },
            Self::RegistryCall(RegistryFailure::Network(_)) => true,
            Self::RegistryCall(RegistryFailure::Status { status, .. }) => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    /// Stable machine-readable name used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelCall { .. } => "model_call",
            Self::ModelOutputParse(_) => "model_output_parse",
            Self::RegistryCall(_) => "registry_call",
            Self::RegistryPaginationExhausted { .. } => "registry_pagination_exhausted",
            Self::UserInput(_) => "user_input",
            Self::UnknownTemplate(_) | Self::MissingBinding { .. } => "template",
            Self::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

impl From<reqwest::Error> for RegistryFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RegistryFailure::Malformed(err.to_string())
        } else {
            RegistryFailure::Network(err.to_string())
        }
    }
}
