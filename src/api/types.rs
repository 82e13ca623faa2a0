//! Request and response bodies for the JSON API.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    data::StructuredStudy,
    error::AssistantError,
    prompts::{Locale, PromptTemplate, TemplateId},
    query::StructuredQuery,
};

#[derive(Debug, Clone, Deserialize)]
pub struct StudiesRequest {
    pub query: StructuredQuery,
    /// Falls back to the configured `MAX_STUDIES`.
    #[serde(default)]
    pub max_records: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudiesResponse {
    pub studies: Vec<StructuredStudy>,
    pub total_count: Option<u64>,
    pub pages: usize,
    pub truncated: bool,
    /// Raw records that could not be structured.
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateDto {
    pub id: TemplateId,
    pub locale: Locale,
    pub placeholders: Vec<String>,
}

impl From<&PromptTemplate> for TemplateDto {
    fn from(template: &PromptTemplate) -> Self {
        TemplateDto {
            id: template.id,
            locale: template.locale,
            placeholders: template.placeholders.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
    transient: bool,
}

/// Domain error rendered as `{error, kind, transient}`.
#[derive(Debug)]
pub struct ApiError(pub AssistantError);

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AssistantError::UserInput(_) => StatusCode::BAD_REQUEST,
            AssistantError::UnknownTemplate(_) => StatusCode::NOT_FOUND,
            AssistantError::MissingBinding { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        if status != StatusCode::BAD_REQUEST {
            warn!(error = %self.0, kind = self.0.kind(), "request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            kind: self.0.kind(),
            transient: self.0.is_transient(),
        };
        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections use the [`ApiError`] envelope.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError(AssistantError::UserInput(rejection.body_text()))),
        }
    }
}
