//! HTTP route handlers for Axum.

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use clap::ValueEnum;
use tracing::{info, warn};

use super::{
    types::{ApiError, ApiJson, HealthDto, StudiesRequest, StudiesResponse, TemplateDto},
    AppState,
};
use crate::{
    prompts::{self, TemplateId},
    query::{QueryPreview, SearchCriteria},
    summarize::{Summary, SummaryKind, SummaryRequest},
};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    version: &'a str,
    model: &'a str,
    max_studies: usize,
    kinds: Vec<&'static str>,
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, String)> {
    let kinds = SummaryKind::value_variants()
        .iter()
        .map(|kind| kind.template().as_str())
        .collect();
    let page = IndexPage {
        version: env!("CARGO_PKG_VERSION"),
        model: state.model.name(),
        max_studies: state.settings.max_studies,
        kinds,
    };
    page.render().map(Html).map_err(|e| {
        warn!(error = %e, "failed to render index");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.model.name().to_string(),
    })
}

pub async fn list_templates() -> Json<Vec<TemplateDto>> {
    Json(prompts::all().map(TemplateDto::from).collect())
}

pub async fn build_query(
    State(state): State<AppState>,
    ApiJson(criteria): ApiJson<SearchCriteria>,
) -> ApiResult<QueryPreview> {
    let preview = state.query_builder.build(&criteria).await?;
    Ok(Json(preview))
}

pub async fn fetch_studies(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StudiesRequest>,
) -> ApiResult<StudiesResponse> {
    let max = request
        .max_records
        .unwrap_or(state.settings.max_studies)
        .min(state.settings.max_studies);
    let results = state.registry.search(&request.query, max).await?;
    let studies = results.structured();
    let skipped = results.studies.len() - studies.len();
    info!(studies = studies.len(), skipped, "studies fetched");
    Ok(Json(StudiesResponse {
        studies,
        total_count: results.total_count,
        pages: results.pages,
        truncated: results.truncated,
        skipped,
    }))
}

pub async fn summarize(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SummaryRequest>,
) -> ApiResult<Summary> {
    let summary = state.summarizer.summarize(&request).await?;
    Ok(Json(summary))
}

pub async fn show_template(
    Path(name): Path<String>,
) -> ApiResult<prompts::PromptTemplate> {
    let template = name.parse::<TemplateId>().map(prompts::get)?;
    Ok(Json(template.clone()))
}
