//! HTTP layer exposing query building, registry search and summaries.

pub mod routes;
pub mod types;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    config::Settings,
    data::RegistryClient,
    llm::{MessagesClient, Model},
    query::QueryBuilder,
    summarize::Summarizer,
};

/// Immutable clients shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub model: Model,
    pub query_builder: QueryBuilder,
    pub registry: RegistryClient,
    pub summarizer: Summarizer,
}

impl AppState {
    pub fn new(settings: Settings, model: Model, registry: RegistryClient) -> Self {
        AppState {
            settings: Arc::new(settings),
            query_builder: QueryBuilder::new(model.clone()),
            summarizer: Summarizer::new(model.clone()),
            model,
            registry,
        }
    }

    pub fn from_settings(settings: Settings) -> Result<Self> {
        let client = MessagesClient::from_settings(&settings)?;
        let model = Model::new(Arc::new(client), settings.retry_policy());
        let registry = RegistryClient::from_settings(&settings)?;
        Ok(Self::new(settings, model, registry))
    }
}

/// Routes without a bound listener, so tests can drive them directly.
pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new("src/ui/static");
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/api/templates", get(routes::list_templates))
        .route("/api/templates/:id", get(routes::show_template))
        .route("/api/query", post(routes::build_query))
        .route("/api/studies", post(routes::fetch_studies))
        .route("/api/summaries", post(routes::summarize))
        .fallback_service(static_dir)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(settings: Settings, host: String, port: u16) -> Result<()> {
    let state = AppState::from_settings(settings)?;
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, "serving ctgov-assistant");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
    }
    info!("shutting down");
}
