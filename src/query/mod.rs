//! Turning PICO search criteria into a validated registry query.

pub mod criteria;
pub mod link;
pub mod structured;

use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    error::Result,
    llm::Model,
    prompts::{self, TemplateId},
};

pub use criteria::{DateRange, SearchCriteria};
pub use link::web_search_url;
pub use structured::{ParamValue, StructuredQuery, DOCUMENTED_PARAMETERS};

/// Query plus what the researcher needs to preview it.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPreview {
    pub query: StructuredQuery,
    /// Unparsed model reply, shown for transparency.
    pub model_output: String,
    pub web_url: String,
}

/// Asks the hosted model to translate criteria into registry parameters.
#[derive(Clone)]
pub struct QueryBuilder {
    model: Model,
}

impl QueryBuilder {
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    /// Validate criteria, call the model once (plus policy retries) and parse its reply.
    #[instrument(skip_all)]
    pub async fn build(&self, criteria: &SearchCriteria) -> Result<QueryPreview> {
        criteria.validate()?;

        let system = &prompts::get(TemplateId::QuerySystem).text;
        let prompt = prompts::get(TemplateId::QueryUser).render(&criteria.bindings())?;
        let model_output = self.model.complete(system, &prompt).await?;

        let mut query = StructuredQuery::from_model_output(&model_output)?;
        for filter in criteria.date_filters() {
            query.and_advanced(&filter);
        }

        info!(
            params = query.len(),
            model = self.model.name(),
            "generated registry query"
        );
        let web_url = web_search_url(&query);
        Ok(QueryPreview {
            query,
            model_output,
            web_url,
        })
    }
}
