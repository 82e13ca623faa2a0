//! CLI entry-point for running a registry search end to end.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument, warn};

use super::CriteriaArgs;
use crate::{
    config::Settings,
    data::{export, RegistryClient, StructuredStudy},
    query::{web_search_url, QueryBuilder, SearchCriteria, StructuredQuery},
    summarize::{SummaryKind, SummaryRequest, Summarizer},
};

const TITLE_WIDTH: usize = 70;

/// Args for the `search` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub criteria: CriteriaArgs,
    /// Run a previously generated (and possibly edited) query instead of asking the model.
    #[arg(long, value_name = "JSON")]
    pub query_file: Option<PathBuf>,
    /// Maximum studies to fetch (defaults to MAX_STUDIES).
    #[arg(long)]
    pub max: Option<usize>,
    /// Export results; `.csv` writes CSV, anything else JSON. Repeatable.
    #[arg(long = "out", value_name = "PATH")]
    pub outputs: Vec<PathBuf>,
    /// Summarise the results right away.
    #[arg(long, value_enum)]
    pub summary: Option<SummaryKind>,
}

#[instrument(skip_all)]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let criteria = SearchCriteria::from(args.criteria.clone());
    let query = match &args.query_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read query from {path:?}"))?;
            StructuredQuery::from_model_output(&raw)?
        }
        None => {
            let builder = QueryBuilder::new(super::model(&settings)?);
            builder.build(&criteria).await?.query
        }
    };
    eprintln!("{}", serde_json::to_string_pretty(&query)?);
    eprintln!("Open on ClinicalTrials.gov: {}", web_search_url(&query));

    let registry = RegistryClient::from_settings(&settings)?;
    let max = args.max.unwrap_or(settings.max_studies);
    let results = registry.search(&query, max).await?;
    let studies = results.structured();
    if studies.len() < results.studies.len() {
        warn!(
            skipped = results.studies.len() - studies.len(),
            "some registry records could not be structured"
        );
    }

    print_table(&studies);
    match results.total_count {
        Some(total) => println!("\n{} of {total} matching studies", studies.len()),
        None => println!("\n{} studies", studies.len()),
    }
    if results.truncated {
        println!("(stopped at {max}; raise --max to fetch more)");
    }

    for path in &args.outputs {
        let path = settings.join_output(path);
        export::export_to_path(&studies, &path)?;
        println!("wrote {}", path.display());
    }

    if let Some(kind) = args.summary {
        let summarizer = Summarizer::new(super::model(&settings)?);
        let request = SummaryRequest::for_kind(kind, studies, criteria.patient_text(), None)?;
        let summary = summarizer.summarize(&request).await?;
        info!(kind = ?summary.kind, "summary ready");
        println!("\n{}", summary.text);
        if let Some(distribution) = &summary.distribution {
            println!("\n{distribution}");
        }
    }
    Ok(())
}

fn print_table(studies: &[StructuredStudy]) {
    println!("{:<12} {:<24} {:<11} TITLE", "NCT ID", "STATUS", "START");
    for study in studies {
        println!(
            "{:<12} {:<24} {:<11} {}",
            study.nct_id,
            study.status.as_deref().unwrap_or("-"),
            study.start_date.as_deref().unwrap_or("-"),
            crate::summarize::bindings::clip(&study.title, TITLE_WIDTH),
        );
    }
}
