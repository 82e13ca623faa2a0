//! CLI entry-point for previewing a generated registry query.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use super::CriteriaArgs;
use crate::{
    config::Settings,
    query::{QueryBuilder, SearchCriteria},
};

/// Args for the `query` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub criteria: CriteriaArgs,
    /// Also print the raw model reply.
    #[arg(long)]
    pub raw: bool,
}

#[instrument(skip_all)]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let builder = QueryBuilder::new(super::model(&settings)?);
    let criteria = SearchCriteria::from(args.criteria);
    let preview = builder.build(&criteria).await?;

    if args.raw {
        eprintln!("{}", preview.model_output);
    }
    println!("{}", serde_json::to_string_pretty(&preview.query)?);
    println!("\nOpen on ClinicalTrials.gov: {}", preview.web_url);
    Ok(())
}
