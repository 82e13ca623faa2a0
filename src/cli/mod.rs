//! Command-line interface wiring for ctgov-assistant.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};

use crate::{
    config::Settings,
    llm::{MessagesClient, Model},
    query::{DateRange, SearchCriteria},
};

pub mod query;
pub mod search;
pub mod serve;
pub mod summarize;
pub mod templates;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Clinical-trial search and summarization assistant", long_about = None)]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Query(args) => query::run(args, settings).await,
            Commands::Search(args) => search::run(args, settings).await,
            Commands::Summarize(args) => summarize::run(args, settings).await,
            Commands::Templates(args) => templates::run(args),
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate and preview a registry query without running it.
    Query(query::Args),
    /// Generate a query, fetch matching studies and optionally export them.
    Search(search::Args),
    /// Summarise studies from an exported JSON file.
    Summarize(summarize::Args),
    /// List or print the prompt templates.
    Templates(templates::Args),
    /// Serve the JSON API and web page.
    Serve(serve::Args),
}

/// PICO fields and date windows shared by `query` and `search`.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct CriteriaArgs {
    /// Patient population, e.g. "adult patients with type 2 diabetes".
    #[arg(short = 'p', long)]
    pub patient: Option<String>,
    /// Intervention under study.
    #[arg(short = 'i', long)]
    pub intervention: Option<String>,
    /// Comparator.
    #[arg(short = 'c', long)]
    pub comparison: Option<String>,
    /// Outcome of interest.
    #[arg(short = 'o', long)]
    pub outcome: Option<String>,
    /// Any other condition (age, BMI, ...); not dates.
    #[arg(short = 'a', long)]
    pub additional: Option<String>,
    /// Earliest study start date (YYYY-MM-DD).
    #[arg(long)]
    pub start_from: Option<NaiveDate>,
    /// Latest study start date (YYYY-MM-DD).
    #[arg(long)]
    pub start_to: Option<NaiveDate>,
    /// Earliest completion date (YYYY-MM-DD).
    #[arg(long)]
    pub completed_from: Option<NaiveDate>,
    /// Latest completion date (YYYY-MM-DD).
    #[arg(long)]
    pub completed_to: Option<NaiveDate>,
}

impl From<CriteriaArgs> for SearchCriteria {
    fn from(args: CriteriaArgs) -> Self {
        SearchCriteria {
            patient: args.patient,
            intervention: args.intervention,
            comparison: args.comparison,
            outcome: args.outcome,
            additional_condition: args.additional,
            start_date_range: DateRange::new(args.start_from, args.start_to),
            completion_date_range: DateRange::new(args.completed_from, args.completed_to),
        }
    }
}

/// Hosted model client configured from settings.
pub fn model(settings: &Settings) -> Result<Model> {
    let client = MessagesClient::from_settings(settings)?;
    Ok(Model::new(Arc::new(client), settings.retry_policy()))
}
