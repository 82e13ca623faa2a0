//! CLI entry-point for summarising exported studies.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::export,
    summarize::{ProtocolDraftInput, SummaryKind, SummaryRequest, Summarizer},
};

/// Args for the `summarize` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Kind of summary to generate.
    #[arg(long, value_enum, default_value = "overview")]
    pub kind: SummaryKind,
    /// JSON file written by `search --out`.
    #[arg(long, value_name = "JSON")]
    pub studies: PathBuf,
    /// Keep only these NCT IDs (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,
    /// Patient description used by the overview templates.
    #[arg(long, default_value = "")]
    pub patient: String,
    /// Save the summary text as well as printing it.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
    #[command(flatten)]
    pub protocol: ProtocolArgs,
}

/// Planned-trial fields for `--kind protocol`.
#[derive(Debug, Clone, ClapArgs)]
pub struct ProtocolArgs {
    #[arg(long)]
    pub target_condition: Option<String>,
    #[arg(long = "protocol-intervention")]
    pub intervention: Option<String>,
    #[arg(long)]
    pub primary_outcome: Option<String>,
    #[arg(long)]
    pub phase: Option<String>,
    #[arg(long)]
    pub design: Option<String>,
    #[arg(long)]
    pub duration_weeks: Option<u32>,
    #[arg(long)]
    pub population: Option<u32>,
    #[arg(long)]
    pub control_group: Option<String>,
    #[arg(long)]
    pub inclusion: Option<String>,
    #[arg(long)]
    pub exclusion: Option<String>,
    /// Brief, Standard or Detailed.
    #[arg(long)]
    pub detail_level: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub focus: Vec<String>,
}

impl From<ProtocolArgs> for ProtocolDraftInput {
    fn from(args: ProtocolArgs) -> Self {
        let defaults = ProtocolDraftInput::default();
        ProtocolDraftInput {
            target_condition: args.target_condition.unwrap_or_default(),
            intervention: args.intervention.unwrap_or_default(),
            primary_outcome: args.primary_outcome.unwrap_or_default(),
            phase: args.phase.unwrap_or(defaults.phase),
            study_design: args.design.unwrap_or(defaults.study_design),
            duration_weeks: args.duration_weeks.unwrap_or(defaults.duration_weeks),
            population_size: args.population.unwrap_or(defaults.population_size),
            control_group: args.control_group.unwrap_or_default(),
            inclusion_criteria: args.inclusion.unwrap_or_default(),
            exclusion_criteria: args.exclusion.unwrap_or_default(),
            detail_level: args.detail_level.unwrap_or(defaults.detail_level),
            focus_areas: if args.focus.is_empty() {
                defaults.focus_areas
            } else {
                args.focus
            },
        }
    }
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let mut studies = export::read_studies(&args.studies)?;
    if !args.select.is_empty() {
        studies.retain(|s| {
            args.select
                .iter()
                .any(|id| id.trim().eq_ignore_ascii_case(&s.nct_id))
        });
        if studies.is_empty() {
            bail!("none of the selected NCT IDs are in {:?}", args.studies);
        }
    }

    let protocol = (args.kind == SummaryKind::Protocol).then(|| args.protocol.clone().into());
    let request = SummaryRequest::for_kind(args.kind, studies, &args.patient, protocol)?;
    let summarizer = Summarizer::new(super::model(&settings)?);
    let summary = summarizer.summarize(&request).await?;

    if let Some(path) = &args.out {
        let path = settings.join_output(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &summary.text)?;
        info!(path = %path.display(), "saved summary");
    }
    println!("{}", summary.text);
    if let Some(distribution) = &summary.distribution {
        println!("\n{distribution}");
    }
    Ok(())
}
