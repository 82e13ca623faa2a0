//! Summaries of retrieved studies produced by the hosted model.

pub mod bindings;

use std::{fmt, slice};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    data::StructuredStudy,
    error::{AssistantError, Result},
    llm::Model,
    prompts::{self, Bindings, TemplateId},
};

use bindings::{MAX_PROMPT_STUDIES, MAX_PUBLICATIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    /// Overall trend with top-5 interventions, criteria and outcomes.
    Overview,
    /// A single study.
    Study,
    /// Themes across the selected studies.
    CrossStudy,
    /// Aggregated eligibility criteria.
    Eligibility,
    /// Publications linked to the studies.
    Publications,
    /// Side-by-side comparison of two or more studies.
    Comparison,
    /// Draft protocol for a new trial.
    Protocol,
    /// Multi-section analysis including criteria statistics.
    Comprehensive,
}

impl SummaryKind {
    pub fn template(&self) -> TemplateId {
        match self {
            Self::Overview => TemplateId::Overview,
            Self::Study => TemplateId::Study,
            Self::CrossStudy => TemplateId::CrossStudy,
            Self::Eligibility => TemplateId::Eligibility,
            Self::Publications => TemplateId::Publications,
            Self::Comparison => TemplateId::Comparison,
            Self::Protocol => TemplateId::Protocol,
            Self::Comprehensive => TemplateId::Comprehensive,
        }
    }
}

/// Planned trial described by the researcher for a protocol draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolDraftInput {
    pub target_condition: String,
    pub intervention: String,
    pub primary_outcome: String,
    pub phase: String,
    pub study_design: String,
    pub duration_weeks: u32,
    pub population_size: u32,
    pub control_group: String,
    pub inclusion_criteria: String,
    pub exclusion_criteria: String,
    pub detail_level: String,
    pub focus_areas: Vec<String>,
}

impl Default for ProtocolDraftInput {
    fn default() -> Self {
        Self {
            target_condition: String::new(),
            intervention: String::new(),
            primary_outcome: String::new(),
            phase: "Phase 3".into(),
            study_design: "Randomized Controlled Trial".into(),
            duration_weeks: 52,
            population_size: 100,
            control_group: String::new(),
            inclusion_criteria: String::new(),
            exclusion_criteria: String::new(),
            detail_level: "Standard".into(),
            focus_areas: vec!["eligibility criteria".into(), "outcome measures".into()],
        }
    }
}

/// What to summarise, with the data bound into the template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryRequest {
    Overview {
        #[serde(default)]
        patient: String,
        studies: Vec<StructuredStudy>,
    },
    Study {
        study: StructuredStudy,
    },
    CrossStudy {
        studies: Vec<StructuredStudy>,
    },
    Eligibility {
        studies: Vec<StructuredStudy>,
    },
    Publications {
        studies: Vec<StructuredStudy>,
    },
    Comparison {
        studies: Vec<StructuredStudy>,
    },
    Protocol {
        input: ProtocolDraftInput,
        studies: Vec<StructuredStudy>,
    },
    Comprehensive {
        #[serde(default)]
        patient: String,
        studies: Vec<StructuredStudy>,
    },
}

/// A rendered prompt ready for the model.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub template: TemplateId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedItem {
    pub name: String,
    pub count: usize,
}

/// Most frequent interventions and primary outcomes, for charting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub interventions: Vec<RankedItem>,
    pub primary_outcomes: Vec<RankedItem>,
}

impl Distribution {
    pub fn of(studies: &[StructuredStudy]) -> Self {
        let items = |ranked: Vec<(String, usize)>| {
            ranked
                .into_iter()
                .map(|(name, count)| RankedItem { name, count })
                .collect()
        };
        Self {
            interventions: items(bindings::ranked_interventions(studies)),
            primary_outcomes: items(bindings::ranked_primary_outcomes(studies)),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, items) in [
            ("Top interventions", &self.interventions),
            ("Top primary outcomes", &self.primary_outcomes),
        ] {
            writeln!(f, "{title}:")?;
            if items.is_empty() {
                writeln!(f, "  (none)")?;
            }
            for item in items {
                writeln!(f, "  {:>3} {} {}", item.count, "#".repeat(item.count.min(40)), item.name)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub kind: SummaryKind,
    pub studies: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
}

fn patient_or_default(patient: &str) -> &str {
    if patient.trim().is_empty() {
        "not specified"
    } else {
        patient.trim()
    }
}

fn capped(studies: &[StructuredStudy]) -> &[StructuredStudy] {
    if studies.len() > MAX_PROMPT_STUDIES {
        warn!(
            selected = studies.len(),
            kept = MAX_PROMPT_STUDIES,
            "too many studies for one prompt, keeping the first ones"
        );
        &studies[..MAX_PROMPT_STUDIES]
    } else {
        studies
    }
}

fn joined_entries<F>(studies: &[StructuredStudy], entry: F) -> String
where
    F: Fn(&StructuredStudy) -> String,
{
    capped(studies)
        .iter()
        .map(entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl SummaryRequest {
    pub fn kind(&self) -> SummaryKind {
        match self {
            Self::Overview { .. } => SummaryKind::Overview,
            Self::Study { .. } => SummaryKind::Study,
            Self::CrossStudy { .. } => SummaryKind::CrossStudy,
            Self::Eligibility { .. } => SummaryKind::Eligibility,
            Self::Publications { .. } => SummaryKind::Publications,
            Self::Comparison { .. } => SummaryKind::Comparison,
            Self::Protocol { .. } => SummaryKind::Protocol,
            Self::Comprehensive { .. } => SummaryKind::Comprehensive,
        }
    }

    pub fn studies(&self) -> &[StructuredStudy] {
        match self {
            Self::Study { study } => slice::from_ref(study),
            Self::Overview { studies, .. }
            | Self::CrossStudy { studies }
            | Self::Eligibility { studies }
            | Self::Publications { studies }
            | Self::Comparison { studies }
            | Self::Protocol { studies, .. }
            | Self::Comprehensive { studies, .. } => studies,
        }
    }

    /// Ranked counts behind the overview and comprehensive prompts.
    pub fn distribution(&self) -> Option<Distribution> {
        match self {
            Self::Overview { studies, .. } | Self::Comprehensive { studies, .. } => {
                Some(Distribution::of(studies))
            }
            _ => None,
        }
    }

    /// Build the request for `kind` over the selected studies.
    pub fn for_kind(
        kind: SummaryKind,
        studies: Vec<StructuredStudy>,
        patient: &str,
        protocol: Option<ProtocolDraftInput>,
    ) -> Result<Self> {
        let patient = patient.to_string();
        Ok(match kind {
            SummaryKind::Overview => Self::Overview { patient, studies },
            SummaryKind::Study => {
                let mut studies = studies.into_iter();
                let study = studies.next().ok_or_else(no_studies)?;
                if studies.next().is_some() {
                    return Err(AssistantError::UserInput(
                        "a study summary covers exactly one study".into(),
                    ));
                }
                Self::Study { study }
            }
            SummaryKind::CrossStudy => Self::CrossStudy { studies },
            SummaryKind::Eligibility => Self::Eligibility { studies },
            SummaryKind::Publications => Self::Publications { studies },
            SummaryKind::Comparison => Self::Comparison { studies },
            SummaryKind::Protocol => Self::Protocol {
                input: protocol.unwrap_or_default(),
                studies,
            },
            SummaryKind::Comprehensive => Self::Comprehensive { patient, studies },
        })
    }

    /// Check the selection and render the template; no model call.
    pub fn prepare(&self) -> Result<PreparedPrompt> {
        let studies = self.studies();
        if studies.is_empty() {
            return Err(no_studies());
        }

        let values = match self {
            Self::Overview { patient, studies } => Bindings::new()
                .set("num_studies", studies.len().to_string())
                .set("patient", patient_or_default(patient))
                .set("interventions", bindings::top_interventions(studies))
                .set("eligibility", bindings::top_eligibility(studies))
                .set("primary_outcomes", bindings::top_primary_outcomes(studies))
                .set("secondary_outcomes", bindings::top_secondary_outcomes(studies)),
            Self::Study { study } => {
                let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "unknown".into());
                Bindings::new()
                    .set("nct_id", study.nct_id.as_str())
                    .set("title", study.title.as_str())
                    .set("status", opt(&study.status))
                    .set("start_date", opt(&study.start_date))
                    .set("end_date", opt(&study.end_date))
                    .set("sponsor", opt(&study.sponsor.name))
                    .set("interventions", bindings::interventions_of(study))
                    .set("primary_outcomes", study.outcomes.primary.join(", "))
                    .set("secondary_outcomes", study.outcomes.secondary.join(", "))
                    .set("brief_summary", study.brief_summary.as_str())
            }
            Self::CrossStudy { studies } => Bindings::new()
                .set("summaries", joined_entries(studies, bindings::study_digest)),
            Self::Eligibility { studies } => Bindings::new()
                .set("criteria", joined_entries(studies, bindings::eligibility_entry)),
            Self::Publications { studies } => {
                let entries: Vec<String> = studies
                    .iter()
                    .flat_map(|s| s.publications.iter())
                    .take(MAX_PUBLICATIONS)
                    .map(bindings::publication_entry)
                    .collect();
                if entries.is_empty() {
                    return Err(AssistantError::UserInput(
                        "none of the selected studies lists a publication".into(),
                    ));
                }
                Bindings::new().set("summaries", entries.join("\n\n"))
            }
            Self::Comparison { studies } => {
                if studies.len() < 2 {
                    return Err(AssistantError::UserInput(
                        "select at least two studies to compare".into(),
                    ));
                }
                Bindings::new().set(
                    "comparison_data",
                    joined_entries(studies, bindings::comparison_entry),
                )
            }
            Self::Protocol { input, studies } => {
                if input.target_condition.trim().is_empty() {
                    return Err(AssistantError::UserInput(
                        "a protocol draft needs a target condition".into(),
                    ));
                }
                let or_none = |v: &str| {
                    if v.trim().is_empty() {
                        "not specified".to_string()
                    } else {
                        v.trim().to_string()
                    }
                };
                Bindings::new()
                    .set("target_condition", input.target_condition.trim())
                    .set("intervention", or_none(&input.intervention))
                    .set("primary_outcome", or_none(&input.primary_outcome))
                    .set("phase", or_none(&input.phase))
                    .set("study_design", or_none(&input.study_design))
                    .set("duration_weeks", input.duration_weeks.to_string())
                    .set("population_size", input.population_size.to_string())
                    .set("control_group", or_none(&input.control_group))
                    .set("inclusion_criteria", or_none(&input.inclusion_criteria))
                    .set("exclusion_criteria", or_none(&input.exclusion_criteria))
                    .set("detail_level", or_none(&input.detail_level))
                    .set("focus_areas", or_none(&input.focus_areas.join(", ")))
                    .set(
                        "existing_studies",
                        joined_entries(studies, bindings::reference_entry),
                    )
            }
            Self::Comprehensive { patient, studies } => Bindings::new()
                .set("num_studies", studies.len().to_string())
                .set("patient", patient_or_default(patient))
                .set("interventions", bindings::top_interventions(studies))
                .set("primary_outcomes", bindings::top_primary_outcomes(studies))
                .set("secondary_outcomes", bindings::top_secondary_outcomes(studies))
                .set("criteria_analysis", bindings::criteria_statistics(studies)),
        };

        let template = self.kind().template();
        let text = prompts::get(template).render(&values)?;
        Ok(PreparedPrompt { template, text })
    }
}

fn no_studies() -> AssistantError {
    AssistantError::UserInput("select at least one study to summarise".into())
}

/// Sends prepared summary prompts to the hosted model.
#[derive(Clone)]
pub struct Summarizer {
    model: Model,
}

impl Summarizer {
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    #[instrument(skip_all, fields(kind = ?request.kind(), studies = request.studies().len()))]
    pub async fn summarize(&self, request: &SummaryRequest) -> Result<Summary> {
        let prompt = request.prepare()?;
        let text = self.model.complete("", &prompt.text).await?;
        info!(chars = text.len(), template = %prompt.template, "summary generated");
        Ok(Summary {
            kind: request.kind(),
            studies: request.studies().len(),
            text,
            distribution: request.distribution(),
        })
    }
}
