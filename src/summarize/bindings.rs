//! Turning structured studies into bounded template values.

use indexmap::IndexMap;

use crate::data::study::{Publication, StructuredStudy};

/// Entries shown in every "top N" template slot.
pub const TOP_N: usize = 5;
/// Studies bound into prompts that list studies one by one.
pub const MAX_PROMPT_STUDIES: usize = 20;
/// Publications bound into the publication summary.
pub const MAX_PUBLICATIONS: usize = 5;

const SNIPPET_CHARS: usize = 50;
const CRITERIA_CHARS: usize = 1500;
const EXAMPLE_CHARS: usize = 300;
const EXAMPLES: usize = 3;

/// Most frequent non-empty items, ties kept in first-seen order.
pub fn top_items<'a, I>(items: I, n: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for item in items {
        let item = item.trim();
        if !item.is_empty() {
            *counts.entry(item).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(item, count)| (item.to_string(), count))
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

/// Numbered list, one `"k. item (n studies)"` line per entry.
pub fn enumerate(ranked: &[(String, usize)]) -> String {
    enumerate_with(ranked, |item| item.to_string())
}

/// Like [`enumerate`] but each item is first passed through `show`.
pub fn enumerate_with<F>(ranked: &[(String, usize)], show: F) -> String
where
    F: Fn(&str) -> String,
{
    if ranked.is_empty() {
        return "(none reported)".to_string();
    }
    ranked
        .iter()
        .enumerate()
        .map(|(idx, (item, count))| {
            let unit = if *count == 1 { "study" } else { "studies" };
            format!("{}. {} ({count} {unit})", idx + 1, show(item))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn clip(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.trim().is_empty()).unwrap_or("unknown")
}

fn joined(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

pub fn interventions_of(study: &StructuredStudy) -> String {
    let names = study.intervention_names();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

pub fn ranked_interventions(studies: &[StructuredStudy]) -> Vec<(String, usize)> {
    top_items(studies.iter().flat_map(|s| s.intervention_names()), TOP_N)
}

pub fn ranked_primary_outcomes(studies: &[StructuredStudy]) -> Vec<(String, usize)> {
    top_items(
        studies
            .iter()
            .flat_map(|s| s.outcomes.primary.iter().map(String::as_str)),
        TOP_N,
    )
}

pub fn top_interventions(studies: &[StructuredStudy]) -> String {
    enumerate(&ranked_interventions(studies))
}

pub fn top_primary_outcomes(studies: &[StructuredStudy]) -> String {
    enumerate(&ranked_primary_outcomes(studies))
}

pub fn top_secondary_outcomes(studies: &[StructuredStudy]) -> String {
    enumerate(&top_items(
        studies
            .iter()
            .flat_map(|s| s.outcomes.secondary.iter().map(String::as_str)),
        TOP_N,
    ))
}

/// Most common criteria texts, each shown as a short snippet.
pub fn top_eligibility(studies: &[StructuredStudy]) -> String {
    let ranked = top_items(
        studies.iter().map(|s| s.eligibility.criteria.as_str()),
        TOP_N,
    );
    enumerate_with(&ranked, |criteria| {
        clip(&criteria.replace('\n', " "), SNIPPET_CHARS)
    })
}

/// Compact digest used by the cross-study summary.
pub fn study_digest(study: &StructuredStudy) -> String {
    format!(
        "### Study {}\n- Title: {}\n- Status: {}\n- Start date: {}\n- Completion date: {}\n- Interventions: {}\n- Primary outcomes: {}\n- Secondary outcomes: {}",
        study.nct_id,
        study.title,
        or_unknown(&study.status),
        or_unknown(&study.start_date),
        or_unknown(&study.end_date),
        interventions_of(study),
        joined(&study.outcomes.primary),
        joined(&study.outcomes.secondary),
    )
}

/// Digest plus eligibility and design, used by the comparison.
pub fn comparison_entry(study: &StructuredStudy) -> String {
    format!(
        "NCT ID: {}\nTitle: {}\nStatus: {}\nDesign: {}\nInterventions: {}\nPrimary outcomes: {}\nSecondary outcomes: {}\nEligibility criteria:\n{}",
        study.nct_id,
        study.title,
        or_unknown(&study.status),
        design_of(study),
        interventions_of(study),
        joined(&study.outcomes.primary),
        joined(&study.outcomes.secondary),
        clip(&study.eligibility.criteria, CRITERIA_CHARS),
    )
}

/// Reference study shown to the protocol drafter.
pub fn reference_entry(study: &StructuredStudy) -> String {
    format!(
        "## Study {}\nTitle: {}\nDesign: {}\nEligibility: {}\nInterventions: {}\nPrimary outcomes: {}\nSecondary outcomes: {}\nPeriod: {} - {}",
        study.nct_id,
        study.title,
        design_of(study),
        clip(&study.eligibility.criteria, CRITERIA_CHARS),
        interventions_of(study),
        joined(&study.outcomes.primary),
        joined(&study.outcomes.secondary),
        or_unknown(&study.start_date),
        or_unknown(&study.end_date),
    )
}

fn design_of(study: &StructuredStudy) -> String {
    let design = &study.design;
    let mut parts: Vec<String> = Vec::new();
    if let Some(kind) = &design.study_type {
        parts.push(kind.clone());
    }
    if !design.phases.is_empty() {
        parts.push(design.phases.join("/"));
    }
    if let Some(allocation) = &design.allocation {
        parts.push(allocation.clone());
    }
    if let Some(n) = design.enrollment {
        parts.push(format!("n={n}"));
    }
    if parts.is_empty() {
        "unknown".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn eligibility_entry(study: &StructuredStudy) -> String {
    format!(
        "### {}\n{}",
        study.nct_id,
        clip(&study.eligibility.criteria, CRITERIA_CHARS)
    )
}

pub fn publication_entry(publication: &Publication) -> String {
    format!(
        "Title: {}\nCitation: {}\nPMID: {}",
        or_unknown(&publication.title),
        or_unknown(&publication.citation),
        or_unknown(&publication.pmid),
    )
}

/// Age, sex and volunteer statistics plus example criteria.
pub fn criteria_statistics(studies: &[StructuredStudy]) -> String {
    let sex = top_items(
        studies
            .iter()
            .filter_map(|s| s.eligibility.sex.as_deref()),
        usize::MAX,
    )
    .into_iter()
    .map(|(sex, count)| format!("{sex} {count}"))
    .collect::<Vec<_>>();
    let min_age = top_items(
        studies
            .iter()
            .filter_map(|s| s.eligibility.minimum_age.as_deref()),
        TOP_N,
    );
    let max_age = top_items(
        studies
            .iter()
            .filter_map(|s| s.eligibility.maximum_age.as_deref()),
        TOP_N,
    );
    let volunteers = studies
        .iter()
        .filter(|s| s.eligibility.healthy_volunteers == Some(true))
        .count();

    let examples = |pick: fn(&StructuredStudy) -> Option<&String>| {
        let lines = studies
            .iter()
            .filter_map(|s| pick(s).map(|text| (s, text)))
            .take(EXAMPLES)
            .map(|(s, text)| format!("  [{}] {}", s.nct_id, clip(&text.replace('\n', " "), EXAMPLE_CHARS)))
            .collect::<Vec<_>>();
        if lines.is_empty() {
            "  (none)".to_string()
        } else {
            lines.join("\n")
        }
    };

    format!(
        "- Sex: {}\n- Minimum age (top {TOP_N}):\n{}\n- Maximum age (top {TOP_N}):\n{}\n- Healthy volunteers accepted: {volunteers} of {} studies\n- Example inclusion criteria:\n{}\n- Example exclusion criteria:\n{}",
        if sex.is_empty() { "unknown".to_string() } else { sex.join(", ") },
        enumerate(&min_age),
        enumerate(&max_age),
        studies.len(),
        examples(|s| s.inclusion_criteria.as_ref()),
        examples(|s| s.exclusion_criteria.as_ref()),
    )
}
