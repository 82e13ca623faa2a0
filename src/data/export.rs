//! Flat CSV and JSON exports of search results.

use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use super::study::StructuredStudy;

/// One CSV row per study; list fields are joined with `"; "`.
#[derive(Debug, Serialize)]
struct StudyRow<'a> {
    nct_id: &'a str,
    title: &'a str,
    status: &'a str,
    start_date: &'a str,
    end_date: &'a str,
    conditions: String,
    study_type: &'a str,
    phases: String,
    enrollment: Option<u64>,
    interventions: String,
    primary_outcomes: String,
    secondary_outcomes: String,
    sponsor: &'a str,
    sex: &'a str,
    minimum_age: &'a str,
    maximum_age: &'a str,
    healthy_volunteers: Option<bool>,
    locations: usize,
    publications: usize,
    brief_summary: &'a str,
}

impl<'a> From<&'a StructuredStudy> for StudyRow<'a> {
    fn from(study: &'a StructuredStudy) -> Self {
        let opt = |value: &'a Option<String>| value.as_deref().unwrap_or("");
        StudyRow {
            nct_id: &study.nct_id,
            title: &study.title,
            status: opt(&study.status),
            start_date: opt(&study.start_date),
            end_date: opt(&study.end_date),
            conditions: study.conditions.join("; "),
            study_type: opt(&study.design.study_type),
            phases: study.design.phases.join("; "),
            enrollment: study.design.enrollment,
            interventions: study.intervention_names().join("; "),
            primary_outcomes: study.outcomes.primary.join("; "),
            secondary_outcomes: study.outcomes.secondary.join("; "),
            sponsor: opt(&study.sponsor.name),
            sex: opt(&study.eligibility.sex),
            minimum_age: opt(&study.eligibility.minimum_age),
            maximum_age: opt(&study.eligibility.maximum_age),
            healthy_volunteers: study.eligibility.healthy_volunteers,
            locations: study.locations.len(),
            publications: study.publications.len(),
            brief_summary: &study.brief_summary,
        }
    }
}

/// Write studies as CSV with a header row.
pub fn write_csv<W: Write>(studies: &[StructuredStudy], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for study in studies {
        csv.serialize(StudyRow::from(study))?;
    }
    csv.flush()?;
    Ok(())
}

/// Export to `path`, choosing CSV or pretty JSON by extension.
pub fn export_to_path(studies: &[StructuredStudy], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {parent:?}"))?;
    }
    let file = File::create(path).with_context(|| format!("create {path:?}"))?;
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_csv(studies, file)?;
    } else {
        serde_json::to_writer_pretty(file, studies)?;
    }
    info!(path = %path.display(), count = studies.len(), "exported studies");
    Ok(())
}

/// Read studies previously exported as JSON.
pub fn read_studies(path: &Path) -> Result<Vec<StructuredStudy>> {
    let file = File::open(path).with_context(|| format!("open {path:?}"))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parse studies from {path:?}"))
}
