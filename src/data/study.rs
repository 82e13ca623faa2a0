//! Study records as returned by the registry and their structured projection.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One study document exactly as the registry returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyRecord(pub Value);

impl StudyRecord {
    pub fn nct_id(&self) -> Option<&str> {
        self.0
            .pointer("/protocolSection/identificationModule/nctId")
            .and_then(Value::as_str)
    }

    /// Project into the fields summaries and displays rely on.
    ///
    /// Records whose sections have an unexpected shape are skipped with a
    /// warning instead of failing the whole search.
    pub fn structure(&self) -> Option<StructuredStudy> {
        if !self.0.is_object() {
            warn!("skipping study record that is not a JSON object");
            return None;
        }
        match RawStudy::deserialize(&self.0) {
            Ok(raw) => Some(raw.into_structured()),
            Err(err) => {
                warn!(nct_id = ?self.nct_id(), %err, "skipping study with unexpected structure");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredStudy {
    pub nct_id: String,
    pub title: String,
    pub brief_summary: String,
    pub detailed_description: String,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub conditions: Vec<String>,
    pub design: StudyDesign,
    pub eligibility: Eligibility,
    pub inclusion_criteria: Option<String>,
    pub exclusion_criteria: Option<String>,
    pub interventions: Vec<Intervention>,
    pub outcomes: Outcomes,
    pub sponsor: Sponsor,
    pub locations: Vec<Location>,
    pub publications: Vec<Publication>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyDesign {
    pub study_type: Option<String>,
    pub phases: Vec<String>,
    pub allocation: Option<String>,
    pub enrollment: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Eligibility {
    pub criteria: String,
    pub healthy_volunteers: Option<bool>,
    pub sex: Option<String>,
    pub minimum_age: Option<String>,
    pub maximum_age: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intervention {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outcomes {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sponsor {
    pub name: Option<String>,
    pub class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub facility: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Publication {
    pub title: Option<String>,
    pub citation: Option<String>,
    pub pmid: Option<String>,
}

impl StructuredStudy {
    /// `NCT…: title`, as shown in selection lists.
    pub fn label(&self) -> String {
        format!("{}: {}", self.nct_id, self.title)
    }

    pub fn intervention_names(&self) -> Vec<&str> {
        self.interventions
            .iter()
            .map(|i| i.name.as_str())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*?>").expect("html regex"));

/// Strip HTML tags from registry free text.
pub fn clean_html(raw: &str) -> String {
    HTML_TAG.replace_all(raw, "").into_owned()
}

/// Normalise "March 5, 2021" to "2021-03-05"; other formats pass through.
pub fn normalize_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw.trim(), "%B %d, %Y")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Lines under the `"{section} Criteria:"` heading, up to the next heading.
pub fn criteria_section(text: &str, section: &str) -> Option<String> {
    let section = section.to_ascii_lowercase();
    let mut collected = Vec::new();
    let mut inside = false;
    for line in text.lines() {
        match criteria_heading(line) {
            Some(label) => inside = label.contains(&section),
            None if inside && !line.trim().is_empty() => collected.push(line.trim()),
            None => {}
        }
    }
    (!collected.is_empty()).then(|| collected.join("\n"))
}

/// Lowercased label of a heading line such as `"Key Inclusion Criteria:"`.
///
/// Bullets and prose that merely mention `criteria:` are not headings.
fn criteria_heading(line: &str) -> Option<String> {
    const SUFFIX: &str = "criteria:";
    const MAX_LABEL_WORDS: usize = 3;

    let line = line.trim();
    let split = line.len().checked_sub(SUFFIX.len())?;
    if !line.is_char_boundary(split) || !line[split..].eq_ignore_ascii_case(SUFFIX) {
        return None;
    }
    let label = line[..split].trim();
    let starts_with_letter = label.chars().next().is_some_and(char::is_alphabetic);
    (starts_with_letter && label.split_whitespace().count() <= MAX_LABEL_WORDS)
        .then(|| label.to_lowercase())
}

// Registry document shape; only the parts the projection reads.

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawStudy {
    protocol_section: ProtocolSection,
    derived_section: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProtocolSection {
    identification_module: IdentificationModule,
    status_module: StatusModule,
    sponsor_collaborators_module: SponsorModule,
    description_module: DescriptionModule,
    conditions_module: ConditionsModule,
    design_module: DesignModule,
    arms_interventions_module: ArmsInterventionsModule,
    outcomes_module: OutcomesModule,
    eligibility_module: EligibilityModule,
    contacts_locations_module: ContactsLocationsModule,
    references_module: ReferencesModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IdentificationModule {
    nct_id: Option<String>,
    brief_title: Option<String>,
    official_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StatusModule {
    overall_status: Option<String>,
    start_date_struct: Option<DateStruct>,
    completion_date_struct: Option<DateStruct>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SponsorModule {
    lead_sponsor: Sponsor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DescriptionModule {
    brief_summary: Option<String>,
    detailed_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConditionsModule {
    conditions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DesignModule {
    study_type: Option<String>,
    phases: Vec<String>,
    design_info: DesignInfo,
    enrollment_info: EnrollmentInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DesignInfo {
    allocation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnrollmentInfo {
    count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArmsInterventionsModule {
    interventions: Vec<Intervention>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OutcomesModule {
    primary_outcomes: Vec<OutcomeMeasure>,
    secondary_outcomes: Vec<OutcomeMeasure>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutcomeMeasure {
    measure: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EligibilityModule {
    eligibility_criteria: Option<String>,
    healthy_volunteers: Option<bool>,
    sex: Option<String>,
    minimum_age: Option<String>,
    maximum_age: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactsLocationsModule {
    locations: Vec<RawLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLocation {
    facility: Option<Facility>,
    city: Option<String>,
    country: Option<String>,
}

/// Older documents nest the facility name in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Facility {
    Name(String),
    Detailed { name: Option<String> },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReferencesModule {
    references: Vec<RawReference>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawReference {
    title: Option<String>,
    citation: Option<String>,
    pmid: Option<String>,
}

impl RawStudy {
    fn into_structured(self) -> StructuredStudy {
        let p = self.protocol_section;
        let id = p.identification_module;
        let criteria = p
            .eligibility_module
            .eligibility_criteria
            .as_deref()
            .map(clean_html)
            .unwrap_or_default();
        let measures = |list: Vec<OutcomeMeasure>| {
            list.into_iter()
                .filter_map(|o| o.measure)
                .filter(|m| !m.trim().is_empty())
                .collect::<Vec<_>>()
        };

        let mut references = p.references_module.references;
        if references.is_empty() {
            // Some documents carry references under the derived section.
            if let Some(found) = self
                .derived_section
                .as_ref()
                .and_then(|d| d.pointer("/publicationModule/references"))
                .and_then(|r| Vec::<RawReference>::deserialize(r).ok())
            {
                references = found;
            }
        }

        StructuredStudy {
            nct_id: id.nct_id.unwrap_or_default(),
            title: id
                .official_title
                .or(id.brief_title)
                .unwrap_or_default(),
            brief_summary: clean_html(p.description_module.brief_summary.as_deref().unwrap_or("")),
            detailed_description: clean_html(
                p.description_module
                    .detailed_description
                    .as_deref()
                    .unwrap_or(""),
            ),
            status: p.status_module.overall_status,
            start_date: p
                .status_module
                .start_date_struct
                .and_then(|d| d.date)
                .map(|d| normalize_date(&d)),
            end_date: p
                .status_module
                .completion_date_struct
                .and_then(|d| d.date)
                .map(|d| normalize_date(&d)),
            conditions: p.conditions_module.conditions,
            design: StudyDesign {
                study_type: p.design_module.study_type,
                phases: p.design_module.phases,
                allocation: p.design_module.design_info.allocation,
                enrollment: p.design_module.enrollment_info.count,
            },
            inclusion_criteria: criteria_section(&criteria, "Inclusion"),
            exclusion_criteria: criteria_section(&criteria, "Exclusion"),
            eligibility: Eligibility {
                criteria,
                healthy_volunteers: p.eligibility_module.healthy_volunteers,
                sex: p.eligibility_module.sex,
                minimum_age: p.eligibility_module.minimum_age,
                maximum_age: p.eligibility_module.maximum_age,
            },
            interventions: p.arms_interventions_module.interventions,
            outcomes: Outcomes {
                primary: measures(p.outcomes_module.primary_outcomes),
                secondary: measures(p.outcomes_module.secondary_outcomes),
            },
            sponsor: p.sponsor_collaborators_module.lead_sponsor,
            locations: p
                .contacts_locations_module
                .locations
                .into_iter()
                .map(|l| Location {
                    facility: l.facility.and_then(|f| match f {
                        Facility::Name(name) => Some(name),
                        Facility::Detailed { name } => name,
                    }),
                    city: l.city,
                    country: l.country,
                })
                .collect(),
            publications: references
                .into_iter()
                .map(|r| Publication {
                    title: r.title,
                    citation: r.citation,
                    pmid: r.pmid,
                })
                .collect(),
        }
    }
}
