//! PICO search criteria entered by the researcher.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AssistantError, Result},
    prompts::Bindings,
};

/// Free-text PICO fields plus optional date windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    pub patient: Option<String>,
    pub intervention: Option<String>,
    pub comparison: Option<String>,
    pub outcome: Option<String>,
    pub additional_condition: Option<String>,
    pub start_date_range: DateRange,
    pub completion_date_range: DateRange,
}

/// Inclusive date window; applied only when both ends are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Essie `RANGE` expression over `area`, e.g. `AREA[StartDate]RANGE[2020-01-01,2021-01-01]`.
    pub fn essie(&self, area: &str) -> Option<String> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Some(format!(
                "AREA[{area}]RANGE[{},{}]",
                from.format("%Y-%m-%d"),
                to.format("%Y-%m-%d")
            )),
            _ => None,
        }
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

impl SearchCriteria {
    /// True when no PICO field carries text.
    pub fn is_empty(&self) -> bool {
        [
            &self.patient,
            &self.intervention,
            &self.comparison,
            &self.outcome,
            &self.additional_condition,
        ]
        .into_iter()
        .all(|field| text(field).is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(AssistantError::UserInput(
                "enter at least one of patient, intervention, comparison, outcome or additional condition"
                    .into(),
            ));
        }
        for (label, range) in [
            ("start", &self.start_date_range),
            ("completion", &self.completion_date_range),
        ] {
            if let (Some(from), Some(to)) = (range.from, range.to) {
                if from > to {
                    return Err(AssistantError::UserInput(format!(
                        "{label} date range begins after it ends ({from} > {to})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Values for the query-generation template; absent fields bind as empty.
    pub fn bindings(&self) -> Bindings {
        Bindings::new()
            .set("patient", text(&self.patient))
            .set("intervention", text(&self.intervention))
            .set("comparison", text(&self.comparison))
            .set("outcome", text(&self.outcome))
            .set("additional_condition", text(&self.additional_condition))
    }

    /// Essie expressions for the configured date windows.
    pub fn date_filters(&self) -> Vec<String> {
        [
            self.start_date_range.essie("StartDate"),
            self.completion_date_range.essie("CompletionDate"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Patient description for summary templates.
    pub fn patient_text(&self) -> &str {
        text(&self.patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn whitespace_only_fields_count_as_empty() {
        let criteria = SearchCriteria {
            patient: Some("   ".into()),
            outcome: Some(String::new()),
            ..Default::default()
        };
        assert!(criteria.is_empty());
        assert!(matches!(
            criteria.validate(),
            Err(AssistantError::UserInput(_))
        ));
    }

    #[test]
    fn half_open_range_is_ignored() {
        let criteria = SearchCriteria {
            patient: Some("adults".into()),
            start_date_range: DateRange::new(Some(date("2020-01-01")), None),
            completion_date_range: DateRange::new(
                Some(date("2021-01-01")),
                Some(date("2023-12-31")),
            ),
            ..Default::default()
        };
        assert_eq!(
            criteria.date_filters(),
            vec!["AREA[CompletionDate]RANGE[2021-01-01,2023-12-31]".to_string()]
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let criteria = SearchCriteria {
            outcome: Some("HbA1c".into()),
            start_date_range: DateRange::new(Some(date("2024-01-01")), Some(date("2020-01-01"))),
            ..Default::default()
        };
        assert!(criteria.validate().is_err());
    }
}
