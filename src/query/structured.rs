//! Registry query parameters and the validating parse of model output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{AssistantError, Result};

/// Parameters documented by the ClinicalTrials.gov v2 `studies` endpoint.
pub const DOCUMENTED_PARAMETERS: &[&str] = &[
    "query.cond",
    "query.term",
    "query.locn",
    "query.titles",
    "query.intr",
    "query.outc",
    "query.spons",
    "query.lead",
    "query.id",
    "query.patient",
    "filter.overallStatus",
    "filter.geo",
    "filter.ids",
    "filter.advanced",
    "filter.synonyms",
    "sort",
    "format",
    "markupFormat",
    "fields",
    "countTotal",
    "pageSize",
    "pageToken",
];

/// Parameters the registry expects as comma-separated lists.
const LIST_PARAMETERS: &[&str] = &[
    "filter.overallStatus",
    "filter.ids",
    "filter.synonyms",
    "sort",
    "fields",
];

/// Dropped from every query: the full record is always needed downstream.
pub const FORBIDDEN_PARAMETER: &str = "fields";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
}

impl ParamValue {
    /// All items; a text value is a single item.
    pub fn items(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => vec![text.as_str()],
            Self::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    fn is_blank(&self) -> bool {
        self.items().iter().all(|item| item.trim().is_empty())
    }

    fn from_json(key: &str, value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| scalar(key, item))
                .collect::<Result<Vec<_>>>()
                .map(Self::List),
            other => scalar(key, other).map(Self::Text),
        }
    }
}

fn scalar(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(AssistantError::UserInput(format!(
            "parameter `{key}` must be a string or list of strings, got {other}"
        ))),
    }
}

/// Ordered mapping of registry parameter names to values.
///
/// Every construction path validates keys against [`DOCUMENTED_PARAMETERS`]
/// and removes `fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct StructuredQuery(IndexMap<String, ParamValue>);

impl TryFrom<Map<String, Value>> for StructuredQuery {
    type Error = AssistantError;

    fn try_from(object: Map<String, Value>) -> Result<Self> {
        let mut query = StructuredQuery::default();
        for (key, value) in object {
            let value = ParamValue::from_json(&key, value)?;
            query.insert(&key, value)?;
        }
        Ok(query)
    }
}

impl StructuredQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse untrusted model text into a validated query.
    ///
    /// Code fences and prose around the first JSON object are tolerated;
    /// anything else is a [`AssistantError::ModelOutputParse`].
    pub fn from_model_output(raw: &str) -> Result<Self> {
        let json = extract_json_object(raw).ok_or_else(|| {
            AssistantError::ModelOutputParse(format!(
                "no JSON object found in model output: {}",
                preview(raw)
            ))
        })?;
        let value: Value = serde_json::from_str(json)
            .map_err(|e| AssistantError::ModelOutputParse(format!("invalid JSON: {e}")))?;
        match value {
            Value::Object(object) => Self::try_from(object).map_err(|err| match err {
                AssistantError::UserInput(message) => AssistantError::ModelOutputParse(message),
                other => other,
            }),
            other => Err(AssistantError::ModelOutputParse(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Insert a parameter after checking it is documented.
    ///
    /// `fields` and blank values are skipped rather than rejected.
    pub fn insert(&mut self, key: &str, value: ParamValue) -> Result<()> {
        let key = key.trim();
        if !DOCUMENTED_PARAMETERS.contains(&key) {
            let hint = closest_parameter(key)
                .map(|name| format!("; did you mean `{name}`?"))
                .unwrap_or_default();
            return Err(AssistantError::UserInput(format!(
                "unknown registry parameter `{key}`{hint}"
            )));
        }
        if key == FORBIDDEN_PARAMETER {
            warn!(?value, "dropping `fields` parameter from query");
            return Ok(());
        }
        if value.is_blank() {
            return Ok(());
        }
        self.0.insert(key.to_string(), value);
        Ok(())
    }

    pub fn set_text(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.insert(key, ParamValue::Text(value.into()))
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// AND an Essie expression onto `filter.advanced`.
    pub fn and_advanced(&mut self, expression: &str) {
        let combined = match self.encoded("filter.advanced") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("({existing}) AND {expression}")
            }
            _ => expression.to_string(),
        };
        self.0
            .insert("filter.advanced".to_string(), ParamValue::Text(combined));
    }

    /// Value as sent on the wire.
    pub fn encoded(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|value| encode_value(key, value))
    }

    /// Query-string pairs in insertion order.
    pub fn to_registry_params(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), encode_value(key, value)))
            .collect()
    }
}

fn encode_value(key: &str, value: &ParamValue) -> String {
    match value {
        ParamValue::Text(text) => text.clone(),
        ParamValue::List(items) if LIST_PARAMETERS.contains(&key) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(","),
        // Essie expression parameters combine list items conjunctively.
        ParamValue::List(items) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

fn closest_parameter(key: &str) -> Option<&'static str> {
    DOCUMENTED_PARAMETERS
        .iter()
        .map(|name| (*name, strsim::jaro_winkler(key, name)))
        .filter(|(_, similarity)| *similarity >= 0.85)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name)
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn preview(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(120) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
