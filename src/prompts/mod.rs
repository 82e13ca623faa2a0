//! Prompt template store: immutable templates keyed by task, loaded once.

mod text;

use std::{collections::BTreeMap, fmt, str::FromStr};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};

/// Identifier of every template the assistant sends to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    QuerySystem,
    QueryUser,
    Overview,
    Study,
    CrossStudy,
    Eligibility,
    Publications,
    Comparison,
    Protocol,
    Comprehensive,
}

impl TemplateId {
    pub fn all() -> &'static [TemplateId] {
        &[
            Self::QuerySystem,
            Self::QueryUser,
            Self::Overview,
            Self::Study,
            Self::CrossStudy,
            Self::Eligibility,
            Self::Publications,
            Self::Comparison,
            Self::Protocol,
            Self::Comprehensive,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuerySystem => "query_system",
            Self::QueryUser => "query_user",
            Self::Overview => "overview",
            Self::Study => "study",
            Self::CrossStudy => "cross_study",
            Self::Eligibility => "eligibility",
            Self::Publications => "publications",
            Self::Comparison => "comparison",
            Self::Protocol => "protocol",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| AssistantError::UnknownTemplate(s.to_string()))
    }
}

/// Language the model is told to answer in. Fixed per template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    English,
    Japanese,
}

/// A format string with `{name}` placeholders.
#[derive(Debug, Clone, Serialize)]
pub struct PromptTemplate {
    pub id: TemplateId,
    pub locale: Locale,
    pub text: String,
    pub placeholders: Vec<String>,
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z][a-z0-9_]*)\}").expect("placeholder regex"));

static STORE: Lazy<IndexMap<TemplateId, PromptTemplate>> = Lazy::new(|| {
    let system = text::QUERY_SYSTEM.replace("@PARAMETERS@", text::REGISTRY_PARAMETERS);
    [
        (TemplateId::QuerySystem, Locale::English, system),
        (TemplateId::QueryUser, Locale::English, text::QUERY_USER.to_string()),
        (TemplateId::Overview, Locale::Japanese, text::OVERVIEW.to_string()),
        (TemplateId::Study, Locale::Japanese, text::STUDY.to_string()),
        (TemplateId::CrossStudy, Locale::Japanese, text::CROSS_STUDY.to_string()),
        (TemplateId::Eligibility, Locale::Japanese, text::ELIGIBILITY.to_string()),
        (TemplateId::Publications, Locale::Japanese, text::PUBLICATIONS.to_string()),
        (TemplateId::Comparison, Locale::Japanese, text::COMPARISON.to_string()),
        (TemplateId::Protocol, Locale::Japanese, text::PROTOCOL.to_string()),
        (TemplateId::Comprehensive, Locale::Japanese, text::COMPREHENSIVE.to_string()),
    ]
    .into_iter()
    .map(|(id, locale, text)| {
        let placeholders = placeholders_in(&text);
        (
            id,
            PromptTemplate {
                id,
                locale,
                text,
                placeholders,
            },
        )
    })
    .collect()
});

fn placeholders_in(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Template for a known identifier.
pub fn get(id: TemplateId) -> &'static PromptTemplate {
    // Every variant is inserted when the store is built.
    &STORE[&id]
}

/// Template by name, e.g. `"cross_study"`.
pub fn lookup(name: &str) -> Result<&'static PromptTemplate> {
    name.parse::<TemplateId>().map(get)
}

/// All templates in declaration order.
pub fn all() -> impl Iterator<Item = &'static PromptTemplate> {
    STORE.values()
}

/// Named values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct Bindings(BTreeMap<String, String>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl PromptTemplate {
    /// Substitute every placeholder in one pass.
    ///
    /// Bound values are inserted verbatim and never rescanned, so a value that
    /// itself looks like `{name}` is left alone. A missing binding is an error.
    pub fn render(&self, bindings: &Bindings) -> Result<String> {
        let mut out = String::with_capacity(self.text.len() + 256);
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&self.text) {
            let Some(whole) = caps.get(0) else { continue };
            let name = &caps[1];
            let value = bindings
                .get(name)
                .ok_or_else(|| AssistantError::MissingBinding {
                    template: self.id.as_str(),
                    placeholder: name.to_string(),
                })?;
            out.push_str(&self.text[last..whole.start()]);
            out.push_str(value);
            last = whole.end();
        }
        out.push_str(&self.text[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_has_no_placeholders() {
        let system = get(TemplateId::QuerySystem);
        assert!(system.placeholders.is_empty());
        assert!(system.text.contains("query.cond"));
        assert!(!system.text.contains("@PARAMETERS@"));
    }

    #[test]
    fn query_rules_live_in_system_prompt() {
        let system = &get(TemplateId::QuerySystem).text;
        assert!(system.contains("Never use the `fields` parameter"));
        assert!(system.contains("Do not add date ranges"));
        assert!(system.contains("in English"));
        let user = &get(TemplateId::QueryUser).text;
        assert!(!user.contains("`fields`"));
    }

    #[test]
    fn lookup_accepts_dashes() {
        assert_eq!(lookup("cross-study").unwrap().id, TemplateId::CrossStudy);
    }

    #[test]
    fn bound_values_are_not_rescanned() {
        let template = get(TemplateId::Eligibility);
        let rendered = template
            .render(&Bindings::new().set("criteria", "{criteria}"))
            .unwrap();
        assert_eq!(rendered.matches("{criteria}").count(), 1);
    }
}
