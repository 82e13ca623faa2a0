//! Clinical-trial search and summarization assistant for ClinicalTrials.gov.
//!
//! The pipeline runs PICO [`query::SearchCriteria`] through the hosted model
//! ([`query::QueryBuilder`]) into a validated [`query::StructuredQuery`], pages
//! through the registry ([`data::RegistryClient`]), and summarises the
//! selected studies ([`summarize::Summarizer`]).

pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod llm;
pub mod logging;
pub mod prompts;
pub mod query;
pub mod retry;
pub mod summarize;

pub use error::{AssistantError, RegistryFailure};
