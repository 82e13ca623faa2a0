//! ClinicalTrials.gov web-search link for previewing a query in the browser.

use once_cell::sync::Lazy;
use regex::Regex;
use urlencoding::encode;

use super::structured::StructuredQuery;

const SEARCH_BASE: &str = "https://clinicaltrials.gov/search?";

static START_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AREA\[StartDate\]RANGE\[(.*?),(.*?)\]").expect("start regex"));
static COMPLETION_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"AREA\[CompletionDate\]RANGE\[(.*?),(.*?)\]").expect("completion regex")
});

fn status_code(status: &str) -> Option<&'static str> {
    Some(match status.trim() {
        "COMPLETED" => "com",
        "RECRUITING" => "rec",
        "NOT_YET_RECRUITING" => "nyr",
        "ACTIVE_NOT_RECRUITING" => "anr",
        "TERMINATED" => "term",
        "WITHDRAWN" => "wth",
        "SUSPENDED" => "sus",
        _ => return None,
    })
}

/// Build the website search URL equivalent to `query` (table view).
///
/// Only the parameters the website understands are carried over; the
/// first status wins when several are given.
pub fn web_search_url(query: &StructuredQuery) -> String {
    let mut params: Vec<(&str, String)> = vec![("viewType", "Table".to_string())];

    if let Some(cond) = query.encoded("query.cond") {
        params.push(("cond", cond));
    }
    if let Some(intr) = query.encoded("query.intr") {
        params.push(("intr", intr));
    }
    if let Some(advanced) = query.encoded("filter.advanced") {
        if let Some(caps) = START_RANGE.captures(&advanced) {
            params.push(("start", format!("{}_{}", caps[1].trim(), caps[2].trim())));
        }
        if let Some(caps) = COMPLETION_RANGE.captures(&advanced) {
            params.push(("studyComp", format!("{}_{}", caps[1].trim(), caps[2].trim())));
        }
    }
    if let Some(status) = query.get("filter.overallStatus") {
        let first = status
            .items()
            .into_iter()
            .flat_map(|item| item.split(','))
            .next()
            .and_then(status_code);
        if let Some(code) = first {
            params.push(("aggFilters", format!("status:{code}")));
        }
    }
    if let Some(sort) = query.get("sort") {
        let newest = sort
            .items()
            .into_iter()
            .flat_map(|item| item.split(|c| c == ',' || c == '|'))
            .any(|item| item.trim() == "LastUpdatePostDate:desc");
        if newest {
            params.push(("sort", "nwst".to_string()));
        }
    }

    let encoded = params
        .iter()
        .map(|(key, value)| format!("{key}={}", encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{SEARCH_BASE}{encoded}")
}
