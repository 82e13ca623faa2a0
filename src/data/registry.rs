//! ClinicalTrials.gov v2 `studies` client with bounded, lazy pagination.

use std::collections::HashSet;

use futures::{stream, Stream, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::study::{StructuredStudy, StudyRecord};
use crate::{
    config::Settings,
    error::{AssistantError, RegistryFailure, Result},
    query::StructuredQuery,
    retry::RetryPolicy,
};

/// Largest page the registry serves.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Parameters owned by the client rather than the query.
const CLIENT_PARAMETERS: &[&str] = &["format", "countTotal", "pageSize", "pageToken"];

/// One registry response page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudyPage {
    pub studies: Vec<StudyRecord>,
    pub next_page_token: Option<String>,
    pub total_count: Option<u64>,
}

/// Records gathered for one search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub studies: Vec<StudyRecord>,
    pub total_count: Option<u64>,
    pub pages: usize,
    /// More records were available than the requested maximum.
    pub truncated: bool,
}

impl SearchResults {
    pub fn structured(&self) -> Vec<StructuredStudy> {
        self.studies.iter().filter_map(StudyRecord::structure).collect()
    }
}

#[derive(Clone)]
pub struct RegistryClient {
    http: Client,
    base_url: String,
    page_size: u32,
    max_pages: usize,
    retry: RetryPolicy,
}

struct Cursor {
    params: Vec<(String, String)>,
    token: Option<String>,
    seen: HashSet<String>,
    pages: usize,
    records: usize,
    finished: bool,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("ctgov-assistant/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryFailure::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            page_size: 100,
            max_pages: 50,
            retry: RetryPolicy::none(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(&settings.registry_base_url, settings.registry_timeout())?
            .with_page_size(settings.registry_page_size)
            .with_max_pages(settings.max_pages)
            .with_retry(settings.retry_policy()))
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Wire parameters for the first page of `query`.
    pub fn request_params(&self, query: &StructuredQuery) -> Vec<(String, String)> {
        let page_size = query
            .encoded("pageSize")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .map(|size| size.clamp(1, MAX_PAGE_SIZE))
            .unwrap_or(self.page_size);
        if let Some(format) = query.encoded("format") {
            if !format.eq_ignore_ascii_case("json") {
                warn!(%format, "overriding requested format with json");
            }
        }
        let mut params: Vec<(String, String)> = query
            .to_registry_params()
            .into_iter()
            .filter(|(key, _)| !CLIENT_PARAMETERS.contains(&key.as_str()))
            .collect();
        params.push(("format".into(), "json".into()));
        params.push(("countTotal".into(), "true".into()));
        params.push(("pageSize".into(), page_size.to_string()));
        params
    }

    async fn fetch_page(&self, params: &[(String, String)], token: Option<&str>) -> Result<StudyPage> {
        let mut request = self.http.get(&self.base_url).query(params);
        if let Some(token) = token {
            request = request.query(&[("pageToken", token)]);
        }
        let response = request.send().await.map_err(RegistryFailure::from)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryFailure::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        let body = response.text().await.map_err(RegistryFailure::from)?;
        serde_json::from_str::<StudyPage>(&body)
            .map_err(|e| RegistryFailure::Malformed(e.to_string()).into())
    }

    /// Lazily stream pages for `query` until the registry stops handing out
    /// tokens or `max_records` records have been produced.
    ///
    /// Each page token is requested at most once. Hitting the page bound while
    /// a token remains, or receiving a token twice, ends the stream with
    /// [`AssistantError::RegistryPaginationExhausted`].
    pub fn pages<'a>(
        &'a self,
        query: &StructuredQuery,
        max_records: usize,
    ) -> impl Stream<Item = Result<StudyPage>> + 'a {
        let cursor = Cursor {
            params: self.request_params(query),
            token: None,
            seen: HashSet::new(),
            pages: 0,
            records: 0,
            finished: false,
        };
        stream::try_unfold(cursor, move |mut cursor| async move {
            if cursor.finished || cursor.records >= max_records {
                return Ok(None);
            }
            if cursor.pages >= self.max_pages {
                return Err(AssistantError::RegistryPaginationExhausted {
                    pages: cursor.pages,
                    detail: format!(
                        "registry still offered more results after {} records",
                        cursor.records
                    ),
                });
            }

            let token = cursor.token.clone();
            let page = {
                let params = &cursor.params;
                let token = token.as_deref();
                self.retry
                    .run("registry", || self.fetch_page(params, token))
                    .await?
            };
            cursor.pages += 1;
            cursor.records += page.studies.len();
            debug!(
                page = cursor.pages,
                studies = page.studies.len(),
                has_next = page.next_page_token.is_some(),
                "fetched registry page"
            );

            match page.next_page_token.as_deref().map(str::trim) {
                None | Some("") => cursor.finished = true,
                Some(next) => {
                    if !cursor.seen.insert(next.to_string()) {
                        return Err(AssistantError::RegistryPaginationExhausted {
                            pages: cursor.pages,
                            detail: format!("registry repeated page token `{next}`"),
                        });
                    }
                    cursor.token = Some(next.to_string());
                }
            }
            Ok(Some((page, cursor)))
        })
    }

    /// Collect up to `max_records` studies for `query`.
    #[instrument(skip(self, query), fields(params = query.len()))]
    pub async fn search(&self, query: &StructuredQuery, max_records: usize) -> Result<SearchResults> {
        let mut results = SearchResults::default();
        let pages = self.pages(query, max_records);
        futures::pin_mut!(pages);
        while let Some(page) = pages.try_next().await? {
            results.pages += 1;
            if page.total_count.is_some() {
                results.total_count = page.total_count;
            }
            let more = page.next_page_token.is_some();
            results.studies.extend(page.studies);
            if results.studies.len() >= max_records {
                results.truncated = more || results.studies.len() > max_records;
                results.studies.truncate(max_records);
            }
        }
        info!(
            studies = results.studies.len(),
            total = ?results.total_count,
            pages = results.pages,
            "registry search complete"
        );
        Ok(results)
    }
}
