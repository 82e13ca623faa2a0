#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{extract::Query, http::StatusCode, routing::get, Router};
use ctgov_assistant::{
    data::{study::Intervention, StructuredStudy},
    error::{AssistantError, Result},
    llm::{Model, ModelClient},
    retry::RetryPolicy,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// What the fake model answers on one call.
pub enum Reply {
    Text(String),
    Status(u16),
}

/// Scripted model double that records every prompt it receives.
#[derive(Default)]
pub struct MockModel {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<String>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl MockModel {
    pub fn replying(text: &str) -> Self {
        MockModel {
            fallback: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn scripted(replies: Vec<Reply>) -> Self {
        MockModel {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.calls.lock().unwrap().last().unwrap().1.clone()
    }
}

#[async_trait]
impl ModelClient for MockModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Status(status)) => Err(AssistantError::ModelCall {
                message: format!("mock status {status}"),
                status: Some(status),
            }),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| AssistantError::model_call("mock has no reply left")),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

pub fn model(mock: &Arc<MockModel>) -> Model {
    Model::new(mock.clone(), RetryPolicy::none())
}

/// Minimal structured study for summary tests.
pub fn study(nct_id: &str, interventions: &[&str]) -> StructuredStudy {
    let mut study = StructuredStudy {
        nct_id: nct_id.to_string(),
        title: format!("Trial {nct_id}"),
        status: Some("COMPLETED".into()),
        ..Default::default()
    };
    study.interventions = interventions
        .iter()
        .map(|name| Intervention {
            kind: Some("DRUG".into()),
            name: name.to_string(),
            description: None,
        })
        .collect();
    study.outcomes.primary = vec!["Change in HbA1c".into()];
    study.eligibility.criteria =
        "Inclusion Criteria:\n* Adults with type 2 diabetes\n\nExclusion Criteria:\n* Type 1 diabetes".into();
    study
}

/// Registry-shaped study document.
pub fn registry_study(nct_id: &str) -> Value {
    json!({
        "protocolSection": {
            "identificationModule": { "nctId": nct_id, "briefTitle": format!("Study {nct_id}") },
            "statusModule": {
                "overallStatus": "RECRUITING",
                "startDateStruct": { "date": "2021-03" }
            },
            "armsInterventionsModule": {
                "interventions": [{ "type": "DRUG", "name": "Empagliflozin" }]
            }
        }
    })
}

pub fn page(ids: &[&str], next: Option<&str>, total: u64) -> String {
    let studies: Vec<Value> = ids.iter().map(|id| registry_study(id)).collect();
    let mut body = json!({ "studies": studies, "totalCount": total });
    if let Some(token) = next {
        body["nextPageToken"] = json!(token);
    }
    body.to_string()
}

/// In-process stand-in for the registry's `studies` endpoint.
pub struct FakeRegistry {
    pub url: String,
    pub requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl FakeRegistry {
    pub fn tokens_requested(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|params| params.get("pageToken").cloned())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub async fn fake_registry<F>(respond: F) -> FakeRegistry
where
    F: Fn(&HashMap<String, String>) -> (StatusCode, String) + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);
    let log = requests.clone();
    let app = Router::new().route(
        "/api/v2/studies",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let respond = respond.clone();
            let log = log.clone();
            async move {
                let reply = respond(&params);
                log.lock().unwrap().push(params);
                reply
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakeRegistry {
        url: format!("http://{addr}/api/v2/studies"),
        requests,
    }
}
