use std::sync::{Arc, Mutex};

use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use ctgov_assistant::{
    config::Settings,
    error::AssistantError,
    llm::{MessagesClient, ModelClient},
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

type Seen = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

async fn fake_model(status: StatusCode, reply: Value) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let app = Router::new().route(
        "/v1/messages",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let log = log.clone();
            let reply = reply.clone();
            async move {
                log.lock().unwrap().push((headers, body));
                (status, Json(reply))
            }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), seen)
}

fn settings(base: &str) -> Settings {
    Settings {
        model_base_url: base.to_string(),
        model_api_key: Some("test-key".into()),
        model_id: "test-model".into(),
        model_max_tokens: 512,
        ..Settings::default()
    }
}

#[tokio::test]
async fn sends_key_version_and_system() {
    let (base, seen) = fake_model(
        StatusCode::OK,
        json!({
            "content": [
                { "type": "text", "text": "{\"query.cond\": " },
                { "type": "text", "text": "\"asthma\"}" }
            ],
            "stop_reason": "end_turn"
        }),
    )
    .await;
    let client = MessagesClient::from_settings(&settings(&base)).unwrap();

    let text = client.complete("system rules", "find asthma trials").await.unwrap();

    assert_eq!(text, r#"{"query.cond": "asthma"}"#);
    assert_eq!(client.model_name(), "test-model");
    let seen = seen.lock().unwrap();
    let (headers, body) = &seen[0];
    assert_eq!(headers["x-api-key"], "test-key");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["system"], "system rules");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "find asthma trials");
}

#[tokio::test]
async fn blank_system_is_omitted() {
    let (base, seen) = fake_model(
        StatusCode::OK,
        json!({ "content": [{ "type": "text", "text": "ok" }] }),
    )
    .await;
    let client = MessagesClient::from_settings(&settings(&base)).unwrap();

    client.complete("", "summarise").await.unwrap();

    assert!(seen.lock().unwrap()[0].1.get("system").is_none());
}

#[tokio::test]
async fn overload_is_transient_model_error() {
    let (base, _) = fake_model(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "type": "rate_limit_error" } }),
    )
    .await;
    let client = MessagesClient::from_settings(&settings(&base)).unwrap();

    let err = client.complete("", "prompt").await.unwrap_err();

    assert!(matches!(err, AssistantError::ModelCall { status: Some(429), .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn empty_reply_is_an_error() {
    let (base, _) = fake_model(StatusCode::OK, json!({ "content": [] })).await;
    let client = MessagesClient::from_settings(&settings(&base)).unwrap();

    let err = client.complete("", "prompt").await.unwrap_err();

    assert!(matches!(err, AssistantError::ModelCall { status: None, .. }));
}

#[test]
fn missing_key_is_rejected() {
    let settings = Settings {
        model_api_key: None,
        ..Settings::default()
    };
    let err = MessagesClient::from_settings(&settings).err().unwrap();
    assert!(err.to_string().contains("MODEL_API_KEY"));
}
