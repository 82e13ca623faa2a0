mod common;

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use common::{MockModel, Reply};
use ctgov_assistant::{error::AssistantError, llm::Model, retry::RetryPolicy};

fn fast(retries: u32) -> RetryPolicy {
    RetryPolicy::with_retries(retries, Duration::from_millis(1))
}

#[tokio::test]
async fn transient_errors_are_retried() {
    let calls = AtomicU32::new(0);
    let value = fast(3)
        .run("test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AssistantError::model_call("timeout"))
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn permanent_errors_are_not_retried() {
    let calls = AtomicU32::new(0);
    let err = fast(3)
        .run("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AssistantError::UserInput("nothing to search".into()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AssistantError::UserInput(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_retries_wrap_last_error() {
    let err = fast(2)
        .run("test", || async {
            Err::<(), _>(AssistantError::ModelCall {
                message: "overloaded".into(),
                status: Some(529),
            })
        })
        .await
        .unwrap_err();

    match err {
        AssistantError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*source, AssistantError::ModelCall { status: Some(529), .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn default_policy_makes_one_attempt() {
    let mock = Arc::new(MockModel::scripted(vec![
        Reply::Status(503),
        Reply::Text("second".into()),
    ]));
    let model = Model::new(mock.clone(), RetryPolicy::default());

    let err = model.complete("", "prompt").await.unwrap_err();

    assert!(matches!(err, AssistantError::ModelCall { status: Some(503), .. }));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn model_retries_through_policy() {
    let mock = Arc::new(MockModel::scripted(vec![
        Reply::Status(503),
        Reply::Text("second".into()),
    ]));
    let model = Model::new(mock.clone(), fast(1));

    assert_eq!(model.complete("", "prompt").await.unwrap(), "second");
    assert_eq!(mock.call_count(), 2);
}

#[test]
fn backoff_grows_and_caps() {
    let policy = RetryPolicy {
        max_retries: 10,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(1000),
    };
    let first = policy.delay_for(1);
    assert!(first <= Duration::from_millis(100) && first >= Duration::from_millis(75));
    let third = policy.delay_for(3);
    assert!(third <= Duration::from_millis(400) && third >= Duration::from_millis(300));
    assert!(policy.delay_for(10) <= Duration::from_millis(1000));
}
