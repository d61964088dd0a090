//! Merge request polling against a stateful fake server.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use foxops_client::{ClientConfig, Context, FoxopsClient, FoxopsError, IncarnationId};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Serves the scripted statuses in order, repeating the last one.
///
/// With no statuses the incarnation has no merge request.
#[derive(Clone)]
struct FakeFoxops {
    statuses: Arc<Vec<&'static str>>,
    gets: Arc<Mutex<Vec<Instant>>>,
}

impl FakeFoxops {
    fn new(statuses: Vec<&'static str>) -> Self {
        FakeFoxops {
            statuses: Arc::new(statuses),
            gets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn gets(&self) -> Vec<Instant> {
        self.gets.lock().clone()
    }
}

async fn incarnation(State(fake): State<FakeFoxops>, Path(id): Path<i64>) -> Json<Value> {
    let status = {
        let mut gets = fake.gets.lock();
        gets.push(Instant::now());
        let index = gets.len().min(fake.statuses.len());
        index.checked_sub(1).map(|index| fake.statuses[index])
    };

    let mut body = json!({
        "id": id,
        "incarnation_repository": "inc/repo",
        "template_repository": "template/repo",
        "template_repository_version": "v2",
        "target_directory": ".",
        "template_data": {},
        "commit_sha": "12345678",
        "commit_url": "u"
    });
    if let (Some(status), Value::Object(fields)) = (status, &mut body) {
        fields.insert("merge_request_id".into(), json!("17"));
        fields.insert(
            "merge_request_url".into(),
            json!("https://git.example.com/mr/17"),
        );
        fields.insert("merge_request_status".into(), json!(status));
    }
    Json(body)
}

async fn serve(fake: FakeFoxops) -> String {
    let app = Router::new()
        .route("/api/incarnations/{id}", get(incarnation))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(endpoint: String) -> FoxopsClient {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    FoxopsClient::new(ClientConfig::new(endpoint, "dev-token", "1.2.3")).unwrap()
}

#[tokio::test]
async fn test_polls_until_merged() {
    let fake = FakeFoxops::new(vec!["open", "merged"]);
    let client = client(serve(fake.clone()).await);

    let incarnation = client
        .get_incarnation_with_merge_request_status(
            &Context::background(),
            &IncarnationId::from("1234"),
            "merged",
        )
        .await
        .unwrap();

    assert_eq!(incarnation.merge_request_status.as_deref(), Some("merged"));
    let gets = fake.gets();
    assert_eq!(gets.len(), 2);
    assert!(gets[1] - gets[0] >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_returns_immediately_when_status_matches() {
    let fake = FakeFoxops::new(vec!["closed"]);
    let client = client(serve(fake.clone()).await);

    let incarnation = client
        .get_incarnation_with_merge_request_status(
            &Context::background(),
            &IncarnationId::from("1234"),
            "closed",
        )
        .await
        .unwrap();

    assert_eq!(incarnation.merge_request_status.as_deref(), Some("closed"));
    assert_eq!(fake.gets().len(), 1);
}

#[tokio::test]
async fn test_no_merge_request_needs_one_get() {
    let fake = FakeFoxops::new(vec![]);
    let client = client(serve(fake.clone()).await);

    for status in ["merged", "closed"] {
        let incarnation = client
            .get_incarnation_with_merge_request_status(
                &Context::background(),
                &IncarnationId::from("1234"),
                status,
            )
            .await
            .unwrap();
        assert_eq!(incarnation.merge_request_id, None);
        assert_eq!(incarnation.merge_request_status, None);
    }

    assert_eq!(fake.gets().len(), 2);
}

#[tokio::test]
async fn test_deadline_reports_last_seen() {
    let fake = FakeFoxops::new(vec!["open"]);
    let client = client(serve(fake.clone()).await);
    let ctx = Context::background().with_timeout(Duration::from_millis(1500));

    let err = client
        .get_incarnation_with_merge_request_status(&ctx, &IncarnationId::from("1234"), "merged")
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    match err {
        FoxopsError::WaitTimedOut {
            status, last_seen, ..
        } => {
            assert_eq!(status, "merged");
            let last_seen = last_seen.expect("at least one poll succeeded");
            assert_eq!(last_seen.merge_request_status.as_deref(), Some("open"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fake.gets().len(), 2);
}

#[tokio::test]
async fn test_cancellation_stops_polling() {
    let fake = FakeFoxops::new(vec!["open"]);
    let client = client(serve(fake.clone()).await);
    let ctx = Context::background();

    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            ctx.cancel();
        })
    };

    let err = client
        .get_incarnation_with_merge_request_status(&ctx, &IncarnationId::from("1234"), "merged")
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(err.is_cancelled());
    assert_eq!(fake.gets().len(), 1);
}
