use crate::e2e::helpers;

use helpers::TestContext;
use hyper::StatusCode;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_ok_for_health_check(ctx: &TestContext) {
    let response = ctx.client.get("/health").await.unwrap();

    response.assert_status(StatusCode::OK);

    // Health endpoint returns plain text
    let body = String::from_utf8(response.body_bytes.clone()).unwrap();
    assert_eq!(body, "OK");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_store_synthesis_and_watcher_when_ready(ctx: &TestContext) {
    let response = ctx.client.get("/health/ready").await.unwrap();

    response.assert_status(StatusCode::OK);

    let body = response.body.as_ref().unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["status"], "connected");
    assert_eq!(body["synthesis"]["provider"], "xtts");
    assert_eq!(body["synthesis"]["healthy"], true);
    assert_eq!(body["watcher"]["running"], true);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_stay_ready_when_synthesis_is_down(ctx: &TestContext) {
    ctx.xtts_server.reset().await;

    let response = ctx.client.get("/health/ready").await.unwrap();

    // Audio degrades but text translation keeps flowing
    response.assert_status(StatusCode::OK);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["synthesis"]["healthy"], false);
    assert!(body["synthesis"]["error"].is_string());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_be_unready_once_the_watcher_stops(ctx: &TestContext) {
    ctx.watcher.stop().await;

    let response = ctx.client.get("/health/ready").await.unwrap();

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["watcher"]["running"], false);
    assert_eq!(body["watcher"]["watchedRooms"], 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_include_request_id_in_health_responses(ctx: &TestContext) {
    let response = ctx.client.get("/health").await.unwrap();
    response.assert_header_exists("x-request-id");

    let response = ctx.client.get("/health/ready").await.unwrap();
    response.assert_header_exists("x-request-id");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_echo_the_callers_request_id(ctx: &TestContext) {
    let response = ctx
        .client
        .get_with_headers("/health", &[("x-request-id", "trace-abc-123")])
        .await
        .unwrap();

    response.assert_header("x-request-id", "trace-abc-123");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_handle_concurrent_health_checks(ctx: &TestContext) {
    let mut futures = Vec::new();
    for _ in 0..10 {
        let client = ctx.client.clone();
        futures.push(async move { client.get("/health").await });
    }

    let results = futures::future::join_all(futures).await;

    for result in results {
        let response = result.unwrap();
        response.assert_status(StatusCode::OK);
    }
}
