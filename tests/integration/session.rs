//! Upstream session integration tests
//!
//! Verifies that logins are cached across requests and that concurrent
//! requests share a single login.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    test_data,
    upstream_mocks::{mock_candidate, mock_login_success, openai_completion},
    CountingAcquirer, GatewayHarness,
};

#[tokio::test]
async fn test_session_reused_across_requests() {
    let harness = GatewayHarness::new().await;
    mock_login_success(&harness.upstream).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion()))
        .expect(3)
        .mount(&harness.upstream)
        .await;

    for _ in 0..3 {
        harness
            .chat()
            .json(&test_data::hi_request())
            .await
            .assert_status_ok();
    }

    assert_eq!(harness.upstream_hits("/api/v1/auths/signin").await, 1);
    assert_eq!(harness.upstream_hits("/auth").await, 1);

    let health: Value = harness.server.get("/health").await.json();
    assert_eq!(health["session"]["state"], "valid");
    assert!(health["session"]["expires_at"].is_string());
}

#[tokio::test]
async fn test_concurrent_requests_trigger_one_login() {
    let acquirer = Arc::new(CountingAcquirer::new(Duration::from_millis(200)));
    let harness = GatewayHarness::with_acquirer(acquirer.clone()).await;
    mock_candidate(
        &harness.upstream,
        "/api/v1/chat/completions",
        ResponseTemplate::new(200).set_body_json(openai_completion()),
        10,
    )
    .await;

    let body = test_data::hi_request();
    let requests = (0..10).map(|_| {
        let request = harness.chat().json(&body);
        async move { request.await }
    });
    let responses = futures::future::join_all(requests).await;

    for response in responses {
        response.assert_status_ok();
    }
    assert_eq!(acquirer.calls(), 1);
}

#[tokio::test]
async fn test_rejected_session_forces_new_login() {
    let harness = GatewayHarness::new().await;
    mock_login_success(&harness.upstream).await;

    // First request: every candidate says the session is no good.
    for endpoint in conduit::completion::DEFAULT_CANDIDATES {
        Mock::given(method("POST"))
            .and(path(endpoint.path))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&harness.upstream)
            .await;
    }
    // Afterwards the first candidate works.
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion()))
        .mount(&harness.upstream)
        .await;

    harness
        .chat()
        .json(&test_data::hi_request())
        .await
        .assert_status_internal_server_error();
    harness
        .chat()
        .json(&test_data::hi_request())
        .await
        .assert_status_ok();

    assert_eq!(harness.upstream_hits("/api/v1/auths/signin").await, 2);
}
