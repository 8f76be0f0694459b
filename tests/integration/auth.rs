//! Gateway API key integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use serde_json::Value;
use wiremock::ResponseTemplate;

use crate::common::{
    bearer, constants, test_data,
    upstream_mocks::{mock_candidate, openai_completion},
    CountingAcquirer, GatewayHarness,
};

#[tokio::test]
async fn test_missing_authorization_header_is_rejected() {
    let harness = GatewayHarness::new().await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .json(&test_data::hi_request())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    assert_eq!(response.header(header::WWW_AUTHENTICATE), "Bearer");
}

#[tokio::test]
async fn test_wrong_api_key_is_rejected_before_upstream() {
    let harness = GatewayHarness::new().await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(header::AUTHORIZATION, bearer("sk-wrong"))
        .json(&test_data::hi_request())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "INVALID_API_KEY");

    let received = harness.upstream.received_requests().await.unwrap();
    assert!(received.is_empty(), "No login should be attempted for a bad key");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let harness = GatewayHarness::new().await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse::<HeaderValue>().unwrap())
        .json(&test_data::hi_request())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lowercase_bearer_scheme_is_accepted() {
    let harness =
        GatewayHarness::with_acquirer(Arc::new(CountingAcquirer::new(Duration::ZERO))).await;
    mock_candidate(
        &harness.upstream,
        "/api/v1/chat/completions",
        ResponseTemplate::new(200).set_body_json(openai_completion()),
        1,
    )
    .await;

    let response = harness
        .server
        .post("/v1/chat/completions")
        .add_header(
            header::AUTHORIZATION,
            format!("bearer {}", constants::TEST_API_KEY).parse::<HeaderValue>().unwrap(),
        )
        .json(&test_data::hi_request())
        .await;

    response.assert_status_ok();
}
