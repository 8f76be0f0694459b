//! Chat completions endpoint integration tests
//!
//! Drives POST /v1/chat/completions end to end: upstream login, candidate
//! discovery, normalization, and the error taxonomy.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    constants, test_data,
    upstream_mocks::{mock_candidate, mock_login_rejected, mock_login_success, openai_completion},
    GatewayHarness,
};

const CANDIDATE_PATHS: [&str; 5] = [
    "/api/v1/chat/completions",
    "/api/chat/completions",
    "/ollama/v1/chat/completions",
    "/api/generate",
    "/ollama/api/generate",
];

#[tokio::test]
async fn test_openai_shaped_response_passes_through_unchanged() {
    let harness = GatewayHarness::new().await;
    mock_login_success(&harness.upstream).await;

    let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"hey"}}],   "vendor_field":  true}"#;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("cookie", constants::TEST_SESSION_COOKIE))
        .and(header("authorization", "Bearer upstream-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(raw))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness.chat().json(&test_data::hi_request()).await;

    response.assert_status_ok();
    assert_eq!(response.text(), raw);
}

#[tokio::test]
async fn test_generate_response_is_normalized() {
    let harness = GatewayHarness::new().await;
    mock_login_success(&harness.upstream).await;

    for endpoint in &CANDIDATE_PATHS[..3] {
        mock_candidate(&harness.upstream, endpoint, ResponseTemplate::new(404), 1).await;
    }
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "prompt": "user: hi\nassistant:" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "  hello world " })))
        .expect(1)
        .mount(&harness.upstream)
        .await;
    mock_candidate(&harness.upstream, "/ollama/api/generate", ResponseTemplate::new(200), 0).await;

    let response = harness.chat().json(&test_data::hi_request()).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["object"], "chat.completion");
    assert_eq!(json["model"], "llama3.2:1b");
    assert_eq!(json["choices"][0]["message"]["role"], "assistant");
    assert_eq!(json["choices"][0]["message"]["content"], "hello world");
    assert_eq!(json["choices"][0]["finish_reason"], "stop");
    assert_eq!(json["usage"]["completion_tokens"], 2);
    // [{"role": "user", "content": "hi"}]
    assert_eq!(json["usage"]["prompt_tokens"], 4);
    assert_eq!(json["usage"]["total_tokens"], 6);
    assert!(json["id"].as_str().unwrap().starts_with("chatcmpl-"));
}

#[tokio::test]
async fn test_all_candidates_failing_returns_aggregate_error() {
    let harness = GatewayHarness::new().await;
    mock_login_success(&harness.upstream).await;

    for endpoint in CANDIDATE_PATHS {
        mock_candidate(
            &harness.upstream,
            endpoint,
            ResponseTemplate::new(503).set_body_string("maintenance"),
            1,
        )
        .await;
    }

    let response = harness.chat().json(&test_data::hi_request()).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "UPSTREAM_EXHAUSTED");

    let failures: Vec<String> = json["error"]["details"]["failures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_str().unwrap().to_string())
        .collect();
    let expected: Vec<String> = CANDIDATE_PATHS
        .iter()
        .map(|p| format!("{}: 503 - maintenance", p))
        .collect();
    assert_eq!(failures, expected);

    let message = json["error"]["message"].as_str().unwrap();
    for endpoint in CANDIDATE_PATHS {
        assert!(message.contains(endpoint), "message should mention {}", endpoint);
    }
}

#[tokio::test]
async fn test_second_candidate_success_skips_the_rest() {
    let harness = GatewayHarness::new().await;
    mock_login_success(&harness.upstream).await;

    mock_candidate(&harness.upstream, CANDIDATE_PATHS[0], ResponseTemplate::new(405), 1).await;
    mock_candidate(
        &harness.upstream,
        CANDIDATE_PATHS[1],
        ResponseTemplate::new(200).set_body_json(openai_completion()),
        1,
    )
    .await;
    for endpoint in &CANDIDATE_PATHS[2..] {
        mock_candidate(&harness.upstream, endpoint, ResponseTemplate::new(200), 0).await;
    }

    let response = harness.chat().json(&test_data::hi_request()).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json, openai_completion());
}

#[tokio::test]
async fn test_unknown_roles_are_forwarded_as_user() {
    let harness = GatewayHarness::new().await;
    mock_login_success(&harness.upstream).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "system", "content": "be brief" },
                { "role": "user", "content": "lookup result" }
            ],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion()))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .chat()
        .json(&json!({
            "messages": [
                { "role": "system", "content": "be brief" },
                { "role": "tool", "content": "lookup result" }
            ]
        }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_failed_login_returns_401() {
    let harness = GatewayHarness::new().await;
    mock_login_rejected(&harness.upstream).await;
    for endpoint in CANDIDATE_PATHS {
        mock_candidate(&harness.upstream, endpoint, ResponseTemplate::new(200), 0).await;
    }

    let response = harness.chat().json(&test_data::hi_request()).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "UPSTREAM_AUTH_FAILED");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("all authentication endpoints failed"));
}

#[tokio::test]
async fn test_placeholder_credentials_return_configuration_error() {
    let harness = GatewayHarness::with_config(|config| {
        config.upstream_email = conduit::config::PLACEHOLDER_EMAIL.to_string();
    })
    .await;

    let response = harness.chat().json(&test_data::hi_request()).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "CONFIGURATION_ERROR");
    assert!(harness.upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_messages_is_bad_request() {
    let harness = GatewayHarness::new().await;

    let response = harness
        .chat()
        .json(&json!({ "model": "llama3.2:1b", "messages": [] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_missing_messages_is_bad_request() {
    let harness = GatewayHarness::new().await;

    let response = harness
        .chat()
        .json(&json!({ "model": "llama3.2:1b" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
