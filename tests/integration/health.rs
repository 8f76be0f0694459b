//! Health endpoint integration tests
//!
//! - GET /health - Service status with session state
//! - GET / - Static API description

use serde_json::Value;

use crate::common::GatewayHarness;

#[tokio::test]
async fn test_health_endpoint_returns_proper_structure() {
    let harness = GatewayHarness::new().await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();

    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json.get("uptime_seconds").is_some(), "Response should have 'uptime_seconds' field");
    assert!(json.get("timestamp").is_some(), "Response should have 'timestamp' field");
    assert_eq!(json["session"]["state"], "absent");
    assert_eq!(json["session"]["acquiring"], false);
}

#[tokio::test]
async fn test_health_does_not_contact_upstream() {
    let harness = GatewayHarness::new().await;

    harness.server.get("/health").await.assert_status_ok();
    harness.server.get("/").await.assert_status_ok();

    let received = harness.upstream.received_requests().await.unwrap();
    assert!(received.is_empty(), "Health checks must not reach the upstream");
}

#[tokio::test]
async fn test_health_needs_no_api_key() {
    let harness = GatewayHarness::new().await;

    // No Authorization header at all
    harness.server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_root_endpoint_describes_api() {
    let harness = GatewayHarness::new().await;

    let response = harness.server.get("/").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["message"], "Chat Completions API");
    assert_eq!(json["endpoints"]["chat"], "/v1/chat/completions");
    assert_eq!(json["endpoints"]["health"], "/health");
    assert_eq!(json["authentication"], "Bearer token required");
}
