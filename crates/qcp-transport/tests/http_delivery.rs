//! HTTP handler integration tests against a mock assembler.

use qcp_core::DeliveryOptions;
use qcp_testkit::{test_cell, MockAssemblerServer};
use qcp_transport::{HttpConfig, HttpHandler, ProtocolHandler};

fn handler() -> HttpHandler {
    HttpHandler::new(HttpConfig::default().with_provider_id("provider-1")).unwrap()
}

#[tokio::test]
async fn accepted_delivery_reports_success() {
    let assembler = MockAssemblerServer::start().await;
    assembler.accept_deliveries(200).await;

    let options = DeliveryOptions::new().with_endpoint(assembler.cells_endpoint());
    let handler = handler();
    let outcome = handler
        .deliver(&test_cell("c1"), "a1", "sig-1", &options)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(200));
    assert_eq!(outcome.response.unwrap()["status"], "accepted");

    let stats = handler.stats();
    assert_eq!(stats.delivery_attempts, 1);
    assert_eq!(stats.successful_deliveries, 1);
}

#[tokio::test]
async fn accepted_202_counts_as_success() {
    let assembler = MockAssemblerServer::start().await;
    assembler.accept_deliveries(202).await;

    let options = DeliveryOptions::new().with_endpoint(assembler.cells_endpoint());
    let outcome = handler()
        .deliver(&test_cell("c1"), "a1", "sig-1", &options)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(202));
}

#[tokio::test]
async fn rejected_delivery_is_structured_failure() {
    let assembler = MockAssemblerServer::start().await;
    assembler.reject_deliveries(500).await;

    let options = DeliveryOptions::new().with_endpoint(assembler.cells_endpoint());
    let handler = handler();
    let outcome = handler
        .deliver(&test_cell("c1"), "a1", "sig-1", &options)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.status_code, Some(500));
    assert!(outcome.error.unwrap().contains("500"));
    assert_eq!(handler.stats().failed_deliveries, 1);
}

#[tokio::test]
async fn connection_failure_is_structured_failure() {
    // Nothing is listening on this port.
    let options = DeliveryOptions::new().with_endpoint("http://127.0.0.1:9/api/v1/cells");
    let handler = handler();
    let outcome = handler
        .deliver(&test_cell("c1"), "a1", "sig-1", &options)
        .await;

    assert!(!outcome.success);
    assert!(outcome.error.is_some());
    assert_eq!(handler.stats().failed_deliveries, 1);
}

#[tokio::test]
async fn custom_headers_are_forwarded() {
    let assembler = MockAssemblerServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::header("X-Custom-Tag", "blue"))
        .respond_with(
            wiremock::ResponseTemplate::new(201).set_body_json(serde_json::json!({"ok": true})),
        )
        .mount(assembler.inner())
        .await;

    let options = DeliveryOptions::new()
        .with_endpoint(assembler.cells_endpoint())
        .with_header("X-Custom-Tag", "blue");
    let outcome = handler()
        .deliver(&test_cell("c1"), "a1", "sig-1", &options)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(201));
}
