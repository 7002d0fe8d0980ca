//! End-to-end pipeline tests: submission through terminal status.

use std::sync::Arc;
use std::time::Duration;

use qcp_core::{DeliveryOptions, DeliveryRequest, DeliveryStatus, DistributionError};
use qcp_distribution::{DeliveryRecord, DistributionConfig, DistributionManager};
use qcp_ratelimit::RateLimitConfig;
use qcp_testkit::{test_cell, InMemoryRepository, MockAssemblerServer, StaticVerifier};

fn manager_with(
    repository: Arc<InMemoryRepository>,
    config: DistributionConfig,
) -> DistributionManager {
    DistributionManager::new(repository, Arc::new(StaticVerifier::passing()), config)
        .expect("manager construction")
}

async fn wait_for_terminal(manager: &DistributionManager, request_id: &str) -> DeliveryRecord {
    for _ in 0..200 {
        if let Some(record) = manager.get_status(request_id) {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("delivery {request_id} never reached a terminal status");
}

fn http_request(assembler: &MockAssemblerServer, cell_id: &str) -> DeliveryRequest {
    DeliveryRequest::for_cell("a1", cell_id)
        .with_quantum_signature("sig-1")
        .with_options(DeliveryOptions::new().with_endpoint(assembler.cells_endpoint()))
}

#[tokio::test]
async fn http_delivery_completes_and_second_hit_is_cached() {
    let assembler = MockAssemblerServer::start().await;
    assembler.accept_deliveries(200).await;

    let repository = Arc::new(InMemoryRepository::new());
    repository.insert(test_cell("c1"));

    let manager = manager_with(Arc::clone(&repository), DistributionConfig::default());
    manager.start();

    let first = manager.submit(http_request(&assembler, "c1")).unwrap();
    let record = wait_for_terminal(&manager, &first).await;
    assert_eq!(record.status, DeliveryStatus::Completed);
    let details = record.history.last().unwrap().details.as_ref().unwrap();
    assert_eq!(details["cached"], false);

    let second = manager.submit(http_request(&assembler, "c1")).unwrap();
    let record = wait_for_terminal(&manager, &second).await;
    assert_eq!(record.status, DeliveryStatus::Completed);
    let details = record.history.last().unwrap().details.as_ref().unwrap();
    assert_eq!(details["cached"], true);

    // The cache absorbed the second resolution.
    assert_eq!(repository.lookup_count(), 1);
    assert_eq!(assembler.delivery_count().await, 2);

    let stats = manager.stats();
    assert_eq!(stats.tracker.completed_count, 2);
    assert_eq!(stats.cache.unwrap().hit_count, 1);
    assert_eq!(stats.protocols["http"].successful_deliveries, 2);
}

#[tokio::test]
async fn disabled_cache_resolves_from_repository_every_time() {
    let assembler = MockAssemblerServer::start().await;
    assembler.accept_deliveries(200).await;

    let repository = Arc::new(InMemoryRepository::new());
    repository.insert(test_cell("c1"));

    let manager = manager_with(
        Arc::clone(&repository),
        DistributionConfig::default().without_cache(),
    );
    manager.start();

    for _ in 0..2 {
        let id = manager.submit(http_request(&assembler, "c1")).unwrap();
        let record = wait_for_terminal(&manager, &id).await;
        assert_eq!(record.status, DeliveryStatus::Completed);
    }

    assert_eq!(repository.lookup_count(), 2);
    assert!(manager.stats().cache.is_none());
}

#[tokio::test]
async fn capability_request_resolves_a_matching_cell() {
    let assembler = MockAssemblerServer::start().await;
    assembler.accept_deliveries(200).await;

    let repository = Arc::new(InMemoryRepository::new());
    repository.insert(test_cell("c1"));

    let manager = manager_with(repository, DistributionConfig::default());
    manager.start();

    let request = DeliveryRequest::for_capability("a1", "testing")
        .with_quantum_signature("sig-1")
        .with_options(DeliveryOptions::new().with_endpoint(assembler.cells_endpoint()));
    let id = manager.submit(request).unwrap();

    let record = wait_for_terminal(&manager, &id).await;
    assert_eq!(record.status, DeliveryStatus::Completed);
    assert_eq!(assembler.delivery_count().await, 1);
}

#[tokio::test]
async fn missing_cell_fails_with_not_found() {
    let manager = manager_with(
        Arc::new(InMemoryRepository::new()),
        DistributionConfig::default(),
    );
    manager.start();

    let id = manager
        .submit(DeliveryRequest::for_cell("a1", "absent"))
        .unwrap();
    let record = wait_for_terminal(&manager, &id).await;

    assert_eq!(record.status, DeliveryStatus::Failed);
    let details = record.history.last().unwrap().details.as_ref().unwrap();
    assert_eq!(details["error_type"], "not_found");
}

#[tokio::test]
async fn verification_failure_is_terminal_failure() {
    let repository = Arc::new(InMemoryRepository::new());
    repository.insert(test_cell("c1"));

    let manager = DistributionManager::new(
        repository,
        Arc::new(StaticVerifier::failing()),
        DistributionConfig::default(),
    )
    .unwrap();
    manager.start();

    let id = manager
        .submit(DeliveryRequest::for_cell("a1", "c1"))
        .unwrap();
    let record = wait_for_terminal(&manager, &id).await;

    assert_eq!(record.status, DeliveryStatus::Failed);
    let details = record.history.last().unwrap().details.as_ref().unwrap();
    assert_eq!(details["error_type"], "verification_failed");
}

#[tokio::test]
async fn unknown_protocol_fails_with_unsupported_protocol() {
    let repository = Arc::new(InMemoryRepository::new());
    repository.insert(test_cell("c1"));

    let manager = manager_with(repository, DistributionConfig::default());
    manager.start();

    let id = manager
        .submit(DeliveryRequest::for_cell("a1", "c1").with_protocol("carrier-pigeon"))
        .unwrap();
    let record = wait_for_terminal(&manager, &id).await;

    assert_eq!(record.status, DeliveryStatus::Failed);
    let details = record.history.last().unwrap().details.as_ref().unwrap();
    assert_eq!(details["error_type"], "unsupported_protocol");
}

#[tokio::test]
async fn transport_rejection_fails_the_delivery() {
    let assembler = MockAssemblerServer::start().await;
    assembler.reject_deliveries(503).await;

    let repository = Arc::new(InMemoryRepository::new());
    repository.insert(test_cell("c1"));

    let manager = manager_with(repository, DistributionConfig::default());
    manager.start();

    let id = manager.submit(http_request(&assembler, "c1")).unwrap();
    let record = wait_for_terminal(&manager, &id).await;

    assert_eq!(record.status, DeliveryStatus::Failed);
    let details = record.history.last().unwrap().details.as_ref().unwrap();
    assert_eq!(details["error_type"], "transport");
    assert_eq!(manager.stats().tracker.failed_count, 1);
}

#[tokio::test]
async fn submit_rejects_invalid_requests() {
    let manager = manager_with(
        Arc::new(InMemoryRepository::new()),
        DistributionConfig::default(),
    );

    let missing_assembler = DeliveryRequest::for_cell("", "c1");
    assert!(matches!(
        manager.submit(missing_assembler),
        Err(DistributionError::Validation { .. })
    ));

    let mut no_target = DeliveryRequest::for_cell("a1", "c1");
    no_target.cell_id = None;
    assert!(matches!(
        manager.submit(no_target),
        Err(DistributionError::Validation { .. })
    ));

    assert_eq!(manager.stats().tracker.total_requests, 0);
}

#[tokio::test]
async fn submit_rejects_rate_limited_assemblers_synchronously() {
    let config = DistributionConfig::default()
        .with_rate_limit(RateLimitConfig::new(1, 60, 1000));
    let manager = manager_with(Arc::new(InMemoryRepository::new()), config);

    manager
        .submit(DeliveryRequest::for_cell("a1", "c1"))
        .unwrap();
    let rejected = manager.submit(DeliveryRequest::for_cell("a1", "c2"));
    assert!(matches!(
        rejected,
        Err(DistributionError::RateLimited { assembler_id }) if assembler_id == "a1"
    ));

    // A different assembler has its own windows.
    assert!(manager.submit(DeliveryRequest::for_cell("a2", "c1")).is_ok());
}

#[tokio::test]
async fn queued_request_can_be_cancelled() {
    let manager = manager_with(
        Arc::new(InMemoryRepository::new()),
        DistributionConfig::default(),
    );
    // Dispatch loop deliberately not started: the request stays queued.

    let id = manager
        .submit(DeliveryRequest::for_cell("a1", "c1"))
        .unwrap();
    assert!(manager.cancel(&id));

    let record = manager.get_status(&id).unwrap();
    assert_eq!(record.status, DeliveryStatus::Cancelled);
    assert_eq!(manager.stats().tracker.cancelled_count, 1);

    // Already terminal: a second cancel is refused, as is an unknown id.
    assert!(!manager.cancel(&id));
    assert!(!manager.cancel("ghost"));
}

#[tokio::test]
async fn cancelled_request_is_not_delivered_after_start() {
    let assembler = MockAssemblerServer::start().await;
    assembler.accept_deliveries(200).await;

    let repository = Arc::new(InMemoryRepository::new());
    repository.insert(test_cell("c1"));

    let manager = manager_with(repository, DistributionConfig::default());
    let id = manager.submit(http_request(&assembler, "c1")).unwrap();
    assert!(manager.cancel(&id));

    manager.start();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        manager.get_status(&id).unwrap().status,
        DeliveryStatus::Cancelled
    );
    assert_eq!(assembler.delivery_count().await, 0);
}

#[tokio::test]
async fn priority_orders_deliveries_when_started() {
    let assembler = MockAssemblerServer::start().await;
    assembler.accept_deliveries(200).await;

    let repository = Arc::new(InMemoryRepository::new());
    repository.insert(test_cell("c1"));

    let manager = manager_with(repository, DistributionConfig::default());

    // Enqueue before starting so priorities decide the dispatch order.
    let background = manager
        .submit(http_request(&assembler, "c1").with_priority(9))
        .unwrap();
    let urgent = manager
        .submit(http_request(&assembler, "c1").with_priority(1))
        .unwrap();
    assert_eq!(manager.stats().queue_size, 2);

    manager.start();
    let urgent_record = wait_for_terminal(&manager, &urgent).await;
    let background_record = wait_for_terminal(&manager, &background).await;
    assert_eq!(urgent_record.status, DeliveryStatus::Completed);
    assert_eq!(background_record.status, DeliveryStatus::Completed);
    assert!(manager.is_running());

    manager.stop();
    assert!(!manager.is_running());
}
